//! An entity-component runtime with incrementally maintained entity groups.
//!
//! # Entities and components
//! An [`Entity`] is an identity plus one optional slot per [`ComponentType`].
//! The number of component types is fixed when the [`Context`] is built,
//! so every entity has the same fixed-size slot array
//! and component access is a direct index.
//!
//! # Groups
//! A [`Group`] is the live set of entities that satisfy a list of [`Matcher`]s.
//! Groups are requested from the context with [`Context::group`]
//! and kept up to date incrementally:
//! a component change on an entity only re-evaluates the groups
//! whose matchers reference that component type.
//! Requesting the same matchers twice returns the same group.
//!
//! # Observers
//! A [`GroupObserver`] passively accumulates the entities that a group reports
//! until it is explicitly cleared,
//! which lets a [`System`](system::System) process only the entities that changed since the last tick.
//!
//! # Recycling
//! Destroyed entities and removed components are retained by the context and reused.
//! Entity handles remember the generation they were issued for,
//! so a handle kept across a destroy never aliases the recycled entity.
//!
//! # Example
//! ```
//! use herd::{comp, Context, Kind, Matcher};
//!
//! #[comp(kind = 0)]
//! #[derive(Default)]
//! struct Position(i32);
//!
//! #[comp(kind = 1)]
//! #[derive(Default)]
//! struct Velocity(i32);
//!
//! let context = Context::new(2);
//! let moving = context.group([Matcher::all_of([Position::TYPE, Velocity::TYPE])]);
//!
//! let entity = context.create_entity([Position(0).into()]).unwrap();
//! assert!(!moving.contains_entity(&entity));
//!
//! entity.add_component([Velocity(3).into()]).unwrap();
//! assert!(moving.contains_entity(&entity));
//!
//! context.destroy_entity(&entity);
//! assert_eq!(moving.count(), 0);
//! ```

#![cfg_attr(not(debug_assertions), deny(missing_docs))]
#![cfg_attr(doc, warn(missing_docs))]

pub mod comp;
pub use comp::{Component, ComponentRef, ComponentType, Kind};

pub mod context;
pub use context::Context;

pub mod entity;
pub use entity::Entity;

mod error;
pub use error::{Error, Result};

pub mod event;
pub use event::EventKind;

pub mod group;
pub use group::Group;

pub mod matcher;
pub use matcher::Matcher;

pub mod observer;
pub use observer::GroupObserver;

pub mod system;

#[cfg(any(test, feature = "internal-bench"))]
pub mod test_util;

/// Implements [`Component`] and [`Kind`] for a struct or enum.
///
/// # Options
/// - `kind = <expr>` (required): the [`ComponentType`] of the component,
///   a constant `u16` expression.
/// - `blank = <expr>`: a function or closure taking no arguments
///   that returns the blank value of the component.
///   Defaults to [`Default::default`].
/// - `herd_as(<path>)`: the path to this crate, `::herd` by default.
///
/// # Example
/// ```
/// #[herd::comp(kind = 3, blank = || Health(100))]
/// struct Health(u32);
///
/// use herd::Kind;
/// assert_eq!(Health::TYPE, herd::ComponentType::new(3));
/// assert_eq!(Health::blank().0, 100);
/// ```
pub use herd_codegen::comp;
