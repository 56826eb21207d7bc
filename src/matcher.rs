//! Matchers are immutable predicates over the component types present on an entity.
//!
//! A matcher is built from a list of component types and a [`Mode`].
//! The list is sorted and deduplicated on construction,
//! so the argument order and repeated types never affect equality or [`Matcher::hash_code`].

use std::fmt;
use std::hash::{Hash, Hasher};

use itertools::Itertools;

use crate::comp::ComponentType;
use crate::Entity;

/// Multiplier applied to each component type in [`Matcher::hash_code`].
pub const COMPONENT_HASH_FACTOR: u64 = 647;
/// Multiplier applied to the number of matchers in [`hash_matchers`].
pub const ARRAY_HASH_FACTOR: u64 = 673;

/// How a [`Matcher`] combines its component types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    /// The entity must have every component type.
    AllOf,
    /// The entity must have at least one of the component types.
    AnyOf,
    /// The entity must have none of the component types.
    NoneOf,
}

impl Mode {
    /// Multiplier applied to the number of component types in [`Matcher::hash_code`].
    pub const fn hash_factor(self) -> u64 {
        match self {
            Mode::AllOf => 653,
            Mode::AnyOf => 659,
            Mode::NoneOf => 661,
        }
    }
}

/// An immutable predicate over the component types of an entity.
#[derive(Clone)]
pub struct Matcher {
    mode:  Mode,
    types: Box<[ComponentType]>,
    hash:  u64,
}

static_assertions::assert_impl_all!(Matcher: Send, Sync);

impl Matcher {
    /// Creates a matcher of the given mode.
    pub fn new<T: Into<ComponentType>>(mode: Mode, types: impl IntoIterator<Item = T>) -> Self {
        let types: Box<[ComponentType]> = types.into_iter().map(Into::into).sorted().dedup().collect();
        let hash = types
            .iter()
            .fold(0, |hash, ty| hash ^ u64::from(ty.raw()).wrapping_mul(COMPONENT_HASH_FACTOR))
            ^ (types.len() as u64).wrapping_mul(mode.hash_factor());
        Self { mode, types, hash }
    }

    /// Matches entities that have all of `types`.
    pub fn all_of<T: Into<ComponentType>>(types: impl IntoIterator<Item = T>) -> Self {
        Self::new(Mode::AllOf, types)
    }

    /// Matches entities that have at least one of `types`.
    pub fn any_of<T: Into<ComponentType>>(types: impl IntoIterator<Item = T>) -> Self {
        Self::new(Mode::AnyOf, types)
    }

    /// Matches entities that have none of `types`.
    pub fn none_of<T: Into<ComponentType>>(types: impl IntoIterator<Item = T>) -> Self {
        Self::new(Mode::NoneOf, types)
    }

    /// The mode of this matcher.
    pub fn mode(&self) -> Mode { self.mode }

    /// The sorted, deduplicated component types of this matcher.
    pub fn types(&self) -> &[ComponentType] { &self.types }

    /// A deterministic, order-independent hash of the mode and component types.
    ///
    /// This hash has a small domain and is only suitable as a bucket key.
    pub fn hash_code(&self) -> u64 { self.hash }

    /// Tests the predicate against the current components of `entity`.
    pub fn matches(&self, entity: &Entity) -> bool {
        match self.mode {
            Mode::AllOf => entity.has_component(&self.types),
            Mode::AnyOf => entity.has_any_component(&self.types),
            Mode::NoneOf => !entity.has_any_component(&self.types),
        }
    }
}

impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool { self.mode == other.mode && self.types == other.types }
}

impl Eq for Matcher {}

impl PartialOrd for Matcher {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

impl Ord for Matcher {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.mode, &self.types).cmp(&(other.mode, &other.types))
    }
}

impl Hash for Matcher {
    fn hash<H: Hasher>(&self, state: &mut H) { state.write_u64(self.hash) }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.mode, self.types.iter().join(", "))
    }
}

/// Combines the hashes of a list of matchers.
///
/// A single matcher hashes to its own [`Matcher::hash_code`].
/// The combination is independent of the order of `matchers`.
pub fn hash_matchers(matchers: &[Matcher]) -> u64 {
    match matchers {
        [single] => single.hash_code(),
        _ => {
            matchers.iter().fold(0, |hash, matcher| hash ^ matcher.hash_code())
                ^ (matchers.len() as u64).wrapping_mul(ARRAY_HASH_FACTOR)
        }
    }
}

/// The identity of a group: a sorted, deduplicated list of matchers.
///
/// The composite hash is only used to select a bucket;
/// two keys are the same group only if their matcher lists are structurally equal.
#[derive(Debug, Clone)]
pub(crate) struct GroupKey {
    hash:     u64,
    matchers: Box<[Matcher]>,
}

impl GroupKey {
    pub(crate) fn new(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let matchers: Box<[Matcher]> = matchers.into_iter().sorted().dedup().collect();
        Self { hash: hash_matchers(&matchers), matchers }
    }

    pub(crate) fn matchers(&self) -> &[Matcher] { &self.matchers }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool { self.matchers == other.matchers }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) { state.write_u64(self.hash) }
}

#[cfg(test)]
mod tests;
