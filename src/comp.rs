//! A component is a small data structure that can be attached to an entity.
//!
//! Every component kind is identified by a dense [`ComponentType`] in the range
//! `0..total_components`, where `total_components` is fixed when the
//! [`Context`](crate::Context) is built.
//! An entity has one slot per component type,
//! so there can only be one instance of each component type on the same entity.
//!
//! # Declaring components
//! Component types implement [`Component`] (the dynamically dispatched interface)
//! and usually [`Kind`] (the statically known component type and blank value).
//! Both are generated by the [`comp`](crate::comp!) attribute macro.
//!
//! # Instances and identity
//! Components are stored behind a [`ComponentRef`],
//! a shared handle to a single instance.
//! Two handles are the same component if they point to the same instance ([`ComponentRef::ptr_eq`]),
//! which is how [`Entity::update_component`](crate::Entity::update_component)
//! tells an in-place update apart from a replacement.
//!
//! # Pooling
//! Components removed from an entity are retained by the context
//! and handed out again by [`Context::create_component`](crate::Context::create_component)
//! after being [reset](Component::reset) to their blank state.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

mod registry;
pub use registry::Registry;

/// Identifies a kind of component.
///
/// Component types are dense small integers,
/// used as the slot index in the fixed-size slot array of every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentType(u16);

impl ComponentType {
    /// Creates a component type from its raw value.
    pub const fn new(raw: u16) -> Self { Self(raw) }

    /// The raw value of this component type.
    pub const fn raw(self) -> u16 { self.0 }

    /// The slot index of this component type.
    pub const fn index(self) -> usize { self.0 as usize }
}

impl From<u16> for ComponentType {
    fn from(raw: u16) -> Self { Self(raw) }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// A value that can be attached to an entity.
///
/// Use [`#[comp]`](crate::comp!) to implement this trait.
pub trait Component: Any {
    /// The slot that this component occupies on an entity.
    ///
    /// This must return the same value for the whole lifetime of the instance.
    fn component_type(&self) -> ComponentType;

    /// Upcasts to [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Upcasts to [`Any`] for mutable downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Restores the blank state of this component.
    ///
    /// Called before a pooled instance is reused.
    fn reset(&mut self);
}

/// A component with a statically known [`ComponentType`].
pub trait Kind: Component + Sized {
    /// The component type of all instances of this type.
    const TYPE: ComponentType;

    /// Creates a blank instance.
    fn blank() -> Self;
}

/// A shared handle to a component instance.
#[derive(Clone)]
pub struct ComponentRef {
    ty:   ComponentType,
    cell: Rc<RefCell<dyn Component>>,
}

impl ComponentRef {
    /// Moves a component into a new shared instance.
    pub fn new<C: Component>(component: C) -> Self {
        let ty = component.component_type();
        let cell: Rc<RefCell<dyn Component>> = Rc::new(RefCell::new(component));
        Self { ty, cell }
    }

    /// The component type of the instance.
    pub fn component_type(&self) -> ComponentType { self.ty }

    /// Whether both handles point to the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.cell, &other.cell) }

    /// Borrows the instance as a trait object.
    ///
    /// # Panics
    /// Panics if the instance is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, dyn Component> { self.cell.borrow() }

    /// Mutably borrows the instance as a trait object.
    ///
    /// # Panics
    /// Panics if the instance is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, dyn Component> { self.cell.borrow_mut() }

    /// Borrows the instance as `C`.
    ///
    /// Returns `None` if the instance is not a `C`.
    pub fn get<C: Component>(&self) -> Option<Ref<'_, C>> {
        Ref::filter_map(self.cell.borrow(), |comp| comp.as_any().downcast_ref::<C>()).ok()
    }

    /// Mutably borrows the instance as `C`.
    ///
    /// Returns `None` if the instance is not a `C`.
    pub fn get_mut<C: Component>(&self) -> Option<RefMut<'_, C>> {
        RefMut::filter_map(self.cell.borrow_mut(), |comp| comp.as_any_mut().downcast_mut::<C>())
            .ok()
    }

    /// Whether this handle is the only reference to the instance.
    pub(crate) fn is_unique(&self) -> bool { Rc::strong_count(&self.cell) == 1 }
}

impl<C: Component> From<C> for ComponentRef {
    fn from(component: C) -> Self { Self::new(component) }
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentRef({} @ {:p})", self.ty, Rc::as_ptr(&self.cell).cast::<()>())
    }
}
