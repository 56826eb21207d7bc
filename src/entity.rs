//! An entity is an identity plus one optional component slot per component type.
//!
//! Entities are created and destroyed by a [`Context`](crate::Context).
//! An [`Entity`] value is a cheap, clonable handle to the entity storage.
//! Destroyed entities are recycled by the context,
//! so each handle also remembers the [`Generation`] it was issued for;
//! a handle kept across a destroy is *stale* and no longer equals the recycled entity.
//!
//! # Events
//! Every component mutation fires an [`EventKind`] to the listeners registered with
//! [`Entity::add_event`], synchronously and in registration order.
//! The derived caches ([`Entity::components`] and [`Entity::component_types`])
//! are invalidated before each event is fired,
//! so listeners always observe snapshots consistent with the slot they were notified about.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use itertools::Itertools;

use crate::comp::{ComponentRef, ComponentType, Kind};
use crate::event::{EventKind, Listeners};
use crate::{Error, Result};

mod slots;
use slots::Slots;

/// Identifies an entity within one context.
///
/// Ids are assigned in increasing order and reused when an entity is recycled.
pub type EntityId = u64;

/// A listener of component changes on an entity.
pub type ComponentListener = dyn Fn(&Entity, &ComponentRef);

/// The number of times an entity storage has been destroyed.
/// A greater generation implies a newer version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u32);

impl Generation {
    fn next(self) -> Self { Self(self.0.wrapping_add(1)) }
}

/// The storage behind entity handles, reused across generations.
struct Shell {
    id:               EntityId,
    generation:       Cell<Generation>,
    slots:            RefCell<Slots>,
    components_cache: RefCell<Option<Rc<[ComponentRef]>>>,
    types_cache:      RefCell<Option<Rc<[ComponentType]>>>,
    listeners:        RefCell<Listeners<ComponentListener>>,
}

/// A handle to an entity.
#[derive(Clone)]
pub struct Entity {
    shell:      Rc<Shell>,
    generation: Generation,
}

static_assertions::assert_not_impl_any!(Entity: Send, Sync);

impl Entity {
    /// Allocates a new entity with `capacity` empty slots.
    pub(crate) fn new(id: EntityId, capacity: usize) -> Self {
        let shell = Shell {
            id,
            generation: Cell::new(Generation::default()),
            slots: RefCell::new(Slots::new(capacity)),
            components_cache: RefCell::new(None),
            types_cache: RefCell::new(None),
            listeners: RefCell::new(Listeners::default()),
        };
        Self { shell: Rc::new(shell), generation: Generation::default() }
    }

    /// The id of this entity in its context.
    pub fn id(&self) -> EntityId { self.shell.id }

    /// The generation this handle was issued for.
    pub fn generation(&self) -> Generation { self.generation }

    /// Whether the entity this handle was issued for has been destroyed.
    pub fn is_stale(&self) -> bool { self.shell.generation.get() != self.generation }

    /// The number of component slots, equal to the number of component types in the context.
    pub fn capacity(&self) -> usize { self.shell.slots.borrow().capacity() }

    /// Whether the entity has every component type in `types`.
    pub fn has_component(&self, types: &[ComponentType]) -> bool {
        let slots = self.shell.slots.borrow();
        types.iter().all(|&ty| slots.is_set(ty))
    }

    /// Whether the entity has at least one component type in `types`.
    pub fn has_any_component(&self, types: &[ComponentType]) -> bool {
        let slots = self.shell.slots.borrow();
        types.iter().any(|&ty| slots.is_set(ty))
    }

    /// Returns the component of type `ty`.
    pub fn component(&self, ty: ComponentType) -> Result<ComponentRef> {
        self.shell.slots.borrow().get(ty).cloned().ok_or(Error::ComponentDoesNotExist(ty))
    }

    /// Returns the component of type `C`.
    pub fn component_of<C: Kind>(&self) -> Result<ComponentRef> { self.component(C::TYPE) }

    /// The number of components on this entity.
    pub fn component_count(&self) -> usize { self.shell.slots.borrow().len() }

    /// The components on this entity, sorted by component type.
    ///
    /// The snapshot is cached until the next component mutation.
    pub fn components(&self) -> Rc<[ComponentRef]> {
        let mut cache = self.shell.components_cache.borrow_mut();
        let components =
            cache.get_or_insert_with(|| self.shell.slots.borrow().iter().cloned().collect());
        Rc::clone(components)
    }

    /// The component types present on this entity, in ascending order.
    ///
    /// The snapshot is cached until the next component mutation.
    pub fn component_types(&self) -> Rc<[ComponentType]> {
        let mut cache = self.shell.types_cache.borrow_mut();
        let types = cache.get_or_insert_with(|| self.shell.slots.borrow().types().collect());
        Rc::clone(types)
    }

    /// Attaches each component to its slot, firing [`EventKind::Added`] for each.
    ///
    /// Stops at the first component whose slot is already occupied and returns
    /// [`Error::ComponentExists`].
    /// Components before the failing one remain attached.
    pub fn add_component(&self, components: impl IntoIterator<Item = ComponentRef>) -> Result<()> {
        self.assert_current();

        for component in components {
            let ty = component.component_type();
            {
                let mut slots = self.shell.slots.borrow_mut();
                if slots.is_set(ty) {
                    return Err(Error::ComponentExists(ty));
                }
                slots.insert(component.clone());
            }
            self.invalidate_caches();
            self.fire(EventKind::Added, &component);
        }

        Ok(())
    }

    /// Stores each component in its slot, replacing any previous occupant.
    ///
    /// For an empty slot, fires [`EventKind::Added`].
    /// Otherwise fires [`EventKind::Removed`] for the previous occupant
    /// (unless it is the same instance) and then [`EventKind::Updated`].
    pub fn update_component(&self, components: impl IntoIterator<Item = ComponentRef>) {
        self.assert_current();

        for component in components {
            let previous = self.shell.slots.borrow_mut().insert(component.clone());
            self.invalidate_caches();

            match previous {
                Some(previous) => {
                    if !previous.ptr_eq(&component) {
                        self.fire(EventKind::Removed, &previous);
                    }
                    self.fire(EventKind::Updated, &component);
                }
                None => self.fire(EventKind::Added, &component),
            }
        }
    }

    /// Detaches the component of each type, firing [`EventKind::Removed`] for each.
    ///
    /// Stops at the first empty slot and returns [`Error::ComponentDoesNotExist`].
    /// Components before the failing type remain detached.
    pub fn remove_component(&self, types: &[ComponentType]) -> Result<()> {
        self.assert_current();

        for &ty in types {
            let removed = self.shell.slots.borrow_mut().remove(ty);
            let removed = removed.ok_or(Error::ComponentDoesNotExist(ty))?;
            self.invalidate_caches();
            self.fire(EventKind::Removed, &removed);
        }

        Ok(())
    }

    /// Detaches every component, firing [`EventKind::Removed`] for each in type order.
    pub fn remove_all_components(&self) {
        self.assert_current();

        let removed = self.shell.slots.borrow_mut().take_all();
        self.invalidate_caches();
        for component in &removed {
            self.fire(EventKind::Removed, component);
        }
    }

    /// Subscribes `listener` to component changes of the given kind.
    pub fn add_event(&self, kind: EventKind, listener: impl Fn(&Entity, &ComponentRef) + 'static) {
        self.shell.listeners.borrow_mut().push(kind, Rc::new(listener));
    }

    /// Drops all listeners of this entity.
    pub fn remove_all_events(&self) { self.shell.listeners.borrow_mut().clear(); }

    /// Whether any listener is subscribed to this entity.
    pub fn has_events(&self) -> bool { !self.shell.listeners.borrow().is_empty() }

    /// Retires the current generation, making all existing handles stale.
    pub(crate) fn retire(&self) {
        let generation = self.shell.generation.get().next();
        self.shell.generation.set(generation);
    }

    /// Issues a handle for the current generation of the storage.
    pub(crate) fn reissue(&self) -> Entity {
        Entity { shell: Rc::clone(&self.shell), generation: self.shell.generation.get() }
    }

    fn assert_current(&self) {
        if self.is_stale() {
            panic!("Cannot mutate {self:?} through a stale handle; the entity has been destroyed");
        }
    }

    fn invalidate_caches(&self) {
        *self.shell.components_cache.borrow_mut() = None;
        *self.shell.types_cache.borrow_mut() = None;
    }

    fn fire(&self, kind: EventKind, component: &ComponentRef) {
        let listeners = self.shell.listeners.borrow().snapshot(kind);
        for listener in listeners {
            listener(self, component);
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shell, &other.shell) && self.generation == other.generation
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shell.id.hash(state);
        self.generation.hash(state);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.shell.id, self.generation.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity_{}(types [{}])", self.shell.id, self.component_types().iter().join(", "))
    }
}
