//! The context owns the entities, components and groups of one simulation world.
//!
//! A context creates entities (recycling destroyed ones),
//! wires their component events to its own handlers,
//! and uses a reverse index from component type to groups
//! so that a component change only re-evaluates the groups interested in that type.
//!
//! A context is single-threaded: it is neither [`Send`] nor [`Sync`],
//! and all events are dispatched synchronously on the mutating call.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use itertools::Itertools;

use crate::comp::{ComponentRef, ComponentType, Registry};
use crate::entity::EntityId;
use crate::event::EventKind;
use crate::matcher::{GroupKey, Matcher};
use crate::{Entity, Error, Group, Result};

mod builder;
pub use builder::{Builder, Config};

/// Lifecycle events of entities in a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextEvent {
    /// An entity has been created and matched against all groups.
    Created,
    /// An entity is about to be destroyed; its components are still attached.
    WillBeDestroyed,
    /// An entity has lost all components and listeners, and is about to be released.
    Destroyed,
}

/// A listener of entity lifecycle events.
pub type EntityListener = dyn Fn(&Context, &Entity);

/// A listener of group creation.
pub type GroupCreatedListener = dyn Fn(&Context, &Group);

struct Inner {
    config:   Config,
    registry: Registry,

    /// The id of the next freshly allocated entity.
    next_id:        Cell<EntityId>,
    /// Live entities indexed by id.
    entities:       RefCell<IndexMap<EntityId, Entity>>,
    entities_cache: RefCell<Option<Rc<[Entity]>>>,
    /// Retired entity storages available for reuse.
    reusable:       RefCell<Vec<Entity>>,
    /// Ids of the entities currently being destroyed.
    dying:          RefCell<Vec<EntityId>>,

    groups:      RefCell<IndexMap<GroupKey, Group>>,
    /// `group_index[ty]` lists the groups whose matchers reference `ty`, each at most once.
    group_index: RefCell<Box<[Vec<Group>]>>,

    /// Retired component instances indexed by component type.
    component_pool: RefCell<Box<[Vec<ComponentRef>]>>,

    entity_listeners:        RefCell<IndexMap<ContextEvent, Vec<Rc<EntityListener>>>>,
    group_created_listeners: RefCell<Vec<Rc<GroupCreatedListener>>>,
}

/// A handle to a context.
///
/// Cloning the handle does not clone the context.
#[derive(Clone)]
pub struct Context {
    inner: Rc<Inner>,
}

static_assertions::assert_not_impl_any!(Context: Send, Sync);

impl Context {
    /// Creates a context with `total_components` component types and the default configuration.
    ///
    /// # Panics
    /// Panics if `total_components` is zero.
    pub fn new(total_components: usize) -> Self { Builder::new(total_components).build() }

    /// Starts building a context with `total_components` component types.
    pub fn builder(total_components: usize) -> Builder { Builder::new(total_components) }

    pub(crate) fn from_parts(config: Config, registry: Registry) -> Self {
        let total = config.total_components;
        let inner = Inner {
            next_id: Cell::new(config.first_id),
            config,
            registry,
            entities: RefCell::new(IndexMap::new()),
            entities_cache: RefCell::new(None),
            reusable: RefCell::new(Vec::new()),
            dying: RefCell::new(Vec::new()),
            groups: RefCell::new(IndexMap::new()),
            group_index: RefCell::new((0..total).map(|_| Vec::new()).collect()),
            component_pool: RefCell::new((0..total).map(|_| Vec::new()).collect()),
            entity_listeners: RefCell::new(IndexMap::new()),
            group_created_listeners: RefCell::new(Vec::new()),
        };
        Self { inner: Rc::new(inner) }
    }

    /// The configuration this context was built with.
    pub fn config(&self) -> &Config { &self.inner.config }

    /// The number of component types, equal to the number of slots of every entity.
    pub fn total_components(&self) -> usize { self.inner.config.total_components }

    /// Returns a blank component of type `ty`.
    ///
    /// Reuses a component previously removed from an entity if one is available
    /// and no longer referenced elsewhere, after [resetting](crate::Component::reset) it.
    /// Otherwise constructs a new instance with the registered blank constructor.
    ///
    /// # Panics
    /// Panics if no instance can be reused and no constructor is registered for `ty`.
    pub fn create_component(&self, ty: ComponentType) -> ComponentRef {
        if let Some(component) = self.pop_pooled_component(ty) {
            component.borrow_mut().reset();
            log::trace!("Reusing pooled component of type {ty}");
            return component;
        }

        match self.inner.registry.construct(ty) {
            Some(component) => component,
            None => panic!(
                "Cannot create a component of type {ty} because no blank constructor is \
                 registered for it"
            ),
        }
    }

    /// Creates an entity with the given components.
    ///
    /// The entity reuses the storage of a destroyed entity if one is available.
    /// After the components are attached, the entity is matched against every group
    /// and [`ContextEvent::Created`] is fired.
    ///
    /// Returns [`Error::ComponentExists`] without creating anything
    /// if two components share the same type.
    pub fn create_entity(
        &self,
        components: impl IntoIterator<Item = ComponentRef>,
    ) -> Result<Entity> {
        let components: Vec<ComponentRef> = components.into_iter().collect();
        if let Some(ty) = components.iter().map(ComponentRef::component_type).duplicates().next() {
            return Err(Error::ComponentExists(ty));
        }

        let entity = self.obtain_entity();
        entity.add_component(components).expect("component types were checked to be distinct");

        self.inner.entities.borrow_mut().insert(entity.id(), entity.clone());
        self.invalidate_entities_cache();

        for group in self.all_groups() {
            group.handle_entity(&entity);
        }

        self.fire_entity_event(ContextEvent::Created, &entity);
        log::trace!("Created {entity}");

        Ok(entity)
    }

    /// Destroys an entity owned by this context.
    ///
    /// Fires [`ContextEvent::WillBeDestroyed`], removes all components
    /// (re-evaluating the groups of each component type, which may drop the entity but never adopt it),
    /// drops all listeners of the entity, fires [`ContextEvent::Destroyed`],
    /// evicts the entity from every group and retains its storage for reuse.
    /// All existing handles to the entity become stale.
    ///
    /// Destroying an entity again from a listener while it is being destroyed has no effect.
    ///
    /// # Panics
    /// Panics if the entity is not currently owned by this context.
    pub fn destroy_entity(&self, entity: &Entity) {
        if !self.has_entity(entity) {
            panic!("Cannot destroy {entity:?} because it is not owned by this context");
        }
        if self.is_dying(entity) {
            log::trace!("{entity:?} is already being destroyed");
            return;
        }

        self.inner.dying.borrow_mut().push(entity.id());
        self.fire_entity_event(ContextEvent::WillBeDestroyed, entity);
        entity.remove_all_components();
        entity.remove_all_events();
        self.fire_entity_event(ContextEvent::Destroyed, entity);

        self.inner.entities.borrow_mut().swap_remove(&entity.id());
        self.invalidate_entities_cache();

        for group in self.all_groups() {
            group.remove_entity(entity);
        }

        entity.retire();
        self.inner.dying.borrow_mut().retain(|&id| id != entity.id());
        self.inner.reusable.borrow_mut().push(entity.clone());
        log::trace!("Destroyed {entity:?}");
    }

    /// Destroys every entity in bulk.
    ///
    /// Each entity fires [`ContextEvent::WillBeDestroyed`] and [`ContextEvent::Destroyed`],
    /// but its listeners are dropped before its components are removed,
    /// so no per-component group re-evaluation takes place.
    /// Entities created by these listeners are destroyed in the same pass,
    /// and entities destroyed by them individually are skipped.
    /// Every group is emptied afterwards, firing [`EventKind::Removed`] for each member.
    ///
    /// Entities and their components are only retained for reuse
    /// if [`Config::recycle_on_reset`] is set.
    pub fn destroy_all_entities(&self) {
        let recycle = self.inner.config.recycle_on_reset;
        log::debug!("Destroying all {} entities (recycle = {recycle})", self.count());

        let mut destroyed = Vec::new();
        loop {
            let pending: Vec<Entity> = self
                .inner
                .entities
                .borrow()
                .values()
                .filter(|entity| !self.is_dying(entity))
                .cloned()
                .collect();
            if pending.is_empty() {
                break;
            }

            for entity in pending {
                if !self.has_entity(&entity) || self.is_dying(&entity) {
                    continue;
                }

                self.inner.dying.borrow_mut().push(entity.id());
                self.fire_entity_event(ContextEvent::WillBeDestroyed, &entity);
                entity.remove_all_events();
                if recycle {
                    for component in entity.components().iter() {
                        self.pool_component(component);
                    }
                }
                entity.remove_all_components();
                self.fire_entity_event(ContextEvent::Destroyed, &entity);
                destroyed.push(entity);
            }
        }

        self.inner.entities.borrow_mut().clear();
        self.invalidate_entities_cache();

        for group in self.all_groups() {
            group.clear();
        }

        for entity in &destroyed {
            entity.retire();
        }
        self.inner
            .dying
            .borrow_mut()
            .retain(|&id| destroyed.iter().all(|entity| entity.id() != id));
        if recycle {
            self.inner.reusable.borrow_mut().extend(destroyed);
        }
    }

    /// The live entities, in no particular order.
    ///
    /// The snapshot is cached until an entity is created or destroyed.
    pub fn entities(&self) -> Rc<[Entity]> {
        let mut cache = self.inner.entities_cache.borrow_mut();
        let entities =
            cache.get_or_insert_with(|| self.inner.entities.borrow().values().cloned().collect());
        Rc::clone(entities)
    }

    /// Returns the live entity with the given id.
    pub fn get_entity(&self, id: EntityId) -> Option<Entity> {
        self.inner.entities.borrow().get(&id).cloned()
    }

    /// The number of live entities.
    pub fn count(&self) -> usize { self.inner.entities.borrow().len() }

    /// Whether `entity` is exactly the live entity registered under its id.
    ///
    /// Returns `false` for stale handles, even if the id has been reused.
    pub fn has_entity(&self, entity: &Entity) -> bool {
        self.inner.entities.borrow().get(&entity.id()).map_or(false, |live| live == entity)
    }

    /// The number of destroyed entity storages available for reuse.
    pub fn reusable_count(&self) -> usize { self.inner.reusable.borrow().len() }

    /// The number of retired component instances of type `ty` held for reuse.
    pub fn pooled_component_count(&self, ty: ComponentType) -> usize {
        self.inner.component_pool.borrow().get(ty.index()).map_or(0, Vec::len)
    }

    /// Returns the group of entities that satisfy all of `matchers`.
    ///
    /// The same matchers (in any order) always return the same group.
    /// A new group is populated with all live entities before it is returned,
    /// and the group-created listeners are notified.
    ///
    /// # Panics
    /// Panics if a matcher references a component type out of range.
    pub fn group(&self, matchers: impl IntoIterator<Item = Matcher>) -> Group {
        let key = GroupKey::new(matchers);
        if let Some(group) = self.inner.groups.borrow().get(&key) {
            return group.clone();
        }

        let total = self.inner.config.total_components;
        let types: Vec<ComponentType> = key
            .matchers()
            .iter()
            .flat_map(|matcher| matcher.types().iter().copied())
            .sorted()
            .dedup()
            .collect();
        if let Some(ty) = types.iter().find(|ty| ty.index() >= total) {
            panic!(
                "Cannot create a group over component type {ty}; it is out of range for a \
                 context with {total} component types"
            );
        }

        let group = Group::new(key.matchers().iter().cloned());
        for entity in self.entities().iter() {
            group.handle_entity(entity);
        }

        self.inner.groups.borrow_mut().insert(key, group.clone());
        {
            let mut index = self.inner.group_index.borrow_mut();
            for ty in types {
                index[ty.index()].push(group.clone());
            }
        }

        log::debug!("Created {group} with {} initial members", group.count());
        let listeners = self.inner.group_created_listeners.borrow().clone();
        for listener in listeners {
            listener(self, &group);
        }

        group
    }

    /// The number of groups in this context.
    pub fn group_count(&self) -> usize { self.inner.groups.borrow().len() }

    /// Subscribes `listener` to an entity lifecycle event.
    pub fn add_event(&self, event: ContextEvent, listener: impl Fn(&Context, &Entity) + 'static) {
        self.inner.entity_listeners.borrow_mut().entry(event).or_default().push(Rc::new(listener));
    }

    /// Subscribes `listener` to the creation of new groups.
    pub fn add_group_created_event(&self, listener: impl Fn(&Context, &Group) + 'static) {
        self.inner.group_created_listeners.borrow_mut().push(Rc::new(listener));
    }

    fn obtain_entity(&self) -> Entity {
        let recycled = self.inner.reusable.borrow_mut().pop();
        let entity = match recycled {
            Some(retired) => {
                let entity = retired.reissue();
                log::trace!("Recycling the storage of {entity:?}");
                entity
            }
            None => {
                let id = self.inner.next_id.get();
                self.inner.next_id.set(id + 1);
                Entity::new(id, self.inner.config.total_components)
            }
        };

        entity.add_event(EventKind::Added, self.handler(Context::on_component_added));
        entity.add_event(EventKind::Updated, self.handler(Context::on_component_updated));
        entity.add_event(EventKind::Removed, self.handler(Context::on_component_removed));

        entity
    }

    /// Binds a component event handler to a weak reference of this context.
    fn handler(
        &self,
        handle: fn(&Context, &Entity, &ComponentRef),
    ) -> impl Fn(&Entity, &ComponentRef) + 'static {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        move |entity, component| {
            if let Some(inner) = weak.upgrade() {
                handle(&Context { inner }, entity, component);
            }
        }
    }

    fn on_component_added(&self, entity: &Entity, component: &ComponentRef) {
        if self.has_entity(entity) {
            for group in self.groups_of(component.component_type()) {
                group.handle_entity(entity);
            }
        }
    }

    fn on_component_updated(&self, entity: &Entity, component: &ComponentRef) {
        if self.has_entity(entity) {
            for group in self.groups_of(component.component_type()) {
                group.update_entity(entity);
            }
        }
    }

    fn on_component_removed(&self, entity: &Entity, component: &ComponentRef) {
        self.pool_component(component);

        if self.has_entity(entity) {
            let dying = self.is_dying(entity);
            for group in self.groups_of(component.component_type()) {
                if !dying {
                    group.handle_entity(entity);
                } else if !group.matches(entity) {
                    group.remove_entity(entity);
                }
            }
        }
    }

    /// Whether `entity` is in the middle of being destroyed.
    fn is_dying(&self, entity: &Entity) -> bool { self.inner.dying.borrow().contains(&entity.id()) }

    fn pool_component(&self, component: &ComponentRef) {
        let mut pool = self.inner.component_pool.borrow_mut();
        if let Some(stack) = pool.get_mut(component.component_type().index()) {
            stack.push(component.clone());
        }
    }

    /// Pops a pooled component of type `ty` that is not referenced outside the pool.
    ///
    /// Instances still referenced elsewhere are discarded from the pool.
    fn pop_pooled_component(&self, ty: ComponentType) -> Option<ComponentRef> {
        let mut pool = self.inner.component_pool.borrow_mut();
        let stack = pool.get_mut(ty.index())?;
        while let Some(component) = stack.pop() {
            if component.is_unique() {
                return Some(component);
            }
        }
        None
    }

    fn groups_of(&self, ty: ComponentType) -> Vec<Group> {
        self.inner.group_index.borrow().get(ty.index()).cloned().unwrap_or_default()
    }

    fn all_groups(&self) -> Vec<Group> { self.inner.groups.borrow().values().cloned().collect() }

    fn invalidate_entities_cache(&self) { *self.inner.entities_cache.borrow_mut() = None; }

    fn fire_entity_event(&self, event: ContextEvent, entity: &Entity) {
        let listeners = self.inner.entity_listeners.borrow().get(&event).cloned().unwrap_or_default();
        for listener in listeners {
            listener(self, entity);
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.inner.config)
            .field("registry", &self.inner.registry)
            .field("entities", &self.count())
            .field("reusable", &self.reusable_count())
            .field("groups", &self.group_count())
            .finish()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Context({} entities, {} reusable, {} groups)",
            self.count(),
            self.reusable_count(),
            self.group_count()
        )
    }
}

#[cfg(test)]
mod tests;
