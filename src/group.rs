//! A group is a live, cached set of the entities that satisfy a list of matchers.
//!
//! Groups are created and kept up to date by a [`Context`](crate::Context):
//! every component change on an entity is forwarded to
//! [`Group::handle_entity`] of the groups interested in that component type.
//! A group fires [`EventKind::Added`] and [`EventKind::Removed`] when membership changes,
//! and [`EventKind::Updated`] when a member has one of the relevant components replaced.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::entity::EntityId;
use crate::event::{EventKind, ListenerId, Listeners};
use crate::matcher::Matcher;
use crate::Entity;

/// A listener of membership changes in a group.
pub type GroupListener = dyn Fn(&Group, &Entity);

struct Inner {
    matchers:  Box<[Matcher]>,
    members:   RefCell<IndexMap<EntityId, Entity>>,
    cache:     RefCell<Option<Rc<[Entity]>>>,
    listeners: RefCell<Listeners<GroupListener>>,
}

/// A handle to a group.
///
/// Cloning the handle does not clone the group.
#[derive(Clone)]
pub struct Group {
    inner: Rc<Inner>,
}

static_assertions::assert_not_impl_any!(Group: Send, Sync);

impl Group {
    /// Creates an empty group for entities that satisfy all of `matchers`.
    pub(crate) fn new(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        Self {
            inner: Rc::new(Inner {
                matchers:  matchers.into_iter().collect(),
                members:   RefCell::new(IndexMap::new()),
                cache:     RefCell::new(None),
                listeners: RefCell::new(Listeners::default()),
            }),
        }
    }

    /// The matchers that every member satisfies.
    pub fn matchers(&self) -> &[Matcher] { &self.inner.matchers }

    /// Whether `entity` satisfies every matcher of this group.
    pub fn matches(&self, entity: &Entity) -> bool {
        self.inner.matchers.iter().all(|matcher| matcher.matches(entity))
    }

    /// Whether `entity` is currently a member of this group.
    pub fn contains_entity(&self, entity: &Entity) -> bool {
        self.inner.members.borrow().get(&entity.id()).map_or(false, |member| member == entity)
    }

    /// The number of members.
    pub fn count(&self) -> usize { self.inner.members.borrow().len() }

    /// The members of this group, in no particular order.
    ///
    /// The snapshot is cached until membership changes.
    pub fn entities(&self) -> Rc<[Entity]> {
        let mut cache = self.inner.cache.borrow_mut();
        let entities =
            cache.get_or_insert_with(|| self.inner.members.borrow().values().cloned().collect());
        Rc::clone(entities)
    }

    /// Re-evaluates the membership of `entity`.
    ///
    /// Adds the entity and fires [`EventKind::Added`] if it newly matches,
    /// or removes it and fires [`EventKind::Removed`] if it no longer matches.
    pub fn handle_entity(&self, entity: &Entity) {
        if self.matches(entity) {
            self.add_entity(entity);
        } else {
            self.remove_entity(entity);
        }
    }

    /// Fires [`EventKind::Updated`] if `entity` is a member.
    pub fn update_entity(&self, entity: &Entity) {
        if self.contains_entity(entity) {
            self.fire(EventKind::Updated, entity);
        }
    }

    /// Subscribes `listener` to membership changes of the given kind.
    pub fn add_event(&self, kind: EventKind, listener: impl Fn(&Group, &Entity) + 'static) {
        self.subscribe(kind, Rc::new(listener));
    }

    /// Drops all listeners of this group.
    pub fn remove_all_events(&self) { self.inner.listeners.borrow_mut().clear(); }

    /// Whether both handles refer to the same group.
    pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.inner, &other.inner) }

    pub(crate) fn subscribe(&self, kind: EventKind, listener: Rc<GroupListener>) -> ListenerId {
        self.inner.listeners.borrow_mut().push(kind, listener)
    }

    pub(crate) fn unsubscribe(&self, kind: EventKind, id: ListenerId) {
        self.inner.listeners.borrow_mut().remove(kind, id);
    }

    /// The number of subscriptions across all event kinds.
    pub(crate) fn listener_count(&self) -> usize { self.inner.listeners.borrow().len() }

    /// Removes `entity` regardless of whether it still matches.
    pub(crate) fn remove_entity(&self, entity: &Entity) {
        let removed = self.inner.members.borrow_mut().swap_remove(&entity.id());
        if let Some(removed) = removed {
            self.invalidate_cache();
            self.fire(EventKind::Removed, &removed);
        }
    }

    /// Removes every member, firing [`EventKind::Removed`] for each.
    pub(crate) fn clear(&self) {
        let members = std::mem::take(&mut *self.inner.members.borrow_mut());
        self.invalidate_cache();
        for member in members.values() {
            self.fire(EventKind::Removed, member);
        }
    }

    fn add_entity(&self, entity: &Entity) {
        {
            let mut members = self.inner.members.borrow_mut();
            if members.contains_key(&entity.id()) {
                return;
            }
            members.insert(entity.id(), entity.clone());
        }
        self.invalidate_cache();
        self.fire(EventKind::Added, entity);
    }

    fn invalidate_cache(&self) { *self.inner.cache.borrow_mut() = None; }

    fn fire(&self, kind: EventKind, entity: &Entity) {
        let listeners = self.inner.listeners.borrow().snapshot(kind);
        for listener in listeners {
            listener(self, entity);
        }
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("matchers", &self.inner.matchers)
            .field("members", &self.inner.members.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Group({})", self.inner.matchers.iter().join(", "))
    }
}
