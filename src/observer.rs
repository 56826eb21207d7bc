//! Passive collection of the entities reported by a group.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexSet;

use crate::event::{EventKind, ListenerId};
use crate::{Entity, Group};

/// Selects the group events that a [`GroupObserver`] collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Entities that joined the group.
    Added,
    /// Members that had a relevant component replaced.
    Updated,
    /// Entities that left the group.
    Removed,
    /// Entities that joined or left the group.
    AddedOrRemoved,
}

impl Trigger {
    /// The group events subscribed for this trigger.
    pub fn kinds(self) -> &'static [EventKind] {
        match self {
            Trigger::Added => &[EventKind::Added],
            Trigger::Updated => &[EventKind::Updated],
            Trigger::Removed => &[EventKind::Removed],
            Trigger::AddedOrRemoved => &[EventKind::Added, EventKind::Removed],
        }
    }
}

impl From<EventKind> for Trigger {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Added => Trigger::Added,
            EventKind::Updated => Trigger::Updated,
            EventKind::Removed => Trigger::Removed,
        }
    }
}

#[derive(Debug)]
struct Inner {
    collected: RefCell<IndexSet<Entity>>,
    active:    Cell<bool>,
}

/// Accumulates the entities reported by a group until explicitly cleared.
///
/// Entities are collected as a set: an entity reported multiple times is only collected once.
/// Collected entities are not evicted when they leave the group.
///
/// Dropping the observer unsubscribes it from the group.
#[derive(Debug)]
pub struct GroupObserver {
    inner:         Rc<Inner>,
    group:         Group,
    subscriptions: Vec<(EventKind, ListenerId)>,
}

impl GroupObserver {
    /// Subscribes a new, active observer to `group`.
    pub fn new(group: &Group, trigger: Trigger) -> Self {
        let inner = Rc::new(Inner { collected: RefCell::new(IndexSet::new()), active: Cell::new(true) });

        let subscriptions = trigger
            .kinds()
            .iter()
            .map(|&kind| {
                let weak = Rc::downgrade(&inner);
                let listener = move |_: &Group, entity: &Entity| collect(&weak, entity);
                let id = group.subscribe(kind, Rc::new(listener));
                (kind, id)
            })
            .collect();

        Self { inner, group: group.clone(), subscriptions }
    }

    /// The collected entities, in the order they were first reported.
    pub fn collected_entities(&self) -> Vec<Entity> {
        self.inner.collected.borrow().iter().cloned().collect()
    }

    /// The number of collected entities.
    pub fn count(&self) -> usize { self.inner.collected.borrow().len() }

    /// Whether `entity` has been collected.
    pub fn contains(&self, entity: &Entity) -> bool { self.inner.collected.borrow().contains(entity) }

    /// Resumes collecting reported entities.
    pub fn activate(&self) { self.inner.active.set(true); }

    /// Stops collecting reported entities. Already collected entities are kept.
    pub fn deactivate(&self) { self.inner.active.set(false); }

    /// Whether reported entities are currently collected.
    pub fn is_active(&self) -> bool { self.inner.active.get() }

    /// Forgets all collected entities.
    pub fn clear_collected_entities(&self) { self.inner.collected.borrow_mut().clear(); }
}

impl Drop for GroupObserver {
    fn drop(&mut self) {
        for &(kind, id) in &self.subscriptions {
            self.group.unsubscribe(kind, id);
        }
    }
}

fn collect(observer: &Weak<Inner>, entity: &Entity) {
    if let Some(inner) = observer.upgrade() {
        if inner.active.get() {
            inner.collected.borrow_mut().insert(entity.clone());
        }
    }
}
