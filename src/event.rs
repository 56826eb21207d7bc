//! Synchronous event subscriptions shared by entities, groups and contexts.
//!
//! Listeners are invoked in subscription order on the thread that performed the mutation,
//! before the mutating call returns.
//! The listener list is copied out before dispatch,
//! so listeners may freely mutate the object that fired the event.

use std::fmt;
use std::rc::Rc;

/// The kind of change that an entity or group reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A component was attached to an entity, or an entity joined a group.
    Added,
    /// A component was replaced in its slot, or a member of a group had such a component replaced.
    Updated,
    /// A component was detached from an entity, or an entity left a group.
    Removed,
}

impl EventKind {
    /// All event kinds, in declaration order.
    pub const ALL: [EventKind; 3] = [EventKind::Added, EventKind::Updated, EventKind::Removed];

    fn index(self) -> usize {
        match self {
            EventKind::Added => 0,
            EventKind::Updated => 1,
            EventKind::Removed => 2,
        }
    }
}

/// Identifies a subscription within one [`Listeners`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListenerId(u64);

/// Ordered listener lists for each [`EventKind`].
pub(crate) struct Listeners<F: ?Sized> {
    next_id: u64,
    by_kind: [Vec<(ListenerId, Rc<F>)>; 3],
}

impl<F: ?Sized> Default for Listeners<F> {
    fn default() -> Self { Self { next_id: 0, by_kind: [Vec::new(), Vec::new(), Vec::new()] } }
}

impl<F: ?Sized> Listeners<F> {
    pub(crate) fn push(&mut self, kind: EventKind, listener: Rc<F>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.by_kind[kind.index()].push((id, listener));
        id
    }

    /// Removes the subscription `id` of `kind`, if it still exists.
    pub(crate) fn remove(&mut self, kind: EventKind, id: ListenerId) {
        self.by_kind[kind.index()].retain(|&(other, _)| other != id);
    }

    /// Copies the listeners of `kind` so that they can be invoked without holding a borrow.
    pub(crate) fn snapshot(&self, kind: EventKind) -> Vec<Rc<F>> {
        self.by_kind[kind.index()].iter().map(|(_, listener)| Rc::clone(listener)).collect()
    }

    pub(crate) fn clear(&mut self) {
        for list in &mut self.by_kind {
            list.clear();
        }
    }

    pub(crate) fn is_empty(&self) -> bool { self.by_kind.iter().all(Vec::is_empty) }

    pub(crate) fn len(&self) -> usize { self.by_kind.iter().map(Vec::len).sum() }
}

impl<F: ?Sized> fmt::Debug for Listeners<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(EventKind::ALL.iter().map(|&kind| (kind, self.by_kind[kind.index()].len())))
            .finish()
    }
}
