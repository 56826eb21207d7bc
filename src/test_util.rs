#![allow(missing_docs)]

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Once;

use crate::comp::{ComponentRef, ComponentType, Kind};
use crate::context::ContextEvent;
use crate::entity::EntityId;
use crate::{comp, Context, Entity, EventKind, Group, Matcher};

pub fn init() {
    static SET_LOGGER_ONCE: Once = Once::new();
    SET_LOGGER_ONCE.call_once(env_logger::init);
}

// Test component summary:
// Position: kind 0, blank 0
// Velocity: kind 1, blank 0
// Health: kind 2, blank 100
// Tag: kind 3, unit

/// The number of component types declared in this module.
pub const TOTAL_COMPONENTS: usize = 4;

#[comp(herd_as(crate), kind = 0)]
#[derive(Debug, Default, PartialEq)]
pub struct Position(pub i32);

#[comp(herd_as(crate), kind = 1)]
#[derive(Debug, Default, PartialEq)]
pub struct Velocity(pub i32);

#[comp(herd_as(crate), kind = 2, blank = || Health(100))]
#[derive(Debug, PartialEq)]
pub struct Health(pub u32);

#[comp(herd_as(crate), kind = 3)]
#[derive(Debug, Default, PartialEq)]
pub struct Tag;

/// A context with all test components registered.
pub fn context() -> Context {
    init();
    Context::builder(TOTAL_COMPONENTS)
        .register::<Position>()
        .register::<Velocity>()
        .register::<Health>()
        .register::<Tag>()
        .build()
}

/// Matchers of each mode over every combination of up to two test components.
pub fn all_matchers() -> Vec<Matcher> {
    let types: Vec<ComponentType> =
        [Position::TYPE, Velocity::TYPE, Health::TYPE, Tag::TYPE].into_iter().collect();
    let mut matchers = Vec::new();
    for (i, &first) in types.iter().enumerate() {
        matchers.push(Matcher::all_of([first]));
        matchers.push(Matcher::any_of([first]));
        matchers.push(Matcher::none_of([first]));
        for &second in &types[i + 1..] {
            matchers.push(Matcher::all_of([first, second]));
            matchers.push(Matcher::any_of([first, second]));
            matchers.push(Matcher::none_of([first, second]));
        }
    }
    matchers
}

/// Reads the value of a [`Position`] component.
pub fn position_of(entity: &Entity) -> Option<i32> {
    let component = entity.component_of::<Position>().ok()?;
    let position = component.get::<Position>()?;
    Some(position.0)
}

/// Asserts that group membership agrees with the matchers for every entity.
pub fn assert_consistent(context: &Context, groups: &[Group]) {
    for group in groups {
        for entity in context.entities().iter() {
            assert_eq!(
                group.contains_entity(entity),
                group.matches(entity),
                "{group} disagrees with its matchers on {entity}",
            );
        }
        for member in group.entities().iter() {
            assert!(context.has_entity(member), "{group} retains dead {member:?}");
        }
    }
}

/// An event observed by a [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Component { entity: EntityId, kind: EventKind, ty: ComponentType },
    Group { group: String, entity: EntityId, kind: EventKind },
    Context { entity: EntityId, event: ContextEvent },
    GroupCreated { group: String },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Component { entity, kind, ty } => write!(f, "{entity}: {kind:?} {ty}"),
            Event::Group { group, entity, kind } => write!(f, "{group}: {kind:?} {entity}"),
            Event::Context { entity, event } => write!(f, "{entity}: {event:?}"),
            Event::GroupCreated { group } => write!(f, "created {group}"),
        }
    }
}

/// Records events in the order they are fired.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self { Self::default() }

    /// Records component events of `entity`.
    pub fn watch_entity(&self, entity: &Entity) {
        for kind in EventKind::ALL {
            let events = Rc::clone(&self.events);
            entity.add_event(kind, move |entity, component: &ComponentRef| {
                events.borrow_mut().push(Event::Component {
                    entity: entity.id(),
                    kind,
                    ty: component.component_type(),
                });
            });
        }
    }

    /// Records membership events of `group`.
    pub fn watch_group(&self, group: &Group) {
        for kind in EventKind::ALL {
            let events = Rc::clone(&self.events);
            group.add_event(kind, move |group, entity| {
                events.borrow_mut().push(Event::Group {
                    group: group.to_string(),
                    entity: entity.id(),
                    kind,
                });
            });
        }
    }

    /// Records lifecycle events and group creation of `context`.
    pub fn watch_context(&self, context: &Context) {
        for event in [ContextEvent::Created, ContextEvent::WillBeDestroyed, ContextEvent::Destroyed] {
            let events = Rc::clone(&self.events);
            context.add_event(event, move |_, entity| {
                events.borrow_mut().push(Event::Context { entity: entity.id(), event });
            });
        }

        let events = Rc::clone(&self.events);
        context.add_group_created_event(move |_, group| {
            events.borrow_mut().push(Event::GroupCreated { group: group.to_string() });
        });
    }

    /// Records an arbitrary event, such as a marker between two operations.
    pub fn push(&self, event: Event) { self.events.borrow_mut().push(event); }

    /// Removes and returns all recorded events.
    pub fn take(&self) -> Vec<Event> { std::mem::take(&mut *self.events.borrow_mut()) }

    /// Removes all recorded events and formats them one per line.
    pub fn take_lines(&self) -> Vec<String> {
        self.take().iter().map(ToString::to_string).collect()
    }
}
