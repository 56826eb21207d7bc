use std::cell::RefCell;
use std::rc::Rc;

use super::{System, Systems};
use crate::comp::Kind;
use crate::observer::Trigger;
use crate::test_util::{self, Position, Velocity};
use crate::{Context, Group, GroupObserver, Matcher};

struct Log {
    name: &'static str,
    log:  Rc<RefCell<Vec<String>>>,
}

impl System for Log {
    fn initialize(&mut self, _: &Context) { self.log.borrow_mut().push(format!("init {}", self.name)); }

    fn execute(&mut self) { self.log.borrow_mut().push(format!("exec {}", self.name)); }

    fn name(&self) -> &str { self.name }
}

#[test]
fn test_registration_order() {
    let context = test_util::context();
    let log = Rc::new(RefCell::new(Vec::new()));

    let mut systems = Systems::new();
    assert!(systems.is_empty());
    systems
        .add(Log { name: "a", log: Rc::clone(&log) })
        .add(Log { name: "b", log: Rc::clone(&log) });
    assert_eq!(systems.len(), 2);
    assert_eq!(format!("{systems:?}"), r#"["a", "b"]"#);

    systems.initialize(&context);
    systems.execute();
    systems.execute();

    assert_eq!(*log.borrow(), ["init a", "init b", "exec a", "exec b", "exec a", "exec b"]);
}

/// Moves every entity whose velocity changed since the last tick.
#[derive(Default)]
struct Movement {
    state: Option<(Group, GroupObserver)>,
}

impl System for Movement {
    fn initialize(&mut self, context: &Context) {
        let group = context.group([Matcher::all_of([Position::TYPE, Velocity::TYPE])]);
        let observer = GroupObserver::new(&group, Trigger::Added);
        self.state = Some((group, observer));
    }

    fn execute(&mut self) {
        let (_, observer) = self.state.as_ref().expect("system is initialized");
        for entity in observer.collected_entities() {
            let velocity = entity.component_of::<Velocity>().expect("velocity is attached");
            let velocity = velocity.get::<Velocity>().expect("component is a Velocity").0;
            let position = entity.component_of::<Position>().expect("position is attached");
            position.get_mut::<Position>().expect("component is a Position").0 += velocity;
        }
        observer.clear_collected_entities();
    }
}

#[test]
fn test_reactive_system() {
    let context = test_util::context();
    let mut systems = Systems::new();
    systems.add(Movement::default());
    systems.initialize(&context);

    let entity = context.create_entity([Position(1).into()]).expect("distinct component types");
    systems.execute();
    assert_eq!(test_util::position_of(&entity), Some(1));

    entity.add_component([Velocity(2).into()]).expect("slot is empty");
    systems.execute();
    assert_eq!(test_util::position_of(&entity), Some(3));

    systems.execute();
    assert_eq!(test_util::position_of(&entity), Some(3));
}
