use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Context, ContextEvent};
use crate::comp::{ComponentRef, ComponentType, Kind};
use crate::test_util::{self, Event, Health, Position, Recorder, Tag, Velocity};
use crate::{Entity, Error, EventKind, Group, GroupObserver, Matcher};

#[test]
fn test_lifecycle() {
    test_util::init();
    let context = Context::new(2);
    let group = context.group([Matcher::all_of([ComponentType::new(0)])]);

    let entity = context.create_entity([Position(1).into()]).expect("distinct component types");
    assert!(group.contains_entity(&entity));

    entity.remove_component(&[Position::TYPE]).expect("slot is occupied");
    assert!(!group.contains_entity(&entity));

    context.destroy_entity(&entity);
    assert!(!context.has_entity(&entity));
    assert_eq!(context.count(), 0);
}

#[test]
#[should_panic = "without component types"]
fn test_zero_components_panics() { Context::new(0); }

#[test]
fn test_first_id() {
    test_util::init();
    let context = Context::builder(1).first_id(10).build();
    let first = context.create_entity([]).expect("no components");
    let second = context.create_entity([]).expect("no components");
    assert_eq!((first.id(), second.id()), (10, 11));
    assert_eq!(context.get_entity(11), Some(second));
    assert_eq!(context.get_entity(12), None);
}

#[test]
fn test_create_entity_rejects_duplicates() {
    let context = test_util::context();
    let group = context.group([Matcher::none_of([Tag::TYPE])]);

    let err = context
        .create_entity([Position(1).into(), Tag.into(), Position(2).into()])
        .expect_err("position is duplicated");
    assert_eq!(err, Error::ComponentExists(Position::TYPE));
    assert_eq!(context.count(), 0);
    assert_eq!(group.count(), 0);
}

#[test]
fn test_recycling_safety() {
    let context = test_util::context();
    let recorder = Recorder::new();

    let old = context.create_entity([Position(1).into(), Tag.into()]).expect("distinct");
    recorder.watch_entity(&old);
    let old_id = old.id();
    context.destroy_entity(&old);
    assert_eq!(context.reusable_count(), 1);
    recorder.take();

    let new = context.create_entity([]).expect("no components");
    assert_eq!(context.reusable_count(), 0);
    assert_eq!(new.id(), old_id);
    assert!(new.component_types().is_empty());
    assert!(old.is_stale());
    assert_ne!(new, old);
    assert!(context.has_entity(&new));
    assert!(!context.has_entity(&old));

    new.add_component([Velocity(1).into()]).expect("slot is empty");
    assert!(recorder.take().is_empty(), "listeners from a previous life must be dropped");
}

#[test]
#[should_panic = "not owned by this context"]
fn test_destroy_twice_panics() {
    let context = test_util::context();
    let entity = context.create_entity([]).expect("no components");
    context.destroy_entity(&entity);
    context.destroy_entity(&entity);
}

#[test]
#[should_panic = "not owned by this context"]
fn test_destroy_stale_handle_panics() {
    let context = test_util::context();
    let entity = context.create_entity([]).expect("no components");
    context.destroy_entity(&entity);
    let _recycled = context.create_entity([]).expect("no components");
    context.destroy_entity(&entity);
}

#[test]
#[should_panic = "not owned by this context"]
fn test_destroy_foreign_panics() {
    let context = test_util::context();
    let other = test_util::context();
    let entity = other.create_entity([]).expect("no components");
    context.destroy_entity(&entity);
}

#[test]
#[should_panic = "through a stale handle"]
fn test_mutate_destroyed_panics() {
    let context = test_util::context();
    let entity = context.create_entity([]).expect("no components");
    context.destroy_entity(&entity);
    entity.add_component([Tag.into()]).expect("slot is empty");
}

#[test]
fn test_group_dedup() {
    let context = test_util::context();
    let recorder = Recorder::new();
    recorder.watch_context(&context);

    let all = Matcher::all_of([Position::TYPE, Velocity::TYPE]);
    let none = Matcher::none_of([Tag::TYPE]);

    let first = context.group([all.clone(), none.clone()]);
    let second = context.group([none.clone(), all.clone()]);
    let third = context
        .group([Matcher::all_of([Velocity::TYPE, Position::TYPE, Velocity::TYPE]), none]);
    let other = context.group([all]);

    assert!(first.ptr_eq(&second));
    assert!(first.ptr_eq(&third));
    assert!(!first.ptr_eq(&other));
    assert_eq!(context.group_count(), 2);
    assert_eq!(
        recorder.take_lines(),
        ["created Group(AllOf(#0, #1), NoneOf(#3))", "created Group(AllOf(#0, #1))"],
    );
}

#[test]
fn test_group_seeded_with_live_entities() {
    let context = test_util::context();
    let moving = context.create_entity([Position(0).into(), Velocity(1).into()]).expect("distinct");
    let still = context.create_entity([Position(0).into()]).expect("distinct");

    let group = context.group([Matcher::all_of([Velocity::TYPE])]);
    assert!(group.contains_entity(&moving));
    assert!(!group.contains_entity(&still));
    assert_eq!(group.count(), 1);
}

#[test]
#[should_panic = "out of range"]
fn test_group_out_of_range_panics() {
    let context = test_util::context();
    context.group([Matcher::any_of([ComponentType::new(4)])]);
}

#[test]
fn test_reverse_index_limits_updates() {
    let context = test_util::context();
    let recorder = Recorder::new();

    let positioned = context.group([Matcher::all_of([Position::TYPE])]);
    let tagged = context.group([Matcher::any_of([Tag::TYPE, Position::TYPE])]);
    let healthy = context.group([Matcher::all_of([Health::TYPE])]);
    recorder.watch_group(&positioned);
    recorder.watch_group(&tagged);
    recorder.watch_group(&healthy);

    let entity = context.create_entity([Position(0).into(), Health(1).into()]).expect("distinct");
    recorder.take();

    entity.update_component([Position(1).into()]);
    assert_eq!(
        recorder.take_lines(),
        [
            format!("Group(AllOf(#0)): Updated {}", entity.id()),
            format!("Group(AnyOf(#0, #3)): Updated {}", entity.id()),
        ],
    );
}

#[test]
fn test_reverse_index_has_no_duplicates() {
    let context = test_util::context();
    let group = context.group([
        Matcher::all_of([Position::TYPE]),
        Matcher::any_of([Position::TYPE, Tag::TYPE]),
        Matcher::none_of([Position::TYPE, Health::TYPE]),
    ]);
    assert_eq!(group.matchers().len(), 3);

    let member = context.group([
        Matcher::all_of([Position::TYPE]),
        Matcher::any_of([Position::TYPE, Tag::TYPE]),
    ]);
    let entity = context.create_entity([Position(0).into()]).expect("distinct component types");
    assert!(!group.contains_entity(&entity));
    assert!(member.contains_entity(&entity));

    let recorder = Recorder::new();
    recorder.watch_group(&member);
    entity.update_component([Position(1).into()]);
    assert_eq!(
        recorder.take_lines(),
        [format!("Group(AllOf(#0), AnyOf(#0, #3)): Updated {}", entity.id())],
    );
}

#[test]
fn test_lifecycle_events_order() {
    let context = test_util::context();
    let group = context.group([Matcher::all_of([Position::TYPE])]);
    let recorder = Recorder::new();
    recorder.watch_context(&context);
    recorder.watch_group(&group);

    let entity = context.create_entity([Position(0).into()]).expect("distinct component types");
    let id = entity.id();
    context.destroy_entity(&entity);

    assert_eq!(
        recorder.take(),
        [
            Event::Group { group: group.to_string(), entity: id, kind: EventKind::Added },
            Event::Context { entity: id, event: ContextEvent::Created },
            Event::Context { entity: id, event: ContextEvent::WillBeDestroyed },
            Event::Group { group: group.to_string(), entity: id, kind: EventKind::Removed },
            Event::Context { entity: id, event: ContextEvent::Destroyed },
        ],
    );
}

#[test]
fn test_will_be_destroyed_sees_components() {
    let context = test_util::context();
    let seen = Rc::new(Cell::new(None));
    {
        let seen = Rc::clone(&seen);
        context.add_event(ContextEvent::WillBeDestroyed, move |context, entity| {
            assert!(context.has_entity(entity));
            seen.set(test_util::position_of(entity));
        });
    }

    let entity = context.create_entity([Position(7).into()]).expect("distinct component types");
    context.destroy_entity(&entity);
    assert_eq!(seen.get(), Some(7));
}

#[test]
fn test_none_of_group_evicts_destroyed_entity() {
    let context = test_util::context();
    let group = context.group([Matcher::none_of([Tag::TYPE])]);

    let entity = context.create_entity([Position(0).into()]).expect("distinct component types");
    assert!(group.contains_entity(&entity));

    context.destroy_entity(&entity);
    assert_eq!(group.count(), 0);
    assert!(group.entities().is_empty());
}

#[test]
fn test_none_of_group_does_not_adopt_dying_entity() {
    let context = test_util::context();
    let untagged = context.group([Matcher::none_of([Tag::TYPE])]);
    let recorder = Recorder::new();
    recorder.watch_group(&untagged);

    let entity = context.create_entity([Tag.into()]).expect("distinct component types");
    context.destroy_entity(&entity);

    assert!(recorder.take().is_empty());
    assert_eq!(untagged.count(), 0);
}

#[test]
fn test_reentrant_destroy_from_group_listener() {
    let context = test_util::context();
    let group = context.group([Matcher::all_of([Health::TYPE])]);
    group.add_event(EventKind::Removed, {
        let context = context.clone();
        move |_, entity| {
            if context.has_entity(entity) {
                context.destroy_entity(entity);
            }
        }
    });

    let entity = context.create_entity([Health(1).into()]).expect("distinct component types");
    context.destroy_entity(&entity);
    assert_eq!(context.reusable_count(), 1);
    assert!(!context.has_entity(&entity));

    let first = context.create_entity([]).expect("no components");
    let second = context.create_entity([]).expect("no components");
    assert_ne!(first.id(), second.id());
    assert_eq!(context.count(), 2);
}

#[test]
fn test_reentrant_destroy_from_lifecycle_listeners() {
    let context = test_util::context();
    let destroyed = Rc::new(Cell::new(0));
    {
        let destroyed = Rc::clone(&destroyed);
        context.add_event(ContextEvent::Destroyed, move |context, entity| {
            destroyed.set(destroyed.get() + 1);
            context.destroy_entity(entity);
        });
    }

    let entity = context.create_entity([Tag.into()]).expect("distinct component types");
    context.destroy_entity(&entity);
    assert_eq!(destroyed.get(), 1);
    assert_eq!(context.reusable_count(), 1);
}

#[test]
fn test_destroy_all_entities_with_reentrant_destroy() {
    test_util::init();
    let context = Context::builder(test_util::TOTAL_COMPONENTS)
        .recycle_on_reset(true)
        .register::<Position>()
        .build();
    let entities: Vec<Entity> = (0..3)
        .map(|i| context.create_entity([Position(i).into()]).expect("distinct component types"))
        .collect();

    let destroyed = Rc::new(Cell::new(0));
    {
        let victim = entities[2].clone();
        let destroyed = Rc::clone(&destroyed);
        context.add_event(ContextEvent::WillBeDestroyed, move |context, entity| {
            destroyed.set(destroyed.get() + 1);
            if context.has_entity(&victim) {
                context.destroy_entity(&victim);
            }
            context.destroy_entity(entity);
        });
    }

    context.destroy_all_entities();

    assert_eq!(destroyed.get(), 3);
    assert_eq!(context.count(), 0);
    assert_eq!(context.reusable_count(), 3);
    assert_eq!(context.pooled_component_count(Position::TYPE), 3);

    let recycled: Vec<Entity> =
        (0..3).map(|_| context.create_entity([]).expect("no components")).collect();
    let mut ids: Vec<_> = recycled.iter().map(Entity::id).collect();
    ids.sort_unstable();
    assert_eq!(ids, [0, 1, 2]);
    assert_eq!(context.count(), 3);
}

#[test]
fn test_entities_snapshot() {
    let context = test_util::context();
    let first = context.create_entity([]).expect("no components");
    let snapshot = context.entities();
    assert!(Rc::ptr_eq(&snapshot, &context.entities()));

    let second = context.create_entity([]).expect("no components");
    let snapshot = context.entities();
    assert_eq!(&snapshot[..], &[first.clone(), second.clone()]);

    first.add_component([Tag.into()]).expect("slot is empty");
    assert!(Rc::ptr_eq(&snapshot, &context.entities()));

    context.destroy_entity(&first);
    assert_eq!(&context.entities()[..], &[second]);
}

#[test]
fn test_component_pool() {
    let context = test_util::context();
    let health = context.create_component(Health::TYPE);
    assert_eq!(health.get::<Health>().map(|health| health.0), Some(100));

    health.get_mut::<Health>().expect("component is a Health").0 = 3;
    let entity = context.create_entity([health.clone()]).expect("distinct component types");
    entity.remove_component(&[Health::TYPE]).expect("slot is occupied");
    assert_eq!(context.pooled_component_count(Health::TYPE), 1);

    drop(health);
    let reused = context.create_component(Health::TYPE);
    assert_eq!(context.pooled_component_count(Health::TYPE), 0);
    assert_eq!(reused.get::<Health>().map(|health| health.0), Some(100));
}

#[test]
fn test_component_pool_skips_shared_instances() {
    let context = test_util::context();
    let shared = ComponentRef::new(Position(5));
    let entity = context.create_entity([shared.clone()]).expect("distinct component types");
    context.destroy_entity(&entity);
    assert_eq!(context.pooled_component_count(Position::TYPE), 1);

    let fresh = context.create_component(Position::TYPE);
    assert!(!fresh.ptr_eq(&shared));
    assert_eq!(shared.get::<Position>().map(|position| position.0), Some(5));
    assert_eq!(context.pooled_component_count(Position::TYPE), 0);
}

#[test]
fn test_update_pools_replaced_component() {
    let context = test_util::context();
    let entity = context.create_entity([Velocity(1).into()]).expect("distinct component types");
    entity.update_component([Velocity(2).into()]);
    assert_eq!(context.pooled_component_count(Velocity::TYPE), 1);
}

#[test]
#[should_panic = "no blank constructor"]
fn test_unregistered_component_panics() {
    test_util::init();
    let context = Context::new(test_util::TOTAL_COMPONENTS);
    context.create_component(Position::TYPE);
}

#[test]
fn test_register_with() {
    test_util::init();
    let context = Context::builder(test_util::TOTAL_COMPONENTS)
        .register_with(Position::TYPE, || ComponentRef::new(Position(-1)))
        .build();
    let position = context.create_component(Position::TYPE);
    assert_eq!(position.get::<Position>().map(|position| position.0), Some(-1));
}

fn populate(context: &Context) -> (Vec<Entity>, Group, GroupObserver) {
    let group = context.group([Matcher::none_of([Tag::TYPE])]);
    let observer = GroupObserver::new(&group, crate::observer::Trigger::Removed);
    let entities = (0..3)
        .map(|i| context.create_entity([Position(i).into()]).expect("distinct component types"))
        .collect();
    (entities, group, observer)
}

#[test]
fn test_destroy_all_entities() {
    let context = test_util::context();
    let (entities, group, observer) = populate(&context);
    let recorder = Recorder::new();
    recorder.watch_context(&context);

    context.destroy_all_entities();

    assert_eq!(context.count(), 0);
    assert!(context.entities().is_empty());
    assert_eq!(group.count(), 0);
    assert_eq!(observer.collected_entities(), entities);
    assert_eq!(context.reusable_count(), 0);
    assert_eq!(context.pooled_component_count(Position::TYPE), 0);
    for entity in &entities {
        assert!(entity.is_stale());
        assert!(!context.has_entity(entity));
    }

    let events = recorder.take();
    assert_eq!(events.len(), 6);
    let first = entities[0].id();
    assert_eq!(events[0], Event::Context { entity: first, event: ContextEvent::WillBeDestroyed });
    assert_eq!(events[1], Event::Context { entity: first, event: ContextEvent::Destroyed });

    let next = context.create_entity([]).expect("no components");
    assert_eq!(next.id(), 3);
}

#[test]
fn test_destroy_all_entities_with_recycling() {
    test_util::init();
    let context = Context::builder(test_util::TOTAL_COMPONENTS)
        .recycle_on_reset(true)
        .register::<Position>()
        .build();
    let (entities, group, _observer) = populate(&context);

    context.destroy_all_entities();

    assert_eq!(group.count(), 0);
    assert_eq!(context.reusable_count(), 3);
    assert_eq!(context.pooled_component_count(Position::TYPE), 3);

    let recycled = context.create_entity([]).expect("no components");
    assert!(entities.iter().any(|entity| entity.id() == recycled.id()));
    assert!(recycled.component_types().is_empty());
    assert!(group.contains_entity(&recycled));
    assert_eq!(
        context.create_component(Position::TYPE).get::<Position>().map(|position| position.0),
        Some(0),
    );
}

#[test]
fn test_display() {
    let context = test_util::context();
    context.group([Matcher::all_of([Position::TYPE])]);
    let entity = context.create_entity([]).expect("no components");
    context.create_entity([]).expect("no components");
    context.destroy_entity(&entity);
    assert_eq!(context.to_string(), "Context(1 entities, 1 reusable, 1 groups)");
}

#[test]
fn test_random_consistency() {
    let context = test_util::context();
    let groups: Vec<Group> = test_util::all_matchers()
        .into_iter()
        .map(|matcher| context.group([matcher]))
        .collect();
    let types = [Position::TYPE, Velocity::TYPE, Health::TYPE, Tag::TYPE];
    let mut rng = StdRng::seed_from_u64(0x6865_7264);

    for step in 0..2000 {
        let entities = context.entities();
        match rng.gen_range(0..6) {
            0 | 1 if !entities.is_empty() => {
                let entity = &entities[rng.gen_range(0..entities.len())];
                let ty = types[rng.gen_range(0..types.len())];
                if entity.has_component(&[ty]) {
                    entity.remove_component(&[ty]).expect("slot is occupied");
                } else {
                    entity.add_component([context.create_component(ty)]).expect("slot is empty");
                }
            }
            2 if !entities.is_empty() => {
                let entity = &entities[rng.gen_range(0..entities.len())];
                let ty = types[rng.gen_range(0..types.len())];
                entity.update_component([context.create_component(ty)]);
            }
            3 if !entities.is_empty() => {
                let entity = &entities[rng.gen_range(0..entities.len())];
                context.destroy_entity(entity);
            }
            5 if step % 500 == 499 => context.destroy_all_entities(),
            _ => {
                let components: Vec<ComponentRef> = types
                    .iter()
                    .filter(|_| rng.gen_bool(0.5))
                    .map(|&ty| context.create_component(ty))
                    .collect();
                context.create_entity(components).expect("distinct component types");
            }
        }

        test_util::assert_consistent(&context, &groups);
    }
}
