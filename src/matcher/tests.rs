use itertools::Itertools;

use super::{hash_matchers, GroupKey, Matcher, Mode, ARRAY_HASH_FACTOR, COMPONENT_HASH_FACTOR};
use crate::comp::{ComponentType, Kind};
use crate::test_util::{self, Health, Position, Tag, Velocity};

fn types(raw: &[u16]) -> Vec<ComponentType> { raw.iter().copied().map(ComponentType::new).collect() }

#[test]
fn test_permutation_identity() {
    let base = types(&[0, 2, 5, 5, 7]);
    for mode in [Mode::AllOf, Mode::AnyOf, Mode::NoneOf] {
        let expected = Matcher::new(mode, base.clone());
        for permutation in base.iter().copied().permutations(base.len()) {
            let matcher = Matcher::new(mode, permutation);
            assert_eq!(matcher, expected);
            assert_eq!(matcher.hash_code(), expected.hash_code());
        }
    }
}

#[test]
fn test_dedup_and_sort() {
    let matcher = Matcher::any_of(types(&[3, 1, 3, 1, 2]));
    assert_eq!(matcher.types(), &types(&[1, 2, 3])[..]);
    assert_eq!(matcher.mode(), Mode::AnyOf);
}

#[test]
fn test_modes_are_distinct() {
    let all = Matcher::all_of(types(&[0, 1]));
    let any = Matcher::any_of(types(&[0, 1]));
    let none = Matcher::none_of(types(&[0, 1]));

    assert_ne!(all, any);
    assert_ne!(any, none);
    assert_ne!(all, none);
    assert_ne!(all.hash_code(), any.hash_code());
    assert_ne!(any.hash_code(), none.hash_code());
}

#[test]
fn test_hash_formula() {
    let matcher = Matcher::all_of(types(&[2, 3]));
    let expected = (2 * COMPONENT_HASH_FACTOR) ^ (3 * COMPONENT_HASH_FACTOR) ^ (2 * 653);
    assert_eq!(matcher.hash_code(), expected);

    let matcher = Matcher::none_of(types(&[4]));
    assert_eq!(matcher.hash_code(), (4 * COMPONENT_HASH_FACTOR) ^ 661);

    let matcher = Matcher::any_of(types(&[]));
    assert_eq!(matcher.hash_code(), 0);
}

#[test]
fn test_hash_matchers() {
    let first = Matcher::all_of(types(&[0]));
    let second = Matcher::none_of(types(&[1]));

    assert_eq!(hash_matchers(&[first.clone()]), first.hash_code());
    assert_eq!(
        hash_matchers(&[first.clone(), second.clone()]),
        first.hash_code() ^ second.hash_code() ^ (2 * ARRAY_HASH_FACTOR),
    );
    assert_eq!(
        hash_matchers(&[first.clone(), second.clone()]),
        hash_matchers(&[second, first]),
    );
}

#[test]
fn test_group_key_is_structural() {
    let first = Matcher::all_of(types(&[0]));
    let second = Matcher::none_of(types(&[1]));

    let key = GroupKey::new([first.clone(), second.clone()]);
    assert_eq!(key, GroupKey::new([second.clone(), first.clone(), second.clone()]));
    assert_eq!(key.matchers().len(), 2);
    assert_ne!(key, GroupKey::new([first]));
}

#[test]
fn test_matches() {
    let context = test_util::context();
    let entity = context
        .create_entity([Position(1).into(), Velocity(2).into()])
        .expect("distinct component types");

    assert!(Matcher::all_of([Position::TYPE, Velocity::TYPE]).matches(&entity));
    assert!(!Matcher::all_of([Position::TYPE, Health::TYPE]).matches(&entity));
    assert!(Matcher::any_of([Health::TYPE, Velocity::TYPE]).matches(&entity));
    assert!(!Matcher::any_of([Health::TYPE, Tag::TYPE]).matches(&entity));
    assert!(Matcher::none_of([Health::TYPE, Tag::TYPE]).matches(&entity));
    assert!(!Matcher::none_of([Tag::TYPE, Position::TYPE]).matches(&entity));
}

#[test]
fn test_empty_matchers() {
    let context = test_util::context();
    let entity = context.create_entity([]).expect("no components");

    assert!(Matcher::all_of(types(&[])).matches(&entity));
    assert!(!Matcher::any_of(types(&[])).matches(&entity));
    assert!(Matcher::none_of(types(&[])).matches(&entity));
}

#[test]
fn test_display() {
    let matcher = Matcher::none_of([Tag::TYPE, Position::TYPE]);
    assert_eq!(matcher.to_string(), "NoneOf(#0, #3)");
    assert_eq!(format!("{matcher:?}"), "NoneOf(#0, #3)");
}
