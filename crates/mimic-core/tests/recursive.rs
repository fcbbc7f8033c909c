//! Nested substitutes, value synthesis and owner-scoped caching

use mimic_behavior::{
    MockCollection, MockMixin, PolicyOverrides, RecursiveMockingBehavior, RecursiveMode,
};
use mimic_core::{MockOptions, MocksRepository, Preset};
use mimic_reflect::{Object, Value};
use mimic_test_utils::{init_tracing, vehicles};
use std::sync::Arc;

#[test]
fn recursive_loose_returns_the_same_nested_substitute() {
    init_tracing();
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let mock = repo.create(&car, MockOptions::new()).unwrap();

    let first = repo.get_property(&mock, "Engine").unwrap();
    let second = repo.get_property(&mock, "Engine").unwrap();
    assert_eq!(first, second);

    let engine = first.as_object().unwrap();
    assert_eq!(engine.unproxied_type().name(), "IEngine");
    assert_eq!(repo.invoke_member(engine, "Power", vec![]).unwrap(), Value::Int(0));
    assert_eq!(repo.get_property(engine, "Serial").unwrap(), Value::from(""));

    let dependents = MockMixin::of(&mock).unwrap().dependents();
    assert_eq!(dependents.len(), 1);
    assert!(Arc::ptr_eq(&dependents[0], engine));
}

#[test]
fn separate_owners_get_separate_nested_substitutes() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let a = repo.create(&car, MockOptions::new()).unwrap();
    let b = repo.create(&car, MockOptions::new()).unwrap();

    assert_ne!(
        repo.get_property(&a, "Engine").unwrap(),
        repo.get_property(&b, "Engine").unwrap()
    );
}

#[test]
fn loose_falls_through_without_fabricating_mocks() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let mock = repo.create(&car, MockOptions::preset(Preset::Loose)).unwrap();

    assert_eq!(repo.get_property(&mock, "Engine").unwrap(), Value::Null);
    assert_eq!(repo.get_property(&mock, "Name").unwrap(), Value::Null);
    assert!(MockMixin::of(&mock).unwrap().dependents().is_empty());

    // Synthesised values are still produced.
    let wheels = repo.invoke_member(&mock, "Wheels", vec![]).unwrap();
    assert_eq!(wheels.as_array().unwrap().rank(), 1);
    assert!(wheels.as_array().unwrap().is_empty());
}

#[test]
fn arrays_have_matching_rank_and_no_elements() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let mock = repo.create(&car, MockOptions::new()).unwrap();

    let grid = repo.invoke_member(&mock, "Grid", vec![]).unwrap();
    let grid = grid.as_array().unwrap();
    assert_eq!(grid.rank(), 2);
    assert_eq!(grid.lengths(), &[0, 0]);
}

#[test]
fn sealed_return_types_decline_to_default() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let mock = repo.create(&car, MockOptions::new()).unwrap();

    assert_eq!(repo.invoke_member(&mock, "Plate", vec![]).unwrap(), Value::Null);
    assert!(MockMixin::of(&mock).unwrap().dependents().is_empty());
}

#[test]
fn map_members_return_stub_tracked_collections() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let mock = repo.create(&car, MockOptions::new()).unwrap();

    let registry = repo.invoke_member(&mock, "Registry", vec![]).unwrap();
    let registry = registry.as_object().unwrap();
    assert_eq!(
        repo.invoke_member(registry, "get_Count", vec![]).unwrap(),
        Value::Int(0)
    );

    repo.invoke_member(registry, "set_Item", vec![Value::from("gear"), Value::Int(3)])
        .unwrap();
    assert_eq!(
        repo.invoke_member(registry, "get_Item", vec![Value::from("gear")]).unwrap(),
        Value::Int(3)
    );
    assert_eq!(
        repo.invoke_member(registry, "ContainsKey", vec![Value::from("gear")]).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(MockCollection::contents(registry).unwrap().len(), 1);

    let again = repo.invoke_member(&mock, "Registry", vec![]).unwrap();
    assert!(Arc::ptr_eq(again.as_object().unwrap(), registry));
}

#[test]
fn sequence_members_return_stub_tracked_collections() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let mock = repo.create(&car, MockOptions::new()).unwrap();

    let passengers = repo.invoke_member(&mock, "Passengers", vec![]).unwrap();
    let passengers = passengers.as_object().unwrap();
    repo.invoke_member(passengers, "Add", vec![Value::from("ada")]).unwrap();
    assert_eq!(
        repo.invoke_member(passengers, "get_Count", vec![]).unwrap(),
        Value::Int(1)
    );
}

#[test]
fn dead_owners_are_pruned_from_a_shared_unit() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let shared = Arc::new(RecursiveMockingBehavior::new(RecursiveMode::ReturnMock));
    let options = || {
        MockOptions::new()
            .with_overrides(PolicyOverrides::default().with_fallback(shared.clone()))
    };
    let get_engine = car.find_member("get_Engine").unwrap();

    let doomed = repo.create(&car, options()).unwrap();
    let survivor = repo.create(&car, options()).unwrap();

    let doomed_engine = repo.invoke(&doomed, &get_engine, vec![]).unwrap();
    let weak_engine = Object::downgrade(doomed_engine.as_object().unwrap());
    drop(doomed_engine);
    let kept = repo.invoke(&survivor, &get_engine, vec![]).unwrap();
    assert_eq!(shared.cached_entries(&get_engine), 2);

    drop(doomed);
    assert!(!weak_engine.is_alive());
    assert_eq!(shared.cached_entries(&get_engine), 1);
    assert_eq!(repo.invoke(&survivor, &get_engine, vec![]).unwrap(), kept);
}

#[test]
fn nested_substitutes_follow_the_owner_preset() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let mock = repo
        .create(&car, MockOptions::preset(Preset::CallOriginal))
        .unwrap();

    let engine = repo.get_property(&mock, "Engine").unwrap();
    let nested = MockMixin::of(engine.as_object().unwrap()).unwrap();
    assert_eq!(nested.preset(), Preset::CallOriginal);
    assert!(nested.is_constructor_mocked());
    assert!(nested.constructor_args().is_none());
}

#[test]
fn containers_are_synthesized_inside_the_owners_own_arrangement() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let mock = repo.create(&car, MockOptions::new()).unwrap();

    let (wheels, engine) = repo.arrange(&car, || {
        (
            repo.invoke_member(&mock, "Wheels", vec![]).unwrap(),
            repo.get_property(&mock, "Engine").unwrap(),
        )
    });
    let wheels = wheels.as_array().unwrap();
    assert_eq!(wheels.rank(), 1);
    assert!(wheels.is_empty());
    // Nested substitutes are not fabricated for the type's own arrangement.
    assert_eq!(engine, Value::Null);
    assert!(MockMixin::of(&mock).unwrap().dependents().is_empty());
}

#[test]
fn concurrent_first_calls_agree_on_one_nested_substitute() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let mock = repo.create(&car, MockOptions::new()).unwrap();

    let seen: Vec<Value> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| s.spawn(|| repo.get_property(&mock, "Engine").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(seen[0].as_object().is_some());
    assert!(seen.iter().all(|engine| *engine == seen[0]));
    assert_eq!(MockMixin::of(&mock).unwrap().dependents().len(), 1);
}
