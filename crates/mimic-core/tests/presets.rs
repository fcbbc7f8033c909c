//! Assembled behavior chains per preset, observed through created substitutes

use mimic_behavior::MockMixin;
use mimic_core::{MockConfig, MockOptions, MocksRepository, Preset};
use mimic_reflect::Value;
use mimic_test_utils::{init_tracing, vehicles};
use pretty_assertions::assert_eq;

fn chain_of(repo: &MocksRepository, preset: Preset) -> (Vec<String>, Vec<String>) {
    let car = vehicles().car;
    let mock = repo.create(&car, MockOptions::preset(preset)).unwrap();
    let mixin = MockMixin::of(&mock).unwrap();
    let chain = mixin.chain();
    (
        chain.supplementary().iter().map(|u| u.describe()).collect(),
        chain.fallback().iter().map(|u| u.describe()).collect(),
    )
}

#[test]
fn every_preset_assembles_its_documented_chain() {
    init_tracing();
    let repo = MocksRepository::new();

    let (supp, fallback) = chain_of(&repo, Preset::Loose);
    assert!(supp.is_empty());
    assert_eq!(
        fallback,
        vec![
            "event_stubs",
            "property_stubs",
            "call_original_object_methods",
            "recursive_mocking(return_default)",
            "static_constructor_mock",
            "execute_constructor",
        ]
    );

    let (supp, fallback) = chain_of(&repo, Preset::RecursiveLoose);
    assert!(supp.is_empty());
    assert_eq!(fallback[3], "recursive_mocking(return_mock)");
    assert_eq!(fallback.len(), 6);

    let (supp, fallback) = chain_of(&repo, Preset::Strict);
    assert_eq!(supp, vec!["strict(value_returning_only)"]);
    assert_eq!(
        fallback,
        vec![
            "event_stubs",
            "recursive_mocking(only_during_analysis)",
            "static_constructor_mock",
            "execute_constructor",
            "strict",
        ]
    );

    let (supp, fallback) = chain_of(&repo, Preset::CallOriginal);
    assert!(supp.is_empty());
    assert_eq!(
        fallback,
        vec![
            "call_original(skip_abstract)",
            "property_stubs",
            "event_stubs",
            "recursive_mocking(return_mock)",
            "static_constructor_mock",
            "execute_constructor",
        ]
    );
}

#[test]
fn configured_default_preset_applies_when_request_names_none() {
    let config = MockConfig::from_toml_str("default_preset = \"strict\"").unwrap();
    let repo = MocksRepository::with_config(config);
    let car = vehicles().car;

    let mock = repo.create(&car, MockOptions::new()).unwrap();
    assert_eq!(MockMixin::of(&mock).unwrap().preset(), Preset::Strict);

    let err = repo.invoke_member(&mock, "Speed", vec![]).unwrap_err();
    assert!(err.is_policy_violation());
}

#[test]
fn property_and_event_stubs_work_on_loose_substitutes() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let mock = repo.create(&car, MockOptions::preset(Preset::Loose)).unwrap();

    repo.set_property(&mock, "Name", Value::from("beetle")).unwrap();
    assert_eq!(repo.get_property(&mock, "Name").unwrap(), Value::from("beetle"));

    let handler = repo.create(&vehicles().engine, MockOptions::new()).unwrap();
    repo.invoke_member(&mock, "add_Crashed", vec![Value::Object(handler)])
        .unwrap();
    let subscriptions = MockMixin::of(&mock)
        .unwrap()
        .mixin::<mimic_behavior::EventSubscriptions>()
        .unwrap();
    assert_eq!(subscriptions.subscriber_count(Some(mock.id()), "Crashed"), 1);
}

#[test]
fn object_identity_members_run_their_originals() {
    let repo = MocksRepository::new();
    let car = vehicles().car;
    let a = repo.create(&car, MockOptions::preset(Preset::Loose)).unwrap();
    let b = repo.create(&car, MockOptions::preset(Preset::Loose)).unwrap();

    assert_eq!(
        repo.invoke_member(&a, "Equals", vec![Value::Object(a.clone())]).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        repo.invoke_member(&a, "Equals", vec![Value::Object(b)]).unwrap(),
        Value::Bool(false)
    );
    assert_eq!(repo.invoke_member(&a, "ToString", vec![]).unwrap(), Value::from("ICar"));
}
