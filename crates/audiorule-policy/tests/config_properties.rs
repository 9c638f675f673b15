//! Configuration loading and property-based checks

use audiorule_core::{InMemoryRuntime, RuntimeState};
use audiorule_policy::prelude::*;
use audiorule_policy::{compare, ValueType};
use proptest::prelude::*;
use std::io::Write;
use std::sync::Arc;

#[test]
fn test_store_from_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        r#"
sinks:
  - {{ name: Speaker, domain: Amp, class: Entertainment, priority: 3 }}
policies:
  - name: echo
    triggers: [USER_SET_VOLUME]
    actions: [{{ type: debug, debugValue: REQ_SINK_NAME }}]
"#
    )
    .unwrap();

    let store = ConfigStore::from_file(file.path());
    assert!(store.is_loaded());
    assert_eq!(store.policies().len(), 1);
    assert_eq!(
        store.class_of(audiorule_core::ElementKind::Sink, "Speaker"),
        Some("Entertainment")
    );
}

#[test]
fn test_store_from_json_file() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"classes": [{{"name": "Navigation", "priority": 1}}], "policies": []}}"#
    )
    .unwrap();

    let store = ConfigStore::from_file(file.path());
    assert!(store.is_loaded());
    assert_eq!(store.names(audiorule_core::ElementKind::Class), vec!["Navigation"]);
}

#[test]
fn test_missing_file_leaves_store_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::from_file(dir.path().join("absent.yaml"));
    assert!(!store.is_loaded());
    assert!(store.load_error().is_some());
    assert!(store.policies_for(TriggerKind::UserSetVolume).is_err());
}

#[test]
fn test_duplicate_names_rejected() {
    let config = ControllerConfig::from_yaml(
        "sinks:\n  - { name: Speaker }\n  - { name: Speaker }\n",
    )
    .unwrap();
    assert!(config.validate().is_err());
    assert!(!ConfigStore::from_config(config).is_loaded());
}

fn policy_yaml(priorities: &[i32]) -> String {
    let mut yaml = String::from("policies:\n");
    for (index, priority) in priorities.iter().enumerate() {
        yaml.push_str(&format!(
            "  - name: p{index}\n    triggers: [USER_SET_VOLUME]\n    priority: {priority}\n    actions: [{{ type: debug, debugValue: p{index} }}]\n"
        ));
    }
    yaml
}

proptest! {
    #[test]
    fn prop_policies_run_in_stable_priority_order(priorities in prop::collection::vec(-3i32..4, 1..12)) {
        let store = ConfigStore::from_yaml(&policy_yaml(&priorities));
        prop_assert!(store.is_loaded());
        let mut engine = PolicyEngine::new(Arc::new(store));
        engine.start(Arc::new(InMemoryRuntime::new(RuntimeState::default()))).unwrap();

        let trigger = Trigger::UserSetVolume {
            sink_name: "Speaker".into(),
            volume: 1,
            is_step: false,
        };
        let actions = engine.evaluate(&trigger).unwrap();
        let seen: Vec<String> = actions
            .iter()
            .filter_map(|a| a.param("debugValue").map(str::to_string))
            .collect();

        let mut expected: Vec<usize> = (0..priorities.len()).collect();
        expected.sort_by_key(|&i| priorities[i]);
        let expected: Vec<String> = expected.into_iter().map(|i| format!("p{i}")).collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn prop_include_and_exclude_are_complementary(
        left in prop::collection::vec("[a-c]{1,2}", 0..5),
        right in "[a-c]{1,2}",
    ) {
        let include = compare(Operator::Include, ValueType::Text, &left, &right).unwrap();
        let exclude = compare(Operator::Exclude, ValueType::Text, &left, &right).unwrap();
        prop_assert_ne!(include, exclude);
        prop_assert_eq!(include, left.contains(&right));
    }

    #[test]
    fn prop_numeric_equality_ignores_symbol_spelling(value in 0i64..3) {
        let symbol = ["MS_UNKNOWN", "MS_MUTED", "MS_UNMUTED"][value as usize];
        let left = vec![value.to_string()];
        prop_assert!(compare(Operator::Equal, ValueType::Numeric, &left, symbol).unwrap());
    }
}
