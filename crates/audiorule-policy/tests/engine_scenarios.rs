//! End-to-end scenarios through `PolicyEngine` with the in-memory runtime

use audiorule_core::prelude::*;
use audiorule_core::{
    Availability, DomainEntry, ElementState, InMemoryRuntime, InterruptState, MuteState,
    NotificationConfiguration, RuntimeState,
};
use audiorule_policy::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Delegating runtime that counts accessor calls by name
struct CountingRuntime {
    inner: InMemoryRuntime,
    mute_state_calls: AtomicUsize,
    volume_calls: AtomicUsize,
}

impl CountingRuntime {
    fn new(state: RuntimeState) -> Self {
        Self {
            inner: InMemoryRuntime::new(state),
            mute_state_calls: AtomicUsize::new(0),
            volume_calls: AtomicUsize::new(0),
        }
    }
}

impl RuntimeView for CountingRuntime {
    fn is_registered(&self, kind: ElementKind, name: &str) -> bool {
        self.inner.is_registered(kind, name)
    }
    fn registered_names(&self, kind: ElementKind) -> Vec<String> {
        self.inner.registered_names(kind)
    }
    fn domain_elements(&self, domain: &str, kind: ElementKind) -> Vec<String> {
        self.inner.domain_elements(domain, kind)
    }
    fn class_of(&self, kind: ElementKind, name: &str) -> Option<String> {
        self.inner.class_of(kind, name)
    }
    fn availability(&self, kind: ElementKind, name: &str) -> Option<Availability> {
        self.inner.availability(kind, name)
    }
    fn mute_state(&self, sink: &str) -> Option<MuteState> {
        self.mute_state_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.mute_state(sink)
    }
    fn interrupt_state(&self, source: &str) -> Option<InterruptState> {
        self.inner.interrupt_state(source)
    }
    fn state(&self, kind: ElementKind, name: &str) -> Option<i16> {
        self.inner.state(kind, name)
    }
    fn main_sound_property(&self, kind: ElementKind, name: &str, property_type: i16) -> Option<i16> {
        self.inner.main_sound_property(kind, name, property_type)
    }
    fn main_sound_properties(&self, kind: ElementKind, name: &str) -> Vec<Property> {
        self.inner.main_sound_properties(kind, name)
    }
    fn sound_property(&self, kind: ElementKind, name: &str, property_type: i16) -> Option<i16> {
        self.inner.sound_property(kind, name, property_type)
    }
    fn volume(&self, kind: ElementKind, name: &str) -> Option<i16> {
        self.volume_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.volume(kind, name)
    }
    fn main_volume(&self, sink: &str) -> Option<i16> {
        self.inner.main_volume(sink)
    }
    fn volume_limit(&self, kind: ElementKind, name: &str) -> Option<i16> {
        self.inner.volume_limit(kind, name)
    }
    fn system_property(&self, property_type: i16) -> Option<i16> {
        self.inner.system_property(property_type)
    }
    fn system_properties(&self) -> Vec<Property> {
        self.inner.system_properties()
    }
    fn main_connections(&self, filter: &ConnectionFilter, order: ConnectionOrder) -> Vec<MainConnection> {
        self.inner.main_connections(filter, order)
    }
    fn notification_configurations(&self, kind: ElementKind, name: &str) -> Vec<NotificationConfiguration> {
        self.inner.notification_configurations(kind, name)
    }
    fn main_notification_configurations(
        &self,
        kind: ElementKind,
        name: &str,
    ) -> Vec<NotificationConfiguration> {
        self.inner.main_notification_configurations(kind, name)
    }
    fn is_domain_registration_complete(&self, domain: &str) -> bool {
        self.inner.is_domain_registration_complete(domain)
    }
}

impl ActionSink for CountingRuntime {
    fn set_list_actions(&self, actions: Vec<Action>, origin: Origin) -> Result<()> {
        self.inner.set_list_actions(actions, origin)
    }
}

fn graph() -> RuntimeState {
    let mut speaker = ElementState::new("Speaker").in_domain("Amp").in_class("Entertainment");
    speaker.mute_state = MuteState::Muted;
    speaker.main_volume = 5;
    speaker.volume = 5;
    RuntimeState {
        domains: vec![DomainEntry {
            name: "Amp".into(),
            state: 1,
            registration_complete: false,
        }],
        sinks: vec![speaker],
        sources: vec![ElementState::new("Radio").in_domain("Tuner")],
        classes: vec!["Entertainment".into()],
        ..RuntimeState::default()
    }
}

fn engine_with(config: &str, runtime: Arc<dyn Runtime>) -> PolicyEngine {
    let store = ConfigStore::from_yaml(config);
    assert!(store.is_loaded(), "{:?}", store.load_error());
    let mut engine = PolicyEngine::new(Arc::new(store));
    engine.start(runtime).unwrap();
    engine
}

fn volume_request() -> Trigger {
    Trigger::UserSetVolume {
        sink_name: "Speaker".into(),
        volume: 10,
        is_step: false,
    }
}

fn debug_values(actions: &[Action]) -> Vec<&str> {
    actions
        .iter()
        .filter_map(|a| a.param(params::DEBUG_VALUE))
        .collect()
}

#[test]
fn test_no_policy_yields_empty_list() {
    let runtime = Arc::new(InMemoryRuntime::new(graph()));
    let engine = engine_with("sinks: []\n", runtime.clone());
    engine.process_trigger(&volume_request()).unwrap();

    let delivered = runtime.take_delivered();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].actions.is_empty());
    assert_eq!(delivered[0].origin, Origin::User);
}

#[test]
fn test_condition_set_short_circuits() {
    let config = r#"
policies:
  - name: guarded
    triggers: [USER_SET_VOLUME]
    conditions:
      - muteState(SINK, REQUESTING) EQ MS_UNMUTED
      - volume(SINK, REQUESTING) EQ 5
    actions:
      - type: debug
        debugValue: reached
"#;
    let runtime = Arc::new(CountingRuntime::new(graph()));
    let engine = engine_with(config, runtime.clone());
    let actions = engine.evaluate(&volume_request()).unwrap();

    assert!(actions.is_empty());
    assert_eq!(runtime.mute_state_calls.load(Ordering::SeqCst), 1);
    assert_eq!(runtime.volume_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_priority_order_is_stable() {
    let config = r#"
policies:
  - name: third
    triggers: [USER_SET_VOLUME]
    priority: 20
    actions: [{ type: debug, debugValue: third }]
  - name: first
    triggers: [ANY]
    priority: 5
    actions: [{ type: debug, debugValue: first }]
  - name: second-a
    triggers: [USER_ALL]
    priority: 10
    actions: [{ type: debug, debugValue: second-a }]
  - name: second-b
    triggers: [USER_SET_VOLUME]
    priority: 10
    actions: [{ type: debug, debugValue: second-b }]
"#;
    let engine = engine_with(config, Arc::new(InMemoryRuntime::new(graph())));
    let actions = engine.evaluate(&volume_request()).unwrap();
    assert_eq!(debug_values(&actions), vec!["first", "second-a", "second-b", "third"]);
}

#[test]
fn test_stop_flag_blocks_later_policies() {
    let config = r#"
policies:
  - name: skipped
    triggers: [USER_SET_VOLUME]
    priority: 1
    conditions:
      - mainVolume(USER, REQUESTING) GT 50
    stop: true
    actions: [{ type: debug, debugValue: skipped }]
  - name: stopper
    triggers: [USER_SET_VOLUME]
    priority: 2
    stop: true
    actions: [{ type: debug, debugValue: stopper }]
  - name: never
    triggers: [USER_SET_VOLUME]
    priority: 3
    actions: [{ type: debug, debugValue: never }]
"#;
    let engine = engine_with(config, Arc::new(InMemoryRuntime::new(graph())));
    let actions = engine.evaluate(&volume_request()).unwrap();
    assert_eq!(debug_values(&actions), vec!["stopper"]);
}

#[test]
fn test_include_exclude_over_class_members() {
    let config = r#"
sinks:
  - { name: Speaker, class: Entertainment }
  - { name: Headphones, class: Entertainment }
  - { name: Cluster, class: Navigation }
policies:
  - name: inc-present
    triggers: [USER_SET_VOLUME]
    conditions: ['name(SINK_OF_CLASS, "Entertainment") INC "Headphones"']
    actions: [{ type: debug, debugValue: inc-present }]
  - name: exc-present
    triggers: [USER_SET_VOLUME]
    conditions: ['name(SINK_OF_CLASS, "Entertainment") EXC "Headphones"']
    actions: [{ type: debug, debugValue: exc-present }]
  - name: inc-absent
    triggers: [USER_SET_VOLUME]
    conditions: ['name(SINK_OF_CLASS, "Entertainment") INC "Cluster"']
    actions: [{ type: debug, debugValue: inc-absent }]
  - name: exc-absent
    triggers: [USER_SET_VOLUME]
    conditions: ['name(SINK_OF_CLASS, "Entertainment") EXC "Cluster"']
    actions: [{ type: debug, debugValue: exc-absent }]
  - name: empty-inc
    triggers: [USER_SET_VOLUME]
    conditions: ['name(SINK_OF_CLASS, "Phone") INC "Cluster"']
    actions: [{ type: debug, debugValue: empty-inc }]
  - name: empty-exc
    triggers: [USER_SET_VOLUME]
    conditions: ['name(SINK_OF_CLASS, "Phone") EXC "Cluster"']
    actions: [{ type: debug, debugValue: empty-exc }]
"#;
    let engine = engine_with(config, Arc::new(InMemoryRuntime::new(graph())));
    let actions = engine.evaluate(&volume_request()).unwrap();
    assert_eq!(
        debug_values(&actions),
        vec!["inc-present", "exc-absent", "empty-exc"]
    );
}

#[test]
fn test_numeric_and_lexical_comparison() {
    let config = r#"
sinks:
  - { name: Speaker, class: Entertainment, priority: 10 }
policies:
  - name: numeric
    triggers: [USER_SET_VOLUME]
    conditions: ['priority(SINK, REQUESTING) GT 9']
    actions: [{ type: debug, debugValue: numeric }]
  - name: lexical
    triggers: [USER_SET_VOLUME]
    conditions: ['name(USER, "10") GT "9"']
    actions: [{ type: debug, debugValue: lexical }]
  - name: mismatch
    triggers: [USER_SET_VOLUME]
    conditions: ['mainVolume(SINK, REQUESTING) EQ loud']
    actions: [{ type: debug, debugValue: mismatch }]
"#;
    let engine = engine_with(config, Arc::new(InMemoryRuntime::new(graph())));
    let actions = engine.evaluate(&volume_request()).unwrap();
    assert_eq!(debug_values(&actions), vec!["numeric"]);
}

#[test]
fn test_macro_and_nested_call_in_parameters() {
    let config = r#"
policies:
  - name: echo
    triggers: [USER_SET_VOLUME]
    actions:
      - type: set_volume
        sinkName: REQ_SINK_NAME
        mainVolume: 'scale(USER, REQ_MAIN_VOLUME, "0:0 100:50")'
      - type: debug
        debugValue: 'mainVolume(SINK, "Nowhere")'
"#;
    let engine = engine_with(config, Arc::new(InMemoryRuntime::new(graph())));
    let actions = engine.evaluate(&volume_request()).unwrap();
    assert_eq!(actions[0].param(params::SINK_NAME), Some("Speaker"));
    assert_eq!(actions[0].param(params::MAIN_VOLUME), Some("5"));
    assert_eq!(actions[1].param(params::DEBUG_VALUE), Some("mainVolume(SINK, \"Nowhere\")"));
}

#[test]
fn test_scale_midpoint() {
    let config = r#"
policies:
  - name: scaled
    triggers: [USER_SET_VOLUME]
    conditions: ['scale(USER, "50", "0:0 100:50") EQ 25']
    actions: [{ type: debug, debugValue: 'scale(USER, "50", "0:0 100:50")' }]
"#;
    let engine = engine_with(config, Arc::new(InMemoryRuntime::new(graph())));
    let actions = engine.evaluate(&volume_request()).unwrap();
    assert_eq!(debug_values(&actions), vec!["25"]);
}

#[test]
fn test_domain_deregistration_disconnects_once() {
    let config = r#"
sinks:
  - { name: SinkA, domain: D1, class: Base }
sources:
  - { name: SrcA, domain: D1, class: Base }
"#;
    let runtime = Arc::new(InMemoryRuntime::new(RuntimeState {
        domains: vec![DomainEntry {
            name: "D1".into(),
            ..DomainEntry::default()
        }],
        sinks: vec![ElementState::new("SinkA").in_domain("D1")],
        sources: vec![ElementState::new("SrcA").in_domain("D1")],
        connections: vec![MainConnection::new("SrcA", "SinkA", "Base")],
        ..RuntimeState::default()
    }));
    let engine = engine_with(config, runtime.clone());
    engine
        .process_trigger(&Trigger::SystemDeregisterDomain {
            domain_name: "D1".into(),
        })
        .unwrap();

    let delivered = runtime.take_delivered();
    let actions = &delivered[0].actions;
    assert_eq!(actions.len(), 1);
    let disconnect = &actions[0];
    assert_eq!(disconnect.kind, ActionKind::Disconnect);
    assert_eq!(disconnect.param(params::CLASS_NAME), Some("Base"));
    assert_eq!(disconnect.param(params::SOURCE_NAME), Some("SrcA"));
    assert_eq!(disconnect.param(params::SINK_NAME), Some("SinkA"));
    assert_eq!(disconnect.param(params::CONNECTION_NAME), Some("SrcA:SinkA"));
}

#[test]
fn test_connection_state_ignores_connection_name() {
    let config = r#"
policies:
  - name: any-suspended
    triggers: [USER_SET_VOLUME]
    conditions: ['connectionState(CONNECTION, "Radio:Speaker") INC CS_SUSPENDED']
    actions: [{ type: debug, debugValue: any-suspended }]
"#;
    let mut suspended = MainConnection::new("Navi", "Cluster", "Navigation");
    suspended.state = audiorule_core::ConnectionState::Suspended;
    let mut state = graph();
    state.connections = vec![MainConnection::new("Radio", "Speaker", "Entertainment"), suspended];
    let engine = engine_with(config, Arc::new(InMemoryRuntime::new(state)));
    let actions = engine.evaluate(&volume_request()).unwrap();
    assert_eq!(debug_values(&actions), vec!["any-suspended"]);
}

#[test]
fn test_domain_registration_complete_restores_properties() {
    let config = r#"
policies:
  - name: restore-list
    triggers: [USER_SET_SINK_MAIN_SOUND_PROPERTIES]
    actions:
      - type: set_properties
        listMainSoundProperties: REQUESTING
  - name: restore-single
    triggers: [USER_SET_SINK_MAIN_SOUND_PROPERTY]
    actions:
      - type: set_property
"#;
    let mut state = graph();
    state.sinks[0].main_sound_properties = vec![Property::new(1, 4), Property::new(2, 8)];
    let engine = engine_with(config, Arc::new(InMemoryRuntime::new(state)));
    let actions = engine
        .evaluate(&Trigger::SystemDomainRegistrationComplete {
            domain_name: "Amp".into(),
        })
        .unwrap();

    assert_eq!(actions.len(), 3);
    assert_eq!(actions[0].kind, ActionKind::SetProperties);
    assert_eq!(actions[0].param(params::LIST_MAIN_SOUND_PROPERTIES), Some("1:4 2:8"));
    assert_eq!(actions[1].param(params::PROPERTY_TYPE), Some("1"));
    assert_eq!(actions[2].param(params::PROPERTY_VALUE), Some("8"));
    assert!(actions.iter().all(|a| a.param(params::SINK_NAME) == Some("Speaker")));
}

#[test]
fn test_mute_policy_against_graph() {
    let config = r#"
policies:
  - name: mute-if-unmuted
    triggers: [USER_SET_SINK_MUTE_STATE]
    conditions:
      - muteState(USER, REQUESTING) EQ MS_MUTED
      - muteState(SINK, REQUESTING) NE MS_MUTED
    actions:
      - type: mute
"#;
    let runtime = Arc::new(InMemoryRuntime::new(graph()));
    runtime.update(|state| state.sinks[0].mute_state = MuteState::Unmuted);
    let engine = engine_with(config, runtime.clone());
    engine
        .process_trigger(&Trigger::UserSetSinkMuteState {
            sink_name: "Speaker".into(),
            mute_state: MuteState::Muted,
        })
        .unwrap();

    let delivered = runtime.take_delivered();
    let action = &delivered[0].actions[0];
    assert_eq!(action.kind, ActionKind::Mute);
    assert_eq!(action.param(params::SINK_NAME), Some("Speaker"));
    assert_eq!(action.param(params::MUTE_STATE), Some("1"));
}
