//! Trigger processing benchmarks
//!
//! Measures a full `process_trigger` pass (policy lookup, condition
//! evaluation, parameter resolution, implicit actions, delivery) against the
//! in-memory runtime.
//!
//! Run with: cargo bench -p audiorule-policy

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use audiorule_core::{
    DomainEntry, ElementState, InMemoryRuntime, MainConnection, MuteState, RuntimeState,
};
use audiorule_policy::{ConfigStore, PolicyEngine, Trigger};

const CONFIG: &str = r#"
sinks:
  - { name: Speaker, domain: Amp, class: Entertainment, priority: 1 }
  - { name: Headphones, domain: Amp, class: Entertainment, priority: 2 }
  - { name: Cluster, domain: Cockpit, class: Navigation, priority: 0 }
sources:
  - { name: Radio, domain: Tuner, class: Entertainment }
  - { name: Navi, domain: Cockpit, class: Navigation }
classes:
  - { name: Entertainment, priority: 2 }
  - { name: Navigation, priority: 1 }
policies:
  - name: clamp-volume
    triggers: [USER_SET_VOLUME]
    priority: 1
    conditions:
      - mainVolume(USER, REQUESTING) GT 40
      - name(SINK_OF_CLASS, "Entertainment") INC REQ_SINK_NAME
    actions:
      - type: set_volume
        mainVolume: 'scale(USER, REQ_MAIN_VOLUME, "0:0 40:40 100:60")'
  - name: plain-volume
    triggers: [USER_SET_VOLUME]
    priority: 2
    actions:
      - type: set_volume
  - name: navi-ducks
    triggers: [USER_CONNECTION_REQUEST]
    conditions:
      - name(CLASS_OF_SOURCE, REQUESTING) EQ "Navigation"
      - connectionState(CONNECTION_OF_CLASS, "Entertainment") INC CS_CONNECTED
    actions:
      - type: limit
        className: '"Entertainment"'
        limitVolume: "-20"
      - type: connect
"#;

fn graph() -> RuntimeState {
    let mut speaker = ElementState::new("Speaker").in_domain("Amp").in_class("Entertainment");
    speaker.mute_state = MuteState::Unmuted;
    speaker.main_volume = 30;
    RuntimeState {
        domains: vec![
            DomainEntry {
                name: "Amp".into(),
                ..DomainEntry::default()
            },
            DomainEntry {
                name: "Cockpit".into(),
                ..DomainEntry::default()
            },
        ],
        sinks: vec![
            speaker,
            ElementState::new("Headphones").in_domain("Amp").in_class("Entertainment"),
            ElementState::new("Cluster").in_domain("Cockpit").in_class("Navigation"),
        ],
        sources: vec![
            ElementState::new("Radio").in_domain("Tuner").in_class("Entertainment"),
            ElementState::new("Navi").in_domain("Cockpit").in_class("Navigation"),
        ],
        connections: vec![MainConnection::new("Radio", "Speaker", "Entertainment")],
        ..RuntimeState::default()
    }
}

fn engine() -> (PolicyEngine, Arc<InMemoryRuntime>) {
    let runtime = Arc::new(InMemoryRuntime::new(graph()));
    let mut engine = PolicyEngine::new(Arc::new(ConfigStore::from_yaml(CONFIG)));
    engine.start(runtime.clone()).unwrap();
    (engine, runtime)
}

fn benchmark_process_trigger(c: &mut Criterion) {
    let (engine, runtime) = engine();

    let cases = vec![
        (
            "volume_matched",
            Trigger::UserSetVolume {
                sink_name: "Speaker".into(),
                volume: 80,
                is_step: false,
            },
        ),
        (
            "volume_fallthrough",
            Trigger::UserSetVolume {
                sink_name: "Speaker".into(),
                volume: 10,
                is_step: false,
            },
        ),
        (
            "connection_request",
            Trigger::UserConnectionRequest {
                source_name: "Navi".into(),
                sink_name: "Cluster".into(),
                class_name: None,
            },
        ),
        (
            "no_policy",
            Trigger::SystemRegisterDomain {
                domain_name: "Tuner".into(),
            },
        ),
        (
            "deregister_domain",
            Trigger::SystemDeregisterDomain {
                domain_name: "Amp".into(),
            },
        ),
    ];

    let mut group = c.benchmark_group("Process_Trigger");
    group.significance_level(0.05);
    group.sample_size(100);

    for (name, trigger) in cases {
        group.bench_with_input(BenchmarkId::new("process", name), &trigger, |b, trigger| {
            b.iter(|| {
                engine.process_trigger(black_box(trigger)).unwrap();
                runtime.take_delivered()
            });
        });
    }

    group.finish();
}

fn benchmark_condition_chain(c: &mut Criterion) {
    let (engine, _) = engine();
    let trigger = Trigger::UserSetVolume {
        sink_name: "Speaker".into(),
        volume: 80,
        is_step: false,
    };

    c.bench_function("evaluate_volume_policies", |b| {
        b.iter(|| engine.evaluate(black_box(&trigger)).unwrap())
    });
}

criterion_group!(benches, benchmark_process_trigger, benchmark_condition_chain);
criterion_main!(benches);
