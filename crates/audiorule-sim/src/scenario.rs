//! Scenario files and their replay

use anyhow::Context;
use audiorule_core::{Action, InMemoryRuntime, Origin, RuntimeState};
use audiorule_policy::{PolicyEngine, Trigger};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Initial graph plus the triggers to replay against it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Audio graph the in-memory runtime starts from
    #[serde(default)]
    pub state: RuntimeState,

    /// Triggers, replayed in order
    #[serde(default)]
    pub triggers: Vec<Trigger>,

    /// Feed each delivered list back into the in-memory graph
    #[serde(default)]
    pub apply_actions: bool,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a scenario file; `.json` files are read as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        let scenario = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(scenario)
    }
}

/// Outcome of one replayed trigger
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub index: usize,
    pub trigger: Trigger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    pub actions: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Replay every trigger of `scenario` through `engine`.
///
/// A trigger the engine rejects is recorded with its error and the replay
/// continues with the next one.
pub fn replay(engine: &PolicyEngine, runtime: &InMemoryRuntime, scenario: &Scenario) -> Vec<Step> {
    let mut steps = Vec::with_capacity(scenario.triggers.len());
    for (index, trigger) in scenario.triggers.iter().enumerate() {
        let result = engine.process_trigger(trigger);
        let delivered = runtime.take_delivered();

        let mut step = Step {
            index,
            trigger: trigger.clone(),
            origin: None,
            actions: Vec::new(),
            error: None,
        };
        let outcome = match result {
            Ok(()) => "delivered",
            Err(e) => {
                warn!(index, trigger = %trigger.kind(), error = %e, "trigger failed");
                step.error = Some(e.to_string());
                "failed"
            }
        };
        metrics::counter!("audiorule_sim_steps_total", "outcome" => outcome).increment(1);
        for list in delivered {
            if scenario.apply_actions {
                runtime.apply(&list.actions);
            }
            step.origin = Some(list.origin);
            step.actions.extend(list.actions);
        }
        debug!(index, trigger = %trigger.kind(), actions = step.actions.len(), "trigger replayed");
        steps.push(step);
    }
    info!(triggers = steps.len(), "scenario replayed");
    steps
}

/// Human-readable rendering of the replay
pub fn render_text(steps: &[Step]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push_str(&format!("#{} {}", step.index, step.trigger.kind()));
        if let Some(origin) = step.origin {
            out.push_str(&format!(" ({})", origin.as_str()));
        }
        out.push('\n');
        if let Some(error) = &step.error {
            out.push_str(&format!("  error: {}\n", error));
        } else if step.actions.is_empty() {
            out.push_str("  (no actions)\n");
        }
        for action in &step.actions {
            out.push_str(&format!("  {}\n", action));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiorule_core::{ActionKind, ElementState, MainConnection};
    use audiorule_policy::ConfigStore;
    use std::sync::Arc;

    const CONFIG: &str = r#"
sinks:
  - { name: Speaker, domain: Amp, class: Entertainment }
sources:
  - { name: Radio, domain: Tuner, class: Entertainment }
policies:
  - name: connect-on-request
    triggers: [USER_CONNECTION_REQUEST]
    conditions:
      - name(CLASS_OF_SINK, REQUESTING) EQ "Entertainment"
    actions:
      - type: connect
"#;

    const SCENARIO: &str = r#"
apply_actions: true
state:
  sinks:
    - { name: Speaker, domain: Amp }
  sources:
    - { name: Radio, domain: Tuner }
triggers:
  - kind: USER_CONNECTION_REQUEST
    source_name: Radio
    sink_name: Speaker
  - kind: SYSTEM_DEREGISTER_SINK
    sink_name: Speaker
"#;

    fn run(scenario: &Scenario) -> (Vec<Step>, Arc<InMemoryRuntime>) {
        let runtime = Arc::new(InMemoryRuntime::new(scenario.state.clone()));
        let mut engine = PolicyEngine::new(Arc::new(ConfigStore::from_yaml(CONFIG)));
        engine.start(runtime.clone()).unwrap();
        (replay(&engine, &runtime, scenario), runtime)
    }

    #[test]
    fn test_replay_applies_actions() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        let (steps, runtime) = run(&scenario);

        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].origin, Some(Origin::User));
        assert_eq!(steps[0].actions[0].kind, ActionKind::Connect);

        // the connect was applied, so deregistration finds it
        assert_eq!(steps[1].actions.len(), 1);
        assert_eq!(steps[1].actions[0].kind, ActionKind::Disconnect);
        assert!(runtime.snapshot().connections.is_empty());
    }

    #[test]
    fn test_replay_without_apply_leaves_graph() {
        let mut scenario = Scenario::from_yaml(SCENARIO).unwrap();
        scenario.apply_actions = false;
        scenario.state.connections.push(MainConnection::new("Radio", "Speaker", "Entertainment"));
        let (steps, runtime) = run(&scenario);

        assert_eq!(steps[1].actions.len(), 1);
        assert_eq!(runtime.snapshot().connections.len(), 1);
    }

    #[test]
    fn test_render_text() {
        let scenario = Scenario {
            state: RuntimeState {
                sinks: vec![ElementState::new("Speaker")],
                ..RuntimeState::default()
            },
            triggers: vec![Trigger::SystemRegisterDomain {
                domain_name: "Amp".into(),
            }],
            apply_actions: false,
        };
        let (steps, _) = run(&scenario);
        let text = render_text(&steps);
        assert!(text.starts_with("#0 SYSTEM_REGISTER_DOMAIN (system)"));
        assert!(text.contains("(no actions)"));
    }

    #[test]
    fn test_replay_counts_steps() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        metrics::with_local_recorder(&recorder, || run(&scenario));

        let rendered = handle.render();
        assert!(rendered.contains("audiorule_sim_steps_total{outcome=\"delivered\"} 2"));
        assert!(rendered.contains("audiorule_triggers_total"));
    }

    #[test]
    fn test_json_scenario_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{"triggers": [{"kind": "SYSTEM_REGISTER_DOMAIN", "domain_name": "Amp"}]}"#,
        )
        .unwrap();
        let scenario = Scenario::from_file(file.path()).unwrap();
        assert_eq!(scenario.triggers.len(), 1);
        assert!(!scenario.apply_actions);
    }
}
