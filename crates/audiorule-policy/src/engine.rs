//! Policy engine
//!
//! Drives a trigger through the configured policies and hands the resulting
//! action list to the runtime:
//!
//! 1. fill the class of availability triggers from the configuration,
//! 2. evaluate the matching policies in priority order,
//! 3. append implicit actions for the trigger kind,
//! 4. deliver the list.

use audiorule_core::{Action, Error, Result, Runtime};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ConfigStore, EngineOptions};
use crate::evaluator::FunctionEvaluator;
use crate::implicit;
use crate::trigger::{Trigger, TriggerKind};

/// Lifecycle of an engine
enum EngineState {
    Uninitialized,
    Started(FunctionEvaluator),
    Stopped,
}

/// Policy evaluation engine
pub struct PolicyEngine {
    store: Arc<ConfigStore>,
    state: EngineState,
}

impl PolicyEngine {
    /// Create an engine over `store`; it must be started before use
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self {
            store,
            state: EngineState::Uninitialized,
        }
    }

    /// Wire in the runtime and build the evaluator
    pub fn start(&mut self, runtime: Arc<dyn Runtime>) -> Result<()> {
        if self.is_started() {
            return Err(Error::policy("policy engine is already started"));
        }
        let evaluator = FunctionEvaluator::new(self.store.clone(), runtime)?;
        self.state = EngineState::Started(evaluator);
        info!(
            policies = self.store.policies().len(),
            config_loaded = self.store.is_loaded(),
            "policy engine started"
        );
        Ok(())
    }

    /// Release the evaluator and the runtime handle
    pub fn stop(&mut self) {
        if self.is_started() {
            info!("policy engine stopped");
        }
        self.state = EngineState::Stopped;
    }

    pub fn is_started(&self) -> bool {
        matches!(self.state, EngineState::Started(_))
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn options(&self) -> &EngineOptions {
        self.store.options()
    }

    fn evaluator(&self) -> Result<&FunctionEvaluator> {
        match &self.state {
            EngineState::Started(evaluator) => Ok(evaluator),
            EngineState::Uninitialized | EngineState::Stopped => Err(Error::NotStarted),
        }
    }

    /// Process a trigger and deliver the resulting actions.
    ///
    /// Only a failed policy lookup or a failed delivery is reported; rule
    /// evaluation problems are logged and skipped.
    pub fn process_trigger(&self, trigger: &Trigger) -> Result<()> {
        let kind = trigger.kind();
        metrics::counter!("audiorule_triggers_total", "kind" => kind.as_str()).increment(1);

        let actions = self.evaluate(trigger)?;
        let evaluator = self.evaluator()?;
        let origin = trigger.origin();
        metrics::counter!("audiorule_actions_total", "origin" => origin.as_str())
            .increment(actions.len() as u64);

        debug!(trigger = %kind, count = actions.len(), "delivering action list");
        evaluator
            .runtime()
            .set_list_actions(actions, origin)
            .map_err(|e| {
                warn!(trigger = %kind, error = %e, "action list delivery failed");
                e
            })
    }

    /// Compute the action list for a trigger without delivering it
    pub fn evaluate(&self, trigger: &Trigger) -> Result<Vec<Action>> {
        let evaluator = self.evaluator()?;
        let mut trigger = trigger.clone();
        self.fill_class(evaluator, &mut trigger);

        let mut actions = self.rule_actions(evaluator, &trigger)?;
        actions.extend(implicit::implicit_actions(
            &self.store,
            evaluator.runtime(),
            &trigger,
        ));

        if let Trigger::SystemDomainRegistrationComplete { domain_name } = &trigger {
            actions.extend(self.restore_actions(evaluator, domain_name));
        }
        Ok(actions)
    }

    /// Availability policies are written against classes. The declared class
    /// wins; elements registered at runtime only fall back to their
    /// registered class.
    fn fill_class(&self, evaluator: &FunctionEvaluator, trigger: &mut Trigger) {
        let (kind, name) = match trigger {
            Trigger::SystemSinkAvailabilityChanged {
                sink_name,
                class_name: None,
                ..
            } => (audiorule_core::ElementKind::Sink, sink_name.clone()),
            Trigger::SystemSourceAvailabilityChanged {
                source_name,
                class_name: None,
                ..
            } => (audiorule_core::ElementKind::Source, source_name.clone()),
            _ => return,
        };
        let class = self
            .store
            .class_of(kind, &name)
            .map(str::to_string)
            .or_else(|| evaluator.runtime().class_of(kind, &name));
        match class {
            Some(class) => trigger.set_class_name(class),
            None => debug!(element = %name, "no configured class for availability trigger"),
        }
    }

    /// Actions of all matching policies, honouring priority and stop flags
    fn rule_actions(&self, evaluator: &FunctionEvaluator, trigger: &Trigger) -> Result<Vec<Action>> {
        let kind = trigger.kind();
        let policies = self.store.policies_for(kind)?;
        if policies.is_empty() {
            if self.options().strict_policy_lookup {
                return Err(Error::policy(format!("no policy for trigger {}", kind)));
            }
            debug!(trigger = %kind, "no policy for trigger");
        }

        let mut actions = Vec::new();
        for policy in policies {
            if !evaluator.evaluate_condition_set(&policy.conditions, trigger) {
                debug!(policy = %policy.name, trigger = %kind, "conditions not met");
                continue;
            }
            metrics::counter!("audiorule_policies_matched_total").increment(1);
            debug!(policy = %policy.name, trigger = %kind, "policy matched");

            for template in &policy.actions {
                let action = template.resolve(trigger, |text| {
                    evaluator.evaluate_parameter_expression(text, trigger)
                });
                debug!(policy = %policy.name, %action, "action resolved");
                actions.push(action);
            }

            if policy.stop {
                debug!(policy = %policy.name, "stop flag set, skipping remaining policies");
                break;
            }
        }
        Ok(actions)
    }

    /// Run the rules for the restore requests of a completed domain
    fn restore_actions(&self, evaluator: &FunctionEvaluator, domain: &str) -> Vec<Action> {
        if !self.options().restore_on_domain_complete {
            return Vec::new();
        }
        let mut actions = Vec::new();
        for restore in implicit::restore_triggers(evaluator.runtime(), domain) {
            match self.rule_actions(evaluator, &restore) {
                Ok(list) => actions.extend(list),
                Err(e) => debug!(trigger = %restore.kind(), error = %e, "restore trigger skipped"),
            }
        }
        actions
    }

    /// Policies that would be considered for `kind`, by name
    pub fn candidate_policies(&self, kind: TriggerKind) -> Result<Vec<String>> {
        Ok(self
            .store
            .policies_for(kind)?
            .into_iter()
            .map(|p| p.name.clone())
            .collect())
    }
}

/// Register descriptions for the engine's counters with the installed recorder
pub fn describe_metrics() {
    metrics::describe_counter!("audiorule_triggers_total", "Triggers processed by kind");
    metrics::describe_counter!(
        "audiorule_policies_matched_total",
        "Policies whose conditions held"
    );
    metrics::describe_counter!("audiorule_actions_total", "Actions delivered by origin");
    metrics::describe_counter!(
        "audiorule_condition_failures_total",
        "Calls that could not be evaluated, by reason"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiorule_core::{
        Availability, AvailabilityState, ElementState, InMemoryRuntime, Origin, RuntimeState,
    };

    const CONFIG: &str = r#"
sinks:
  - name: Speaker
    domain: Amp
    class: Entertainment
policies:
  - name: availability-by-class
    triggers: [SYSTEM_SINK_AVAILABILITY_CHANGED]
    conditions:
      - name(USER, REQ_CLASS_NAME) EQ "Entertainment"
    actions:
      - type: debug
        debugValue: REQ_CLASS_NAME
"#;

    fn started(config: &str) -> (PolicyEngine, Arc<InMemoryRuntime>) {
        let runtime = Arc::new(InMemoryRuntime::new(RuntimeState {
            sinks: vec![ElementState::new("Speaker").in_domain("Amp")],
            ..RuntimeState::default()
        }));
        let mut engine = PolicyEngine::new(Arc::new(ConfigStore::from_yaml(config)));
        engine.start(runtime.clone()).unwrap();
        (engine, runtime)
    }

    #[test]
    fn test_lifecycle() {
        let mut engine = PolicyEngine::new(Arc::new(ConfigStore::from_yaml(CONFIG)));
        let trigger = Trigger::SystemRegisterSink {
            sink_name: "Speaker".into(),
        };
        assert!(matches!(engine.process_trigger(&trigger), Err(Error::NotStarted)));

        let runtime = Arc::new(InMemoryRuntime::default());
        engine.start(runtime.clone()).unwrap();
        assert!(engine.start(runtime.clone()).is_err());
        engine.process_trigger(&trigger).unwrap();
        assert_eq!(runtime.take_delivered().len(), 1);

        engine.stop();
        assert!(matches!(engine.process_trigger(&trigger), Err(Error::NotStarted)));
    }

    #[test]
    fn test_availability_class_filled() {
        let (engine, runtime) = started(CONFIG);
        let trigger = Trigger::SystemSinkAvailabilityChanged {
            sink_name: "Speaker".into(),
            availability: Availability::new(AvailabilityState::Available, 0),
            class_name: None,
        };
        engine.process_trigger(&trigger).unwrap();
        let delivered = runtime.take_delivered();
        assert_eq!(delivered[0].origin, Origin::System);
        assert_eq!(delivered[0].actions.len(), 1);
        assert_eq!(delivered[0].actions[0].param("debugValue"), Some("Entertainment"));
    }

    #[test]
    fn test_runtime_only_sink_uses_registered_class() {
        let config = format!(
            "{}  - name: class-of-sink\n    triggers: [USER_SET_VOLUME]\n    conditions:\n      - name(CLASS_OF_SINK, REQUESTING) EQ \"Entertainment\"\n    actions:\n      - type: debug\n        debugValue: class-of-sink\n",
            CONFIG
        );
        let (engine, runtime) = started(&config);
        runtime.update(|state| {
            state
                .sinks
                .push(ElementState::new("Headphones").in_domain("Amp").in_class("Entertainment"))
        });

        let availability = Trigger::SystemSinkAvailabilityChanged {
            sink_name: "Headphones".into(),
            availability: Availability::new(AvailabilityState::Unavailable, 1),
            class_name: None,
        };
        let actions = engine.evaluate(&availability).unwrap();
        assert_eq!(actions[0].param("debugValue"), Some("Entertainment"));

        let volume = Trigger::UserSetVolume {
            sink_name: "Headphones".into(),
            volume: 3,
            is_step: false,
        };
        let actions = engine.evaluate(&volume).unwrap();
        assert_eq!(actions[0].param("debugValue"), Some("class-of-sink"));
    }

    #[test]
    fn test_strict_lookup() {
        let config = format!("{}engine:\n  strict_policy_lookup: true\n", CONFIG);
        let (engine, _) = started(&config);
        let trigger = Trigger::SystemRegisterDomain {
            domain_name: "Amp".into(),
        };
        assert!(matches!(engine.evaluate(&trigger), Err(Error::Policy(_))));
    }

    #[test]
    fn test_unloaded_config_fails_lookup() {
        let (engine, runtime) = started("policies: [");
        let trigger = Trigger::SystemRegisterDomain {
            domain_name: "Amp".into(),
        };
        assert!(matches!(engine.process_trigger(&trigger), Err(Error::Config(_))));
        assert!(runtime.delivered().is_empty());
    }

    #[test]
    fn test_restore_switch() {
        let restore = r#"
policies:
  - name: restore-list
    triggers: [USER_SET_SINK_MAIN_SOUND_PROPERTIES]
    actions:
      - type: set_properties
        listMainSoundProperties: REQUESTING
"#;
        let trigger = Trigger::SystemDomainRegistrationComplete {
            domain_name: "Amp".into(),
        };
        let with_properties = |engine: &PolicyEngine, runtime: &InMemoryRuntime| {
            runtime.update(|state| {
                state.sinks[0].main_sound_properties = vec![audiorule_core::Property::new(1, 4)];
            });
            engine.evaluate(&trigger).unwrap()
        };

        let (engine, runtime) = started(restore);
        assert_eq!(with_properties(&engine, &runtime).len(), 1);

        let disabled = format!("{}engine:\n  restore_on_domain_complete: false\n", restore);
        let (engine, runtime) = started(&disabled);
        assert!(with_properties(&engine, &runtime).is_empty());
    }

    #[test]
    fn test_delivery_failure_surfaces() {
        let (engine, runtime) = started(CONFIG);
        runtime.set_fail_delivery(true);
        let trigger = Trigger::SystemRegisterDomain {
            domain_name: "Amp".into(),
        };
        assert!(matches!(engine.process_trigger(&trigger), Err(Error::Runtime(_))));
    }
}
