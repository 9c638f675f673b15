//! Policy definitions

use serde::{Deserialize, Serialize};

use crate::action::ActionTemplate;
use crate::expression::Condition;
use crate::trigger::TriggerKind;

/// A named rule reacting to one or more trigger kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Policy name
    pub name: String,

    /// Description of what this policy does
    #[serde(default)]
    pub description: String,

    /// Trigger kinds this policy reacts to; may contain catch-alls
    pub triggers: Vec<TriggerKind>,

    /// Conditions, all of which must hold
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Actions emitted when the conditions hold
    #[serde(default)]
    pub actions: Vec<ActionTemplate>,

    /// Lower values are evaluated first
    #[serde(default)]
    pub priority: i32,

    /// Skip all later policies once this one matched
    #[serde(default)]
    pub stop: bool,

    /// Whether this policy is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Policy {
    /// Load a single policy from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}
