//! Action templates
//!
//! A template is an action kind plus parameter expressions. Expressions are
//! resolved per trigger into a plain [`Action`]; see [`ActionTemplate::resolve`].

use audiorule_core::types::render_properties;
use audiorule_core::{params, Action, ActionKind, LimitState, MuteState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::trigger::Trigger;

/// Selector token meaning "the element named by the trigger"
pub const REQUESTING: &str = "REQUESTING";

/// An action as declared in a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTemplate")]
pub struct ActionTemplate {
    #[serde(rename = "type")]
    pub kind: ActionKind,

    /// Parameter name to unresolved expression
    #[serde(flatten)]
    pub params: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawTemplate {
    #[serde(rename = "type")]
    kind: ActionKind,
    #[serde(flatten)]
    params: BTreeMap<String, Scalar>,
}

/// Parameter values may be written as bare YAML scalars
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s),
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<RawTemplate> for ActionTemplate {
    fn from(raw: RawTemplate) -> Self {
        Self {
            kind: raw.kind,
            params: raw
                .params
                .into_iter()
                .map(|(key, value)| (key, value.to_string()))
                .collect(),
        }
    }
}

impl ActionTemplate {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Resolve every parameter through `expand`, then fill trigger defaults.
    ///
    /// Quoted values are taken literally. The `REQUESTING` selector is
    /// replaced from the trigger for name and property-list keys; anything
    /// else goes through `expand` (macros and nested calls).
    pub fn resolve(&self, trigger: &Trigger, mut expand: impl FnMut(&str) -> String) -> Action {
        let mut action = Action::new(self.kind);
        for (key, raw) in &self.params {
            let raw = raw.trim();
            let value = if let Some(literal) = strip_quotes(raw) {
                literal.to_string()
            } else if raw == REQUESTING {
                requesting_value(key, trigger).unwrap_or_else(|| {
                    warn!(action = %self.kind, param = %key, trigger = %trigger.kind(), "trigger carries no value for REQUESTING");
                    raw.to_string()
                })
            } else {
                expand(raw)
            };
            action.params.insert(key.clone(), value);
        }
        fill_defaults(&mut action, trigger);
        action
    }
}

fn strip_quotes(text: &str) -> Option<&str> {
    text.strip_prefix('"')?.strip_suffix('"')
}

/// What `REQUESTING` stands for under a given parameter key
fn requesting_value(key: &str, trigger: &Trigger) -> Option<String> {
    match key {
        params::SINK_NAME | params::EXCEPT_SINK => trigger.sink_name().map(str::to_string),
        params::SOURCE_NAME | params::EXCEPT_SOURCE => trigger.source_name().map(str::to_string),
        params::CLASS_NAME => trigger.class_name().map(str::to_string),
        params::DOMAIN_NAME => trigger.domain_name().map(str::to_string),
        params::GATEWAY_NAME => trigger.gateway_name().map(str::to_string),
        params::CONNECTION_NAME => trigger.connection_name(),
        params::LIST_MAIN_SOUND_PROPERTIES => {
            let properties = trigger.main_sound_properties();
            (!properties.is_empty()).then(|| render_properties(properties))
        }
        params::LIST_SYSTEM_PROPERTIES => {
            let properties = trigger.system_properties();
            (!properties.is_empty()).then(|| render_properties(properties))
        }
        _ => None,
    }
}

const ELEMENT_KEYS: &[&str] = &[params::SINK_NAME, params::SOURCE_NAME, params::CLASS_NAME];

/// Fill parameters the action kind needs but the policy left out
fn fill_defaults(action: &mut Action, trigger: &Trigger) {
    match action.kind {
        ActionKind::Mute | ActionKind::Unmute => {
            let state = if action.kind == ActionKind::Mute {
                MuteState::Muted
            } else {
                MuteState::Unmuted
            };
            action
                .params
                .insert(params::MUTE_STATE.to_string(), state.code().to_string());
            if !action.has_any(ELEMENT_KEYS) {
                default_sink(action, trigger);
            }
        }
        ActionKind::Limit | ActionKind::Unlimit => {
            let state = if action.kind == ActionKind::Limit {
                LimitState::Limited
            } else {
                LimitState::Unlimited
            };
            action
                .params
                .insert(params::LIMIT_STATE.to_string(), state.code().to_string());
            if !action.has_any(ELEMENT_KEYS) {
                default_sink(action, trigger);
            }
        }
        ActionKind::SetVolume => {
            if !action.has_any(ELEMENT_KEYS) {
                default_sink(action, trigger);
            }
            if !action.has_any(&[params::MAIN_VOLUME, params::MAIN_VOLUME_STEP, params::VOLUME]) {
                if let Some(volume) = trigger.main_volume() {
                    let key = if trigger.is_volume_step() == Some(true) {
                        params::MAIN_VOLUME_STEP
                    } else {
                        params::MAIN_VOLUME
                    };
                    action.set_default(key, volume.to_string());
                }
            }
        }
        ActionKind::Connect | ActionKind::Disconnect => {
            if !action.has_any(&[params::SINK_NAME, params::SOURCE_NAME, params::CONNECTION_NAME]) {
                if let Some(source) = trigger.source_name() {
                    action.set_default(params::SOURCE_NAME, source);
                }
                if let Some(sink) = trigger.sink_name() {
                    action.set_default(params::SINK_NAME, sink);
                }
                if let Some(class) = trigger.class_name() {
                    action.set_default(params::CLASS_NAME, class);
                }
            }
        }
        ActionKind::SetProperty => {
            default_element(action, trigger);
            if let Some(property) = trigger.main_sound_properties().first() {
                action.set_default(params::PROPERTY_TYPE, property.property_type.to_string());
                action.set_default(params::PROPERTY_VALUE, property.value.to_string());
            }
        }
        ActionKind::SetProperties => {
            default_element(action, trigger);
            let properties = trigger.main_sound_properties();
            if !properties.is_empty() {
                action.set_default(params::LIST_MAIN_SOUND_PROPERTIES, render_properties(properties));
            }
        }
        ActionKind::SetSystemProperty => {
            if let Some(property) = trigger.system_properties().first() {
                action.set_default(params::PROPERTY_TYPE, property.property_type.to_string());
                action.set_default(params::PROPERTY_VALUE, property.value.to_string());
            }
        }
        ActionKind::SetSystemProperties => {
            let properties = trigger.system_properties();
            if !properties.is_empty() {
                action.set_default(params::LIST_SYSTEM_PROPERTIES, render_properties(properties));
            }
        }
        ActionKind::SetNotificationConfiguration => {
            default_element(action, trigger);
            if let Some(config) = trigger.notification_configuration() {
                action.set_default(params::NOTIFICATION_TYPE, config.notification_type.to_string());
                action.set_default(params::NOTIFICATION_STATUS, config.status.code().to_string());
                action.set_default(params::NOTIFICATION_PARAM, config.parameter.to_string());
            }
        }
        ActionKind::Push
        | ActionKind::Pop
        | ActionKind::Suspend
        | ActionKind::Resume
        | ActionKind::Register
        | ActionKind::Debug => {}
    }
}

fn default_sink(action: &mut Action, trigger: &Trigger) {
    if let Some(sink) = trigger.sink_name() {
        action.set_default(params::SINK_NAME, sink);
    }
}

/// Default the sink or source a property action targets
fn default_element(action: &mut Action, trigger: &Trigger) {
    if action.has_any(&[params::SINK_NAME, params::SOURCE_NAME]) {
        return;
    }
    if let Some(sink) = trigger.sink_name() {
        action.set_default(params::SINK_NAME, sink);
    } else if let Some(source) = trigger.source_name() {
        action.set_default(params::SOURCE_NAME, source);
    }
}
