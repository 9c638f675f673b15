//! Resolved actions handed to the routing runtime

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of operation the runtime is asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Connect,
    Disconnect,
    Push,
    Pop,
    Suspend,
    Resume,
    SetVolume,
    Limit,
    Unlimit,
    Mute,
    Unmute,
    SetProperty,
    SetProperties,
    SetSystemProperty,
    SetSystemProperties,
    SetNotificationConfiguration,
    Register,
    Debug,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Connect => "connect",
            ActionKind::Disconnect => "disconnect",
            ActionKind::Push => "push",
            ActionKind::Pop => "pop",
            ActionKind::Suspend => "suspend",
            ActionKind::Resume => "resume",
            ActionKind::SetVolume => "set_volume",
            ActionKind::Limit => "limit",
            ActionKind::Unlimit => "unlimit",
            ActionKind::Mute => "mute",
            ActionKind::Unmute => "unmute",
            ActionKind::SetProperty => "set_property",
            ActionKind::SetProperties => "set_properties",
            ActionKind::SetSystemProperty => "set_system_property",
            ActionKind::SetSystemProperties => "set_system_properties",
            ActionKind::SetNotificationConfiguration => "set_notification_configuration",
            ActionKind::Register => "register",
            ActionKind::Debug => "debug",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter names understood by the runtime
pub mod params {
    pub const CLASS_NAME: &str = "className";
    pub const SOURCE_NAME: &str = "sourceName";
    pub const SINK_NAME: &str = "sinkName";
    pub const DOMAIN_NAME: &str = "domainName";
    pub const GATEWAY_NAME: &str = "gatewayName";
    pub const CONNECTION_NAME: &str = "connectionName";
    pub const CONNECTION_STATE: &str = "connectionState";
    pub const MAIN_VOLUME: &str = "mainVolume";
    pub const MAIN_VOLUME_STEP: &str = "mainVolumeStep";
    pub const VOLUME: &str = "volume";
    pub const LIMIT_VOLUME: &str = "limitVolume";
    pub const LIMIT_STATE: &str = "limitState";
    pub const MUTE_STATE: &str = "muteState";
    pub const PROPERTY_TYPE: &str = "propertyType";
    pub const PROPERTY_VALUE: &str = "propertyValue";
    pub const LIST_MAIN_SOUND_PROPERTIES: &str = "listMainSoundProperties";
    pub const LIST_SYSTEM_PROPERTIES: &str = "listSystemProperties";
    pub const NOTIFICATION_TYPE: &str = "notificationType";
    pub const NOTIFICATION_STATUS: &str = "notificationStatus";
    pub const NOTIFICATION_PARAM: &str = "notificationParam";
    pub const LIST_SINKS: &str = "listSinks";
    pub const LIST_SOURCES: &str = "listSources";
    pub const LIST_GATEWAYS: &str = "listGateways";
    pub const ORDER: &str = "order";
    pub const EXCEPT_SOURCE: &str = "exceptSource";
    pub const EXCEPT_SINK: &str = "exceptSink";
    pub const DEBUG_TYPE: &str = "debugType";
    pub const DEBUG_VALUE: &str = "debugValue";
}

/// A fully resolved action: every parameter is plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Operation to perform
    #[serde(rename = "type")]
    pub kind: ActionKind,

    /// Parameter name to resolved value
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Action {
    /// Create an action without parameters
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter setter
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Look up a parameter value
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Whether any of `keys` is present
    pub fn has_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|key| self.params.contains_key(*key))
    }

    /// Insert `value` under `key` unless the key is already present
    pub fn set_default(&mut self, key: &str, value: impl Into<String>) {
        self.params
            .entry(key.to_string())
            .or_insert_with(|| value.into());
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for (key, value) in &self.params {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_defaults_do_not_override() {
        let mut action = Action::new(ActionKind::Mute).with(params::SINK_NAME, "Speaker");
        action.set_default(params::SINK_NAME, "Headphones");
        action.set_default(params::MUTE_STATE, "1");

        assert_eq!(action.param(params::SINK_NAME), Some("Speaker"));
        assert_eq!(action.param(params::MUTE_STATE), Some("1"));
        assert!(action.has_any(&[params::CLASS_NAME, params::SINK_NAME]));
    }

    #[test]
    fn test_action_json() {
        let json = r#"{"type": "set_volume", "params": {"sinkName": "Speaker", "mainVolume": "20"}}"#;
        let action: Action = serde_json::from_str(json).unwrap();
        assert_eq!(action.kind, ActionKind::SetVolume);
        assert_eq!(action.to_string(), "set_volume mainVolume=20 sinkName=Speaker");
    }
}
