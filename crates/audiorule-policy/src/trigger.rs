//! Trigger definitions
//!
//! A trigger is one notification about a change in the audio graph. Each
//! variant carries exactly the fields meaningful for its kind.

use audiorule_core::{
    Availability, ConnectionState, ElementKind, ErrorCode, InterruptState, MainConnection,
    MuteState, NotificationConfiguration, NotificationPayload, Origin, Property,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of a trigger, as referenced by policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    UserConnectionRequest,
    UserDisconnectionRequest,
    UserSetSinkMuteState,
    UserSetVolume,
    UserSetSinkMainSoundProperty,
    UserSetSourceMainSoundProperty,
    UserSetSinkMainSoundProperties,
    UserSetSourceMainSoundProperties,
    UserSetSystemProperty,
    UserSetSystemProperties,
    UserSetSinkMainNotificationConfiguration,
    UserSetSourceMainNotificationConfiguration,
    SystemSourceAvailabilityChanged,
    SystemSinkAvailabilityChanged,
    SystemInterruptStateChanged,
    SystemSinkMuteStateChanged,
    SystemSinkMainSoundPropertyChanged,
    SystemSourceMainSoundPropertyChanged,
    SystemSinkVolumeChanged,
    SystemRegisterDomain,
    SystemRegisterSource,
    SystemRegisterSink,
    SystemRegisterGateway,
    SystemDeregisterDomain,
    SystemDeregisterSource,
    SystemDeregisterSink,
    SystemDeregisterGateway,
    SystemDomainRegistrationComplete,
    SystemConnectionStateChange,
    SystemSinkNotificationDataChanged,
    SystemSourceNotificationDataChanged,
    /// Matches every trigger (policy side only)
    Any,
    /// Matches every user-originated trigger (policy side only)
    UserAll,
    /// Matches every system-originated trigger (policy side only)
    SystemAll,
}

impl TriggerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerKind::UserConnectionRequest => "USER_CONNECTION_REQUEST",
            TriggerKind::UserDisconnectionRequest => "USER_DISCONNECTION_REQUEST",
            TriggerKind::UserSetSinkMuteState => "USER_SET_SINK_MUTE_STATE",
            TriggerKind::UserSetVolume => "USER_SET_VOLUME",
            TriggerKind::UserSetSinkMainSoundProperty => "USER_SET_SINK_MAIN_SOUND_PROPERTY",
            TriggerKind::UserSetSourceMainSoundProperty => "USER_SET_SOURCE_MAIN_SOUND_PROPERTY",
            TriggerKind::UserSetSinkMainSoundProperties => "USER_SET_SINK_MAIN_SOUND_PROPERTIES",
            TriggerKind::UserSetSourceMainSoundProperties => "USER_SET_SOURCE_MAIN_SOUND_PROPERTIES",
            TriggerKind::UserSetSystemProperty => "USER_SET_SYSTEM_PROPERTY",
            TriggerKind::UserSetSystemProperties => "USER_SET_SYSTEM_PROPERTIES",
            TriggerKind::UserSetSinkMainNotificationConfiguration => {
                "USER_SET_SINK_MAIN_NOTIFICATION_CONFIGURATION"
            }
            TriggerKind::UserSetSourceMainNotificationConfiguration => {
                "USER_SET_SOURCE_MAIN_NOTIFICATION_CONFIGURATION"
            }
            TriggerKind::SystemSourceAvailabilityChanged => "SYSTEM_SOURCE_AVAILABILITY_CHANGED",
            TriggerKind::SystemSinkAvailabilityChanged => "SYSTEM_SINK_AVAILABILITY_CHANGED",
            TriggerKind::SystemInterruptStateChanged => "SYSTEM_INTERRUPT_STATE_CHANGED",
            TriggerKind::SystemSinkMuteStateChanged => "SYSTEM_SINK_MUTE_STATE_CHANGED",
            TriggerKind::SystemSinkMainSoundPropertyChanged => {
                "SYSTEM_SINK_MAIN_SOUND_PROPERTY_CHANGED"
            }
            TriggerKind::SystemSourceMainSoundPropertyChanged => {
                "SYSTEM_SOURCE_MAIN_SOUND_PROPERTY_CHANGED"
            }
            TriggerKind::SystemSinkVolumeChanged => "SYSTEM_SINK_VOLUME_CHANGED",
            TriggerKind::SystemRegisterDomain => "SYSTEM_REGISTER_DOMAIN",
            TriggerKind::SystemRegisterSource => "SYSTEM_REGISTER_SOURCE",
            TriggerKind::SystemRegisterSink => "SYSTEM_REGISTER_SINK",
            TriggerKind::SystemRegisterGateway => "SYSTEM_REGISTER_GATEWAY",
            TriggerKind::SystemDeregisterDomain => "SYSTEM_DEREGISTER_DOMAIN",
            TriggerKind::SystemDeregisterSource => "SYSTEM_DEREGISTER_SOURCE",
            TriggerKind::SystemDeregisterSink => "SYSTEM_DEREGISTER_SINK",
            TriggerKind::SystemDeregisterGateway => "SYSTEM_DEREGISTER_GATEWAY",
            TriggerKind::SystemDomainRegistrationComplete => "SYSTEM_DOMAIN_REGISTRATION_COMPLETE",
            TriggerKind::SystemConnectionStateChange => "SYSTEM_CONNECTION_STATE_CHANGE",
            TriggerKind::SystemSinkNotificationDataChanged => "SYSTEM_SINK_NOTIFICATION_DATA_CHANGED",
            TriggerKind::SystemSourceNotificationDataChanged => {
                "SYSTEM_SOURCE_NOTIFICATION_DATA_CHANGED"
            }
            TriggerKind::Any => "ANY",
            TriggerKind::UserAll => "USER_ALL",
            TriggerKind::SystemAll => "SYSTEM_ALL",
        }
    }

    /// Who raises triggers of this kind; `None` for catch-alls
    pub fn origin(self) -> Option<Origin> {
        match self {
            TriggerKind::Any | TriggerKind::UserAll | TriggerKind::SystemAll => None,
            kind if kind.as_str().starts_with("USER_") => Some(Origin::User),
            _ => Some(Origin::System),
        }
    }

    /// Whether a policy declared for `self` reacts to a trigger of `kind`
    pub fn covers(self, kind: TriggerKind) -> bool {
        match self {
            TriggerKind::Any => true,
            TriggerKind::UserAll => kind.origin() == Some(Origin::User),
            TriggerKind::SystemAll => kind.origin() == Some(Origin::System),
            declared => declared == kind,
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single event delivered to the policy engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trigger {
    UserConnectionRequest {
        source_name: String,
        sink_name: String,
        #[serde(default)]
        class_name: Option<String>,
    },
    UserDisconnectionRequest {
        source_name: String,
        sink_name: String,
        #[serde(default)]
        class_name: Option<String>,
    },
    UserSetSinkMuteState {
        sink_name: String,
        mute_state: MuteState,
    },
    UserSetVolume {
        sink_name: String,
        volume: i16,
        /// Volume is relative to the current main volume
        #[serde(default)]
        is_step: bool,
    },
    UserSetSinkMainSoundProperty {
        sink_name: String,
        property: Property,
    },
    UserSetSourceMainSoundProperty {
        source_name: String,
        property: Property,
    },
    UserSetSinkMainSoundProperties {
        sink_name: String,
        properties: Vec<Property>,
    },
    UserSetSourceMainSoundProperties {
        source_name: String,
        properties: Vec<Property>,
    },
    UserSetSystemProperty {
        property: Property,
    },
    UserSetSystemProperties {
        properties: Vec<Property>,
    },
    UserSetSinkMainNotificationConfiguration {
        sink_name: String,
        configuration: NotificationConfiguration,
    },
    UserSetSourceMainNotificationConfiguration {
        source_name: String,
        configuration: NotificationConfiguration,
    },
    SystemSourceAvailabilityChanged {
        source_name: String,
        availability: Availability,
        /// Filled by the engine from the configuration
        #[serde(default)]
        class_name: Option<String>,
    },
    SystemSinkAvailabilityChanged {
        sink_name: String,
        availability: Availability,
        /// Filled by the engine from the configuration
        #[serde(default)]
        class_name: Option<String>,
    },
    SystemInterruptStateChanged {
        source_name: String,
        interrupt_state: InterruptState,
    },
    SystemSinkMuteStateChanged {
        sink_name: String,
        mute_state: MuteState,
    },
    SystemSinkMainSoundPropertyChanged {
        sink_name: String,
        property: Property,
    },
    SystemSourceMainSoundPropertyChanged {
        source_name: String,
        property: Property,
    },
    SystemSinkVolumeChanged {
        sink_name: String,
        volume: i16,
    },
    SystemRegisterDomain {
        domain_name: String,
    },
    SystemRegisterSource {
        source_name: String,
    },
    SystemRegisterSink {
        sink_name: String,
    },
    SystemRegisterGateway {
        gateway_name: String,
    },
    SystemDeregisterDomain {
        domain_name: String,
    },
    SystemDeregisterSource {
        source_name: String,
    },
    SystemDeregisterSink {
        sink_name: String,
    },
    SystemDeregisterGateway {
        gateway_name: String,
    },
    SystemDomainRegistrationComplete {
        domain_name: String,
    },
    SystemConnectionStateChange {
        connection_name: String,
        connection_state: ConnectionState,
        #[serde(default)]
        status: ErrorCode,
    },
    SystemSinkNotificationDataChanged {
        sink_name: String,
        payload: NotificationPayload,
    },
    SystemSourceNotificationDataChanged {
        source_name: String,
        payload: NotificationPayload,
    },
}

impl Trigger {
    /// Discriminant of this trigger
    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::UserConnectionRequest { .. } => TriggerKind::UserConnectionRequest,
            Trigger::UserDisconnectionRequest { .. } => TriggerKind::UserDisconnectionRequest,
            Trigger::UserSetSinkMuteState { .. } => TriggerKind::UserSetSinkMuteState,
            Trigger::UserSetVolume { .. } => TriggerKind::UserSetVolume,
            Trigger::UserSetSinkMainSoundProperty { .. } => TriggerKind::UserSetSinkMainSoundProperty,
            Trigger::UserSetSourceMainSoundProperty { .. } => {
                TriggerKind::UserSetSourceMainSoundProperty
            }
            Trigger::UserSetSinkMainSoundProperties { .. } => {
                TriggerKind::UserSetSinkMainSoundProperties
            }
            Trigger::UserSetSourceMainSoundProperties { .. } => {
                TriggerKind::UserSetSourceMainSoundProperties
            }
            Trigger::UserSetSystemProperty { .. } => TriggerKind::UserSetSystemProperty,
            Trigger::UserSetSystemProperties { .. } => TriggerKind::UserSetSystemProperties,
            Trigger::UserSetSinkMainNotificationConfiguration { .. } => {
                TriggerKind::UserSetSinkMainNotificationConfiguration
            }
            Trigger::UserSetSourceMainNotificationConfiguration { .. } => {
                TriggerKind::UserSetSourceMainNotificationConfiguration
            }
            Trigger::SystemSourceAvailabilityChanged { .. } => {
                TriggerKind::SystemSourceAvailabilityChanged
            }
            Trigger::SystemSinkAvailabilityChanged { .. } => TriggerKind::SystemSinkAvailabilityChanged,
            Trigger::SystemInterruptStateChanged { .. } => TriggerKind::SystemInterruptStateChanged,
            Trigger::SystemSinkMuteStateChanged { .. } => TriggerKind::SystemSinkMuteStateChanged,
            Trigger::SystemSinkMainSoundPropertyChanged { .. } => {
                TriggerKind::SystemSinkMainSoundPropertyChanged
            }
            Trigger::SystemSourceMainSoundPropertyChanged { .. } => {
                TriggerKind::SystemSourceMainSoundPropertyChanged
            }
            Trigger::SystemSinkVolumeChanged { .. } => TriggerKind::SystemSinkVolumeChanged,
            Trigger::SystemRegisterDomain { .. } => TriggerKind::SystemRegisterDomain,
            Trigger::SystemRegisterSource { .. } => TriggerKind::SystemRegisterSource,
            Trigger::SystemRegisterSink { .. } => TriggerKind::SystemRegisterSink,
            Trigger::SystemRegisterGateway { .. } => TriggerKind::SystemRegisterGateway,
            Trigger::SystemDeregisterDomain { .. } => TriggerKind::SystemDeregisterDomain,
            Trigger::SystemDeregisterSource { .. } => TriggerKind::SystemDeregisterSource,
            Trigger::SystemDeregisterSink { .. } => TriggerKind::SystemDeregisterSink,
            Trigger::SystemDeregisterGateway { .. } => TriggerKind::SystemDeregisterGateway,
            Trigger::SystemDomainRegistrationComplete { .. } => {
                TriggerKind::SystemDomainRegistrationComplete
            }
            Trigger::SystemConnectionStateChange { .. } => TriggerKind::SystemConnectionStateChange,
            Trigger::SystemSinkNotificationDataChanged { .. } => {
                TriggerKind::SystemSinkNotificationDataChanged
            }
            Trigger::SystemSourceNotificationDataChanged { .. } => {
                TriggerKind::SystemSourceNotificationDataChanged
            }
        }
    }

    /// Whether the trigger came from a user or from the system
    pub fn origin(&self) -> Origin {
        self.kind().origin().unwrap_or(Origin::System)
    }

    pub fn sink_name(&self) -> Option<&str> {
        match self {
            Trigger::UserConnectionRequest { sink_name, .. }
            | Trigger::UserDisconnectionRequest { sink_name, .. }
            | Trigger::UserSetSinkMuteState { sink_name, .. }
            | Trigger::UserSetVolume { sink_name, .. }
            | Trigger::UserSetSinkMainSoundProperty { sink_name, .. }
            | Trigger::UserSetSinkMainSoundProperties { sink_name, .. }
            | Trigger::UserSetSinkMainNotificationConfiguration { sink_name, .. }
            | Trigger::SystemSinkAvailabilityChanged { sink_name, .. }
            | Trigger::SystemSinkMuteStateChanged { sink_name, .. }
            | Trigger::SystemSinkMainSoundPropertyChanged { sink_name, .. }
            | Trigger::SystemSinkVolumeChanged { sink_name, .. }
            | Trigger::SystemRegisterSink { sink_name }
            | Trigger::SystemDeregisterSink { sink_name }
            | Trigger::SystemSinkNotificationDataChanged { sink_name, .. } => Some(sink_name),
            _ => None,
        }
    }

    pub fn source_name(&self) -> Option<&str> {
        match self {
            Trigger::UserConnectionRequest { source_name, .. }
            | Trigger::UserDisconnectionRequest { source_name, .. }
            | Trigger::UserSetSourceMainSoundProperty { source_name, .. }
            | Trigger::UserSetSourceMainSoundProperties { source_name, .. }
            | Trigger::UserSetSourceMainNotificationConfiguration { source_name, .. }
            | Trigger::SystemSourceAvailabilityChanged { source_name, .. }
            | Trigger::SystemInterruptStateChanged { source_name, .. }
            | Trigger::SystemSourceMainSoundPropertyChanged { source_name, .. }
            | Trigger::SystemRegisterSource { source_name }
            | Trigger::SystemDeregisterSource { source_name }
            | Trigger::SystemSourceNotificationDataChanged { source_name, .. } => Some(source_name),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            Trigger::UserConnectionRequest { class_name, .. }
            | Trigger::UserDisconnectionRequest { class_name, .. }
            | Trigger::SystemSourceAvailabilityChanged { class_name, .. }
            | Trigger::SystemSinkAvailabilityChanged { class_name, .. } => class_name.as_deref(),
            _ => None,
        }
    }

    /// Fill the class slot of triggers that carry one
    pub fn set_class_name(&mut self, name: impl Into<String>) {
        match self {
            Trigger::UserConnectionRequest { class_name, .. }
            | Trigger::UserDisconnectionRequest { class_name, .. }
            | Trigger::SystemSourceAvailabilityChanged { class_name, .. }
            | Trigger::SystemSinkAvailabilityChanged { class_name, .. } => {
                *class_name = Some(name.into())
            }
            _ => {}
        }
    }

    pub fn domain_name(&self) -> Option<&str> {
        match self {
            Trigger::SystemRegisterDomain { domain_name }
            | Trigger::SystemDeregisterDomain { domain_name }
            | Trigger::SystemDomainRegistrationComplete { domain_name } => Some(domain_name),
            _ => None,
        }
    }

    pub fn gateway_name(&self) -> Option<&str> {
        match self {
            Trigger::SystemRegisterGateway { gateway_name }
            | Trigger::SystemDeregisterGateway { gateway_name } => Some(gateway_name),
            _ => None,
        }
    }

    /// Main connection name; connection requests use the `source:sink` convention
    pub fn connection_name(&self) -> Option<String> {
        match self {
            Trigger::SystemConnectionStateChange {
                connection_name, ..
            } => Some(connection_name.clone()),
            Trigger::UserConnectionRequest {
                source_name,
                sink_name,
                ..
            }
            | Trigger::UserDisconnectionRequest {
                source_name,
                sink_name,
                ..
            } => Some(MainConnection::compose_name(source_name, sink_name)),
            _ => None,
        }
    }

    /// Name of the element of `kind` this trigger refers to
    pub fn element_name(&self, kind: ElementKind) -> Option<String> {
        match kind {
            ElementKind::Sink => self.sink_name().map(str::to_string),
            ElementKind::Source => self.source_name().map(str::to_string),
            ElementKind::Class => self.class_name().map(str::to_string),
            ElementKind::Domain => self.domain_name().map(str::to_string),
            ElementKind::Gateway => self.gateway_name().map(str::to_string),
            ElementKind::Connection => self.connection_name(),
        }
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        match self {
            Trigger::SystemConnectionStateChange {
                connection_state, ..
            } => Some(*connection_state),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<ErrorCode> {
        match self {
            Trigger::SystemConnectionStateChange { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn main_volume(&self) -> Option<i16> {
        match self {
            Trigger::UserSetVolume { volume, .. } | Trigger::SystemSinkVolumeChanged { volume, .. } => {
                Some(*volume)
            }
            _ => None,
        }
    }

    pub fn is_volume_step(&self) -> Option<bool> {
        match self {
            Trigger::UserSetVolume { is_step, .. } => Some(*is_step),
            Trigger::SystemSinkVolumeChanged { .. } => Some(false),
            _ => None,
        }
    }

    /// Main sound properties carried by the trigger (single or list)
    pub fn main_sound_properties(&self) -> &[Property] {
        match self {
            Trigger::UserSetSinkMainSoundProperty { property, .. }
            | Trigger::UserSetSourceMainSoundProperty { property, .. }
            | Trigger::SystemSinkMainSoundPropertyChanged { property, .. }
            | Trigger::SystemSourceMainSoundPropertyChanged { property, .. } => {
                std::slice::from_ref(property)
            }
            Trigger::UserSetSinkMainSoundProperties { properties, .. }
            | Trigger::UserSetSourceMainSoundProperties { properties, .. } => properties,
            _ => &[],
        }
    }

    /// System properties carried by the trigger (single or list)
    pub fn system_properties(&self) -> &[Property] {
        match self {
            Trigger::UserSetSystemProperty { property } => std::slice::from_ref(property),
            Trigger::UserSetSystemProperties { properties } => properties,
            _ => &[],
        }
    }

    pub fn mute_state(&self) -> Option<MuteState> {
        match self {
            Trigger::UserSetSinkMuteState { mute_state, .. }
            | Trigger::SystemSinkMuteStateChanged { mute_state, .. } => Some(*mute_state),
            _ => None,
        }
    }

    pub fn availability(&self) -> Option<Availability> {
        match self {
            Trigger::SystemSourceAvailabilityChanged { availability, .. }
            | Trigger::SystemSinkAvailabilityChanged { availability, .. } => Some(*availability),
            _ => None,
        }
    }

    pub fn interrupt_state(&self) -> Option<InterruptState> {
        match self {
            Trigger::SystemInterruptStateChanged {
                interrupt_state, ..
            } => Some(*interrupt_state),
            _ => None,
        }
    }

    pub fn notification_payload(&self) -> Option<NotificationPayload> {
        match self {
            Trigger::SystemSinkNotificationDataChanged { payload, .. }
            | Trigger::SystemSourceNotificationDataChanged { payload, .. } => Some(*payload),
            _ => None,
        }
    }

    pub fn notification_configuration(&self) -> Option<NotificationConfiguration> {
        match self {
            Trigger::UserSetSinkMainNotificationConfiguration { configuration, .. }
            | Trigger::UserSetSourceMainNotificationConfiguration { configuration, .. } => {
                Some(*configuration)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_yaml() {
        let yaml = r#"
kind: USER_SET_VOLUME
sink_name: Speaker
volume: -3
is_step: true
"#;
        let trigger: Trigger = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(trigger.kind(), TriggerKind::UserSetVolume);
        assert_eq!(trigger.sink_name(), Some("Speaker"));
        assert_eq!(trigger.main_volume(), Some(-3));
        assert_eq!(trigger.is_volume_step(), Some(true));
        assert_eq!(trigger.origin(), Origin::User);
    }

    #[test]
    fn test_catch_all_coverage() {
        assert!(TriggerKind::Any.covers(TriggerKind::SystemRegisterSink));
        assert!(TriggerKind::UserAll.covers(TriggerKind::UserSetVolume));
        assert!(!TriggerKind::UserAll.covers(TriggerKind::SystemRegisterSink));
        assert!(TriggerKind::SystemAll.covers(TriggerKind::SystemRegisterSink));
        assert!(!TriggerKind::UserSetVolume.covers(TriggerKind::UserSetSinkMuteState));
    }

    #[test]
    fn test_class_slot() {
        let mut trigger = Trigger::SystemSinkAvailabilityChanged {
            sink_name: "Speaker".into(),
            availability: Availability::default(),
            class_name: None,
        };
        trigger.set_class_name("Entertainment");
        assert_eq!(trigger.class_name(), Some("Entertainment"));
        assert_eq!(trigger.element_name(ElementKind::Class).as_deref(), Some("Entertainment"));
    }

    #[test]
    fn test_connection_name_convention() {
        let trigger = Trigger::UserConnectionRequest {
            source_name: "Radio".into(),
            sink_name: "Speaker".into(),
            class_name: None,
        };
        assert_eq!(trigger.connection_name().as_deref(), Some("Radio:Speaker"));
        assert!(trigger.main_sound_properties().is_empty());
    }
}
