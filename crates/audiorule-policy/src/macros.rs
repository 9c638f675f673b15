//! `REQ_*` macro substitution
//!
//! Action parameters and call arguments may reference fields of the current
//! trigger through fixed `REQ_*` tokens. Tokens the trigger cannot supply,
//! and unknown `REQ_*` words, are left in place and logged.

use aho_corasick::{AhoCorasick, MatchKind};
use audiorule_core::{Error, Result};
use tracing::warn;

use crate::trigger::Trigger;

/// A trigger field addressable from expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Macro {
    SinkName,
    SourceName,
    DomainName,
    ClassName,
    GatewayName,
    ConnectionName,
    ConnectionState,
    Status,
    MainVolume,
    IsVolumeStep,
    MuteState,
    Availability,
    AvailabilityReason,
    InterruptState,
    PropertyType,
    PropertyValue,
    SystemPropertyType,
    SystemPropertyValue,
    NotificationType,
    NotificationValue,
    NotificationConfigType,
    NotificationConfigStatus,
    NotificationConfigParam,
}

impl Macro {
    pub const ALL: [Macro; 23] = [
        Macro::SinkName,
        Macro::SourceName,
        Macro::DomainName,
        Macro::ClassName,
        Macro::GatewayName,
        Macro::ConnectionName,
        Macro::ConnectionState,
        Macro::Status,
        Macro::MainVolume,
        Macro::IsVolumeStep,
        Macro::MuteState,
        Macro::Availability,
        Macro::AvailabilityReason,
        Macro::InterruptState,
        Macro::PropertyType,
        Macro::PropertyValue,
        Macro::SystemPropertyType,
        Macro::SystemPropertyValue,
        Macro::NotificationType,
        Macro::NotificationValue,
        Macro::NotificationConfigType,
        Macro::NotificationConfigStatus,
        Macro::NotificationConfigParam,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Macro::SinkName => "REQ_SINK_NAME",
            Macro::SourceName => "REQ_SOURCE_NAME",
            Macro::DomainName => "REQ_DOMAIN_NAME",
            Macro::ClassName => "REQ_CLASS_NAME",
            Macro::GatewayName => "REQ_GATEWAY_NAME",
            Macro::ConnectionName => "REQ_CONNECTION_NAME",
            Macro::ConnectionState => "REQ_CONNECTION_STATE",
            Macro::Status => "REQ_STATUS",
            Macro::MainVolume => "REQ_MAIN_VOLUME",
            Macro::IsVolumeStep => "REQ_IS_VOLUME_STEP",
            Macro::MuteState => "REQ_MUTE_STATE",
            Macro::Availability => "REQ_AVAILABILITY",
            Macro::AvailabilityReason => "REQ_AVAILABILITY_REASON",
            Macro::InterruptState => "REQ_INTERRUPT_STATE",
            Macro::PropertyType => "REQ_PROPERTY_TYPE",
            Macro::PropertyValue => "REQ_PROPERTY_VALUE",
            Macro::SystemPropertyType => "REQ_SYSTEM_PROPERTY_TYPE",
            Macro::SystemPropertyValue => "REQ_SYSTEM_PROPERTY_VALUE",
            Macro::NotificationType => "REQ_NOTIFICATION_TYPE",
            Macro::NotificationValue => "REQ_NOTIFICATION_VALUE",
            Macro::NotificationConfigType => "REQ_NOTIFICATION_CONFIG_TYPE",
            Macro::NotificationConfigStatus => "REQ_NOTIFICATION_CONFIG_STATUS",
            Macro::NotificationConfigParam => "REQ_NOTIFICATION_CONFIG_PARAM",
        }
    }

    /// Textual value of the field in `trigger`, if the trigger carries it
    pub fn value(self, trigger: &Trigger) -> Option<String> {
        let first_property = trigger.main_sound_properties().first().copied();
        let first_system = trigger.system_properties().first().copied();
        match self {
            Macro::SinkName => trigger.sink_name().map(str::to_string),
            Macro::SourceName => trigger.source_name().map(str::to_string),
            Macro::DomainName => trigger.domain_name().map(str::to_string),
            Macro::ClassName => trigger.class_name().map(str::to_string),
            Macro::GatewayName => trigger.gateway_name().map(str::to_string),
            Macro::ConnectionName => trigger.connection_name(),
            Macro::ConnectionState => trigger.connection_state().map(|s| s.code().to_string()),
            Macro::Status => trigger.status().map(|s| s.code().to_string()),
            Macro::MainVolume => trigger.main_volume().map(|v| v.to_string()),
            Macro::IsVolumeStep => trigger
                .is_volume_step()
                .map(audiorule_core::symbols::bool_text),
            Macro::MuteState => trigger.mute_state().map(|m| m.code().to_string()),
            Macro::Availability => trigger.availability().map(|a| a.state.code().to_string()),
            Macro::AvailabilityReason => trigger.availability().map(|a| a.reason.to_string()),
            Macro::InterruptState => trigger.interrupt_state().map(|s| s.code().to_string()),
            Macro::PropertyType => first_property.map(|p| p.property_type.to_string()),
            Macro::PropertyValue => first_property.map(|p| p.value.to_string()),
            Macro::SystemPropertyType => first_system.map(|p| p.property_type.to_string()),
            Macro::SystemPropertyValue => first_system.map(|p| p.value.to_string()),
            Macro::NotificationType => trigger
                .notification_payload()
                .map(|p| p.notification_type.to_string()),
            Macro::NotificationValue => trigger.notification_payload().map(|p| p.value.to_string()),
            Macro::NotificationConfigType => trigger
                .notification_configuration()
                .map(|c| c.notification_type.to_string()),
            Macro::NotificationConfigStatus => trigger
                .notification_configuration()
                .map(|c| c.status.code().to_string()),
            Macro::NotificationConfigParam => trigger
                .notification_configuration()
                .map(|c| c.parameter.to_string()),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replaces `REQ_*` tokens with trigger fields
#[derive(Debug, Clone)]
pub struct MacroExpander {
    matcher: AhoCorasick,
}

impl MacroExpander {
    pub fn new() -> Result<Self> {
        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(Macro::ALL.iter().map(|m| m.token()))
            .map_err(|e| Error::internal(format!("failed to build macro matcher: {}", e)))?;
        Ok(Self { matcher })
    }

    /// Whether `text` mentions any `REQ_*` word at all
    pub fn mentions_macro(text: &str) -> bool {
        text.contains("REQ_")
    }

    /// Substitute every known token the trigger can supply
    pub fn expand(&self, text: &str, trigger: &Trigger) -> String {
        if !Self::mentions_macro(text) {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for m in self.matcher.find_iter(text) {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            if before.is_some_and(is_word_char) || after.is_some_and(is_word_char) {
                continue;
            }
            let token = Macro::ALL[m.pattern().as_usize()];
            out.push_str(&text[last..m.start()]);
            match token.value(trigger) {
                Some(value) => out.push_str(&value),
                None => {
                    warn!(token = token.token(), trigger = %trigger.kind(), "macro not available for trigger");
                    out.push_str(token.token());
                }
            }
            last = m.end();
        }
        out.push_str(&text[last..]);

        for word in unknown_tokens(&out) {
            warn!(token = word, "unknown macro left unresolved");
        }
        out
    }
}

/// `REQ_*` words that are not in the macro table
fn unknown_tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !is_word_char(c))
        .filter(|word| word.starts_with("REQ_"))
        .filter(|word| !Macro::ALL.iter().any(|m| m.token() == *word))
        .collect()
}
