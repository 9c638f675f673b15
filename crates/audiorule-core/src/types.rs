//! Core audio-graph types shared by the controller and its runtime
//!
//! State enums carry the numeric codes used on the wire between the
//! controller and the routing runtime. Their symbolic spellings (`MS_MUTED`,
//! `CS_CONNECTED`, ...) are resolved by [`crate::symbols`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of element in the audio graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Sink,
    Source,
    Domain,
    Gateway,
    Class,
    Connection,
}

impl ElementKind {
    /// Lowercase name used in logs and messages
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Sink => "sink",
            ElementKind::Source => "source",
            ElementKind::Domain => "domain",
            ElementKind::Gateway => "gateway",
            ElementKind::Class => "class",
            ElementKind::Connection => "connection",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a trigger (and the action list it produces) originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Requests coming from a user-facing command interface
    User,
    /// Notifications coming from routing domains
    System,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::User => "user",
            Origin::System => "system",
        }
    }
}

/// Availability state of a sink or source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum AvailabilityState {
    #[default]
    Unknown = 0,
    Available = 1,
    Unavailable = 2,
}

/// Availability of a sink or source together with the reason for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Availability {
    /// Current availability
    #[serde(default)]
    pub state: AvailabilityState,

    /// Reason code (`AR_*`)
    #[serde(default)]
    pub reason: i16,
}

impl Availability {
    pub fn new(state: AvailabilityState, reason: i16) -> Self {
        Self { state, reason }
    }
}

/// Mute state of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum MuteState {
    #[default]
    Unknown = 0,
    Muted = 1,
    Unmuted = 2,
}

/// Interrupt state of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum InterruptState {
    #[default]
    Unknown = 0,
    Off = 1,
    Interrupted = 2,
}

/// State of a main connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ConnectionState {
    #[default]
    Unknown = 0,
    Connecting = 1,
    Connected = 2,
    Disconnecting = 3,
    Disconnected = 4,
    Suspended = 5,
}

/// Volume limit state of a sink or class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum LimitState {
    #[default]
    Unknown = 0,
    Limited = 1,
    Unlimited = 2,
}

/// Status of a notification configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum NotificationStatus {
    #[default]
    Unknown = 0,
    Off = 1,
    Periodic = 2,
    Minimum = 3,
    Maximum = 4,
    Change = 5,
}

/// Result code reported by the routing runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ErrorCode {
    #[default]
    Ok = 0,
    Unknown = 1,
    OutOfRange = 2,
    NotUsed = 3,
    DatabaseError = 4,
    AlreadyExists = 5,
    NoChange = 6,
    NotPossible = 7,
    NonExistent = 8,
    Aborted = 9,
    WrongFormat = 10,
    Communication = 11,
}

macro_rules! impl_code {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                /// Numeric code of this state
                pub fn code(self) -> i16 {
                    self as i16
                }
            }
        )*
    };
}

impl_code!(
    AvailabilityState,
    MuteState,
    InterruptState,
    ConnectionState,
    LimitState,
    NotificationStatus,
    ErrorCode,
);

/// A typed property value (main sound property, sound property or system property)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Property {
    /// Property type identifier
    #[serde(rename = "type")]
    pub property_type: i16,

    /// Property value
    pub value: i16,
}

impl Property {
    pub fn new(property_type: i16, value: i16) -> Self {
        Self {
            property_type,
            value,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.property_type, self.value)
    }
}

/// Render a property list as whitespace-separated `type:value` pairs
pub fn render_properties(properties: &[Property]) -> String {
    properties
        .iter()
        .map(Property::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a list produced by [`render_properties`]
pub fn parse_properties(text: &str) -> Option<Vec<Property>> {
    text.split_whitespace()
        .map(|pair| {
            let (ty, value) = pair.split_once(':')?;
            Some(Property::new(ty.trim().parse().ok()?, value.trim().parse().ok()?))
        })
        .collect()
}

/// Notification payload reported by a sink or source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(rename = "type")]
    pub notification_type: i16,
    pub value: i16,
}

/// Notification configuration of a sink or source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationConfiguration {
    #[serde(rename = "type")]
    pub notification_type: i16,
    #[serde(default)]
    pub status: NotificationStatus,
    #[serde(default)]
    pub parameter: i16,
}

/// A main connection between a source and a sink as seen by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainConnection {
    /// Connection name, conventionally `source:sink`
    pub name: String,

    /// Main source
    pub source: String,

    /// Main sink
    pub sink: String,

    /// Class the connection belongs to
    #[serde(default)]
    pub class: String,

    /// Current connection state
    #[serde(default)]
    pub state: ConnectionState,

    /// Priority within its class (lower value wins)
    #[serde(default)]
    pub priority: i32,

    /// Connection format (`CF_*`)
    #[serde(default)]
    pub format: i16,

    /// Intermediate sinks and sources the route passes through
    #[serde(default)]
    pub route: Vec<String>,
}

impl MainConnection {
    /// Conventional name for the main connection between `source` and `sink`
    pub fn compose_name(source: &str, sink: &str) -> String {
        format!("{}:{}", source, sink)
    }

    /// Create a connected main connection with the conventional name
    pub fn new(source: impl Into<String>, sink: impl Into<String>, class: impl Into<String>) -> Self {
        let source = source.into();
        let sink = sink.into();
        Self {
            name: Self::compose_name(&source, &sink),
            source,
            sink,
            class: class.into(),
            state: ConnectionState::Connected,
            priority: 0,
            format: 0,
            route: Vec::new(),
        }
    }

    /// Whether the connection starts, ends, or passes through `element`
    pub fn touches(&self, element: &str) -> bool {
        self.source == element || self.sink == element || self.route.iter().any(|e| e == element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        assert_eq!(MuteState::Muted.code(), 1);
        assert_eq!(ConnectionState::Suspended.code(), 5);
        assert_eq!(ErrorCode::NotPossible.code(), 7);
    }

    #[test]
    fn test_property_list_format() {
        let props = vec![Property::new(1, 10), Property::new(3, -2)];
        let text = render_properties(&props);
        assert_eq!(text, "1:10 3:-2");
        assert_eq!(parse_properties(&text), Some(props));
        assert_eq!(parse_properties("1:x"), None);
    }

    #[test]
    fn test_main_connection_touches_route() {
        let mut conn = MainConnection::new("Radio", "Amp", "Entertainment");
        conn.route = vec!["GwSink".to_string(), "GwSource".to_string()];
        assert_eq!(conn.name, "Radio:Amp");
        assert!(conn.touches("Radio"));
        assert!(conn.touches("GwSource"));
        assert!(!conn.touches("Speaker"));
    }
}
