//! Interfaces toward the live routing runtime
//!
//! The controller never owns the audio graph. It reads element state through
//! [`RuntimeView`] and hands synthesized action lists to [`ActionSink`].
//! Every value read here is a snapshot valid for the current trigger only.

use crate::action::Action;
use crate::error::Result;
use crate::types::{
    Availability, ElementKind, InterruptState, MainConnection, MuteState,
    NotificationConfiguration, Origin, Property,
};

/// Selection of main connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionFilter {
    /// Every main connection
    All,
    /// Connections with the given name
    Name(String),
    /// Connections belonging to a class
    Class(String),
    /// Connections whose main source is the given source
    Source(String),
    /// Connections whose main sink is the given sink
    Sink(String),
    /// Connections starting at, ending at, or routed through an element
    Element(String),
}

impl ConnectionFilter {
    /// Whether `connection` is selected by this filter
    pub fn matches(&self, connection: &MainConnection) -> bool {
        match self {
            ConnectionFilter::All => true,
            ConnectionFilter::Name(name) => &connection.name == name,
            ConnectionFilter::Class(class) => &connection.class == class,
            ConnectionFilter::Source(source) => &connection.source == source,
            ConnectionFilter::Sink(sink) => &connection.sink == sink,
            ConnectionFilter::Element(element) => connection.touches(element),
        }
    }
}

/// Ordering of a main connection listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionOrder {
    /// Runtime order (oldest first)
    #[default]
    Unordered,
    /// Lowest priority value first
    HighPriority,
    /// Highest priority value first
    LowPriority,
    /// Most recently created first
    Newest,
    /// Least recently created first
    Oldest,
}

impl ConnectionOrder {
    /// Parse an `O_*` ordering token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "O_UNORDERED" => Some(Self::Unordered),
            "O_HIGH_PRIORITY" => Some(Self::HighPriority),
            "O_LOW_PRIORITY" => Some(Self::LowPriority),
            "O_NEWEST" => Some(Self::Newest),
            "O_OLDEST" => Some(Self::Oldest),
            _ => None,
        }
    }

    /// Sort a runtime-ordered (oldest first) listing in place
    pub fn apply(self, connections: &mut Vec<MainConnection>) {
        match self {
            ConnectionOrder::Unordered | ConnectionOrder::Oldest => {}
            ConnectionOrder::Newest => connections.reverse(),
            ConnectionOrder::HighPriority => connections.sort_by_key(|c| c.priority),
            ConnectionOrder::LowPriority => {
                connections.sort_by_key(|c| std::cmp::Reverse(c.priority))
            }
        }
    }
}

/// Read accessors over the live audio graph
pub trait RuntimeView: Send + Sync {
    /// Whether the element is currently registered
    fn is_registered(&self, kind: ElementKind, name: &str) -> bool;

    /// Names of all registered elements of a kind
    fn registered_names(&self, kind: ElementKind) -> Vec<String>;

    /// Names of the registered elements of `kind` owned by `domain`
    fn domain_elements(&self, domain: &str, kind: ElementKind) -> Vec<String>;

    /// Class a registered sink or source was registered with
    fn class_of(&self, kind: ElementKind, name: &str) -> Option<String>;

    fn availability(&self, kind: ElementKind, name: &str) -> Option<Availability>;

    fn mute_state(&self, sink: &str) -> Option<MuteState>;

    fn interrupt_state(&self, source: &str) -> Option<InterruptState>;

    /// Source state (`SS_*`) or domain state (`DS_*`)
    fn state(&self, kind: ElementKind, name: &str) -> Option<i16>;

    fn main_sound_property(&self, kind: ElementKind, name: &str, property_type: i16) -> Option<i16>;

    fn main_sound_properties(&self, kind: ElementKind, name: &str) -> Vec<Property>;

    fn sound_property(&self, kind: ElementKind, name: &str, property_type: i16) -> Option<i16>;

    fn volume(&self, kind: ElementKind, name: &str) -> Option<i16>;

    fn main_volume(&self, sink: &str) -> Option<i16>;

    fn volume_limit(&self, kind: ElementKind, name: &str) -> Option<i16>;

    fn system_property(&self, property_type: i16) -> Option<i16>;

    fn system_properties(&self) -> Vec<Property>;

    /// Main connections selected by `filter`, in the requested order
    fn main_connections(&self, filter: &ConnectionFilter, order: ConnectionOrder) -> Vec<MainConnection>;

    fn notification_configurations(&self, kind: ElementKind, name: &str) -> Vec<NotificationConfiguration>;

    fn main_notification_configurations(
        &self,
        kind: ElementKind,
        name: &str,
    ) -> Vec<NotificationConfiguration>;

    fn is_domain_registration_complete(&self, domain: &str) -> bool;
}

/// Receiver of synthesized action lists
pub trait ActionSink: Send + Sync {
    /// Deliver `actions` for execution. No retry is attempted on failure.
    fn set_list_actions(&self, actions: Vec<Action>, origin: Origin) -> Result<()>;
}

/// Full runtime collaborator: readable graph plus action receiver
pub trait Runtime: RuntimeView + ActionSink {}

impl<T: RuntimeView + ActionSink> Runtime for T {}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(source: &str, sink: &str, priority: i32) -> MainConnection {
        let mut c = MainConnection::new(source, sink, "Base");
        c.priority = priority;
        c
    }

    #[test]
    fn test_order_by_priority_is_stable() {
        let mut list = vec![conn("A", "S", 5), conn("B", "S", 1), conn("C", "S", 5)];
        ConnectionOrder::HighPriority.apply(&mut list);
        let names: Vec<_> = list.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_order_tokens() {
        assert_eq!(ConnectionOrder::from_token("O_NEWEST"), Some(ConnectionOrder::Newest));
        assert_eq!(ConnectionOrder::from_token("newest"), None);
    }

    #[test]
    fn test_filter_matches() {
        let c = conn("Radio", "Speaker", 0);
        assert!(ConnectionFilter::Sink("Speaker".into()).matches(&c));
        assert!(ConnectionFilter::Element("Radio".into()).matches(&c));
        assert!(!ConnectionFilter::Class("Navi".into()).matches(&c));
    }
}
