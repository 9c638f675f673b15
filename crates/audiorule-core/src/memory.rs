//! In-memory runtime
//!
//! A self-contained implementation of [`Runtime`](crate::runtime::Runtime)
//! holding the audio graph in plain collections. Used by the simulator and
//! by tests; scenario files deserialize straight into [`RuntimeState`].

use crate::action::{params, Action, ActionKind};
use crate::error::{Error, Result};
use crate::runtime::{ActionSink, ConnectionFilter, ConnectionOrder, RuntimeView};
use crate::types::{
    Availability, ConnectionState, ElementKind, InterruptState, MainConnection, MuteState,
    NotificationConfiguration, Origin, Property,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Registered sink, source or gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementState {
    pub name: String,

    /// Owning (for gateways: controlling) domain
    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub class: String,

    #[serde(default)]
    pub availability: Availability,

    #[serde(default)]
    pub volume: i16,

    #[serde(default)]
    pub main_volume: i16,

    #[serde(default)]
    pub volume_limit: Option<i16>,

    #[serde(default)]
    pub mute_state: MuteState,

    #[serde(default)]
    pub interrupt_state: InterruptState,

    /// Source state code
    #[serde(default)]
    pub state: i16,

    #[serde(default)]
    pub main_sound_properties: Vec<Property>,

    #[serde(default)]
    pub sound_properties: Vec<Property>,

    #[serde(default)]
    pub notification_configurations: Vec<NotificationConfiguration>,

    #[serde(default)]
    pub main_notification_configurations: Vec<NotificationConfiguration>,
}

impl ElementState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn in_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }
}

/// Registered routing domain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainEntry {
    pub name: String,

    /// Domain state code
    #[serde(default)]
    pub state: i16,

    #[serde(default)]
    pub registration_complete: bool,
}

/// Snapshot of the whole audio graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeState {
    #[serde(default)]
    pub domains: Vec<DomainEntry>,

    #[serde(default)]
    pub sinks: Vec<ElementState>,

    #[serde(default)]
    pub sources: Vec<ElementState>,

    #[serde(default)]
    pub gateways: Vec<ElementState>,

    #[serde(default)]
    pub classes: Vec<String>,

    /// Main connections, oldest first
    #[serde(default)]
    pub connections: Vec<MainConnection>,

    #[serde(default)]
    pub system_properties: Vec<Property>,
}

impl RuntimeState {
    fn elements(&self, kind: ElementKind) -> &[ElementState] {
        match kind {
            ElementKind::Sink => &self.sinks,
            ElementKind::Source => &self.sources,
            ElementKind::Gateway => &self.gateways,
            _ => &[],
        }
    }

    fn elements_mut(&mut self, kind: ElementKind) -> Option<&mut Vec<ElementState>> {
        match kind {
            ElementKind::Sink => Some(&mut self.sinks),
            ElementKind::Source => Some(&mut self.sources),
            ElementKind::Gateway => Some(&mut self.gateways),
            _ => None,
        }
    }

    fn element(&self, kind: ElementKind, name: &str) -> Option<&ElementState> {
        self.elements(kind).iter().find(|e| e.name == name)
    }

    fn element_mut(&mut self, kind: ElementKind, name: &str) -> Option<&mut ElementState> {
        self.elements_mut(kind)?.iter_mut().find(|e| e.name == name)
    }
}

/// One action list received through [`ActionSink::set_list_actions`]
#[derive(Debug, Clone, Serialize)]
pub struct DeliveredList {
    pub origin: Origin,
    pub actions: Vec<Action>,
}

/// Runtime backed by an in-memory [`RuntimeState`]
#[derive(Debug, Default)]
pub struct InMemoryRuntime {
    state: RwLock<RuntimeState>,
    delivered: Mutex<Vec<DeliveredList>>,
    fail_delivery: AtomicBool,
}

impl InMemoryRuntime {
    pub fn new(state: RuntimeState) -> Self {
        Self {
            state: RwLock::new(state),
            delivered: Mutex::new(Vec::new()),
            fail_delivery: AtomicBool::new(false),
        }
    }

    /// Mutate the graph in place
    pub fn update(&self, f: impl FnOnce(&mut RuntimeState)) {
        f(&mut self.state.write());
    }

    /// Copy of the current graph
    pub fn snapshot(&self) -> RuntimeState {
        self.state.read().clone()
    }

    /// All lists delivered so far
    pub fn delivered(&self) -> Vec<DeliveredList> {
        self.delivered.lock().clone()
    }

    /// Drain the delivered lists
    pub fn take_delivered(&self) -> Vec<DeliveredList> {
        std::mem::take(&mut *self.delivered.lock())
    }

    /// Make subsequent deliveries fail
    pub fn set_fail_delivery(&self, fail: bool) {
        self.fail_delivery.store(fail, Ordering::Relaxed);
    }

    /// Apply the graph-changing subset of `actions` to the stored state
    pub fn apply(&self, actions: &[Action]) {
        let mut state = self.state.write();
        for action in actions {
            apply_action(&mut state, action);
        }
    }
}

fn apply_action(state: &mut RuntimeState, action: &Action) {
    match action.kind {
        ActionKind::Connect => {
            let (Some(source), Some(sink)) = (
                action.param(params::SOURCE_NAME),
                action.param(params::SINK_NAME),
            ) else {
                warn!(action = %action, "connect without source and sink");
                return;
            };
            let name = MainConnection::compose_name(source, sink);
            if state.connections.iter().any(|c| c.name == name) {
                return;
            }
            let class = action.param(params::CLASS_NAME).unwrap_or_default();
            state.connections.push(MainConnection::new(source, sink, class));
        }
        ActionKind::Disconnect => {
            let name = action
                .param(params::CONNECTION_NAME)
                .map(str::to_string)
                .or_else(|| {
                    let source = action.param(params::SOURCE_NAME)?;
                    let sink = action.param(params::SINK_NAME)?;
                    Some(MainConnection::compose_name(source, sink))
                });
            if let Some(name) = name {
                state.connections.retain(|c| c.name != name);
            }
        }
        ActionKind::Suspend | ActionKind::Resume => {
            let target = if action.kind == ActionKind::Suspend {
                ConnectionState::Suspended
            } else {
                ConnectionState::Connected
            };
            if let Some(name) = action.param(params::CONNECTION_NAME) {
                for conn in state.connections.iter_mut().filter(|c| c.name == name) {
                    conn.state = target;
                }
            }
        }
        ActionKind::Mute | ActionKind::Unmute => {
            let mute = if action.kind == ActionKind::Mute {
                MuteState::Muted
            } else {
                MuteState::Unmuted
            };
            if let Some(sink) = action
                .param(params::SINK_NAME)
                .and_then(|name| state.element_mut(ElementKind::Sink, name))
            {
                sink.mute_state = mute;
            }
        }
        ActionKind::SetVolume => {
            let Some(sink) = action
                .param(params::SINK_NAME)
                .and_then(|name| state.element_mut(ElementKind::Sink, name))
            else {
                return;
            };
            if let Some(volume) = action.param(params::MAIN_VOLUME).and_then(|v| v.parse().ok()) {
                sink.main_volume = volume;
            } else if let Some(step) = action
                .param(params::MAIN_VOLUME_STEP)
                .and_then(|v| v.parse::<i16>().ok())
            {
                sink.main_volume = sink.main_volume.saturating_add(step);
            }
        }
        ActionKind::Limit | ActionKind::Unlimit => {
            let limit = match action.kind {
                ActionKind::Limit => action.param(params::LIMIT_VOLUME).and_then(|v| v.parse().ok()),
                _ => None,
            };
            if let Some(sink) = action
                .param(params::SINK_NAME)
                .and_then(|name| state.element_mut(ElementKind::Sink, name))
            {
                sink.volume_limit = limit;
            }
        }
        ActionKind::Register => {
            let domain = action.param(params::DOMAIN_NAME).unwrap_or_default().to_string();
            for (key, kind) in [
                (params::LIST_SINKS, ElementKind::Sink),
                (params::LIST_SOURCES, ElementKind::Source),
                (params::LIST_GATEWAYS, ElementKind::Gateway),
            ] {
                let names: Vec<String> = action
                    .param(key)
                    .map(|list| list.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default();
                for name in names {
                    if state.element(kind, &name).is_some() {
                        continue;
                    }
                    if let Some(list) = state.elements_mut(kind) {
                        list.push(ElementState::new(name).in_domain(domain.clone()));
                    }
                }
            }
        }
        _ => debug!(action = %action, "action has no effect on the in-memory graph"),
    }
}

impl RuntimeView for InMemoryRuntime {
    fn is_registered(&self, kind: ElementKind, name: &str) -> bool {
        let state = self.state.read();
        match kind {
            ElementKind::Domain => state.domains.iter().any(|d| d.name == name),
            ElementKind::Class => state.classes.iter().any(|c| c == name),
            ElementKind::Connection => state.connections.iter().any(|c| c.name == name),
            _ => state.element(kind, name).is_some(),
        }
    }

    fn registered_names(&self, kind: ElementKind) -> Vec<String> {
        let state = self.state.read();
        match kind {
            ElementKind::Domain => state.domains.iter().map(|d| d.name.clone()).collect(),
            ElementKind::Class => state.classes.clone(),
            ElementKind::Connection => state.connections.iter().map(|c| c.name.clone()).collect(),
            _ => state.elements(kind).iter().map(|e| e.name.clone()).collect(),
        }
    }

    fn domain_elements(&self, domain: &str, kind: ElementKind) -> Vec<String> {
        self.state
            .read()
            .elements(kind)
            .iter()
            .filter(|e| e.domain == domain)
            .map(|e| e.name.clone())
            .collect()
    }

    fn class_of(&self, kind: ElementKind, name: &str) -> Option<String> {
        self.state
            .read()
            .element(kind, name)
            .filter(|e| !e.class.is_empty())
            .map(|e| e.class.clone())
    }

    fn availability(&self, kind: ElementKind, name: &str) -> Option<Availability> {
        self.state.read().element(kind, name).map(|e| e.availability)
    }

    fn mute_state(&self, sink: &str) -> Option<MuteState> {
        self.state.read().element(ElementKind::Sink, sink).map(|e| e.mute_state)
    }

    fn interrupt_state(&self, source: &str) -> Option<InterruptState> {
        self.state
            .read()
            .element(ElementKind::Source, source)
            .map(|e| e.interrupt_state)
    }

    fn state(&self, kind: ElementKind, name: &str) -> Option<i16> {
        let state = self.state.read();
        match kind {
            ElementKind::Domain => state.domains.iter().find(|d| d.name == name).map(|d| d.state),
            _ => state.element(kind, name).map(|e| e.state),
        }
    }

    fn main_sound_property(&self, kind: ElementKind, name: &str, property_type: i16) -> Option<i16> {
        self.state
            .read()
            .element(kind, name)?
            .main_sound_properties
            .iter()
            .find(|p| p.property_type == property_type)
            .map(|p| p.value)
    }

    fn main_sound_properties(&self, kind: ElementKind, name: &str) -> Vec<Property> {
        self.state
            .read()
            .element(kind, name)
            .map(|e| e.main_sound_properties.clone())
            .unwrap_or_default()
    }

    fn sound_property(&self, kind: ElementKind, name: &str, property_type: i16) -> Option<i16> {
        self.state
            .read()
            .element(kind, name)?
            .sound_properties
            .iter()
            .find(|p| p.property_type == property_type)
            .map(|p| p.value)
    }

    fn volume(&self, kind: ElementKind, name: &str) -> Option<i16> {
        self.state.read().element(kind, name).map(|e| e.volume)
    }

    fn main_volume(&self, sink: &str) -> Option<i16> {
        self.state.read().element(ElementKind::Sink, sink).map(|e| e.main_volume)
    }

    fn volume_limit(&self, kind: ElementKind, name: &str) -> Option<i16> {
        self.state.read().element(kind, name)?.volume_limit
    }

    fn system_property(&self, property_type: i16) -> Option<i16> {
        self.state
            .read()
            .system_properties
            .iter()
            .find(|p| p.property_type == property_type)
            .map(|p| p.value)
    }

    fn system_properties(&self) -> Vec<Property> {
        self.state.read().system_properties.clone()
    }

    fn main_connections(&self, filter: &ConnectionFilter, order: ConnectionOrder) -> Vec<MainConnection> {
        let mut list: Vec<MainConnection> = self
            .state
            .read()
            .connections
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        order.apply(&mut list);
        list
    }

    fn notification_configurations(&self, kind: ElementKind, name: &str) -> Vec<NotificationConfiguration> {
        self.state
            .read()
            .element(kind, name)
            .map(|e| e.notification_configurations.clone())
            .unwrap_or_default()
    }

    fn main_notification_configurations(
        &self,
        kind: ElementKind,
        name: &str,
    ) -> Vec<NotificationConfiguration> {
        self.state
            .read()
            .element(kind, name)
            .map(|e| e.main_notification_configurations.clone())
            .unwrap_or_default()
    }

    fn is_domain_registration_complete(&self, domain: &str) -> bool {
        self.state
            .read()
            .domains
            .iter()
            .any(|d| d.name == domain && d.registration_complete)
    }
}

impl ActionSink for InMemoryRuntime {
    fn set_list_actions(&self, actions: Vec<Action>, origin: Origin) -> Result<()> {
        if self.fail_delivery.load(Ordering::Relaxed) {
            return Err(Error::runtime("action list rejected"));
        }
        debug!(origin = origin.as_str(), count = actions.len(), "received action list");
        self.delivered.lock().push(DeliveredList { origin, actions });
        Ok(())
    }
}
