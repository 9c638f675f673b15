//! Configuration store
//!
//! Immutable, name-indexed access to the statically declared topology
//! (sources, sinks, domains, gateways, classes) and to the policy rules.
//! The store is built once from a [`ControllerConfig`] snapshot and is
//! read-only afterwards.

use audiorule_core::{ElementKind, Error, Property, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use crate::expression::{Condition, Operand};
use crate::function::{Category, Function};
use crate::rule::Policy;
use crate::trigger::TriggerKind;

/// Who registers a declared element with the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Registration {
    /// The owning routing domain registers the element itself
    #[default]
    Domain,
    /// The controller registers the element once its domain is present
    Controller,
}

/// Declared source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDecl {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub registration: Registration,
    /// Templates only serve as defaults for dynamically registered elements
    #[serde(default)]
    pub template: bool,
    #[serde(default)]
    pub main_sound_properties: Vec<Property>,
    #[serde(default)]
    pub connection_formats: Vec<i16>,
}

/// Declared sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkDecl {
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub registration: Registration,
    #[serde(default)]
    pub template: bool,
    #[serde(default)]
    pub main_sound_properties: Vec<Property>,
    #[serde(default)]
    pub connection_formats: Vec<i16>,
}

/// Declared routing domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainDecl {
    pub name: String,
    #[serde(default)]
    pub bus_name: String,
    #[serde(default)]
    pub node_name: String,
    #[serde(default)]
    pub early: bool,
    #[serde(default)]
    pub template: bool,
}

/// Declared gateway between two domains
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayDecl {
    pub name: String,
    /// Sink side of the gateway
    pub sink: String,
    /// Source side of the gateway
    pub source: String,
    pub control_domain: String,
    #[serde(default)]
    pub registration: Registration,
    #[serde(default)]
    pub template: bool,
}

/// Declared class of connections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub template: bool,
}

/// Engine behaviour switches carried with the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Report a trigger kind without any matching policy as an error
    #[serde(default)]
    pub strict_policy_lookup: bool,

    /// Re-issue property restore triggers when a domain completes registration
    #[serde(default = "default_true")]
    pub restore_on_domain_complete: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            strict_policy_lookup: false,
            restore_on_domain_complete: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Parsed configuration snapshot handed to the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub sources: Vec<SourceDecl>,
    #[serde(default)]
    pub sinks: Vec<SinkDecl>,
    #[serde(default)]
    pub domains: Vec<DomainDecl>,
    #[serde(default)]
    pub gateways: Vec<GatewayDecl>,
    #[serde(default)]
    pub classes: Vec<ClassDecl>,
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub system_properties: Vec<Property>,
    #[serde(default)]
    pub engine: EngineOptions,
}

impl ControllerConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file; `.json` files are read as JSON, everything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Reject duplicate element names; warn about dangling references and unknown functions
    pub fn validate(&self) -> Result<()> {
        check_unique(ElementKind::Source, self.sources.iter().map(|s| s.name.as_str()))?;
        check_unique(ElementKind::Sink, self.sinks.iter().map(|s| s.name.as_str()))?;
        check_unique(ElementKind::Domain, self.domains.iter().map(|d| d.name.as_str()))?;
        check_unique(ElementKind::Gateway, self.gateways.iter().map(|g| g.name.as_str()))?;
        check_unique(ElementKind::Class, self.classes.iter().map(|c| c.name.as_str()))?;

        for gateway in &self.gateways {
            if !self.sinks.iter().any(|s| s.name == gateway.sink) {
                warn!(gateway = %gateway.name, sink = %gateway.sink, "gateway references undeclared sink");
            }
            if !self.sources.iter().any(|s| s.name == gateway.source) {
                warn!(gateway = %gateway.name, source = %gateway.source, "gateway references undeclared source");
            }
        }

        for policy in &self.policies {
            if policy.triggers.is_empty() {
                warn!(policy = %policy.name, "policy has no triggers and will never run");
            }
            for condition in &policy.conditions {
                warn_unknown_names(&policy.name, condition);
            }
        }
        Ok(())
    }
}

fn check_unique<'a>(kind: ElementKind, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::config(format!("duplicate {} name '{}'", kind, name)));
        }
    }
    Ok(())
}

fn warn_unknown_names(policy: &str, condition: &Condition) {
    let mut calls = vec![&condition.left];
    if let Operand::Call(call) = &condition.right {
        calls.push(call);
    }
    for call in calls {
        if Function::from_name(&call.function).is_none() {
            warn!(policy, function = %call.function, "condition uses an unknown function");
        }
        if Category::from_name(&call.category).is_none() {
            warn!(policy, category = %call.category, "condition uses an unknown category");
        }
    }
}

/// Statically declared element that can be looked up by name
pub trait ConfigElement: Sized {
    const KIND: ElementKind;

    fn name(&self) -> &str;

    fn table(store: &ConfigStore) -> &HashMap<String, Self>;
}

macro_rules! config_element {
    ($ty:ty, $kind:expr, $field:ident) => {
        impl ConfigElement for $ty {
            const KIND: ElementKind = $kind;

            fn name(&self) -> &str {
                &self.name
            }

            fn table(store: &ConfigStore) -> &HashMap<String, Self> {
                &store.$field
            }
        }
    };
}

config_element!(SourceDecl, ElementKind::Source, sources);
config_element!(SinkDecl, ElementKind::Sink, sinks);
config_element!(DomainDecl, ElementKind::Domain, domains);
config_element!(GatewayDecl, ElementKind::Gateway, gateways);
config_element!(ClassDecl, ElementKind::Class, classes);

/// Name-indexed, read-only view of the controller configuration
#[derive(Debug, Default)]
pub struct ConfigStore {
    sources: HashMap<String, SourceDecl>,
    sinks: HashMap<String, SinkDecl>,
    domains: HashMap<String, DomainDecl>,
    gateways: HashMap<String, GatewayDecl>,
    classes: HashMap<String, ClassDecl>,
    policies: Vec<Policy>,
    system_properties: Vec<Property>,
    options: EngineOptions,
    load_error: Option<String>,
}

impl ConfigStore {
    /// Build a store from a validated snapshot
    pub fn new(config: ControllerConfig) -> Result<Self> {
        config.validate()?;

        fn index<T: ConfigElement>(items: Vec<T>, is_template: impl Fn(&T) -> bool) -> HashMap<String, T> {
            items
                .into_iter()
                .filter(|item| !is_template(item))
                .map(|item| (item.name().to_string(), item))
                .collect()
        }

        let store = Self {
            sources: index(config.sources, |s| s.template),
            sinks: index(config.sinks, |s| s.template),
            domains: index(config.domains, |d| d.template),
            gateways: index(config.gateways, |g| g.template),
            classes: index(config.classes, |c| c.template),
            policies: config.policies,
            system_properties: config.system_properties,
            options: config.engine,
            load_error: None,
        };

        info!(
            sources = store.sources.len(),
            sinks = store.sinks.len(),
            domains = store.domains.len(),
            gateways = store.gateways.len(),
            classes = store.classes.len(),
            policies = store.policies.len(),
            "configuration store built"
        );

        Ok(store)
    }

    /// Store that holds nothing because the configuration could not be loaded
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(%reason, "configuration unavailable, starting with an empty rule set");
        Self {
            load_error: Some(reason),
            ..Self::default()
        }
    }

    /// Build from a snapshot; invalid snapshots yield an empty store
    pub fn from_config(config: ControllerConfig) -> Self {
        Self::new(config).unwrap_or_else(|e| Self::unavailable(e.to_string()))
    }

    /// Parse YAML; parse failures yield an empty store
    pub fn from_yaml(yaml: &str) -> Self {
        match ControllerConfig::from_yaml(yaml) {
            Ok(config) => Self::from_config(config),
            Err(e) => Self::unavailable(e.to_string()),
        }
    }

    /// Read and parse a configuration file; failures yield an empty store
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        match ControllerConfig::from_file(path.as_ref()) {
            Ok(config) => Self::from_config(config),
            Err(e) => Self::unavailable(format!("{}: {}", path.as_ref().display(), e)),
        }
    }

    /// Whether the configuration was loaded successfully
    pub fn is_loaded(&self) -> bool {
        self.load_error.is_none()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// All declared (non-template) elements of a kind, in no particular order
    pub fn elements<T: ConfigElement>(&self) -> Vec<&T> {
        T::table(self).values().collect()
    }

    /// Look up a declared element by name
    pub fn element<T: ConfigElement>(&self, name: &str) -> Result<&T> {
        T::table(self)
            .get(name)
            .ok_or_else(|| Error::config(format!("{} '{}' not found", T::KIND, name)))
    }

    /// Names of declared elements of a kind
    pub fn names(&self, kind: ElementKind) -> Vec<String> {
        fn keys<T>(table: &HashMap<String, T>) -> Vec<String> {
            table.keys().cloned().collect()
        }
        match kind {
            ElementKind::Source => keys(&self.sources),
            ElementKind::Sink => keys(&self.sinks),
            ElementKind::Domain => keys(&self.domains),
            ElementKind::Gateway => keys(&self.gateways),
            ElementKind::Class => keys(&self.classes),
            ElementKind::Connection => Vec::new(),
        }
    }

    /// Class a declared sink or source belongs to
    pub fn class_of(&self, kind: ElementKind, name: &str) -> Option<&str> {
        let class = match kind {
            ElementKind::Sink => self.sinks.get(name).map(|s| s.class.as_str()),
            ElementKind::Source => self.sources.get(name).map(|s| s.class.as_str()),
            _ => None,
        }?;
        (!class.is_empty()).then_some(class)
    }

    /// Domain a declared sink, source or gateway belongs to
    pub fn domain_of(&self, kind: ElementKind, name: &str) -> Option<&str> {
        let domain = match kind {
            ElementKind::Sink => self.sinks.get(name).map(|s| s.domain.as_str()),
            ElementKind::Source => self.sources.get(name).map(|s| s.domain.as_str()),
            ElementKind::Gateway => self.gateways.get(name).map(|g| g.control_domain.as_str()),
            _ => None,
        }?;
        (!domain.is_empty()).then_some(domain)
    }

    /// Enabled policies reacting to `kind`, stably sorted by ascending priority
    pub fn policies_for(&self, kind: TriggerKind) -> Result<Vec<&Policy>> {
        if let Some(reason) = &self.load_error {
            return Err(Error::config(format!(
                "no policies for {}: configuration unavailable ({})",
                kind, reason
            )));
        }

        let mut matching: Vec<&Policy> = self
            .policies
            .iter()
            .filter(|p| p.enabled && p.triggers.iter().any(|t| t.covers(kind)))
            .collect();
        matching.sort_by_key(|p| p.priority);
        Ok(matching)
    }

    /// All declared policies in declaration order
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn system_properties(&self) -> &[Property] {
        &self.system_properties
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
sources:
  - name: Radio
    domain: Tuner
    class: Entertainment
    priority: 3
  - name: RadioTemplate
    template: true
sinks:
  - name: Speaker
    domain: Amp
    class: Entertainment
domains:
  - name: Amp
  - name: Tuner
classes:
  - name: Entertainment
    priority: 10
policies:
  - name: late
    triggers: [USER_SET_VOLUME]
    priority: 5
  - name: early
    triggers: [ANY]
    priority: 1
  - name: tie
    triggers: [USER_ALL]
    priority: 5
  - name: disabled
    triggers: [USER_SET_VOLUME]
    enabled: false
  - name: other
    triggers: [SYSTEM_REGISTER_SINK]
system_properties:
  - { type: 1, value: 0 }
"#;

    #[test]
    fn test_lookup_by_name() {
        let store = ConfigStore::from_yaml(YAML);
        assert!(store.is_loaded());

        let radio: &SourceDecl = store.element("Radio").unwrap();
        assert_eq!(radio.priority, 3);
        assert!(store.element::<SourceDecl>("RadioTemplate").is_err());
        assert!(store.element::<SinkDecl>("Radio").is_err());
        assert_eq!(store.elements::<DomainDecl>().len(), 2);
        assert_eq!(store.class_of(ElementKind::Sink, "Speaker"), Some("Entertainment"));
        assert_eq!(store.domain_of(ElementKind::Source, "Radio"), Some("Tuner"));
        assert_eq!(store.system_properties().len(), 1);
    }

    #[test]
    fn test_policies_sorted_and_filtered() {
        let store = ConfigStore::from_yaml(YAML);
        let names: Vec<_> = store
            .policies_for(TriggerKind::UserSetVolume)
            .unwrap()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["early", "late", "tie"]);

        let none = store.policies_for(TriggerKind::SystemDeregisterSink).unwrap();
        assert_eq!(none.len(), 1);
        assert_eq!(none[0].name, "early");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let yaml = "sinks:\n  - name: A\n  - name: A\n";
        let store = ConfigStore::from_yaml(yaml);
        assert!(!store.is_loaded());
        assert!(store.load_error().unwrap().contains("duplicate sink"));
    }

    #[test]
    fn test_unavailable_store_reports_not_found() {
        let store = ConfigStore::from_yaml("policies: [oops");
        assert!(!store.is_loaded());
        assert!(store.elements::<SinkDecl>().is_empty());
        assert!(store.element::<ClassDecl>("Entertainment").is_err());
        assert!(store.policies_for(TriggerKind::UserSetVolume).is_err());
    }

    #[test]
    fn test_from_missing_file() {
        let store = ConfigStore::from_file("/nonexistent/audiorule.yaml");
        assert!(!store.is_loaded());
    }
}
