//! Actions and triggers the engine derives on its own
//!
//! - Deregistering a sink, source, gateway or domain disconnects every main
//!   connection touching the removed elements.
//! - Registering a domain, sink or source registers controller-owned
//!   elements that have become registrable.
//! - Completing a domain's registration replays the stored main sound
//!   properties of its sinks and sources as user requests.

use audiorule_core::{
    params, Action, ActionKind, ConnectionFilter, ConnectionOrder, ElementKind, Runtime,
};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::config::{ConfigStore, GatewayDecl, Registration, SinkDecl, SourceDecl};
use crate::trigger::Trigger;

/// Implicit actions for `trigger`, independent of any policy
pub fn implicit_actions(store: &ConfigStore, runtime: &dyn Runtime, trigger: &Trigger) -> Vec<Action> {
    match trigger {
        Trigger::SystemDeregisterDomain { domain_name } => {
            disconnect_all(runtime, &domain_members(store, runtime, domain_name))
        }
        Trigger::SystemDeregisterSink { sink_name } => disconnect_all(runtime, &[sink_name.clone()]),
        Trigger::SystemDeregisterSource { source_name } => {
            disconnect_all(runtime, &[source_name.clone()])
        }
        Trigger::SystemDeregisterGateway { gateway_name } => {
            disconnect_all(runtime, &gateway_members(store, gateway_name))
        }
        Trigger::SystemRegisterDomain { domain_name } => {
            register_for_domain(store, runtime, domain_name).into_iter().collect()
        }
        Trigger::SystemRegisterSink { sink_name } => {
            register_gateways(store, runtime, ElementKind::Sink, sink_name)
        }
        Trigger::SystemRegisterSource { source_name } => {
            register_gateways(store, runtime, ElementKind::Source, source_name)
        }
        _ => Vec::new(),
    }
}

fn push_unique(list: &mut Vec<String>, seen: &mut HashSet<String>, name: &str) {
    if seen.insert(name.to_string()) {
        list.push(name.to_string());
    }
}

/// A gateway plus the sink and source it joins
fn gateway_members(store: &ConfigStore, gateway: &str) -> Vec<String> {
    let mut members = vec![gateway.to_string()];
    if let Ok(decl) = store.element::<GatewayDecl>(gateway) {
        members.push(decl.sink.clone());
        members.push(decl.source.clone());
    }
    members
}

/// Gateways first, then sinks, then sources owned by `domain`
fn domain_members(store: &ConfigStore, runtime: &dyn Runtime, domain: &str) -> Vec<String> {
    let mut members = Vec::new();
    let mut seen = HashSet::new();

    let mut gateways = runtime.domain_elements(domain, ElementKind::Gateway);
    let mut declared: Vec<&GatewayDecl> = store
        .elements::<GatewayDecl>()
        .into_iter()
        .filter(|g| g.control_domain == domain)
        .collect();
    declared.sort_by(|a, b| a.name.cmp(&b.name));
    gateways.extend(declared.into_iter().map(|g| g.name.clone()));
    for gateway in &gateways {
        for member in gateway_members(store, gateway) {
            push_unique(&mut members, &mut seen, &member);
        }
    }

    for kind in [ElementKind::Sink, ElementKind::Source] {
        let mut names = runtime.domain_elements(domain, kind);
        let mut declared = store.names(kind);
        declared.retain(|name| store.domain_of(kind, name) == Some(domain));
        declared.sort();
        names.extend(declared);
        for name in &names {
            push_unique(&mut members, &mut seen, name);
        }
    }

    debug!(domain, members = ?members, "walking deregistered domain");
    members
}

/// One disconnect per main connection touching any of `elements`
fn disconnect_all(runtime: &dyn Runtime, elements: &[String]) -> Vec<Action> {
    let mut seen = HashSet::new();
    let mut actions = Vec::new();
    for element in elements {
        for connection in
            runtime.main_connections(&ConnectionFilter::Element(element.clone()), ConnectionOrder::Unordered)
        {
            if !seen.insert(connection.name.clone()) {
                continue;
            }
            actions.push(
                Action::new(ActionKind::Disconnect)
                    .with(params::CLASS_NAME, connection.class.as_str())
                    .with(params::SOURCE_NAME, connection.source.as_str())
                    .with(params::SINK_NAME, connection.sink.as_str())
                    .with(params::CONNECTION_NAME, connection.name.as_str()),
            );
        }
    }
    actions
}

/// Controller-owned elements of `domain` that can be registered now
fn register_for_domain(store: &ConfigStore, runtime: &dyn Runtime, domain: &str) -> Option<Action> {
    let sinks = pending::<SinkDecl>(store, runtime, |s| {
        s.registration == Registration::Controller && s.domain == domain
    });
    let sources = pending::<SourceDecl>(store, runtime, |s| {
        s.registration == Registration::Controller && s.domain == domain
    });

    let available = |kind: ElementKind, name: &str, pending: &[String]| {
        runtime.is_registered(kind, name) || pending.iter().any(|p| p == name)
    };
    let gateways = pending::<GatewayDecl>(store, runtime, |g| {
        g.registration == Registration::Controller
            && g.control_domain == domain
            && available(ElementKind::Sink, &g.sink, &sinks)
            && available(ElementKind::Source, &g.source, &sources)
    });

    if sinks.is_empty() && sources.is_empty() && gateways.is_empty() {
        return None;
    }
    let mut action = Action::new(ActionKind::Register).with(params::DOMAIN_NAME, domain);
    for (key, names) in [
        (params::LIST_SINKS, &sinks),
        (params::LIST_SOURCES, &sources),
        (params::LIST_GATEWAYS, &gateways),
    ] {
        if !names.is_empty() {
            action = action.with(key, names.join(" "));
        }
    }
    Some(action)
}

/// Controller-owned gateways that became complete with `name` registered
fn register_gateways(
    store: &ConfigStore,
    runtime: &dyn Runtime,
    kind: ElementKind,
    name: &str,
) -> Vec<Action> {
    let gateways = pending::<GatewayDecl>(store, runtime, |g| {
        if g.registration != Registration::Controller
            || !runtime.is_registered(ElementKind::Domain, &g.control_domain)
        {
            return false;
        }
        match kind {
            ElementKind::Sink => g.sink == name && runtime.is_registered(ElementKind::Source, &g.source),
            ElementKind::Source => g.source == name && runtime.is_registered(ElementKind::Sink, &g.sink),
            _ => false,
        }
    });

    let mut by_domain: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for gateway in gateways {
        if let Ok(decl) = store.element::<GatewayDecl>(&gateway) {
            by_domain.entry(decl.control_domain.clone()).or_default().push(gateway);
        }
    }
    by_domain
        .into_iter()
        .map(|(domain, names)| {
            Action::new(ActionKind::Register)
                .with(params::DOMAIN_NAME, domain)
                .with(params::LIST_GATEWAYS, names.join(" "))
        })
        .collect()
}

/// Sorted names of declared, unregistered elements accepted by `filter`
fn pending<T>(store: &ConfigStore, runtime: &dyn Runtime, filter: impl Fn(&T) -> bool) -> Vec<String>
where
    T: crate::config::ConfigElement,
{
    let mut names: Vec<String> = store
        .elements::<T>()
        .into_iter()
        .filter(|decl| filter(*decl))
        .map(|decl| decl.name().to_string())
        .filter(|name| !runtime.is_registered(T::KIND, name))
        .collect();
    names.sort();
    names
}

/// Replay stored main sound properties of a domain's sinks and sources.
///
/// Each element yields the list-shaped request followed by one
/// single-property request per property.
pub fn restore_triggers(runtime: &dyn Runtime, domain: &str) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    for sink in runtime.domain_elements(domain, ElementKind::Sink) {
        let properties = runtime.main_sound_properties(ElementKind::Sink, &sink);
        if properties.is_empty() {
            continue;
        }
        triggers.push(Trigger::UserSetSinkMainSoundProperties {
            sink_name: sink.clone(),
            properties: properties.clone(),
        });
        triggers.extend(properties.into_iter().map(|property| Trigger::UserSetSinkMainSoundProperty {
            sink_name: sink.clone(),
            property,
        }));
    }
    for source in runtime.domain_elements(domain, ElementKind::Source) {
        let properties = runtime.main_sound_properties(ElementKind::Source, &source);
        if properties.is_empty() {
            continue;
        }
        triggers.push(Trigger::UserSetSourceMainSoundProperties {
            source_name: source.clone(),
            properties: properties.clone(),
        });
        triggers.extend(properties.into_iter().map(|property| {
            Trigger::UserSetSourceMainSoundProperty {
                source_name: source.clone(),
                property,
            }
        }));
    }
    triggers
}
