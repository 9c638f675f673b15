//! Function registry
//!
//! Every query function a condition may call is a variant of [`Function`].
//! A call is dispatched by exhaustive match; the only side table is the
//! [`ValueType`] classification that decides how comparisons treat the
//! right-hand side.
//!
//! Results are lists of strings even for numeric functions, so membership
//! tests work uniformly over mixed result sets.

use audiorule_core::symbols::{bool_text, to_number};
use audiorule_core::{
    ConnectionFilter, ConnectionOrder, ElementKind, MainConnection, NotificationConfiguration,
    Runtime,
};
use std::collections::HashSet;
use std::fmt;

use crate::config::{ClassDecl, ConfigElement, ConfigStore, SinkDecl, SourceDecl};
use crate::expression::ParseError;
use crate::trigger::Trigger;

/// Why a call produced no usable result
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalFailure {
    /// Target element, property or trigger field is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Unknown function or category, or an unsupported combination
    #[error("not possible: {0}")]
    NotPossible(String),

    /// A value could not be interpreted as a number
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A nested call expression did not parse
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),
}

impl EvalFailure {
    /// Label used for the failure counter
    pub fn reason(&self) -> &'static str {
        match self {
            EvalFailure::NotFound(_) => "not_found",
            EvalFailure::NotPossible(_) => "not_possible",
            EvalFailure::TypeMismatch(_) => "type_mismatch",
            EvalFailure::Syntax(_) => "syntax",
        }
    }
}

pub type EvalResult = std::result::Result<Vec<String>, EvalFailure>;

/// How a function's results are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Numeric,
}

/// Declares the function enum together with its textual names
macro_rules! functions {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// A query function callable from conditions and action parameters
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Function {
            $($variant),+
        }

        impl Function {
            /// Every supported function
            pub const ALL: &'static [Function] = &[$(Function::$variant),+];

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Function::$variant),)+
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Function::$variant => $name),+
                }
            }
        }
    };
}

functions! {
    Name => "name",
    Elements => "elements",
    Count => "count",
    Priority => "priority",
    ConnectionState => "connectionState",
    Volume => "volume",
    MainVolume => "mainVolume",
    IsMainVolumeStep => "isMainVolumeStep",
    VolumeLimit => "volumeLimit",
    SoundProperty => "soundProperty",
    MainSoundPropertyValue => "mainSoundPropertyValue",
    MainSoundPropertyType => "mainSoundPropertyType",
    SystemPropertyValue => "systemPropertyValue",
    SystemPropertyType => "systemPropertyType",
    MuteState => "muteState",
    Availability => "availability",
    AvailabilityReason => "availabilityReason",
    ConnectionFormat => "connectionFormat",
    InterruptState => "interruptState",
    IsRegistered => "isRegistered",
    IsRegistrationComplete => "isRegistrationComplete",
    State => "state",
    Peek => "peek",
    Error => "error",
    NotificationConfigurationStatus => "notificationConfigurationStatus",
    NotificationConfigurationParam => "notificationConfigurationParam",
    NotificationDataValue => "notificationDataValue",
    NotificationDataType => "notificationDataType",
    MainNotificationConfigurationType => "mainNotificationConfigurationType",
    MainNotificationConfigurationStatus => "mainNotificationConfigurationStatus",
    MainNotificationConfigurationParam => "mainNotificationConfigurationParam",
    Scale => "scale",
}

impl Function {
    pub fn value_type(self) -> ValueType {
        match self {
            Function::Name | Function::Elements | Function::Peek => ValueType::Text,
            _ => ValueType::Numeric,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element type a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Sink,
    Source,
    Class,
    Domain,
    Connection,
    ConnectionOfClass,
    ConnectionOfSource,
    ConnectionOfSink,
    ClassOfSource,
    ClassOfSink,
    DomainOfSource,
    DomainOfSink,
    SourceOfClass,
    SinkOfClass,
    /// The trigger itself
    User,
    /// System-wide scope
    System,
}

impl Category {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SINK" => Some(Self::Sink),
            "SOURCE" => Some(Self::Source),
            "CLASS" => Some(Self::Class),
            "DOMAIN" => Some(Self::Domain),
            "CONNECTION" => Some(Self::Connection),
            "CONNECTION_OF_CLASS" => Some(Self::ConnectionOfClass),
            "CONNECTION_OF_SOURCE" => Some(Self::ConnectionOfSource),
            "CONNECTION_OF_SINK" => Some(Self::ConnectionOfSink),
            "CLASS_OF_SOURCE" => Some(Self::ClassOfSource),
            "CLASS_OF_SINK" => Some(Self::ClassOfSink),
            "DOMAIN_OF_SOURCE" => Some(Self::DomainOfSource),
            "DOMAIN_OF_SINK" => Some(Self::DomainOfSink),
            "SOURCE_OF_CLASS" => Some(Self::SourceOfClass),
            "SINK_OF_CLASS" => Some(Self::SinkOfClass),
            "USER" => Some(Self::User),
            "SYSTEM" => Some(Self::System),
            _ => None,
        }
    }

    /// Kind of element the mandatory parameter names
    pub fn subject(self) -> Option<ElementKind> {
        match self {
            Self::Sink | Self::ClassOfSink | Self::DomainOfSink | Self::ConnectionOfSink => {
                Some(ElementKind::Sink)
            }
            Self::Source | Self::ClassOfSource | Self::DomainOfSource | Self::ConnectionOfSource => {
                Some(ElementKind::Source)
            }
            Self::Class | Self::ConnectionOfClass | Self::SourceOfClass | Self::SinkOfClass => {
                Some(ElementKind::Class)
            }
            Self::Domain => Some(ElementKind::Domain),
            Self::Connection => Some(ElementKind::Connection),
            Self::User | Self::System => None,
        }
    }

    /// Kind of element the function is applied to
    pub fn target(self) -> Option<ElementKind> {
        match self {
            Self::Sink | Self::SinkOfClass => Some(ElementKind::Sink),
            Self::Source | Self::SourceOfClass => Some(ElementKind::Source),
            Self::Class | Self::ClassOfSink | Self::ClassOfSource => Some(ElementKind::Class),
            Self::Domain | Self::DomainOfSink | Self::DomainOfSource => Some(ElementKind::Domain),
            Self::Connection
            | Self::ConnectionOfClass
            | Self::ConnectionOfSource
            | Self::ConnectionOfSink => Some(ElementKind::Connection),
            Self::User | Self::System => None,
        }
    }
}

/// How the mandatory parameter selects elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// The element named by the trigger
    Requesting,
    /// Every known element
    All,
    /// A literal name or value
    Name(String),
}

impl Selector {
    /// Interpret a resolved mandatory parameter; quoted text is always a name
    pub fn parse(text: &str, quoted: bool) -> Self {
        match text {
            "REQUESTING" if !quoted => Selector::Requesting,
            "ALL" if !quoted => Selector::All,
            other => Selector::Name(other.to_string()),
        }
    }
}

/// A call with its function, category and parameters fully resolved
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub function: Function,
    pub category: Category,
    pub selector: Selector,
    pub optional: Vec<String>,
}

impl ResolvedCall {
    fn optional(&self, index: usize) -> Option<&str> {
        self.optional.get(index).map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Numeric optional parameter, symbolic tokens allowed
    fn optional_number(&self, index: usize) -> Result<Option<i64>, EvalFailure> {
        match self.optional(index) {
            None => Ok(None),
            Some(text) => to_number(text)
                .map(Some)
                .ok_or_else(|| EvalFailure::TypeMismatch(format!("'{}' is not a number", text))),
        }
    }

    /// Connection ordering token from any optional parameter
    fn order(&self) -> ConnectionOrder {
        self.optional
            .iter()
            .find_map(|text| ConnectionOrder::from_token(text))
            .unwrap_or_default()
    }
}

/// Everything a handler may read
pub struct CallScope<'a> {
    pub store: &'a ConfigStore,
    pub runtime: &'a dyn Runtime,
    pub trigger: &'a Trigger,
}

/// Run a resolved call
pub fn invoke(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    match call.function {
        Function::Name => name(scope, call),
        Function::Elements => elements(scope, call),
        Function::Count => count(scope, call),
        Function::Priority => priority(scope, call),
        Function::ConnectionState => connection_state(scope, call),
        Function::Volume => volume(scope, call),
        Function::MainVolume => main_volume(scope, call),
        Function::IsMainVolumeStep => is_main_volume_step(scope, call),
        Function::VolumeLimit => volume_limit(scope, call),
        Function::SoundProperty => sound_property(scope, call),
        Function::MainSoundPropertyValue => main_sound_property_value(scope, call),
        Function::MainSoundPropertyType => main_sound_property_type(scope, call),
        Function::SystemPropertyValue => system_property_value(scope, call),
        Function::SystemPropertyType => system_property_type(scope, call),
        Function::MuteState => mute_state(scope, call),
        Function::Availability => availability(scope, call, false),
        Function::AvailabilityReason => availability(scope, call, true),
        Function::ConnectionFormat => connection_format(scope, call),
        Function::InterruptState => interrupt_state(scope, call),
        Function::IsRegistered => is_registered(scope, call),
        Function::IsRegistrationComplete => is_registration_complete(scope, call),
        Function::State => state(scope, call),
        Function::Peek => peek(scope, call),
        Function::Error => error(scope, call),
        Function::NotificationConfigurationStatus => {
            notification_configuration(scope, call, false, NotificationField::Status)
        }
        Function::NotificationConfigurationParam => {
            notification_configuration(scope, call, false, NotificationField::Param)
        }
        Function::NotificationDataValue => notification_data(scope, call, true),
        Function::NotificationDataType => notification_data(scope, call, false),
        Function::MainNotificationConfigurationType => {
            notification_configuration(scope, call, true, NotificationField::Type)
        }
        Function::MainNotificationConfigurationStatus => {
            notification_configuration(scope, call, true, NotificationField::Status)
        }
        Function::MainNotificationConfigurationParam => {
            notification_configuration(scope, call, true, NotificationField::Param)
        }
        Function::Scale => scale(call),
    }
}

fn not_possible(call: &ResolvedCall) -> EvalFailure {
    EvalFailure::NotPossible(format!(
        "{} does not support category {:?}",
        call.function, call.category
    ))
}

fn missing(what: &str) -> EvalFailure {
    EvalFailure::NotFound(what.to_string())
}

/// Keep order, drop duplicates
fn dedup(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names.into_iter().filter(|n| seen.insert(n.clone())).collect()
}

/// Names selected by the mandatory parameter, of the category's subject kind
fn subjects(scope: &CallScope<'_>, call: &ResolvedCall) -> Result<Vec<String>, EvalFailure> {
    let kind = call.category.subject().ok_or_else(|| not_possible(call))?;
    match &call.selector {
        Selector::Requesting => scope
            .trigger
            .element_name(kind)
            .map(|name| vec![name])
            .ok_or_else(|| missing(&format!("trigger {} carries no {} name", scope.trigger.kind(), kind))),
        Selector::All => {
            let mut names = scope.runtime.registered_names(kind);
            names.extend(scope.store.names(kind));
            Ok(dedup(names))
        }
        Selector::Name(name) => Ok(vec![name.clone()]),
    }
}

/// Names the function is applied to after following the category relation
fn targets(scope: &CallScope<'_>, call: &ResolvedCall) -> Result<Vec<String>, EvalFailure> {
    let subjects = subjects(scope, call)?;
    let store = scope.store;
    match call.category {
        Category::Sink
        | Category::Source
        | Category::Class
        | Category::Domain
        | Category::Connection => Ok(subjects),
        Category::ClassOfSink => related(call, &subjects, |s| element_class(scope, ElementKind::Sink, s)),
        Category::ClassOfSource => {
            related(call, &subjects, |s| element_class(scope, ElementKind::Source, s))
        }
        Category::DomainOfSink => related(call, &subjects, |s| {
            store.domain_of(ElementKind::Sink, s).map(str::to_string)
        }),
        Category::DomainOfSource => related(call, &subjects, |s| {
            store.domain_of(ElementKind::Source, s).map(str::to_string)
        }),
        Category::SinkOfClass => Ok(members_of_class::<SinkDecl>(store, &subjects, |d| &d.class)),
        Category::SourceOfClass => {
            Ok(members_of_class::<SourceDecl>(store, &subjects, |d| &d.class))
        }
        Category::ConnectionOfClass => Ok(connections_of(scope, call, &subjects, ConnectionFilter::Class)),
        Category::ConnectionOfSource => {
            Ok(connections_of(scope, call, &subjects, ConnectionFilter::Source))
        }
        Category::ConnectionOfSink => Ok(connections_of(scope, call, &subjects, ConnectionFilter::Sink)),
        Category::User | Category::System => Err(not_possible(call)),
    }
}

/// Declared class first, then the class the element registered with
pub(crate) fn element_class(scope: &CallScope<'_>, kind: ElementKind, name: &str) -> Option<String> {
    scope
        .store
        .class_of(kind, name)
        .map(str::to_string)
        .or_else(|| scope.runtime.class_of(kind, name))
}

/// Follow a one-to-one relation; fail when no subject has a counterpart
fn related(
    call: &ResolvedCall,
    subjects: &[String],
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Vec<String>, EvalFailure> {
    let names: Vec<String> = subjects.iter().filter_map(|s| lookup(s)).collect();
    if names.is_empty() && !subjects.is_empty() {
        Err(missing(&format!("no {:?} for {}", call.category, subjects.join(" "))))
    } else {
        Ok(dedup(names))
    }
}

fn connections_of(
    scope: &CallScope<'_>,
    call: &ResolvedCall,
    subjects: &[String],
    filter: fn(String) -> ConnectionFilter,
) -> Vec<String> {
    dedup(subjects.iter().flat_map(|s| {
        scope
            .runtime
            .main_connections(&filter(s.clone()), call.order())
            .into_iter()
            .map(|c| c.name)
    }))
}

fn members_of_class<T: ConfigElement>(
    store: &ConfigStore,
    classes: &[String],
    class_of: impl Fn(&T) -> &String,
) -> Vec<String> {
    let mut names: Vec<String> = store
        .elements::<T>()
        .into_iter()
        .filter(|decl| classes.contains(class_of(*decl)))
        .map(|decl| decl.name().to_string())
        .collect();
    names.sort();
    names
}

/// Apply `read` to every target; fail only when nothing could be read
fn per_target(
    targets: &[String],
    what: &str,
    mut read: impl FnMut(&str) -> Option<String>,
) -> EvalResult {
    let values: Vec<String> = targets.iter().filter_map(|t| read(t)).collect();
    if values.is_empty() && !targets.is_empty() {
        Err(missing(&format!("{} of {}", what, targets.join(" "))))
    } else {
        Ok(values)
    }
}

fn connection(scope: &CallScope<'_>, name: &str) -> Option<MainConnection> {
    scope
        .runtime
        .main_connections(&ConnectionFilter::Name(name.to_string()), ConnectionOrder::Unordered)
        .into_iter()
        .next()
}

/// Property type from the first optional parameter
fn property_type(call: &ResolvedCall) -> Result<Option<i16>, EvalFailure> {
    call.optional_number(0)
        .map(|ty| ty.and_then(|ty| i16::try_from(ty).ok()))
}

fn user_text<T: ToString>(value: Option<T>, what: &str) -> EvalResult {
    value
        .map(|v| vec![v.to_string()])
        .ok_or_else(|| missing(&format!("trigger carries no {}", what)))
}

fn name(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    match (&call.category, &call.selector) {
        (Category::User, Selector::Name(value)) => Ok(vec![value.clone()]),
        (Category::User, _) | (Category::System, _) => Err(not_possible(call)),
        _ => targets(scope, call),
    }
}

fn elements(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let kind = call.category.target().ok_or_else(|| not_possible(call))?;
    let targets = targets(scope, call)?;
    Ok(targets
        .into_iter()
        .filter(|t| scope.runtime.is_registered(kind, t))
        .collect())
}

fn count(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    if call.category.target().is_none() {
        return Err(not_possible(call));
    }
    Ok(vec![targets(scope, call)?.len().to_string()])
}

fn priority(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let kind = call.category.target().ok_or_else(|| not_possible(call))?;
    let targets = targets(scope, call)?;
    match kind {
        ElementKind::Sink => per_target(&targets, "priority", |t| {
            scope.store.element::<SinkDecl>(t).ok().map(|d| d.priority.to_string())
        }),
        ElementKind::Source => per_target(&targets, "priority", |t| {
            scope.store.element::<SourceDecl>(t).ok().map(|d| d.priority.to_string())
        }),
        ElementKind::Class => per_target(&targets, "priority", |t| {
            scope.store.element::<ClassDecl>(t).ok().map(|d| d.priority.to_string())
        }),
        ElementKind::Connection => per_target(&targets, "priority", |t| {
            connection(scope, t).map(|c| c.priority.to_string())
        }),
        ElementKind::Domain | ElementKind::Gateway => Err(not_possible(call)),
    }
}

/// With category `CONNECTION` the mandatory name is ignored and the states of
/// all main connections are returned. Long-standing controller behaviour that
/// policies may depend on; use `CONNECTION_OF_*` to address specific ones.
fn connection_state(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    match call.category {
        Category::User => user_text(scope.trigger.connection_state().map(|s| s.code()), "connection state"),
        Category::Connection => Ok(scope
            .runtime
            .main_connections(&ConnectionFilter::All, call.order())
            .into_iter()
            .map(|c| c.state.code().to_string())
            .collect()),
        Category::ConnectionOfClass | Category::ConnectionOfSink | Category::ConnectionOfSource => {
            let targets = targets(scope, call)?;
            per_target(&targets, "connection state", |t| {
                connection(scope, t).map(|c| c.state.code().to_string())
            })
        }
        _ => Err(not_possible(call)),
    }
}

fn volume(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let kind = match call.category {
        Category::Sink | Category::SinkOfClass => ElementKind::Sink,
        Category::Source | Category::SourceOfClass => ElementKind::Source,
        _ => return Err(not_possible(call)),
    };
    let targets = targets(scope, call)?;
    per_target(&targets, "volume", |t| scope.runtime.volume(kind, t).map(|v| v.to_string()))
}

fn main_volume(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    match call.category {
        Category::User => user_text(scope.trigger.main_volume(), "main volume"),
        Category::Sink | Category::SinkOfClass => {
            let targets = targets(scope, call)?;
            per_target(&targets, "main volume", |t| {
                scope.runtime.main_volume(t).map(|v| v.to_string())
            })
        }
        _ => Err(not_possible(call)),
    }
}

fn is_main_volume_step(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    match call.category {
        Category::User => user_text(scope.trigger.is_volume_step().map(bool_text), "volume step flag"),
        _ => Err(not_possible(call)),
    }
}

fn volume_limit(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let kind = match call.category {
        Category::Sink | Category::SinkOfClass => ElementKind::Sink,
        Category::Source | Category::SourceOfClass => ElementKind::Source,
        _ => return Err(not_possible(call)),
    };
    let targets = targets(scope, call)?;
    per_target(&targets, "volume limit", |t| {
        scope.runtime.volume_limit(kind, t).map(|v| v.to_string())
    })
}

/// Sink or source kind for property-style functions
fn endpoint_kind(call: &ResolvedCall) -> Result<ElementKind, EvalFailure> {
    match call.category {
        Category::Sink | Category::SinkOfClass => Ok(ElementKind::Sink),
        Category::Source | Category::SourceOfClass => Ok(ElementKind::Source),
        _ => Err(not_possible(call)),
    }
}

fn sound_property(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let kind = endpoint_kind(call)?;
    let ty = property_type(call)?.ok_or_else(|| missing("sound property type parameter"))?;
    let targets = targets(scope, call)?;
    per_target(&targets, "sound property", |t| {
        scope.runtime.sound_property(kind, t, ty).map(|v| v.to_string())
    })
}

fn main_sound_property_value(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let ty = property_type(call)?;
    if call.category == Category::User {
        let values: Vec<String> = scope
            .trigger
            .main_sound_properties()
            .iter()
            .filter(|p| ty.map_or(true, |ty| p.property_type == ty))
            .map(|p| p.value.to_string())
            .collect();
        return if values.is_empty() {
            Err(missing("main sound property in trigger"))
        } else {
            Ok(values)
        };
    }

    let kind = endpoint_kind(call)?;
    let targets = targets(scope, call)?;
    match ty {
        Some(ty) => per_target(&targets, "main sound property", |t| {
            scope.runtime.main_sound_property(kind, t, ty).map(|v| v.to_string())
        }),
        None => Ok(targets
            .iter()
            .flat_map(|t| scope.runtime.main_sound_properties(kind, t))
            .map(|p| p.value.to_string())
            .collect()),
    }
}

fn main_sound_property_type(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    if call.category == Category::User {
        return Ok(scope
            .trigger
            .main_sound_properties()
            .iter()
            .map(|p| p.property_type.to_string())
            .collect());
    }
    let kind = endpoint_kind(call)?;
    let targets = targets(scope, call)?;
    Ok(dedup(
        targets
            .iter()
            .flat_map(|t| scope.runtime.main_sound_properties(kind, t))
            .map(|p| p.property_type.to_string()),
    ))
}

/// `SYSTEM`: the mandatory parameter selects property types (`ALL`,
/// `REQUESTING` for the trigger's types, or a type). `USER`: values carried by
/// the trigger, optionally filtered by the type in the first optional parameter.
fn system_property_value(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    match call.category {
        Category::User => {
            let ty = property_type(call)?;
            let values: Vec<String> = scope
                .trigger
                .system_properties()
                .iter()
                .filter(|p| ty.map_or(true, |ty| p.property_type == ty))
                .map(|p| p.value.to_string())
                .collect();
            if values.is_empty() {
                Err(missing("system property in trigger"))
            } else {
                Ok(values)
            }
        }
        Category::System => match &call.selector {
            Selector::All => Ok(scope
                .runtime
                .system_properties()
                .iter()
                .map(|p| p.value.to_string())
                .collect()),
            Selector::Requesting => {
                let types: Vec<String> = scope
                    .trigger
                    .system_properties()
                    .iter()
                    .map(|p| p.property_type.to_string())
                    .collect();
                per_target(&types, "system property", |t| system_value(scope, t))
            }
            Selector::Name(ty) => per_target(std::slice::from_ref(ty), "system property", |t| {
                system_value(scope, t)
            }),
        },
        _ => Err(not_possible(call)),
    }
}

fn system_value(scope: &CallScope<'_>, ty: &str) -> Option<String> {
    let ty = i16::try_from(to_number(ty)?).ok()?;
    scope.runtime.system_property(ty).map(|v| v.to_string())
}

fn system_property_type(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let properties = match call.category {
        Category::User => scope.trigger.system_properties().to_vec(),
        Category::System => scope.runtime.system_properties(),
        _ => return Err(not_possible(call)),
    };
    Ok(properties.iter().map(|p| p.property_type.to_string()).collect())
}

fn mute_state(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    match call.category {
        Category::User => user_text(scope.trigger.mute_state().map(|m| m.code()), "mute state"),
        Category::Sink | Category::SinkOfClass => {
            let targets = targets(scope, call)?;
            per_target(&targets, "mute state", |t| {
                scope.runtime.mute_state(t).map(|m| m.code().to_string())
            })
        }
        _ => Err(not_possible(call)),
    }
}

fn availability(scope: &CallScope<'_>, call: &ResolvedCall, reason: bool) -> EvalResult {
    let render = |a: audiorule_core::Availability| {
        if reason {
            a.reason.to_string()
        } else {
            a.state.code().to_string()
        }
    };
    if call.category == Category::User {
        return user_text(scope.trigger.availability().map(render), "availability");
    }
    let kind = endpoint_kind(call)?;
    let targets = targets(scope, call)?;
    per_target(&targets, "availability", |t| scope.runtime.availability(kind, t).map(render))
}

fn connection_format(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let targets = targets(scope, call)?;
    match call.category.target() {
        Some(ElementKind::Connection) => per_target(&targets, "connection format", |t| {
            connection(scope, t).map(|c| c.format.to_string())
        }),
        Some(ElementKind::Sink) => Ok(declared_formats::<SinkDecl>(scope.store, &targets, |d| {
            &d.connection_formats
        })),
        Some(ElementKind::Source) => Ok(declared_formats::<SourceDecl>(scope.store, &targets, |d| {
            &d.connection_formats
        })),
        _ => Err(not_possible(call)),
    }
}

fn declared_formats<T: ConfigElement>(
    store: &ConfigStore,
    targets: &[String],
    formats: impl Fn(&T) -> &Vec<i16>,
) -> Vec<String> {
    targets
        .iter()
        .filter_map(|t| store.element::<T>(t).ok())
        .flat_map(|decl| formats(decl).iter().map(i16::to_string).collect::<Vec<_>>())
        .collect()
}

fn interrupt_state(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    match call.category {
        Category::User => {
            user_text(scope.trigger.interrupt_state().map(|s| s.code()), "interrupt state")
        }
        Category::Source | Category::SourceOfClass => {
            let targets = targets(scope, call)?;
            per_target(&targets, "interrupt state", |t| {
                scope.runtime.interrupt_state(t).map(|s| s.code().to_string())
            })
        }
        _ => Err(not_possible(call)),
    }
}

fn is_registered(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let kind = call.category.target().ok_or_else(|| not_possible(call))?;
    let targets = targets(scope, call)?;
    Ok(targets
        .iter()
        .map(|t| bool_text(scope.runtime.is_registered(kind, t)))
        .collect())
}

fn is_registration_complete(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    if call.category != Category::Domain {
        return Err(not_possible(call));
    }
    let targets = targets(scope, call)?;
    Ok(targets
        .iter()
        .map(|t| bool_text(scope.runtime.is_domain_registration_complete(t)))
        .collect())
}

fn state(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let kind = match call.category {
        Category::Source | Category::SourceOfClass => ElementKind::Source,
        Category::Domain | Category::DomainOfSink | Category::DomainOfSource => ElementKind::Domain,
        _ => return Err(not_possible(call)),
    };
    let targets = targets(scope, call)?;
    per_target(&targets, "state", |t| scope.runtime.state(kind, t).map(|s| s.to_string()))
}

/// Name of the main connection at position `opt1` of the priority-ordered queue
fn peek(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    let filter: fn(String) -> ConnectionFilter = match call.category {
        Category::Class | Category::ClassOfSink | Category::ClassOfSource => ConnectionFilter::Class,
        Category::Sink => ConnectionFilter::Sink,
        Category::Source => ConnectionFilter::Source,
        _ => return Err(not_possible(call)),
    };
    let index = call.optional_number(0)?.unwrap_or(0);
    let index = usize::try_from(index)
        .map_err(|_| EvalFailure::TypeMismatch(format!("negative queue index {}", index)))?;

    let targets = targets(scope, call)?;
    Ok(targets
        .into_iter()
        .filter_map(|t| {
            scope
                .runtime
                .main_connections(&filter(t), ConnectionOrder::HighPriority)
                .into_iter()
                .nth(index)
                .map(|c| c.name)
        })
        .collect())
}

fn error(scope: &CallScope<'_>, call: &ResolvedCall) -> EvalResult {
    match call.category {
        Category::User => user_text(scope.trigger.status().map(|s| s.code()), "status"),
        _ => Err(not_possible(call)),
    }
}

#[derive(Clone, Copy)]
enum NotificationField {
    Type,
    Status,
    Param,
}

impl NotificationField {
    fn read(self, config: &NotificationConfiguration) -> String {
        match self {
            NotificationField::Type => config.notification_type.to_string(),
            NotificationField::Status => config.status.code().to_string(),
            NotificationField::Param => config.parameter.to_string(),
        }
    }
}

/// Notification configuration fields; `opt1` selects the notification type
fn notification_configuration(
    scope: &CallScope<'_>,
    call: &ResolvedCall,
    main: bool,
    field: NotificationField,
) -> EvalResult {
    let ty = property_type(call)?;
    let matches = |c: &NotificationConfiguration| ty.map_or(true, |ty| c.notification_type == ty);

    if call.category == Category::User {
        if !main {
            return Err(not_possible(call));
        }
        return scope
            .trigger
            .notification_configuration()
            .filter(|c| matches(c))
            .map(|c| vec![field.read(&c)])
            .ok_or_else(|| missing("notification configuration in trigger"));
    }

    let kind = endpoint_kind(call)?;
    let targets = targets(scope, call)?;
    let values: Vec<String> = targets
        .iter()
        .flat_map(|t| {
            if main {
                scope.runtime.main_notification_configurations(kind, t)
            } else {
                scope.runtime.notification_configurations(kind, t)
            }
        })
        .filter(|c| matches(c))
        .map(|c| field.read(&c))
        .collect();
    if values.is_empty() && ty.is_some() {
        Err(missing("notification configuration"))
    } else {
        Ok(values)
    }
}

fn notification_data(scope: &CallScope<'_>, call: &ResolvedCall, value: bool) -> EvalResult {
    if call.category != Category::User {
        return Err(not_possible(call));
    }
    let payload = scope
        .trigger
        .notification_payload()
        .map(|p| if value { p.value } else { p.notification_type });
    user_text(payload, "notification payload")
}

/// Piecewise linear interpolation of the mandatory value over the anchor
/// table in `opt1` (`"x:y x:y ..."`), clamped to the outermost anchors
fn scale(call: &ResolvedCall) -> EvalResult {
    let input = match &call.selector {
        Selector::Name(text) => text,
        _ => return Err(not_possible(call)),
    };
    let x = to_number(input)
        .ok_or_else(|| EvalFailure::TypeMismatch(format!("scale input '{}' is not a number", input)))?;
    let table = call.optional(0).ok_or_else(|| missing("scale anchor table"))?;
    let anchors = parse_anchors(table)
        .ok_or_else(|| EvalFailure::TypeMismatch(format!("bad scale anchors '{}'", table)))?;
    let y = interpolate(x as f64, &anchors).ok_or_else(|| missing("scale anchors"))?;
    Ok(vec![(y.round() as i64).to_string()])
}

fn parse_anchors(text: &str) -> Option<Vec<(f64, f64)>> {
    text.split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(':')?;
            Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
        })
        .collect()
}

pub(crate) fn interpolate(x: f64, anchors: &[(f64, f64)]) -> Option<f64> {
    let mut anchors = anchors.to_vec();
    anchors.sort_by(|a, b| a.0.total_cmp(&b.0));
    let first = *anchors.first()?;
    let last = *anchors.last()?;
    if x <= first.0 {
        return Some(first.1);
    }
    if x >= last.0 {
        return Some(last.1);
    }
    anchors.windows(2).find_map(|w| {
        let ((x0, y0), (x1, y1)) = (w[0], w[1]);
        (x >= x0 && x <= x1).then(|| {
            if x1 == x0 {
                y1
            } else {
                y0 + (x - x0) * (y1 - y0) / (x1 - x0)
            }
        })
    })
}
