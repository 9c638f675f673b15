//! audiorule Policy Engine
//!
//! Declarative rule engine of the audio-routing controller. Given a trigger
//! describing a change in the audio graph, it decides which actions the
//! runtime must execute.
//!
//! The engine is made of:
//! - a configuration store holding the declared topology and policies
//! - a condition evaluator with a closed set of query functions
//! - the policy engine, which orders policies, resolves action parameters
//!   and appends implicit actions

pub mod action;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod expression;
pub mod function;
pub mod implicit;
pub mod macros;
pub mod rule;
pub mod trigger;

pub use action::ActionTemplate;
pub use config::{
    ClassDecl, ConfigElement, ConfigStore, ControllerConfig, DomainDecl, EngineOptions,
    GatewayDecl, Registration, SinkDecl, SourceDecl,
};
pub use engine::{describe_metrics, PolicyEngine};
pub use evaluator::{compare, FunctionEvaluator};
pub use expression::{Argument, Condition, FunctionCall, Operand, Operator, ParseError};
pub use function::{Category, EvalFailure, Function, ValueType};
pub use macros::{Macro, MacroExpander};
pub use rule::Policy;
pub use trigger::{Trigger, TriggerKind};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{ConfigStore, ControllerConfig, EngineOptions};
    pub use crate::engine::PolicyEngine;
    pub use crate::evaluator::FunctionEvaluator;
    pub use crate::expression::{Condition, FunctionCall, Operator};
    pub use crate::rule::Policy;
    pub use crate::trigger::{Trigger, TriggerKind};
}
