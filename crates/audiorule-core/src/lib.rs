//! audiorule Core
//!
//! Core types, traits, and utilities shared across audiorule components.
//!
//! This crate provides:
//! - Audio-graph vocabulary (element kinds, availability, mute, connection states)
//! - Error types and result handling
//! - The runtime collaborator interfaces the policy engine reads from and delivers to
//! - Resolved action types
//! - An in-memory runtime for simulation and tests

pub mod action;
pub mod error;
pub mod memory;
pub mod runtime;
pub mod symbols;
pub mod types;

pub use action::{params, Action, ActionKind};
pub use error::{Error, Result};
pub use memory::{DeliveredList, DomainEntry, ElementState, InMemoryRuntime, RuntimeState};
pub use runtime::{ActionSink, ConnectionFilter, ConnectionOrder, Runtime, RuntimeView};
pub use types::{
    Availability, AvailabilityState, ConnectionState, ElementKind, ErrorCode, InterruptState,
    LimitState, MainConnection, MuteState, NotificationConfiguration, NotificationPayload,
    NotificationStatus, Origin, Property,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{params, Action, ActionKind};
    pub use crate::error::{Error, Result};
    pub use crate::runtime::{ActionSink, ConnectionFilter, ConnectionOrder, Runtime, RuntimeView};
    pub use crate::types::{ElementKind, MainConnection, Origin, Property};
}
