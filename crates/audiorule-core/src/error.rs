//! Error types for audiorule

/// Result type alias using audiorule's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for audiorule operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors (missing element, missing policy, invalid snapshot)
    #[error("configuration error: {0}")]
    Config(String),

    /// Policy processing errors
    #[error("policy error: {0}")]
    Policy(String),

    /// Function or condition evaluation errors
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Failures reported by the runtime collaborator
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Engine used outside of its started state
    #[error("policy engine is not started")]
    NotStarted,

    /// File IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new policy error
    pub fn policy(msg: impl Into<String>) -> Self {
        Self::Policy(msg.into())
    }

    /// Create a new evaluation error
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Create a new runtime error
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
