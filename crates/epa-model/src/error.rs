//! Class validation errors.

use thiserror::Error;

/// A class that cannot be analysed as written.
///
/// Raised once, while the action set is extracted; never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invariant method missing: it must be named '{expected}'")]
    MissingInvariant { expected: String },

    #[error("exactly one invariant method is needed, found {count} named '{name}'")]
    AmbiguousInvariant { name: String, count: usize },

    #[error("invariant method '{name}' must return a boolean")]
    InvariantNotBoolean { name: String },

    #[error("invariant method '{name}' must take no arguments, found {arity}")]
    InvariantHasArguments { name: String, arity: usize },

    #[error("overloading is not supported for action '{name}' ({count} declarations)")]
    OverloadedAction { name: String, count: usize },

    #[error("precondition '{name}' must return a boolean")]
    PreconditionNotBoolean { name: String },

    #[error("precondition '{precondition}' must have the same arguments as its method '{action}'")]
    SignatureMismatch {
        action: String,
        precondition: String,
    },

    #[error("precondition '{name}' has no matching method '{action}'")]
    OrphanPrecondition { name: String, action: String },

    #[error("action '{name}' is not a valid identifier")]
    InvalidActionName { name: String },
}

impl ConfigError {
    /// Qualified name of the offending method.
    pub fn method(&self) -> &str {
        match self {
            ConfigError::MissingInvariant { expected } => expected,
            ConfigError::AmbiguousInvariant { name, .. }
            | ConfigError::InvariantNotBoolean { name }
            | ConfigError::InvariantHasArguments { name, .. }
            | ConfigError::OverloadedAction { name, .. }
            | ConfigError::PreconditionNotBoolean { name }
            | ConfigError::OrphanPrecondition { name, .. }
            | ConfigError::InvalidActionName { name } => name,
            ConfigError::SignatureMismatch { precondition, .. } => precondition,
        }
    }
}

/// Result type for class validation.
pub type ConfigResult<T> = Result<T, ConfigError>;
