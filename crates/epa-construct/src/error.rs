//! Construction error taxonomy.
//!
//! All of these are fatal: a partially built automaton is never reported.

use epa_model::{Action, ConfigError, State};
use epa_query::{CombinationsError, QueryError};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// An internal invariant of the construction was violated.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("info logged for source state {state} that was never enqueued")]
    UnvisitedState { state: State },

    #[error("unclassifiable verifier result for procedure '{procedure}': {output}")]
    UnclassifiedResult { procedure: String, output: String },

    #[error("malformed query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("necessity answer for untracked pair ({state}, {action})")]
    UntrackedNecessity { state: State, action: Action },
}

/// The external verifier could not be run.
#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("failed to launch verifier '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("verifier timed out after {timeout:?} on procedure '{procedure}'")]
    Timeout { procedure: String, timeout: Duration },

    #[error("verifier I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("could not classify verifier output for procedure '{procedure}': {output}")]
    Unclassified { procedure: String, output: String },
}

#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("invalid class: {0}")]
    Config(#[from] ConfigError),

    #[error("integrity violation: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("verifier invocation failed: {0}")]
    Verifier(VerifierError),

    #[error("candidate enumeration failed: {0}")]
    Combinations(#[from] CombinationsError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },

    #[error("construction cancelled")]
    Cancelled,
}

// An unclassifiable result is an integration bug, not an infrastructure failure.
impl From<VerifierError> for ConstructionError {
    fn from(e: VerifierError) -> Self {
        match e {
            VerifierError::Unclassified { procedure, output } => {
                ConstructionError::Integrity(IntegrityError::UnclassifiedResult { procedure, output })
            }
            other => ConstructionError::Verifier(other),
        }
    }
}

impl From<QueryError> for ConstructionError {
    fn from(e: QueryError) -> Self {
        ConstructionError::Integrity(IntegrityError::InvalidQuery(e))
    }
}

pub type ConstructionResult<T> = Result<T, ConstructionError>;
