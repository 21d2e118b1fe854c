//! Concurrent EPA construction.
//!
//! A fixed pool of [`VerificationWorker`]s drains one shared queue of
//! queries. Each worker owns a growing verification program and its own
//! verifier; the [`Automaton`](epa_model::Automaton) and the [`ResultLog`] are
//! the only shared mutable state.

pub mod error;
pub mod explorer;
pub mod log;
pub mod program;
pub mod queue;
pub mod verifier;
pub mod worker;

pub use error::{ConstructionError, ConstructionResult, IntegrityError, VerifierError};
pub use explorer::{Construction, ConstructionConfig, ConstructionStats, Constructor};
pub use log::{Inconsistency, QueryInfo, ResultLog, StateActionInfo};
pub use program::{Fragment, ProgramBuffer};
pub use queue::{Poll, WorkQueue};
pub use verifier::{classify_output, CorralConfig, CorralVerifier, RunnerResult, VerifierAdapter};
pub use worker::VerificationWorker;
