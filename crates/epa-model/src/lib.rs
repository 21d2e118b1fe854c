//! Domain model for enabledness protocol automata (EPA).
//!
//! An EPA abstracts an object's protocol: nodes are the sets of operations
//! enabled at some point of an execution, edges are the operations that move
//! the object from one such set to another.

pub mod action;
pub mod automaton;
pub mod class;
pub mod error;
pub mod extract;
pub mod state;
pub mod transition;

pub use action::{Action, Invariant};
pub use automaton::Automaton;
pub use class::{ClassModel, Operation, BOOL_TYPE};
pub use error::{ConfigError, ConfigResult};
pub use extract::{ActionSet, ActionSetBuilder, INVARIANT_METHOD_NAME, PRECONDITION_SUFFIX};
pub use state::State;
pub use transition::{Existence, Transition};
