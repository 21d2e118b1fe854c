//! Query algebra for EPA construction.
//!
//! Every query compiles to a verification procedure that assumes the class
//! invariant, the main action's precondition and the enabledness pattern of
//! the source state, runs the main action, and asserts the negation of the
//! property under test. A counterexample is evidence the property is
//! achievable; its absence (within the verifier's bound) is evidence it is not.
//! Necessity answers read the other way round: YES means no run escapes the
//! necessity, so the tested action's enabledness is forced.

pub mod answer;
pub mod combinations;
pub mod program;
pub mod query;
pub mod translator;

pub use answer::{interpret, Answer, VerifierResult};
pub use combinations::{CombinationsError, CombinationsGenerator, MAX_COMBINATION_SIZE};
pub use program::QueryContext;
pub use query::{Completion, Necessity, Query, QueryError, QueryKind, QueryResult, Scope};
pub use translator::Translator;
