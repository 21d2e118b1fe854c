//! Raw verifier outcomes and their domain interpretation.

use crate::query::{Completion, QueryKind};
use std::fmt;

/// Classification of one verification run, as reported by the verifier adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifierResult {
    /// The assertion fails on some run.
    CounterexampleFound,
    /// No run within the bound violates the assertion.
    NoCounterexample,
    /// The bound was reached before a verdict.
    Inconclusive,
    /// The assertion fails on a run that completes through an exception.
    ExceptionalCounterexample,
    /// The operation cannot complete exceptionally.
    ThrowSafetyConfirmed,
}

impl fmt::Display for VerifierResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerifierResult::CounterexampleFound => "COUNTEREXAMPLE_FOUND",
            VerifierResult::NoCounterexample => "NO_COUNTEREXAMPLE",
            VerifierResult::Inconclusive => "INCONCLUSIVE",
            VerifierResult::ExceptionalCounterexample => "EXCEPTIONAL_COUNTEREXAMPLE",
            VerifierResult::ThrowSafetyConfirmed => "THROW_SAFETY_CONFIRMED",
        };
        f.write_str(s)
    }
}

/// Domain-level answer to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Answer {
    Yes,
    No,
    Maybe,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Yes => f.write_str("YES"),
            Answer::No => f.write_str("NO"),
            Answer::Maybe => f.write_str("MAYBE"),
        }
    }
}

/// Interpret a verifier result for a query kind.
///
/// Invariant and transition queries ask whether something can happen, so a
/// counterexample answers YES. Necessity queries ask whether something must
/// happen, so only the absence of a counterexample answers YES.
///
/// | result                      | invariant     | transition    | necessity |
/// |-----------------------------|---------------|---------------|-----------|
/// | CounterexampleFound         | YES           | YES           | NO        |
/// | NoCounterexample            | NO            | NO            | YES       |
/// | Inconclusive                | MAYBE         | MAYBE         | MAYBE     |
/// | ExceptionalCounterexample   | YES if exc.   | YES if exc.   | MAYBE     |
/// | ThrowSafetyConfirmed        | NO            | NO            | MAYBE     |
///
/// "exc." = the exceptional-completion variant; otherwise MAYBE.
pub fn interpret(kind: &QueryKind, result: VerifierResult) -> Answer {
    use VerifierResult::*;

    match (kind, result) {
        (_, Inconclusive) => Answer::Maybe,

        (QueryKind::Necessary { .. }, NoCounterexample) => Answer::Yes,
        (QueryKind::Necessary { .. }, CounterexampleFound) => Answer::No,
        (QueryKind::Necessary { .. }, ExceptionalCounterexample | ThrowSafetyConfirmed) => {
            Answer::Maybe
        }

        (_, CounterexampleFound) => Answer::Yes,
        (_, NoCounterexample) => Answer::No,
        (
            QueryKind::Invariant { completion } | QueryKind::Transition { completion, .. },
            ExceptionalCounterexample,
        ) => match completion {
            Completion::Exceptional => Answer::Yes,
            Completion::Normal => Answer::Maybe,
        },
        (QueryKind::Invariant { .. } | QueryKind::Transition { .. }, ThrowSafetyConfirmed) => {
            Answer::No
        }
    }
}
