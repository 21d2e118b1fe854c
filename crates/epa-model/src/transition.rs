//! Action-labelled edges between abstract states.

use crate::action::Action;
use crate::state::State;
use std::fmt;

/// How strongly the verifier supports an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Existence {
    /// A counterexample witnessed the edge.
    Confirmed,
    /// The verifier could not exclude the edge within its bound.
    Possible,
}

impl fmt::Display for Existence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Existence::Confirmed => write!(f, "confirmed"),
            Existence::Possible => write!(f, "possible"),
        }
    }
}

/// An edge of the automaton.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Transition {
    pub source: State,
    pub target: State,
    pub action: Action,
    pub existence: Existence,
    /// Reserved auxiliary flag; always false.
    pub reserved: bool,
}

impl Transition {
    pub fn new(source: State, target: State, action: Action, existence: Existence) -> Self {
        Self {
            source,
            target,
            action,
            existence,
            reserved: false,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} --{}--> {} ({})",
            self.source, self.action, self.target, self.existence
        )
    }
}
