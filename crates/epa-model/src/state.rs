//! Abstract states: sets of simultaneously enabled actions.

use crate::action::Action;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// An abstract state of the automaton.
///
/// Identity is set equality, so two explorations that reach the same
/// enabled-set denote the same node. Uses Arc for cheap cloning.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State {
    enabled: Arc<BTreeSet<Action>>,
}

impl State {
    pub fn new(enabled: impl IntoIterator<Item = Action>) -> Self {
        Self {
            enabled: Arc::new(enabled.into_iter().collect()),
        }
    }

    /// The terminal state: nothing is enabled.
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Enabled actions, in action order.
    pub fn enabled_actions(&self) -> impl ExactSizeIterator<Item = &Action> + '_ {
        self.enabled.iter()
    }

    pub fn as_set(&self) -> &BTreeSet<Action> {
        &self.enabled
    }

    pub fn is_enabled(&self, action: &Action) -> bool {
        self.enabled.contains(action)
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    /// The only enabled action, if exactly one is enabled.
    pub fn single_action(&self) -> Option<&Action> {
        if self.enabled.len() == 1 {
            self.enabled.iter().next()
        } else {
            None
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, action) in self.enabled.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{action}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State{self}")
    }
}

impl FromIterator<Action> for State {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        State::new(iter)
    }
}
