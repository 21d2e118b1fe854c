//! Typed queries.

use crate::answer::{interpret, Answer, VerifierResult};
use epa_model::{Action, State};
use std::fmt;
use thiserror::Error;

/// How the main action is assumed to complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Completion {
    Normal,
    Exceptional,
}

/// Which enabledness a necessity query asserts for the tested action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Necessity {
    Enabled,
    Disabled,
}

/// Whether a necessity query assumes the source state's enabledness pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Local,
    /// Only the invariant and the main action's precondition are assumed.
    Global,
}

/// Kind-specific payload of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Can the main action break the invariant?
    Invariant { completion: Completion },
    /// Can the main action lead to exactly `target` being enabled?
    Transition { completion: Completion, target: State },
    /// Does the main action leave `tested` enabled (resp. disabled)?
    Necessary {
        necessity: Necessity,
        scope: Scope,
        tested: Action,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("main action {action} is not enabled in state {state}")]
    MainActionNotEnabled { state: State, action: Action },

    #[error("necessity query tests its own main action {action}")]
    TestedIsMain { action: Action },

    #[error("global query for {action} requires a state where it is the only enabled action, got {state}")]
    NotSingleActionState { state: State, action: Action },
}

pub type QueryResult<T> = Result<T, QueryError>;

/// An immutable question about one (state, main action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    source: State,
    main_action: Action,
    kind: QueryKind,
}

impl Query {
    /// Build a query, checking that it is well formed.
    ///
    /// In particular no query is ever built for a state where the main action
    /// is not enabled, so the terminal (empty) state never yields one.
    pub fn new(source: State, main_action: Action, kind: QueryKind) -> QueryResult<Self> {
        if !source.is_enabled(&main_action) {
            return Err(QueryError::MainActionNotEnabled {
                state: source,
                action: main_action,
            });
        }
        if let QueryKind::Necessary { scope, tested, .. } = &kind {
            if *tested == main_action {
                return Err(QueryError::TestedIsMain {
                    action: main_action,
                });
            }
            if *scope == Scope::Global && source.single_action() != Some(&main_action) {
                return Err(QueryError::NotSingleActionState {
                    state: source,
                    action: main_action,
                });
            }
        }
        Ok(Self {
            source,
            main_action,
            kind,
        })
    }

    pub fn invariant(source: State, main_action: Action, completion: Completion) -> QueryResult<Self> {
        Self::new(source, main_action, QueryKind::Invariant { completion })
    }

    pub fn transition(
        source: State,
        main_action: Action,
        target: State,
        completion: Completion,
    ) -> QueryResult<Self> {
        Self::new(
            source,
            main_action,
            QueryKind::Transition { completion, target },
        )
    }

    pub fn necessary(
        source: State,
        main_action: Action,
        tested: Action,
        necessity: Necessity,
        scope: Scope,
    ) -> QueryResult<Self> {
        Self::new(
            source,
            main_action,
            QueryKind::Necessary {
                necessity,
                scope,
                tested,
            },
        )
    }

    pub fn source(&self) -> &State {
        &self.source
    }

    pub fn main_action(&self) -> &Action {
        &self.main_action
    }

    pub fn kind(&self) -> &QueryKind {
        &self.kind
    }

    /// Target state of a transition query.
    pub fn target(&self) -> Option<&State> {
        match &self.kind {
            QueryKind::Transition { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Tested action of a necessity query.
    pub fn tested_action(&self) -> Option<&Action> {
        match &self.kind {
            QueryKind::Necessary { tested, .. } => Some(tested),
            _ => None,
        }
    }

    pub fn completion(&self) -> Option<Completion> {
        match &self.kind {
            QueryKind::Invariant { completion } | QueryKind::Transition { completion, .. } => {
                Some(*completion)
            }
            QueryKind::Necessary { .. } => None,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(
            self.kind,
            QueryKind::Necessary {
                scope: Scope::Global,
                ..
            }
        )
    }

    pub fn answer(&self, result: VerifierResult) -> Answer {
        interpret(&self.kind, result)
    }

    /// Name of the verification procedure encoding this query.
    ///
    /// Deterministic: equal queries share a name, distinct queries never do.
    /// Global queries omit the source state since they do not depend on it.
    /// Action names are escaped so that neither `_` nor `$` in them can be
    /// mistaken for a separator.
    pub fn procedure_name(&self) -> String {
        let main = mangle(self.main_action.name());
        let src = state_tag(&self.source);
        match &self.kind {
            QueryKind::Invariant { completion } => {
                format!("q_inv_{}__{src}__{main}", completion_tag(*completion))
            }
            QueryKind::Transition { completion, target } => format!(
                "q_tr_{}__{src}__{main}__{}",
                completion_tag(*completion),
                state_tag(target)
            ),
            QueryKind::Necessary {
                necessity,
                scope,
                tested,
            } => {
                let polarity = match necessity {
                    Necessity::Enabled => "en",
                    Necessity::Disabled => "dis",
                };
                match scope {
                    Scope::Local => {
                        format!("q_{polarity}_l__{src}__{main}__{}", mangle(tested.name()))
                    }
                    Scope::Global => format!("q_{polarity}_g__{main}__{}", mangle(tested.name())),
                }
            }
        }
    }
}

fn completion_tag(completion: Completion) -> &'static str {
    match completion {
        Completion::Normal => "n",
        Completion::Exceptional => "x",
    }
}

/// Escape `$` and `_` as `$24` and `$5f`.
///
/// A mangled name has no `_`, and each of its `$` is followed by a digit.
/// Action names never start with a digit, so a lone `$` separates names.
fn mangle(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '$' => out.push_str("$24"),
            '_' => out.push_str("$5f"),
            c => out.push(c),
        }
    }
    out
}

fn state_tag(state: &State) -> String {
    state
        .enabled_actions()
        .map(|a| mangle(a.name()))
        .collect::<Vec<_>>()
        .join("$")
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            QueryKind::Invariant { completion } => write!(
                f,
                "invariant({:?}) {} in {}",
                completion, self.main_action, self.source
            ),
            QueryKind::Transition { completion, target } => write!(
                f,
                "transition({:?}) {} --{}--> {}",
                completion, self.source, self.main_action, target
            ),
            QueryKind::Necessary {
                necessity,
                scope,
                tested,
            } => write!(
                f,
                "necessarily {:?} ({:?}) {} after {} in {}",
                necessity, scope, tested, self.main_action, self.source
            ),
        }
    }
}
