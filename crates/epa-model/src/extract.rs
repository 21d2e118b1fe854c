//! Derive the action set and invariant from a class's operation table.
//!
//! An instance method `m` is an action iff an instance method `m_pre` exists.
//! The invariant is the instance method `<Class>#inv`.

use crate::action::{Action, Invariant};
use crate::class::{ClassModel, Operation};
use crate::error::{ConfigError, ConfigResult};
use crate::state::State;
use std::collections::BTreeSet;

/// Name of the invariant method, unqualified.
pub const INVARIANT_METHOD_NAME: &str = "inv";

/// Suffix naming the precondition of an action.
pub const PRECONDITION_SUFFIX: &str = "_pre";

/// The actions of a class and its invariant. Fixed once computed.
#[derive(Debug, Clone)]
pub struct ActionSet {
    actions: BTreeSet<Action>,
    invariant: Invariant,
}

impl ActionSet {
    /// Validate `class` and extract its actions.
    pub fn extract(class: &ClassModel) -> ConfigResult<Self> {
        ActionSetBuilder::new(class).build()
    }

    pub fn actions(&self) -> impl ExactSizeIterator<Item = &Action> + '_ {
        self.actions.iter()
    }

    pub fn as_set(&self) -> &BTreeSet<Action> {
        &self.actions
    }

    pub fn invariant(&self) -> &Invariant {
        &self.invariant
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Look up an action by its unqualified name.
    pub fn find(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name() == name)
    }

    /// Build a state from action names. Returns the first unknown name on failure.
    pub fn state_of<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<State, &'a str> {
        names
            .into_iter()
            .map(|name| self.find(name).cloned().ok_or(name))
            .collect::<Result<Vec<_>, _>>()
            .map(State::new)
    }
}

/// One-shot validating builder for an [`ActionSet`].
pub struct ActionSetBuilder<'a> {
    class: &'a ClassModel,
}

impl<'a> ActionSetBuilder<'a> {
    pub fn new(class: &'a ClassModel) -> Self {
        Self { class }
    }

    pub fn build(self) -> ConfigResult<ActionSet> {
        let groups = self.class.instance_operations_by_name();

        let invariant = self.search_invariant(groups.get(self.invariant_name().as_str()))?;

        let mut actions = BTreeSet::new();
        for (&name, methods) in &groups {
            let precondition_name = format!("{name}{PRECONDITION_SUFFIX}");
            let Some(preconditions) = groups.get(precondition_name.as_str()) else {
                if let Some(base) = name.strip_suffix(PRECONDITION_SUFFIX) {
                    if !groups.contains_key(base) {
                        return Err(ConfigError::OrphanPrecondition {
                            name: name.to_string(),
                            action: base.to_string(),
                        });
                    }
                }
                continue;
            };

            let method = single(name, methods)?;
            let precondition = single(&precondition_name, preconditions)?;

            if !is_identifier(method.simple_name()) {
                return Err(ConfigError::InvalidActionName {
                    name: name.to_string(),
                });
            }

            if !precondition.returns_bool() {
                return Err(ConfigError::PreconditionNotBoolean {
                    name: precondition_name,
                });
            }

            if method.parameter_types != precondition.parameter_types {
                return Err(ConfigError::SignatureMismatch {
                    action: name.to_string(),
                    precondition: precondition_name,
                });
            }

            actions.insert(Action::new(precondition.clone(), method.clone()));
        }

        Ok(ActionSet { actions, invariant })
    }

    fn invariant_name(&self) -> String {
        self.class.qualify(INVARIANT_METHOD_NAME)
    }

    fn search_invariant(&self, candidates: Option<&Vec<&Operation>>) -> ConfigResult<Invariant> {
        let name = self.invariant_name();
        let candidates = candidates.ok_or_else(|| ConfigError::MissingInvariant {
            expected: name.clone(),
        })?;

        let [invariant] = candidates.as_slice() else {
            return Err(ConfigError::AmbiguousInvariant {
                name,
                count: candidates.len(),
            });
        };

        if !invariant.returns_bool() {
            return Err(ConfigError::InvariantNotBoolean { name });
        }
        if invariant.arity() != 0 {
            return Err(ConfigError::InvariantHasArguments {
                name,
                arity: invariant.arity(),
            });
        }

        Ok(Invariant::new((*invariant).clone()))
    }
}

/// Java identifier syntax: a letter, `_` or `$`, then also digits.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn single<'o>(name: &str, methods: &[&'o Operation]) -> ConfigResult<&'o Operation> {
    match methods {
        [method] => Ok(method),
        _ => Err(ConfigError::OverloadedAction {
            name: name.to_string(),
            count: methods.len(),
        }),
    }
}
