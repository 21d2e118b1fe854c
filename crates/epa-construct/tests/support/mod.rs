//! In-process verifier over an explicitly enumerated concrete state space.
//!
//! A model is a small integer domain, an invariant and a set of actions with
//! concrete preconditions and bodies. Queries are decided by brute force over
//! the domain, following the same assume/execute/assert shape as the
//! generated procedures.

#![allow(dead_code)]

use epa_construct::{RunnerResult, VerifierAdapter, VerifierError};
use epa_model::{ClassModel, Operation, State};
use epa_query::{Completion, Necessity, Query, QueryKind, Translator, VerifierResult};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub type Concrete = u32;

#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Returns(Concrete),
    Throws(Concrete),
}

#[derive(Clone)]
pub struct ConcreteAction {
    pub name: &'static str,
    pub pre: fn(Concrete) -> bool,
    pub body: fn(Concrete) -> Outcome,
}

#[derive(Clone)]
pub struct ConcreteModel {
    pub class: &'static str,
    pub domain: Vec<Concrete>,
    pub invariant: fn(Concrete) -> bool,
    pub actions: Vec<ConcreteAction>,
    /// Actions whose reachable transitions are reported as inconclusive.
    pub inconclusive: Vec<&'static str>,
}

impl ConcreteModel {
    pub fn class_model(&self) -> ClassModel {
        let qualify = |name: &str| format!("{}#{name}", self.class);
        let mut ops = vec![Operation::new(qualify("inv"), vec![], Some("bool"))];
        for action in &self.actions {
            ops.push(Operation::new(qualify(action.name), vec![], None));
            ops.push(Operation::new(
                qualify(&format!("{}_pre", action.name)),
                vec![],
                Some("bool"),
            ));
        }
        ClassModel::new(self.class, ops)
    }

    fn action(&self, name: &str) -> &ConcreteAction {
        self.actions
            .iter()
            .find(|a| a.name == name)
            .unwrap_or_else(|| panic!("unknown action {name}"))
    }

    fn pattern(&self, value: Concrete) -> BTreeSet<String> {
        self.actions
            .iter()
            .filter(|a| (a.pre)(value))
            .map(|a| a.name.to_string())
            .collect()
    }

    pub fn decide(&self, query: &Query) -> VerifierResult {
        let main = self.action(query.main_action().name());
        let completion = query.completion().unwrap_or(Completion::Normal);
        let source = names(query.source());

        let counterexample = self.domain.iter().any(|&value| {
            if !(self.invariant)(value) {
                return false;
            }
            let assumed = if query.is_global() {
                (main.pre)(value)
            } else {
                self.pattern(value) == source
            };
            if !assumed {
                return false;
            }
            let post = match ((main.body)(value), completion) {
                (Outcome::Returns(post), Completion::Normal) => post,
                (Outcome::Throws(post), Completion::Exceptional) => post,
                _ => return false,
            };
            match query.kind() {
                QueryKind::Invariant { .. } => !(self.invariant)(post),
                QueryKind::Transition { target, .. } => self.pattern(post) == names(target),
                QueryKind::Necessary {
                    necessity, tested, ..
                } => {
                    let enabled = (self.action(tested.name()).pre)(post);
                    match necessity {
                        Necessity::Enabled => !enabled,
                        Necessity::Disabled => enabled,
                    }
                }
            }
        });

        match (counterexample, completion) {
            (true, _)
                if query.target().is_some() && self.inconclusive.contains(&main.name) =>
            {
                VerifierResult::Inconclusive
            }
            (true, Completion::Exceptional) => VerifierResult::ExceptionalCounterexample,
            (true, Completion::Normal) => VerifierResult::CounterexampleFound,
            (false, _) => VerifierResult::NoCounterexample,
        }
    }
}

pub fn names(state: &State) -> BTreeSet<String> {
    state.enabled_actions().map(|a| a.name().to_string()).collect()
}

/// Decides queries against a [`ConcreteModel`], after checking the worker
/// really appended the queried procedure to its program.
#[derive(Clone)]
pub struct ConcreteVerifier {
    model: Arc<ConcreteModel>,
}

impl ConcreteVerifier {
    pub fn new(model: ConcreteModel) -> Self {
        Self {
            model: Arc::new(model),
        }
    }
}

impl VerifierAdapter for ConcreteVerifier {
    fn run(&self, program: &Path, query: &Query) -> Result<RunnerResult, VerifierError> {
        let procedure = query.procedure_name();
        let text = std::fs::read_to_string(program)?;
        if !text.contains(&format!("procedure {procedure}(")) {
            return Err(VerifierError::Unclassified {
                procedure,
                output: "procedure not found in program".into(),
            });
        }
        Ok(RunnerResult {
            result: self.model.decide(query),
            command: format!("concrete {} /main:{procedure}", program.display()),
            elapsed: Duration::ZERO,
        })
    }
}

/// Emits one declaration per operation.
pub struct StubTranslator;

impl Translator for StubTranslator {
    fn translate_base_class(&self, class: &ClassModel) -> String {
        format!("// {}\nvar $Exception: Ref;\n", class.name)
    }

    fn translate_method(&self, operation: &Operation) -> String {
        format!("procedure {}(this: Ref);\n", self.procedure_name(operation))
    }
}

/// A single always-enabled `push` under an invariant that always holds.
pub fn stack() -> ConcreteModel {
    ConcreteModel {
        class: "Stack",
        domain: (0..=3).collect(),
        invariant: |_| true,
        actions: vec![ConcreteAction {
            name: "push",
            pre: |_| true,
            body: |n| Outcome::Returns((n + 1).min(3)),
        }],
        inconclusive: vec![],
    }
}

pub fn door() -> ConcreteModel {
    ConcreteModel {
        class: "Door",
        domain: vec![0, 1],
        invariant: |_| true,
        actions: vec![
            ConcreteAction {
                name: "open",
                pre: |s| s == 0,
                body: |_| Outcome::Returns(1),
            },
            ConcreteAction {
                name: "close",
                pre: |s| s == 1,
                body: |_| Outcome::Returns(0),
            },
        ],
        inconclusive: vec![],
    }
}

pub fn counter() -> ConcreteModel {
    ConcreteModel {
        class: "Counter",
        domain: (0..=2).collect(),
        invariant: |n| n <= 2,
        actions: vec![
            ConcreteAction {
                name: "inc",
                pre: |n| n < 2,
                body: |n| Outcome::Returns(n + 1),
            },
            ConcreteAction {
                name: "dec",
                pre: |n| n > 0,
                body: |n| Outcome::Returns(n.saturating_sub(1)),
            },
            ConcreteAction {
                name: "reset",
                pre: |_| true,
                body: |_| Outcome::Returns(0),
            },
        ],
        inconclusive: vec![],
    }
}

pub fn account() -> ConcreteModel {
    ConcreteModel {
        class: "Account",
        domain: (0..=2).collect(),
        invariant: |_| true,
        actions: vec![
            ConcreteAction {
                name: "deposit",
                pre: |_| true,
                body: |b| Outcome::Returns((b + 1).min(2)),
            },
            ConcreteAction {
                name: "withdraw",
                pre: |_| true,
                body: |b| {
                    if b == 0 {
                        Outcome::Throws(0)
                    } else {
                        Outcome::Returns(b - 1)
                    }
                },
            },
        ],
        inconclusive: vec![],
    }
}

/// `arm` is enabled only when unarmed; `cycle` is always enabled and disarms.
pub fn latch() -> ConcreteModel {
    ConcreteModel {
        class: "Latch",
        domain: vec![0, 1],
        invariant: |_| true,
        actions: vec![
            ConcreteAction {
                name: "arm",
                pre: |s| s == 0,
                body: |_| Outcome::Returns(1),
            },
            ConcreteAction {
                name: "cycle",
                pre: |_| true,
                body: |_| Outcome::Returns(0),
            },
        ],
        inconclusive: vec![],
    }
}

/// `half` is enabled on some of the values `inc` and `dec` reach and not on
/// others, so its enabledness after either stays undetermined.
pub fn gauge() -> ConcreteModel {
    ConcreteModel {
        class: "Gauge",
        domain: (0..=4).collect(),
        invariant: |_| true,
        actions: vec![
            ConcreteAction {
                name: "inc",
                pre: |n| n < 4,
                body: |n| Outcome::Returns(n + 1),
            },
            ConcreteAction {
                name: "dec",
                pre: |n| n > 0,
                body: |n| Outcome::Returns(n - 1),
            },
            ConcreteAction {
                name: "half",
                pre: |n| n >= 2,
                body: |n| Outcome::Returns(n / 2),
            },
        ],
        inconclusive: vec![],
    }
}
