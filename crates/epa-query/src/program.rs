//! Verification-procedure text for queries.

use crate::query::{Completion, Necessity, Query, QueryKind, Scope};
use crate::translator::Translator;
use epa_model::{Action, ActionSet, Operation};

/// Type of the implicit receiver in translated procedures.
const RECEIVER_TYPE: &str = "Ref";

/// Everything needed to turn a query into procedure text.
pub struct QueryContext<'a> {
    pub actions: &'a ActionSet,
    pub translator: &'a dyn Translator,
}

impl<'a> QueryContext<'a> {
    pub fn new(actions: &'a ActionSet, translator: &'a dyn Translator) -> Self {
        Self {
            actions,
            translator,
        }
    }

    /// Procedure text encoding `query`, named [`Query::procedure_name`].
    pub fn procedure_text(&self, query: &Query) -> String {
        let actions: Vec<&Action> = self.actions.actions().collect();
        let index_of = |action: &Action| actions.iter().position(|a| *a == action);
        let main = query.main_action();
        let main_idx = index_of(main);

        let mut body = Lines::default();

        body.push("var $inv: bool;");
        for (k, action) in actions.iter().enumerate() {
            body.push(format!("var $pre{k}: bool;"));
            for (i, ty) in action.parameter_types().iter().enumerate() {
                body.push(format!("var $a{k}_{i}: {ty};"));
            }
        }
        if let Some(ret) = &main.operation().return_type {
            body.push(format!("var $ret: {ret};"));
        }
        body.blank();

        body.push("assume this != null;");
        body.push(format!("call $inv := {}(this);", self.invariant_proc()));
        body.push("assume $inv;");

        // Source-state enabledness.
        let global = matches!(
            query.kind(),
            QueryKind::Necessary {
                scope: Scope::Global,
                ..
            }
        );
        for (k, action) in actions.iter().enumerate() {
            if global && Some(k) != main_idx {
                continue;
            }
            body.push(self.call_pre(k, action));
            if query.source().is_enabled(action) {
                body.push(format!("assume $pre{k};"));
            } else {
                body.push(format!("assume !$pre{k};"));
            }
        }
        body.blank();

        // The main action runs with the arguments its precondition accepted.
        let main_args = match main_idx {
            Some(k) => args(k, main),
            None => String::new(),
        };
        let main_proc = self.translator.procedure_name(main.operation());
        let lhs = if main.operation().return_type.is_some() {
            "$ret := "
        } else {
            ""
        };
        body.push(format!("call {lhs}{main_proc}(this{main_args});"));

        let completion = query.completion().unwrap_or(Completion::Normal);
        match completion {
            Completion::Normal => body.push("assume $Exception == null;"),
            Completion::Exceptional => {
                body.push("assume $Exception != null;");
                body.push("$Exception := null;");
            }
        }
        body.blank();

        let assert = match completion {
            Completion::Normal => "assert",
            Completion::Exceptional => "assert {:exceptional_path}",
        };

        match query.kind() {
            QueryKind::Invariant { .. } => {
                body.push(format!("call $inv := {}(this);", self.invariant_proc()));
                body.push(format!("{assert} $inv;"));
            }
            QueryKind::Transition { target, .. } => {
                let mut literals = Vec::with_capacity(actions.len());
                for (k, action) in actions.iter().enumerate() {
                    body.extend(havoc(k, action));
                    body.push(self.call_pre(k, action));
                    if target.is_enabled(action) {
                        literals.push(format!("$pre{k}"));
                    } else {
                        literals.push(format!("!$pre{k}"));
                    }
                }
                let conjunction = if literals.is_empty() {
                    "true".to_string()
                } else {
                    literals.join(" && ")
                };
                body.push(format!("{assert} !({conjunction});"));
            }
            QueryKind::Necessary {
                necessity, tested, ..
            } => {
                if let Some(k) = index_of(tested) {
                    body.extend(havoc(k, tested));
                    body.push(self.call_pre(k, tested));
                    match necessity {
                        Necessity::Enabled => body.push(format!("{assert} $pre{k};")),
                        Necessity::Disabled => body.push(format!("{assert} !$pre{k};")),
                    }
                }
            }
        }

        let mut out = format!("procedure {}(this: {RECEIVER_TYPE})\n", query.procedure_name());
        let globals = self.translator.modified_globals();
        if !globals.is_empty() {
            out.push_str(&format!("  modifies {};\n", globals.join(", ")));
        }
        out.push_str("{\n");
        for line in body.0 {
            if line.is_empty() {
                out.push('\n');
            } else {
                out.push_str("  ");
                out.push_str(&line);
                out.push('\n');
            }
        }
        out.push_str("}\n");
        out
    }

    fn invariant_proc(&self) -> String {
        self.translator
            .procedure_name(self.actions.invariant().operation())
    }

    fn call_pre(&self, k: usize, action: &Action) -> String {
        let pre: &Operation = action.precondition();
        format!(
            "call $pre{k} := {}(this{});",
            self.translator.procedure_name(pre),
            args(k, action)
        )
    }
}

impl Query {
    /// Shorthand for [`QueryContext::procedure_text`].
    pub fn program_text(&self, ctx: &QueryContext<'_>) -> String {
        ctx.procedure_text(self)
    }
}

fn args(k: usize, action: &Action) -> String {
    (0..action.parameter_types().len())
        .map(|i| format!(", $a{k}_{i}"))
        .collect()
}

fn havoc(k: usize, action: &Action) -> Option<String> {
    let n = action.parameter_types().len();
    (n > 0).then(|| {
        let vars: Vec<_> = (0..n).map(|i| format!("$a{k}_{i}")).collect();
        format!("havoc {};", vars.join(", "))
    })
}

#[derive(Default)]
struct Lines(Vec<String>);

impl Lines {
    fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    fn blank(&mut self) {
        self.0.push(String::new());
    }
}

impl Extend<String> for Lines {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
