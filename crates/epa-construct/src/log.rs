//! Structured record of every query outcome.

use crate::error::{ConstructionResult, IntegrityError};
use crate::verifier::RunnerResult;
use epa_model::{Action, State, Transition};
use epa_query::{Answer, Completion, Necessity, Query, QueryKind, Scope};
use indexmap::{IndexMap, IndexSet};
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of one query as recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryInfo {
    pub answer: Answer,
    pub run: RunnerResult,
}

/// Everything recorded for one (state, main action) pair.
#[derive(Debug, Clone, Default)]
pub struct StateActionInfo {
    pub necessarily_enabled: IndexMap<Action, QueryInfo>,
    pub necessarily_disabled: IndexMap<Action, QueryInfo>,
    pub normal_transitions: IndexMap<State, QueryInfo>,
    pub exceptional_transitions: IndexMap<State, QueryInfo>,
    /// Targets first discovered through this pair.
    pub enqueued: IndexSet<State>,
    pub normal_invariant: Option<QueryInfo>,
    pub exceptional_invariant: Option<QueryInfo>,
}

impl StateActionInfo {
    fn necessities_mut(&mut self, necessity: Necessity) -> &mut IndexMap<Action, QueryInfo> {
        match necessity {
            Necessity::Enabled => &mut self.necessarily_enabled,
            Necessity::Disabled => &mut self.necessarily_disabled,
        }
    }

    fn necessities(&self, necessity: Necessity) -> &IndexMap<Action, QueryInfo> {
        match necessity {
            Necessity::Enabled => &self.necessarily_enabled,
            Necessity::Disabled => &self.necessarily_disabled,
        }
    }

    fn tested_actions(&self) -> IndexSet<&Action> {
        self.necessarily_enabled
            .keys()
            .chain(self.necessarily_disabled.keys())
            .collect()
    }

    fn targets(&self) -> IndexSet<&State> {
        self.normal_transitions
            .keys()
            .chain(self.exceptional_transitions.keys())
            .collect()
    }

    fn is_inconsistent(&self, tested: &Action) -> bool {
        ResultLog::are_inconsistent(
            self.necessarily_enabled.get(tested).map(|i| i.answer),
            self.necessarily_disabled.get(tested).map(|i| i.answer),
        )
    }
}

/// Contradictory necessity evidence for one tested action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inconsistency {
    /// `None` for the global table.
    pub state: Option<State>,
    pub main_action: Action,
    pub tested: Action,
}

#[derive(Default)]
struct Tables {
    visited: IndexSet<State>,
    per_state: IndexMap<State, IndexMap<Action, StateActionInfo>>,
    global: IndexMap<Action, StateActionInfo>,
}

impl Tables {
    fn info_mut(&mut self, state: &State, main: &Action) -> &mut StateActionInfo {
        self.per_state
            .entry(state.clone())
            .or_default()
            .entry(main.clone())
            .or_default()
    }
}

/// Concurrency-safe recorder of query outcomes.
///
/// Global necessity answers live in their own table keyed by main action and
/// double as the cache consulted for single-action states. All methods,
/// including report emission, are mutually exclusive.
#[derive(Default)]
pub struct ResultLog {
    tables: Mutex<Tables>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a state to the ordered visited list. Returns false if already there.
    pub fn register_visited(&self, state: State) -> bool {
        self.lock().visited.insert(state)
    }

    /// Record a query outcome and return its answer.
    pub fn record(&self, query: &Query, run: &RunnerResult) -> Answer {
        let answer = query.answer(run.result);
        let info = QueryInfo {
            answer,
            run: run.clone(),
        };
        let mut tables = self.lock();
        let source = query.source();
        let main = query.main_action();
        match query.kind() {
            QueryKind::Necessary {
                necessity,
                scope: Scope::Global,
                tested,
            } => {
                tables
                    .global
                    .entry(main.clone())
                    .or_default()
                    .necessities_mut(*necessity)
                    .insert(tested.clone(), info);
            }
            QueryKind::Necessary {
                necessity, tested, ..
            } => {
                tables
                    .info_mut(source, main)
                    .necessities_mut(*necessity)
                    .insert(tested.clone(), info);
            }
            QueryKind::Invariant { completion } => {
                let entry = tables.info_mut(source, main);
                match completion {
                    Completion::Normal => entry.normal_invariant = Some(info),
                    Completion::Exceptional => entry.exceptional_invariant = Some(info),
                }
            }
            QueryKind::Transition { completion, target } => {
                let entry = tables.info_mut(source, main);
                match completion {
                    Completion::Normal => entry.normal_transitions.insert(target.clone(), info),
                    Completion::Exceptional => {
                        entry.exceptional_transitions.insert(target.clone(), info)
                    }
                };
            }
        }
        answer
    }

    /// Note that `transition` discovered its target, which becomes visited.
    pub fn record_enqueued(&self, transition: &Transition) {
        let mut tables = self.lock();
        tables.visited.insert(transition.target.clone());
        tables
            .info_mut(&transition.source, &transition.action)
            .enqueued
            .insert(transition.target.clone());
        tables
            .per_state
            .entry(transition.target.clone())
            .or_default();
    }

    /// Cached global necessity answer, if one was recorded.
    pub fn global_answer(&self, main: &Action, tested: &Action, necessity: Necessity) -> Option<Answer> {
        let tables = self.lock();
        let info = tables.global.get(main)?.necessities(necessity).get(tested)?;
        Some(info.answer)
    }

    /// Answer a necessity query from the global table, if a recorded answer applies.
    ///
    /// A global answer assumes only the invariant and the main action's
    /// precondition. It is reused as is for global queries. For a local query
    /// only YES carries over, since a necessity proven under weaker assumptions
    /// still holds; the entry is then copied into the state's own table.
    pub fn reuse_global(&self, query: &Query) -> Option<Answer> {
        let QueryKind::Necessary {
            necessity,
            scope,
            tested,
        } = query.kind()
        else {
            return None;
        };
        let mut tables = self.lock();
        let info = tables
            .global
            .get(query.main_action())?
            .necessities(*necessity)
            .get(tested)?
            .clone();
        match scope {
            Scope::Global => Some(info.answer),
            Scope::Local if info.answer == Answer::Yes => {
                let answer = info.answer;
                tables
                    .info_mut(query.source(), query.main_action())
                    .necessities_mut(*necessity)
                    .insert(tested.clone(), info);
                Some(answer)
            }
            Scope::Local => None,
        }
    }

    pub fn visited_states(&self) -> Vec<State> {
        self.lock().visited.iter().cloned().collect()
    }

    pub fn is_visited(&self, state: &State) -> bool {
        self.lock().visited.contains(state)
    }

    pub fn info(&self, state: &State, main: &Action) -> Option<StateActionInfo> {
        self.lock().per_state.get(state)?.get(main).cloned()
    }

    pub fn global_info(&self, main: &Action) -> Option<StateActionInfo> {
        self.lock().global.get(main).cloned()
    }

    /// True iff both answers are present and both are YES.
    pub fn are_inconsistent(enabled: Option<Answer>, disabled: Option<Answer>) -> bool {
        enabled == Some(Answer::Yes) && disabled == Some(Answer::Yes)
    }

    /// Every contradictory necessity pair, global table first.
    pub fn inconsistencies(&self) -> Vec<Inconsistency> {
        let tables = self.lock();
        let mut found = Vec::new();
        for (main, info) in &tables.global {
            for tested in info.tested_actions() {
                if info.is_inconsistent(tested) {
                    found.push(Inconsistency {
                        state: None,
                        main_action: main.clone(),
                        tested: tested.clone(),
                    });
                }
            }
        }
        for (state, actions) in &tables.per_state {
            for (main, info) in actions {
                for tested in info.tested_actions() {
                    if info.is_inconsistent(tested) {
                        found.push(Inconsistency {
                            state: Some(state.clone()),
                            main_action: main.clone(),
                            tested: tested.clone(),
                        });
                    }
                }
            }
        }
        found
    }

    /// Every state with recorded info must have been visited.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        check_tables(&self.lock())
    }

    /// Write the full report: global table, then each visited state in order.
    pub fn write_report<W: Write>(&self, out: &mut W) -> ConstructionResult<()> {
        let tables = self.lock();
        check_tables(&tables)?;

        writeln!(out, "Global necessarily enabled/disabled queries: ")?;
        writeln!(out)?;
        writeln!(out)?;
        for (main, info) in &tables.global {
            writeln!(out, "\tMain Action: {main}")?;
            write_necessities(out, info, "\t\t")?;
        }
        writeln!(out)?;
        writeln!(out)?;

        writeln!(out, "Normal queries: ")?;
        for state in &tables.visited {
            for _ in 0..4 {
                writeln!(out)?;
            }
            writeln!(out, "State: {state}")?;
            let Some(actions) = tables.per_state.get(state) else {
                continue;
            };
            for (main, info) in actions {
                writeln!(out)?;
                writeln!(out)?;
                writeln!(out, "\tAction: {main}")?;
                writeln!(out)?;

                writeln!(out, "\t\tInvariant breakage:")?;
                writeln!(out)?;
                write_entry(out, "\t\t\t", "Not throwing", info.normal_invariant.as_ref())?;
                write_entry(out, "\t\t\t", "Throwing", info.exceptional_invariant.as_ref())?;
                writeln!(out)?;
                writeln!(out)?;

                writeln!(out, "\t\tNecessary actions:")?;
                writeln!(out)?;
                write_necessities(out, info, "\t\t\t")?;
                writeln!(out)?;
                writeln!(out)?;

                writeln!(out, "\t\tTransitions:")?;
                for target in info.targets() {
                    writeln!(out, "\t\t\tTarget state: {target}")?;
                    if info.enqueued.contains(target) {
                        writeln!(out, "\t\t\t\tEnqueued")?;
                    }
                    write_entry(out, "\t\t\t\t", "Not throwing", info.normal_transitions.get(target))?;
                    write_entry(out, "\t\t\t\t", "Throwing", info.exceptional_transitions.get(target))?;
                }
                writeln!(out)?;
                writeln!(out)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    /// [`write_report`](Self::write_report) into a string.
    pub fn report(&self) -> ConstructionResult<String> {
        let mut buf = Vec::new();
        self.write_report(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn check_tables(tables: &Tables) -> Result<(), IntegrityError> {
    match tables.per_state.keys().find(|s| !tables.visited.contains(*s)) {
        Some(state) => Err(IntegrityError::UnvisitedState {
            state: state.clone(),
        }),
        None => Ok(()),
    }
}

fn write_necessities<W: Write>(out: &mut W, info: &StateActionInfo, indent: &str) -> io::Result<()> {
    let nested = format!("{indent}\t");
    for tested in info.tested_actions() {
        writeln!(out, "{indent}Tested action: {tested}")?;
        if info.is_inconsistent(tested) {
            writeln!(out, "{nested}Inconsistent")?;
        }
        write_entry(out, &nested, "Enabled", info.necessarily_enabled.get(tested))?;
        write_entry(out, &nested, "Disabled", info.necessarily_disabled.get(tested))?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_entry<W: Write>(
    out: &mut W,
    indent: &str,
    label: &str,
    info: Option<&QueryInfo>,
) -> io::Result<()> {
    writeln!(out, "{indent}{label}:")?;
    match info {
        Some(info) => {
            writeln!(out, "{indent}\tAnswer: {}", info.answer)?;
            writeln!(out, "{indent}\tCommand:")?;
            writeln!(out, "{indent}\t\t{}", info.run.command)?;
        }
        None => writeln!(out, "{indent}\tNot present")?,
    }
    writeln!(out)
}
