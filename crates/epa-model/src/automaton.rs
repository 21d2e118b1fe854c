//! The enabledness protocol automaton.

use crate::state::State;
use crate::transition::{Existence, Transition};
use indexmap::IndexSet;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe, monotonically growing multigraph of abstract states.
///
/// The state registry is the single source of truth for node identity:
/// structurally equal states are stored once, no matter how many workers
/// discover them. Transitions are appended, never deduplicated or removed.
pub struct Automaton {
    graph: Mutex<Graph>,
}

struct Graph {
    initial: State,
    /// States in discovery order.
    states: IndexSet<State>,
    transitions: Vec<Transition>,
}

impl Automaton {
    /// Create an automaton holding only its initial state.
    pub fn new(initial: State) -> Self {
        let mut states = IndexSet::new();
        states.insert(initial.clone());
        Self {
            graph: Mutex::new(Graph {
                initial,
                states,
                transitions: Vec::new(),
            }),
        }
    }

    // The graph only grows, so a guard poisoned by a panicking worker still
    // holds a consistent prefix.
    fn lock(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn initial_state(&self) -> State {
        self.lock().initial.clone()
    }

    /// Register a state. Returns true if it was new.
    pub fn add_state(&self, state: State) -> bool {
        self.lock().states.insert(state)
    }

    /// Append a transition, registering both endpoints.
    /// Returns true if the target state was new.
    pub fn add_transition(&self, transition: Transition) -> bool {
        let mut graph = self.lock();
        graph.states.insert(transition.source.clone());
        let is_new = graph.states.insert(transition.target.clone());
        graph.transitions.push(transition);
        is_new
    }

    pub fn contains_state(&self, state: &State) -> bool {
        self.lock().states.contains(state)
    }

    /// Snapshot of the states, in discovery order.
    pub fn states(&self) -> Vec<State> {
        self.lock().states.iter().cloned().collect()
    }

    /// Snapshot of the transitions, in insertion order.
    pub fn transitions(&self) -> Vec<Transition> {
        self.lock().transitions.clone()
    }

    pub fn transitions_from(&self, source: &State) -> Vec<Transition> {
        self.lock()
            .transitions
            .iter()
            .filter(|t| &t.source == source)
            .cloned()
            .collect()
    }

    pub fn state_count(&self) -> usize {
        self.lock().states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.lock().transitions.len()
    }

    /// Render in Graphviz DOT. Possible transitions are dashed; parallel
    /// edges with the same label and existence are drawn once.
    pub fn to_dot(&self) -> String {
        let graph = self.lock();
        let mut out = String::from("digraph epa {\n    rankdir=LR;\n    node [shape=box];\n");

        for (idx, state) in graph.states.iter().enumerate() {
            let peripheries = if *state == graph.initial { 2 } else { 1 };
            let _ = writeln!(
                out,
                "    s{idx} [label=\"{}\", peripheries={peripheries}];",
                escape(&state.to_string())
            );
        }

        let mut drawn = IndexSet::new();
        for t in &graph.transitions {
            let (Some(src), Some(dst)) = (
                graph.states.get_index_of(&t.source),
                graph.states.get_index_of(&t.target),
            ) else {
                continue;
            };
            if !drawn.insert((src, dst, t.action.clone(), t.existence)) {
                continue;
            }
            let style = match t.existence {
                Existence::Confirmed => "solid",
                Existence::Possible => "dashed",
            };
            let _ = writeln!(
                out,
                "    s{src} -> s{dst} [label=\"{}\", style={style}];",
                escape(&t.action.to_string())
            );
        }

        out.push_str("}\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
