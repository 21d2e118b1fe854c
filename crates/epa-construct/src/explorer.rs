//! Exploration orchestrator.
//!
//! Exploring a state enqueues, for every enabled main action, its invariant
//! queries and its necessity queries. Once all necessity answers for a
//! (state, main action) pair are in, the candidate targets are enumerated and
//! the transition queries enqueued. Transitions to unseen states trigger their
//! exploration. Construction ends when no query is outstanding.

use crate::error::{ConstructionError, ConstructionResult, IntegrityError};
use crate::log::{Inconsistency, ResultLog};
use crate::queue::WorkQueue;
use crate::verifier::VerifierAdapter;
use crate::worker::VerificationWorker;
use dashmap::DashMap;
use epa_model::{Action, ActionSet, Automaton, ClassModel, Existence, State, Transition};
use epa_query::{
    Answer, CombinationsGenerator, Completion, Necessity, Query, QueryKind, Scope, Translator,
    MAX_COMBINATION_SIZE,
};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Configuration for a construction run.
#[derive(Debug, Clone)]
pub struct ConstructionConfig {
    /// Number of workers; 0 means one per available core.
    pub workers: usize,
    /// How long an idle worker waits on the queue before re-checking for shutdown.
    pub poll_interval: Duration,
    /// Upper bound on the number of actions branched over per (state, action).
    pub max_combination_size: usize,
    /// Directory for the workers' program files; the system temp dir if unset.
    pub program_dir: Option<PathBuf>,
    /// External cancellation flag.
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            poll_interval: Duration::from_millis(50),
            max_combination_size: MAX_COMBINATION_SIZE,
            program_dir: None,
            stop_flag: None,
        }
    }
}

impl ConstructionConfig {
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstructionStats {
    pub workers: usize,
    /// Verifier invocations.
    pub queries_run: usize,
    /// Necessity answers taken from the global table instead of the verifier.
    pub cached_answers: usize,
    pub states: usize,
    pub transitions: usize,
    pub elapsed: Duration,
}

/// Outcome of a successful construction.
pub struct Construction {
    pub automaton: Arc<Automaton>,
    pub log: Arc<ResultLog>,
    pub stats: ConstructionStats,
}

impl Construction {
    pub fn inconsistencies(&self) -> Vec<Inconsistency> {
        self.log.inconsistencies()
    }

    pub fn write_report<W: Write>(&self, out: &mut W) -> ConstructionResult<()> {
        self.log.write_report(out)
    }
}

/// Builds the EPA of one class.
pub struct Constructor<V> {
    class: ClassModel,
    actions: ActionSet,
    translator: Arc<dyn Translator>,
    verifier: V,
    config: ConstructionConfig,
}

impl<V> Constructor<V>
where
    V: VerifierAdapter + Clone + 'static,
{
    /// Validate the class and extract its actions.
    pub fn new(
        class: ClassModel,
        translator: Arc<dyn Translator>,
        verifier: V,
        config: ConstructionConfig,
    ) -> ConstructionResult<Self> {
        let actions = ActionSet::extract(&class)?;
        info!(class = %class.name, actions = actions.len(), "actions extracted");
        Ok(Self {
            class,
            actions,
            translator,
            verifier,
            config,
        })
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn config(&self) -> &ConstructionConfig {
        &self.config
    }

    /// Run the construction from `initial` to completion.
    ///
    /// The first worker failure stops every worker and is returned; no
    /// automaton is produced by a failed run.
    pub fn construct(&self, initial: State) -> ConstructionResult<Construction> {
        let start = Instant::now();
        let workers = self.config.worker_count();
        let base = self.translator.base_translation(&self.class);
        let exploration = Arc::new(Exploration::new(
            self.actions.clone(),
            Arc::clone(&self.translator),
            initial.clone(),
            &self.config,
        ));

        info!(class = %self.class.name, %initial, workers, "starting construction");
        exploration.log.register_visited(initial.clone());
        exploration.explore(&initial)?;
        exploration.queue.close_if_idle();

        let mut first_error: Option<ConstructionError> = None;
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let shared = Arc::clone(&exploration);
            let verifier = self.verifier.clone();
            let base = base.clone();
            let config = self.config.clone();
            let spawned = thread::Builder::new()
                .name(format!("epa-worker-{id}"))
                .spawn(move || {
                    match VerificationWorker::new(id, Arc::clone(&shared), &base, verifier, &config) {
                        Ok(worker) => worker.run(),
                        Err(e) => {
                            shared.abort();
                            Err(e)
                        }
                    }
                });
            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => {
                    exploration.abort();
                    first_error = Some(e.into());
                    break;
                }
            }
        }

        for (id, handle) in handles {
            match handle.join() {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    exploration.abort();
                    first_error.get_or_insert(ConstructionError::WorkerPanicked { worker: id });
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        if exploration.queue.outstanding() > 0 {
            info!(pending = exploration.queue.outstanding(), "construction cancelled");
            return Err(ConstructionError::Cancelled);
        }
        exploration.log.check_integrity()?;

        let stats = ConstructionStats {
            workers,
            queries_run: exploration.queries_run.load(Ordering::Relaxed),
            cached_answers: exploration.cached_answers.load(Ordering::Relaxed),
            states: exploration.automaton.state_count(),
            transitions: exploration.automaton.transition_count(),
            elapsed: start.elapsed(),
        };
        info!(
            states = stats.states,
            transitions = stats.transitions,
            queries = stats.queries_run,
            cached = stats.cached_answers,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "construction finished"
        );
        Ok(Construction {
            automaton: Arc::clone(&exploration.automaton),
            log: Arc::clone(&exploration.log),
            stats,
        })
    }
}

/// Necessity answers gathered for one (state, main action) pair.
#[derive(Debug, Default)]
struct NecessityFacts {
    remaining: usize,
    enabled: HashMap<Action, Answer>,
    disabled: HashMap<Action, Answer>,
}

impl NecessityFacts {
    fn insert(&mut self, necessity: Necessity, tested: Action, answer: Answer) {
        match necessity {
            Necessity::Enabled => self.enabled.insert(tested, answer),
            Necessity::Disabled => self.disabled.insert(tested, answer),
        };
    }

    /// `Some(true)` if `action` is proven enabled after the main action,
    /// `Some(false)` if proven disabled, `None` if it must be branched over.
    fn fixed(&self, action: &Action) -> Option<bool> {
        let enabled = self.enabled.get(action) == Some(&Answer::Yes);
        let disabled = self.disabled.get(action) == Some(&Answer::Yes);
        match (enabled, disabled) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }
}

/// State shared by the orchestrator and all workers of one run.
pub(crate) struct Exploration {
    pub(crate) actions: ActionSet,
    pub(crate) translator: Arc<dyn Translator>,
    pub(crate) automaton: Arc<Automaton>,
    pub(crate) log: Arc<ResultLog>,
    pub(crate) queue: WorkQueue<Query>,
    pending: DashMap<(State, Action), NecessityFacts>,
    generator: CombinationsGenerator,
    aborted: AtomicBool,
    stop_flag: Option<Arc<AtomicBool>>,
    pub(crate) queries_run: AtomicUsize,
    cached_answers: AtomicUsize,
}

impl Exploration {
    fn new(
        actions: ActionSet,
        translator: Arc<dyn Translator>,
        initial: State,
        config: &ConstructionConfig,
    ) -> Self {
        Self {
            actions,
            translator,
            automaton: Arc::new(Automaton::new(initial)),
            log: Arc::new(ResultLog::new()),
            queue: WorkQueue::new(),
            pending: DashMap::new(),
            generator: CombinationsGenerator::with_max_size(config.max_combination_size),
            aborted: AtomicBool::new(false),
            stop_flag: config.stop_flag.clone(),
            queries_run: AtomicUsize::new(0),
            cached_answers: AtomicUsize::new(0),
        }
    }

    pub(crate) fn should_stop(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
            || self
                .stop_flag
                .as_ref()
                .is_some_and(|f| f.load(Ordering::Relaxed))
    }

    pub(crate) fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
        self.queue.abort();
    }

    fn enqueue(&self, query: Query) {
        if !self.queue.push(query) {
            trace!("queue closed, query dropped");
        }
    }

    /// Enqueue the invariant and necessity queries of every enabled action.
    pub(crate) fn explore(&self, state: &State) -> ConstructionResult<()> {
        if state.is_empty() {
            debug!(%state, "terminal state");
            return Ok(());
        }
        let scope = if state.len() == 1 {
            Scope::Global
        } else {
            Scope::Local
        };

        for main in state.enabled_actions() {
            for completion in [Completion::Normal, Completion::Exceptional] {
                self.enqueue(Query::invariant(state.clone(), main.clone(), completion)?);
            }

            let mut facts = NecessityFacts::default();
            let mut to_run = Vec::new();
            for tested in self.actions.actions().filter(|t| *t != main) {
                for necessity in [Necessity::Enabled, Necessity::Disabled] {
                    let query =
                        Query::necessary(state.clone(), main.clone(), tested.clone(), necessity, scope)?;
                    match self.log.reuse_global(&query) {
                        Some(answer) => {
                            self.cached_answers.fetch_add(1, Ordering::Relaxed);
                            facts.insert(necessity, tested.clone(), answer);
                        }
                        None => to_run.push(query),
                    }
                }
            }

            if to_run.is_empty() {
                self.schedule_transitions(state, main, &facts)?;
                continue;
            }
            facts.remaining = to_run.len();
            self.pending.insert((state.clone(), main.clone()), facts);
            for query in to_run {
                self.enqueue(query);
            }
        }
        Ok(())
    }

    /// React to a recorded answer.
    pub(crate) fn on_answer(&self, query: &Query, answer: Answer) -> ConstructionResult<()> {
        match query.kind() {
            QueryKind::Invariant { .. } => Ok(()),
            QueryKind::Transition { target, .. } => {
                let existence = match answer {
                    Answer::Yes => Existence::Confirmed,
                    Answer::Maybe => Existence::Possible,
                    Answer::No => return Ok(()),
                };
                self.discover(Transition::new(
                    query.source().clone(),
                    target.clone(),
                    query.main_action().clone(),
                    existence,
                ))
            }
            QueryKind::Necessary {
                necessity, tested, ..
            } => self.resolve_necessity(query.source(), query.main_action(), tested, *necessity, answer),
        }
    }

    fn discover(&self, transition: Transition) -> ConstructionResult<()> {
        if !self.automaton.add_transition(transition.clone()) {
            return Ok(());
        }
        self.log.record_enqueued(&transition);
        debug!(state = %transition.target, via = %transition.action, "state enqueued");
        self.explore(&transition.target)
    }

    fn resolve_necessity(
        &self,
        source: &State,
        main: &Action,
        tested: &Action,
        necessity: Necessity,
        answer: Answer,
    ) -> ConstructionResult<()> {
        let key = (source.clone(), main.clone());
        let complete = {
            let Some(mut facts) = self.pending.get_mut(&key) else {
                return Err(IntegrityError::UntrackedNecessity {
                    state: source.clone(),
                    action: main.clone(),
                }
                .into());
            };
            facts.insert(necessity, tested.clone(), answer);
            facts.remaining = facts.remaining.saturating_sub(1);
            facts.remaining == 0
        };
        if !complete {
            return Ok(());
        }
        match self.pending.remove(&key) {
            Some((_, facts)) => self.schedule_transitions(source, main, &facts),
            None => Ok(()),
        }
    }

    /// Enqueue both transition queries for every candidate target of `main` in `source`.
    fn schedule_transitions(
        &self,
        source: &State,
        main: &Action,
        facts: &NecessityFacts,
    ) -> ConstructionResult<()> {
        let mut fixed_in = BTreeSet::new();
        let mut free = BTreeSet::new();
        for action in self.actions.actions() {
            if action == main {
                free.insert(action.clone());
                continue;
            }
            match facts.fixed(action) {
                Some(true) => {
                    fixed_in.insert(action.clone());
                }
                Some(false) => {}
                None => {
                    free.insert(action.clone());
                }
            }
        }

        let candidates = self.generator.combinations(&free)?;
        debug!(
            state = %source,
            action = %main,
            fixed = fixed_in.len(),
            branched = free.len(),
            candidates = candidates.len(),
            "scheduling transition queries"
        );
        for combination in candidates {
            let target = State::new(fixed_in.iter().cloned().chain(combination));
            for completion in [Completion::Normal, Completion::Exceptional] {
                self.enqueue(Query::transition(
                    source.clone(),
                    main.clone(),
                    target.clone(),
                    completion,
                )?);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epa_model::Operation;

    fn action(name: &str) -> Action {
        Action::new(
            Operation::new(format!("C#{name}_pre"), vec![], Some("bool")),
            Operation::new(format!("C#{name}"), vec![], None),
        )
    }

    #[test]
    fn test_fixed_actions_follow_proven_necessities() {
        let mut facts = NecessityFacts::default();
        facts.insert(Necessity::Enabled, action("a"), Answer::Yes);
        facts.insert(Necessity::Disabled, action("a"), Answer::No);
        facts.insert(Necessity::Enabled, action("b"), Answer::No);
        facts.insert(Necessity::Disabled, action("b"), Answer::Yes);
        facts.insert(Necessity::Enabled, action("c"), Answer::Maybe);
        facts.insert(Necessity::Disabled, action("c"), Answer::No);
        facts.insert(Necessity::Enabled, action("d"), Answer::Yes);
        facts.insert(Necessity::Disabled, action("d"), Answer::Yes);
        facts.insert(Necessity::Enabled, action("f"), Answer::No);
        facts.insert(Necessity::Disabled, action("f"), Answer::No);

        assert_eq!(facts.fixed(&action("a")), Some(true));
        assert_eq!(facts.fixed(&action("b")), Some(false));
        assert_eq!(facts.fixed(&action("c")), None);
        // contradictory proofs are branched over
        assert_eq!(facts.fixed(&action("d")), None);
        assert_eq!(facts.fixed(&action("e")), None);
        assert_eq!(facts.fixed(&action("f")), None);
    }

    #[test]
    fn test_default_config() {
        let config = ConstructionConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.max_combination_size, 30);
        assert!(config.worker_count() >= 1);

        let fixed = ConstructionConfig {
            workers: 3,
            ..ConstructionConfig::default()
        };
        assert_eq!(fixed.worker_count(), 3);
    }
}
