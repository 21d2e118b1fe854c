//! Query-draining workers.

use crate::error::ConstructionResult;
use crate::explorer::{ConstructionConfig, Exploration};
use crate::program::ProgramBuffer;
use crate::queue::Poll;
use crate::verifier::{RunnerResult, VerifierAdapter};
use epa_query::{Answer, Query, QueryContext, QueryKind, VerifierResult};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drains the shared queue against a private, growing verification program.
///
/// Runs until the queue is closed and empty, or the construction is aborted.
/// Any error is fatal: the worker aborts the whole construction and returns it.
pub struct VerificationWorker<V> {
    id: usize,
    exploration: Arc<Exploration>,
    program: ProgramBuffer,
    verifier: V,
    poll_interval: Duration,
    queries_run: usize,
}

impl<V: VerifierAdapter> VerificationWorker<V> {
    pub(crate) fn new(
        id: usize,
        exploration: Arc<Exploration>,
        base: &str,
        verifier: V,
        config: &ConstructionConfig,
    ) -> ConstructionResult<Self> {
        let program = ProgramBuffer::create(base, config.program_dir.as_deref())?;
        Ok(Self {
            id,
            exploration,
            program,
            verifier,
            poll_interval: config.poll_interval,
            queries_run: 0,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn program(&self) -> &ProgramBuffer {
        &self.program
    }

    /// Process queries until shutdown. Returns the number of verifier runs.
    pub fn run(mut self) -> ConstructionResult<usize> {
        debug!(worker = self.id, program = %self.program.path().display(), "worker started");
        let exploration = Arc::clone(&self.exploration);
        let queue = &exploration.queue;
        loop {
            if exploration.should_stop() {
                break;
            }
            match queue.poll(self.poll_interval) {
                Poll::Item(query) => {
                    let outcome = self.process(&query);
                    queue.task_done();
                    if let Err(e) = outcome {
                        error!(worker = self.id, %query, error = %e, "query failed");
                        exploration.abort();
                        return Err(e);
                    }
                }
                Poll::Empty => continue,
                Poll::Closed => break,
            }
        }
        debug!(worker = self.id, queries = self.queries_run, "worker finished");
        Ok(self.queries_run)
    }

    fn process(&mut self, query: &Query) -> ConstructionResult<()> {
        let name = query.procedure_name();
        let text = {
            let ctx = QueryContext::new(
                &self.exploration.actions,
                self.exploration.translator.as_ref(),
            );
            query.program_text(&ctx)
        };
        self.program.append(&name, &text)?;

        let run = self.verifier.run(self.program.path(), query)?;
        self.queries_run += 1;
        self.exploration.queries_run.fetch_add(1, Ordering::Relaxed);

        let answer = self.exploration.log.record(query, &run);
        self.trace(query, &name, &run, answer);
        self.exploration.on_answer(query, answer)
    }

    fn trace(&self, query: &Query, procedure: &str, run: &RunnerResult, answer: Answer) {
        let worker = self.id;
        let elapsed_ms = run.elapsed.as_millis() as u64;
        match (query.kind(), answer) {
            (QueryKind::Transition { target, .. }, Answer::Yes) => info!(
                worker,
                source = %query.source(),
                action = %query.main_action(),
                %target,
                elapsed_ms,
                "confirmed transition"
            ),
            (QueryKind::Transition { target, .. }, Answer::Maybe) => warn!(
                worker,
                source = %query.source(),
                action = %query.main_action(),
                %target,
                elapsed_ms,
                "possible transition"
            ),
            _ if run.result == VerifierResult::ThrowSafetyConfirmed => warn!(
                worker,
                procedure,
                result = %run.result,
                %answer,
                elapsed_ms,
                "throw safety confirmed"
            ),
            _ => debug!(
                worker,
                procedure,
                result = %run.result,
                %answer,
                elapsed_ms,
                "query answered"
            ),
        }
    }
}
