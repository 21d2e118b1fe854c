//! Verifier adapters.

use crate::error::VerifierError;
use epa_query::{Query, VerifierResult};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use wait_timeout::ChildExt;

/// Classified outcome of one verifier run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerResult {
    pub result: VerifierResult,
    /// Command line that produced the result, for the report.
    pub command: String,
    pub elapsed: Duration,
}

/// Runs one query procedure of a program file.
///
/// Every worker owns its own clone, so implementations may keep per-process
/// state without synchronisation.
pub trait VerifierAdapter: Send {
    fn run(&self, program: &Path, query: &Query) -> Result<RunnerResult, VerifierError>;
}

#[derive(Debug, Clone)]
pub struct CorralConfig {
    pub binary: PathBuf,
    pub recursion_bound: u32,
    pub timeout: Duration,
    pub extra_args: Vec<String>,
}

impl Default for CorralConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("corral"),
            recursion_bound: 3,
            timeout: Duration::from_secs(600),
            extra_args: Vec::new(),
        }
    }
}

/// Adapter for the Corral bounded verifier.
#[derive(Debug, Clone, Default)]
pub struct CorralVerifier {
    config: CorralConfig,
}

impl CorralVerifier {
    pub fn new(config: CorralConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CorralConfig {
        &self.config
    }

    fn arguments(&self, program: &Path, procedure: &str) -> Vec<String> {
        let mut args = vec![
            program.display().to_string(),
            format!("/main:{procedure}"),
            format!("/recursionBound:{}", self.config.recursion_bound),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args
    }
}

impl VerifierAdapter for CorralVerifier {
    fn run(&self, program: &Path, query: &Query) -> Result<RunnerResult, VerifierError> {
        let procedure = query.procedure_name();
        let args = self.arguments(program, &procedure);
        let binary = self.config.binary.display().to_string();
        let command = format!("{binary} {}", args.join(" "));

        debug!(%command, "invoking Corral");
        let start = Instant::now();
        let mut child = Command::new(&self.config.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| VerifierError::Spawn {
                binary: binary.clone(),
                source,
            })?;

        // Corral may print more than a pipe holds before exiting.
        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        match child.wait_timeout(self.config.timeout)? {
            Some(_) => {}
            None => {
                let _ = child.kill();
                let _ = child.wait();
                info!(%procedure, timeout_s = self.config.timeout.as_secs(), "Corral timed out");
                return Err(VerifierError::Timeout {
                    procedure,
                    timeout: self.config.timeout,
                });
            }
        }
        let elapsed = start.elapsed();
        let stdout = collect(stdout_reader)?;
        let stderr = collect(stderr_reader)?;

        let stdout = String::from_utf8_lossy(&stdout);
        let result = classify_output(&stdout).ok_or_else(|| {
            let stderr = String::from_utf8_lossy(&stderr);
            VerifierError::Unclassified {
                procedure: procedure.clone(),
                output: format!("{}\n{}", stdout.trim(), stderr.trim()).trim().to_string(),
            }
        })?;
        debug!(%procedure, %result, elapsed_ms = elapsed.as_millis() as u64, "Corral finished");

        Ok(RunnerResult {
            result,
            command,
            elapsed,
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn collect(reader: JoinHandle<io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    reader
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("output reader panicked")))
}

/// Classify Corral's standard output. `None` if it matches no known outcome.
pub fn classify_output(stdout: &str) -> Option<VerifierResult> {
    if stdout.contains("may not throw") {
        Some(VerifierResult::ThrowSafetyConfirmed)
    } else if stdout.contains("True bug") {
        if stdout.contains("exceptional_path") {
            Some(VerifierResult::ExceptionalCounterexample)
        } else {
            Some(VerifierResult::CounterexampleFound)
        }
    } else if stdout.contains("Reached recursion bound") || stdout.contains("timed out") {
        Some(VerifierResult::Inconclusive)
    } else if stdout.contains("Program has no bugs") {
        Some(VerifierResult::NoCounterexample)
    } else {
        None
    }
}
