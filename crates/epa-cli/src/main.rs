//! Command-line interface for EPA construction.

use clap::{Parser, Subcommand};
use epa_cli::{ClassDescription, ClassFileError};
use epa_construct::{ConstructionConfig, ConstructionError, Constructor, CorralConfig, CorralVerifier};
use epa_model::{ActionSet, ConfigError, Existence};
use miette::Diagnostic;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(code(epa::class_file))]
    ClassFile(#[from] ClassFileError),

    #[error("invalid class: {0}")]
    #[diagnostic(
        code(epa::config),
        help("each action `m` needs a boolean `m_pre` with the same parameters, and the class exactly one `inv()`")
    )]
    Config(#[from] ConfigError),

    #[error("construction failed: {0}")]
    #[diagnostic(code(epa::construction))]
    Construction(#[from] ConstructionError),

    #[error("failed to write {path}: {message}")]
    IoError { path: PathBuf, message: String },
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "epa", version)]
#[command(about = "Enabledness protocol automata construction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a class description and list its actions
    Actions {
        /// Class description (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Construct the EPA of a class
    Construct {
        /// Class description (JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Path to the Corral binary
        #[arg(long, default_value = "corral")]
        corral: PathBuf,

        /// Number of verification workers (0 = use all available)
        #[arg(long, default_value = "0")]
        workers: usize,

        /// Corral recursion bound
        #[arg(long, default_value = "3")]
        recursion_bound: u32,

        /// Per-query verifier timeout in seconds
        #[arg(long, default_value = "600")]
        timeout: u64,

        /// Additional argument passed to Corral (repeatable)
        #[arg(long = "corral-arg", value_name = "ARG")]
        corral_args: Vec<String>,

        /// Directory for the workers' verification programs
        #[arg(long, value_name = "DIR")]
        program_dir: Option<PathBuf>,

        /// Write the per-query report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Write the automaton in Graphviz DOT format to this file
        #[arg(long, value_name = "FILE")]
        dot: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))
    .ok();

    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Construct { verbose: true, .. });
    let directives = log_directives(verbose, std::env::var(EnvFilter::DEFAULT_ENV).ok());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_target(false)
        .without_time()
        .init();

    let result = match cli.command {
        Commands::Actions { file } => cmd_actions(&file),
        Commands::Construct {
            file,
            corral,
            workers,
            recursion_bound,
            timeout,
            corral_args,
            program_dir,
            report,
            dot,
            verbose: _,
        } => cmd_construct(
            &file,
            CorralConfig {
                binary: corral,
                recursion_bound,
                timeout: Duration::from_secs(timeout),
                extra_args: corral_args,
            },
            ConstructionConfig {
                workers,
                program_dir,
                ..ConstructionConfig::default()
            },
            report.as_deref(),
            dot.as_deref(),
        ),
    };

    if let Err(e) = result {
        eprintln!("{:?}", miette::Report::new(e));
        std::process::exit(1);
    }
}

/// `RUST_LOG` when set, otherwise `debug` with `--verbose` and `info` without.
fn log_directives(verbose: bool, env: Option<String>) -> String {
    match env {
        Some(directives) if !directives.trim().is_empty() => directives,
        _ if verbose => "debug".to_string(),
        _ => "info".to_string(),
    }
}

fn cmd_actions(file: &Path) -> CliResult<()> {
    let desc = ClassDescription::load(file)?;
    let class = desc.class_model();
    let actions = ActionSet::extract(&class)?;
    desc.translator()?;
    let initial = desc.initial_state(&actions)?;

    println!("class {}", class.name);
    println!("  invariant: {}", actions.invariant());
    println!("  {} actions", actions.len());
    for action in actions.actions() {
        println!("    {} [{}]", action, action.precondition());
    }
    println!("  initial state: {initial}");
    Ok(())
}

fn cmd_construct(
    file: &Path,
    corral: CorralConfig,
    config: ConstructionConfig,
    report: Option<&Path>,
    dot: Option<&Path>,
) -> CliResult<()> {
    let desc = ClassDescription::load(file)?;
    let translator = Arc::new(desc.translator()?);
    let constructor = Constructor::new(
        desc.class_model(),
        translator,
        CorralVerifier::new(corral),
        config,
    )?;
    let initial = desc.initial_state(constructor.actions())?;

    info!("constructing EPA...");
    let construction = constructor.construct(initial)?;
    let stats = &construction.stats;
    let transitions = construction.automaton.transitions();
    let possible = transitions
        .iter()
        .filter(|t| t.existence == Existence::Possible)
        .count();

    println!();
    println!("Result: OK");
    println!("  States: {}", stats.states);
    println!(
        "  Transitions: {} ({} possible)",
        transitions.len(),
        possible
    );
    println!(
        "  Queries: {} ({} answered from the global table)",
        stats.queries_run, stats.cached_answers
    );
    println!("  Workers: {}", stats.workers);
    println!("  Time: {:.2}s", stats.elapsed.as_secs_f64());
    println!("  Automaton:");
    for t in &transitions {
        let marker = match t.existence {
            Existence::Confirmed => "",
            Existence::Possible => " (possible)",
        };
        println!("    {} --{}--> {}{}", t.source, t.action, t.target, marker);
    }

    let inconsistencies = construction.inconsistencies();
    if !inconsistencies.is_empty() {
        println!("  Inconsistent necessity answers: {}", inconsistencies.len());
        for i in &inconsistencies {
            match &i.state {
                Some(state) => println!("    {} after {} in {}", i.tested, i.main_action, state),
                None => println!("    {} after {} (global)", i.tested, i.main_action),
            }
        }
    }

    if let Some(path) = report {
        let file = File::create(path).map_err(|e| CliError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        construction.write_report(&mut BufWriter::new(file))?;
        info!(path = %path.display(), "report written");
    }
    if let Some(path) = dot {
        fs::write(path, construction.automaton.to_dot()).map_err(|e| CliError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), "automaton written");
    }
    Ok(())
}
