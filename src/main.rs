//! courier - background file operations with a terminal UI.
//!
//! Usage:
//!   courier                          Launch interactive TUI
//!   courier copy <SRC>... <DEST>     Copy into DEST and wait
//!   courier move <SRC>... <DEST>     Move into DEST and wait
//!   courier delete <PATH>...         Delete permanently and wait
//!   courier trash <PATH>...          Move to the system trash and wait
//!   courier --help                   Show help

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use tracing_subscriber::EnvFilter;

use courier_core::{ConflictPolicy, EngineConfig, Operation, OperationKind, OperationState};
use courier_ops::{Engine, OperationEvent};

#[derive(Parser)]
#[command(
    name = "courier",
    version,
    about = "Copy, move and delete files in the background",
    long_about = "courier runs file operations as background workers and tracks their \
                  progress.\n\n\
                  Launch the interactive TUI by running `courier`, or use a subcommand \
                  to run a single operation and wait for it."
)]
struct Cli {
    /// Maximum number of operations running at once (0 = unlimited)
    #[arg(short = 'j', long, default_value_t = 0, global = true)]
    max_workers: usize,

    /// What to do when a target already exists
    #[arg(long, value_enum, default_value_t = ConflictArg::Rename, global = true)]
    conflict: ConflictArg,

    /// Write logs to this file (filter with RUST_LOG)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Copy sources into a destination directory
    Copy {
        /// Sources followed by the destination directory
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Move sources into a destination directory
    Move {
        /// Sources followed by the destination directory
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete paths permanently
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Move paths to the system trash
    Trash {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConflictArg {
    /// Pick a free name such as "file (1).txt"
    Rename,
    /// Replace files and merge directories
    Overwrite,
    /// Leave existing targets alone
    Skip,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(arg: ConflictArg) -> Self {
        match arg {
            ConflictArg::Rename => ConflictPolicy::AutoRename,
            ConflictArg::Overwrite => ConflictPolicy::Overwrite,
            ConflictArg::Skip => ConflictPolicy::Skip,
        }
    }
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = EngineConfig::builder()
        .max_workers(cli.max_workers)
        .conflict_policy(ConflictPolicy::from(cli.conflict))
        .build()
        .map_err(|e| eyre!("Invalid configuration: {e}"))?;

    let headless = cli.command.is_some();
    init_logging(cli.log_file.as_deref(), headless)?;
    tracing::debug!(
        max_workers = config.max_workers,
        conflict = %config.conflict_policy,
        headless,
        "starting"
    );

    let Some(command) = cli.command else {
        courier_tui::run(config)?;
        return Ok(ExitCode::SUCCESS);
    };

    let (kind, mut paths, format) = match command {
        Command::Copy { paths, format } => (OperationKind::Copy, paths, format),
        Command::Move { paths, format } => (OperationKind::Move, paths, format),
        Command::Delete { paths, format } => (OperationKind::Delete, paths, format),
        Command::Trash { paths, format } => (OperationKind::Trash, paths, format),
    };
    let destination = if kind.needs_destination() {
        paths.pop()
    } else {
        None
    };

    run_headless(config, kind, paths, destination, format)
}

/// Install the global subscriber.
///
/// The TUI owns the terminal, so without a log file it gets no logging at
/// all; headless runs log to stderr.
fn init_logging(log_file: Option<&Path>, headless: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("Failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None if headless => builder.with_writer(std::io::stderr).try_init(),
        None => return Ok(()),
    };
    installed.map_err(|e| eyre!("Failed to install logger: {e}"))
}

/// Run one operation to completion, reporting progress on stderr.
fn run_headless(
    config: EngineConfig,
    kind: OperationKind,
    sources: Vec<PathBuf>,
    destination: Option<PathBuf>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let mut engine = Engine::new(config);
        let id = engine
            .submit(kind, sources, destination)
            .wrap_err("Request rejected")?;

        let mut stderr = std::io::stderr();
        while let Some(event) = engine.next_event().await {
            let finished = event.is_finished();
            let progressed = matches!(
                event,
                OperationEvent::Started { .. } | OperationEvent::Progress { .. }
            );
            engine.apply(event);

            if let Some(op) = engine.get(id) {
                if progressed && !op.is_terminal() {
                    write!(stderr, "\r{}", op.summary())?;
                    stderr.flush()?;
                }
            }
            if finished {
                writeln!(stderr)?;
                break;
            }
        }

        let op = engine
            .get(id)
            .ok_or_else(|| eyre!("Operation {id} disappeared"))?;
        print_result(op, format)?;

        let code = if op.state() == OperationState::Successful {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
        Ok::<_, color_eyre::Report>(code)
    })
}

fn print_result(op: &Operation, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", op.summary());
            for error in op.errors() {
                println!("  {error}");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(op)?);
        }
    }
    Ok(())
}
