use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use swell::agent::AgentRunner;
use swell::artifact::{ArtifactProbes, FsArtifacts};
use swell::config::Config;
use swell::executor::Phase;
use swell::manifest;
use swell::observer::StatusObserver;
use swell::scheduler::{Scheduler, SchedulerConfig, DEFAULT_MAX_ATTEMPTS};
use swell::state::StatusBoard;
use swell::{swlog, Result};

/// Swell - wave-based orchestrator for multi-phase task pipelines
#[derive(Parser, Debug)]
#[command(name = "swell")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    SWELL_DEBUG=1   Enable debug logging (alternative to --debug)")]
struct Cli {
    /// Enable debug logging (writes to ~/.swell/swell.log)
    #[arg(short = 'd', long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive every task in a manifest through its phases
    Run(RunArgs),
    /// Print the artifact-derived progress of each task and exit
    Status(StatusArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the task manifest
    #[arg(short, long, default_value = "swell.toml")]
    manifest: PathBuf,

    /// Artifact directory (default: .swell/artifacts next to the manifest)
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    /// Maximum concurrently running tasks
    #[arg(short = 'j', long)]
    max_concurrent: Option<usize>,

    /// Comma-separated subset of phases to execute (plan,implement,review,gate)
    #[arg(long, value_delimiter = ',')]
    phases: Option<Vec<String>>,

    /// Retry ceiling per task for the implement/review loop
    #[arg(long)]
    max_attempts: Option<usize>,

    /// Disable the retry circuit breaker (manual runs)
    #[arg(long)]
    unlimited: bool,

    /// Disable the live status renderer
    #[arg(long)]
    no_status: bool,
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Path to the task manifest
    #[arg(short, long, default_value = "swell.toml")]
    manifest: PathBuf,

    /// Artifact directory (default: .swell/artifacts next to the manifest)
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    /// Emit machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    swell::log::init_with_debug(cli.debug);

    let outcome = match cli.command {
        Command::Run(args) => run(args).await,
        Command::Status(args) => status(args),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Resolve the artifact root: flag, then config file, then a `.swell`
/// directory next to the manifest.
fn resolve_artifacts_dir(manifest_path: &Path, flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.or_else(|| config.artifacts_dir_path()).unwrap_or_else(|| {
        manifest_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(".swell")
            .join("artifacts")
    })
}

fn parse_phases(phases: Option<Vec<String>>) -> Result<Option<HashSet<Phase>>> {
    match phases {
        Some(names) => Ok(Some(
            names
                .iter()
                .map(|name| name.parse::<Phase>())
                .collect::<Result<HashSet<Phase>>>()?,
        )),
        None => Ok(None),
    }
}

async fn run(args: RunArgs) -> Result<ExitCode> {
    let config = Config::load()?;
    let graph = manifest::load_graph(&args.manifest)?;
    let artifacts_root = resolve_artifacts_dir(&args.manifest, args.artifacts_dir, &config);

    swlog!(
        "run: {} tasks from {}, artifacts at {}",
        graph.len(),
        args.manifest.display(),
        artifacts_root.display()
    );

    let probes = Arc::new(FsArtifacts::new(artifacts_root.clone()));
    let runner = Arc::new(AgentRunner::new(
        config.effective_command(),
        artifacts_root,
        config.effective_timeout(),
    )?);
    let board = Arc::new(StatusBoard::from_graph(&graph));

    let mut scheduler = Scheduler::new(
        graph,
        board.clone(),
        probes,
        runner,
        SchedulerConfig {
            allowed_phases: parse_phases(args.phases)?,
            max_concurrent: args.max_concurrent.or(config.max_concurrent),
            unlimited: args.unlimited,
            max_attempts_per_task: args.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
        },
    );

    let observer = (!args.no_status).then(|| StatusObserver::start(board.clone()));
    let report = scheduler.run().await;
    if let Some(observer) = observer {
        observer.stop().await;
    }

    println!(
        "{} completed, {} failed, {} never ready",
        report.completed.len(),
        report.failed.len(),
        report.pending.len()
    );
    if !report.failed.is_empty() {
        println!("failed: {}", report.failed.join(", "));
    }
    if !report.pending.is_empty() {
        println!("never ready: {}", report.pending.join(", "));
    }

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn status(args: StatusArgs) -> Result<ExitCode> {
    let config = Config::load()?;
    let graph = manifest::load_graph(&args.manifest)?;
    let probes = FsArtifacts::new(resolve_artifacts_dir(
        &args.manifest,
        args.artifacts_dir,
        &config,
    ));

    let mut rows = Vec::new();
    for id in graph.task_ids() {
        let stage = if probes.deliverable_exists(&id)? {
            "completed"
        } else if probes.review_exists(&id)? {
            "reviewed"
        } else if probes.plan_marked_complete(&id)? {
            "implemented"
        } else if probes.plan_exists(&id)? {
            "planned"
        } else {
            "not started"
        };
        rows.push((id, stage));
    }

    if args.json {
        let value = serde_json::json!(rows
            .iter()
            .map(|(id, stage)| serde_json::json!({ "id": id, "stage": stage }))
            .collect::<Vec<_>>());
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        for (id, stage) in rows {
            println!("{:<24} {}", id, stage);
        }
    }

    Ok(ExitCode::SUCCESS)
}
