#![warn(missing_docs)]
//! Pipebench CLI
//!
//! Drives a latency sweep over the external capture/filter/playback
//! pipeline: for each filter count in the configured range it cleans the
//! previous run's artifacts, configures the pipeline through the settings
//! queue, runs the three stage processes to completion, correlates their
//! timestamp logs and appends one row to the sweep report.

mod config;
mod orchestrator;
mod settings;
mod sweep;

pub use config::{
    AnalysisSection, HarnessConfig, PathsSection, QueuesSection, StagesSection, SweepSection,
};
pub use orchestrator::{OrchestratorError, PipelineSpec, RunOrchestrator, RunState};
pub use settings::distribute_settings;
pub use sweep::{run_sweep, SweepContext, SweepPlan};

use anyhow::Context;
use clap::Parser;
use pipebench_core::TotalMode;
use pipebench_report::SweepReport;
use std::path::PathBuf;

/// Pipebench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "pipebench")]
#[command(
    author,
    version,
    about = "Latency sweep harness for the capture/filter/playback pipeline"
)]
pub struct Cli {
    /// Configuration file (default: discover pipebench.toml upward)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// First filter count of the sweep (inclusive)
    #[arg(long)]
    pub filters_from: Option<u32>,

    /// End of the filter-count range (exclusive)
    #[arg(long)]
    pub filters_to: Option<u32>,

    /// Periods parameter handed to every stage
    #[arg(long)]
    pub periods: Option<u32>,

    /// Report output path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Aggregate-total mode: join (per-event) or positional (legacy parity)
    #[arg(long)]
    pub total_mode: Option<String>,

    /// List the sweep points without running anything
    #[arg(long)]
    pub print_plan: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run the harness with arguments from the process command line.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the harness with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("pipebench=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("pipebench=info")
            .init();
    }

    let config = match &cli.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => HarnessConfig::discover().unwrap_or_default(),
    };

    let plan = SweepPlan {
        filters: cli.filters_from.unwrap_or(config.sweep.filters_from)
            ..cli.filters_to.unwrap_or(config.sweep.filters_to),
        periods: cli.periods.unwrap_or(config.sweep.periods),
    };
    anyhow::ensure!(plan.periods > 0, "periods must be a positive integer");
    if plan.filters.is_empty() {
        tracing::warn!(
            from = plan.filters.start,
            to = plan.filters.end,
            "sweep range is empty"
        );
    }

    if cli.print_plan {
        for point in plan.points() {
            println!(
                "filters = {:2}  periods = {}",
                point.filter_count, point.periods
            );
        }
        return Ok(());
    }

    let total_mode: TotalMode = cli
        .total_mode
        .as_deref()
        .unwrap_or(&config.analysis.total_mode)
        .parse()
        .map_err(|reason: String| anyhow::anyhow!(reason))?;

    let report_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.paths.report));
    let report = SweepReport::create(&report_path)
        .with_context(|| format!("creating report {}", report_path.display()))?;

    let pipeline = PipelineSpec {
        capture_program: PathBuf::from(&config.stages.capture),
        filter_program: PathBuf::from(&config.stages.filter),
        playback_program: PathBuf::from(&config.stages.playback),
        capture_log: PathBuf::from(&config.paths.capture_log),
        filter_log: PathBuf::from(&config.paths.filter_log),
        playback_log: PathBuf::from(&config.paths.playback_log),
        input_queue: config.queues.input.clone(),
        output_queue: config.queues.output.clone(),
        settings_queue: config.queues.settings.clone(),
    };

    let mut ctx = SweepContext {
        pipeline,
        report,
        total_mode,
    };
    run_sweep(&plan, &mut ctx)
}
