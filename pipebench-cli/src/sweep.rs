//! Sweep Control
//!
//! Runs one measurement per filter-count point, strictly sequentially: the
//! next point only starts configuring once the previous point's artifacts
//! are fully torn down, because every point shares the same queue and log
//! names. Each completed point appends one row to the report and flushes
//! it, so an interrupted sweep keeps everything already measured.

use crate::orchestrator::{PipelineSpec, RunOrchestrator};
use anyhow::Context;
use pipebench_core::{analyze, RunConfig, Stage, TimeLog, TotalMode};
use pipebench_report::{ResultRow, SweepReport};
use std::ops::Range;
use tracing::info;

/// The full set of sweep points
#[derive(Debug, Clone)]
pub struct SweepPlan {
    /// Half-open range of filter counts
    pub filters: Range<u32>,
    /// Fixed load parameter for every point
    pub periods: u32,
}

impl SweepPlan {
    /// Sweep points in increasing filter-count order
    pub fn points(&self) -> impl Iterator<Item = RunConfig> + '_ {
        let periods = self.periods;
        self.filters
            .clone()
            .map(move |filter_count| RunConfig {
                filter_count,
                periods,
            })
    }
}

/// Everything one sweep owns: the pipeline layout, the open report and the
/// aggregation mode. Passed explicitly to each point instead of living in
/// globals.
pub struct SweepContext {
    /// External pipeline layout
    pub pipeline: PipelineSpec,
    /// Open report writer
    pub report: SweepReport,
    /// Aggregate-total mode
    pub total_mode: TotalMode,
}

/// Run every sweep point in order, appending one report row per point.
///
/// A failed point stops the sweep; rows for completed points stay in the
/// report.
pub fn run_sweep(plan: &SweepPlan, ctx: &mut SweepContext) -> anyhow::Result<()> {
    for config in plan.points() {
        run_point(ctx, &config).with_context(|| {
            format!(
                "sweep point failed: filters = {}, periods = {}",
                config.filter_count, config.periods
            )
        })?;
    }
    info!(
        rows = ctx.report.rows_written(),
        report = %ctx.report.path().display(),
        "sweep complete"
    );
    Ok(())
}

fn run_point(ctx: &mut SweepContext, config: &RunConfig) -> anyhow::Result<()> {
    info!(
        filters = config.filter_count,
        periods = config.periods,
        "measuring"
    );

    RunOrchestrator::new(&ctx.pipeline).execute(config)?;

    let row = analyze_point(&ctx.pipeline, ctx.total_mode, config.filter_count)?;
    ctx.report.append(&row)?;
    Ok(())
}

fn analyze_point(
    pipeline: &PipelineSpec,
    mode: TotalMode,
    filter_count: u32,
) -> anyhow::Result<ResultRow> {
    let capture = TimeLog::load(pipeline.log(Stage::Capture))?;
    let filter = TimeLog::load(pipeline.log(Stage::Filter))?;
    let playback = TimeLog::load(pipeline.log(Stage::Playback))?;

    let stats = analyze(&capture, &filter, &playback, mode)?;
    Ok(ResultRow {
        filter_count,
        capture_to_filter: stats.capture_to_filter,
        filter_to_playback: stats.filter_to_playback,
        total: stats.total,
    })
}
