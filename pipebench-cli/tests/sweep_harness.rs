//! End-to-end harness tests against stub stage processes.
//!
//! Each stub is a small shell script standing in for one external stage: it
//! ignores the periods argument and writes a fixed timestamp log. The
//! capture stub writes a poisoned log if its log file already exists, so a
//! cleanup failure between sweep points shows up as a correlation error
//! instead of silently re-measuring stale data.

use pipebench_cli::{run_sweep, PipelineSpec, SweepContext, SweepPlan};
use pipebench_core::TotalMode;
use pipebench_report::{SweepReport, REPORT_HEADER};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    let mut permissions = fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(&path, permissions).unwrap();
    path
}

/// Stage stubs producing capture_to_filter = {1.0, 3.0} and
/// filter_to_playback = {2.0, 4.0}.
fn stub_pipeline(dir: &Path, tag: &str) -> PipelineSpec {
    let capture_log = dir.join("log-capture");
    let filter_log = dir.join("log-filter");
    let playback_log = dir.join("log-playback");

    let capture = write_stub(
        dir,
        "capture",
        &format!(
            "if [ -e {log} ]; then\n    printf 'stale 0.0\\n' > {log}\nelse\n    printf 'e1 10.0\\ne2 20.0\\n' > {log}\nfi\n",
            log = capture_log.display()
        ),
    );
    let filter = write_stub(
        dir,
        "filter",
        &format!(
            "printf 'e1 11.0\\ne2 23.0\\n' > {}\n",
            filter_log.display()
        ),
    );
    let playback = write_stub(
        dir,
        "playback",
        &format!(
            "printf 'e1 13.0\\ne2 27.0\\n' > {}\n",
            playback_log.display()
        ),
    );

    let pid = std::process::id();
    PipelineSpec {
        capture_program: capture,
        filter_program: filter,
        playback_program: playback,
        capture_log,
        filter_log,
        playback_log,
        input_queue: format!("/pipebench-e2e-{tag}-in-{pid}"),
        output_queue: format!("/pipebench-e2e-{tag}-out-{pid}"),
        settings_queue: format!("/pipebench-e2e-{tag}-set-{pid}"),
    }
}

fn report_rows(path: &Path) -> Vec<Vec<f64>> {
    let content = fs::read_to_string(path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some(REPORT_HEADER));
    lines
        .map(|line| {
            line.split(',')
                .map(|field| field.parse::<f64>().unwrap())
                .collect()
        })
        .collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "got {actual}, expected {expected}"
    );
}

#[test]
fn test_single_point_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = stub_pipeline(dir.path(), "single");
    let report_path = dir.path().join("results.csv");

    let plan = SweepPlan {
        filters: 2..3,
        periods: 1000,
    };
    let mut ctx = SweepContext {
        pipeline,
        report: SweepReport::create(&report_path).unwrap(),
        total_mode: TotalMode::Join,
    };
    run_sweep(&plan, &mut ctx).unwrap();

    let rows = report_rows(&report_path);
    assert_eq!(rows.len(), 1);

    let row = &rows[0];
    let sqrt2 = (2.0f64).sqrt();
    assert_close(row[0], 2.0); // filter count
    assert_close(row[1], 2.0); // mean time-to-filter
    assert_close(row[2], sqrt2);
    assert_close(row[3], 3.0); // mean time-to-playback
    assert_close(row[4], sqrt2);
    assert_close(row[5], 5.0); // mean total (join: {3.0, 7.0})
    assert_close(row[6], 2.0 * sqrt2);
}

#[test]
fn test_sweep_appends_one_ordered_row_per_point() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = stub_pipeline(dir.path(), "sweep");
    let report_path = dir.path().join("results.csv");

    let plan = SweepPlan {
        filters: 0..3,
        periods: 1000,
    };
    let mut ctx = SweepContext {
        pipeline,
        report: SweepReport::create(&report_path).unwrap(),
        total_mode: TotalMode::Join,
    };

    // The capture stub poisons its log if the previous point's file is
    // still there, so this passing also checks the cleanup ordering.
    run_sweep(&plan, &mut ctx).unwrap();

    let rows = report_rows(&report_path);
    assert_eq!(rows.len(), 3);
    for (index, row) in rows.iter().enumerate() {
        assert_close(row[0], index as f64);
        assert_close(row[1], 2.0);
    }
}

#[test]
fn test_lost_event_stops_the_sweep_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = stub_pipeline(dir.path(), "lost");

    // Filter log drops e2: capture→filter correlation must fail.
    pipeline.filter_program = write_stub(
        dir.path(),
        "filter-lossy",
        &format!(
            "printf 'e1 11.0\\n' > {}\n",
            pipeline.filter_log.display()
        ),
    );

    let report_path = dir.path().join("results.csv");
    let plan = SweepPlan {
        filters: 1..2,
        periods: 1000,
    };
    let mut ctx = SweepContext {
        pipeline,
        report: SweepReport::create(&report_path).unwrap(),
        total_mode: TotalMode::Join,
    };

    let err = run_sweep(&plan, &mut ctx).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("filters = 1"), "message: {message}");
    assert!(
        message.contains("missing from the filter log"),
        "message: {message}"
    );

    // No partial row: only the header was written.
    let content = fs::read_to_string(&report_path).unwrap();
    assert_eq!(content.trim_end(), REPORT_HEADER);
}

#[test]
fn test_positional_mode_reproduces_legacy_totals() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = stub_pipeline(dir.path(), "legacy");
    let report_path = dir.path().join("results.csv");

    let plan = SweepPlan {
        filters: 0..1,
        periods: 1000,
    };
    let mut ctx = SweepContext {
        pipeline,
        report: SweepReport::create(&report_path).unwrap(),
        total_mode: TotalMode::Positional,
    };
    run_sweep(&plan, &mut ctx).unwrap();

    let rows = report_rows(&report_path);
    let row = &rows[0];

    // Positional totals are {1.0, 9.0}, measured against the summed pair
    // means (5.0): std dev = sqrt(32).
    assert_close(row[5], 5.0);
    assert_close(row[6], 32.0f64.sqrt());
}
