//! Report Rows and the Sweep Report Writer

use pipebench_stats::LatencySummary;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Header row written once at report creation
pub const REPORT_HEADER: &str =
    "filter count,mean time-to-filter,std dev,mean time-to-playback,std dev,mean total,std dev";

/// The report file could not be written
#[derive(Debug, Error)]
#[error("failed to write report {path}: {source}")]
pub struct ReportError {
    /// Report file path
    pub path: PathBuf,
    /// Underlying I/O error
    pub source: std::io::Error,
}

/// One sweep point's numbers, in report column order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRow {
    /// The sweep point's filter count
    pub filter_count: u32,
    /// Capture→filter latency summary
    pub capture_to_filter: LatencySummary,
    /// Filter→playback latency summary
    pub filter_to_playback: LatencySummary,
    /// Aggregate latency summary
    pub total: LatencySummary,
}

impl ResultRow {
    /// Render as one CSV line (no trailing newline), numeric fields as
    /// decimal text.
    pub fn to_csv(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.filter_count,
            self.capture_to_filter.mean,
            self.capture_to_filter.std_dev,
            self.filter_to_playback.mean,
            self.filter_to_playback.std_dev,
            self.total.mean,
            self.total.std_dev
        )
    }
}

/// Writer owning the report file for the lifetime of one sweep.
#[derive(Debug)]
pub struct SweepReport {
    writer: BufWriter<File>,
    path: PathBuf,
    rows: usize,
}

impl SweepReport {
    /// Create the report file, truncating any previous sweep's report, and
    /// write the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| ReportError {
            path: path.clone(),
            source: e,
        })?;
        let mut report = Self {
            writer: BufWriter::new(file),
            path,
            rows: 0,
        };
        report.write_line(REPORT_HEADER)?;
        Ok(report)
    }

    /// Append one row and flush it to disk.
    pub fn append(&mut self, row: &ResultRow) -> Result<(), ReportError> {
        self.write_line(&row.to_csv())?;
        self.rows += 1;
        Ok(())
    }

    /// Number of data rows appended so far.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Report file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) -> Result<(), ReportError> {
        writeln!(self.writer, "{line}").map_err(|e| io_error(&self.path, e))?;
        self.writer.flush().map_err(|e| io_error(&self.path, e))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError {
        path: path.to_path_buf(),
        source,
    }
}
