#![warn(missing_docs)]
//! Pipebench Report - Sweep Report Output
//!
//! One CSV file per sweep: a fixed header row, then one row per sweep
//! point, appended in sweep order and flushed after every row so completed
//! points survive an interrupted sweep. The file is never rewritten.

mod report;

pub use report::{ReportError, ResultRow, SweepReport, REPORT_HEADER};
