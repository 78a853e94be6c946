//! Cross-Stage Latency Correlation
//!
//! Joins adjacent stage logs by event id into per-pair latency sample
//! sequences, then summarizes them into one run's report numbers. An event
//! id that never reached the downstream log is fatal to the whole run's
//! statistics; no partial result is produced.

use crate::timelog::TimeLog;
use crate::Stage;
use pipebench_stats::{sample_std_dev, summarize, LatencySummary, StatsError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the aggregate per-event latency is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotalMode {
    /// Join capture→filter and filter→playback deltas per event id
    #[default]
    Join,
    /// Reproduce the legacy accumulation of every filter→playback delta
    /// onto the tail of the capture-ordered sequence. Kept only for parity
    /// with previously published reports.
    Positional,
}

impl fmt::Display for TotalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotalMode::Join => f.write_str("join"),
            TotalMode::Positional => f.write_str("positional"),
        }
    }
}

impl FromStr for TotalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "join" => Ok(TotalMode::Join),
            "positional" => Ok(TotalMode::Positional),
            other => Err(format!(
                "unknown total mode {other:?} (expected \"join\" or \"positional\")"
            )),
        }
    }
}

/// An event observed upstream never showed up downstream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event {event_id:?} was logged by the {upstream} stage but is missing from the {downstream} log")]
pub struct CorrelationError {
    /// Id of the lost event
    pub event_id: String,
    /// Stage that recorded the event
    pub upstream: Stage,
    /// Stage whose log lacks the event
    pub downstream: Stage,
}

/// Per-pair latency sample sequences for one run, in log traversal order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelatedLatencies {
    /// `filter[id] - capture[id]` per capture-log id
    pub capture_to_filter: Vec<f64>,
    /// `playback[id] - filter[id]` per filter-log id
    pub filter_to_playback: Vec<f64>,
    /// Aggregate per-event latency, per [`TotalMode`]
    pub total: Vec<f64>,
}

/// Summaries of the three latency sequences of one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStatistics {
    /// Capture→filter summary
    pub capture_to_filter: LatencySummary,
    /// Filter→playback summary
    pub filter_to_playback: LatencySummary,
    /// Aggregate summary
    pub total: LatencySummary,
}

/// Errors from turning three stage logs into run statistics
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// A cross-stage id lookup failed
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// A latency sequence was too small to summarize
    #[error("statistics over the {sequence} latency sequence: {source}")]
    Stats {
        /// Which sequence could not be summarized
        sequence: &'static str,
        /// Underlying domain error
        source: StatsError,
    },
}

fn missing(event_id: &str, upstream: Stage, downstream: Stage) -> CorrelationError {
    CorrelationError {
        event_id: event_id.to_string(),
        upstream,
        downstream,
    }
}

/// Join the three stage logs into latency sample sequences.
///
/// Traversal order is the order ids were first encountered in the upstream
/// log of each pair, so repeated runs over the same logs produce identical
/// sequences.
pub fn correlate(
    capture: &TimeLog,
    filter: &TimeLog,
    playback: &TimeLog,
    mode: TotalMode,
) -> Result<CorrelatedLatencies, CorrelationError> {
    let mut capture_to_filter = Vec::with_capacity(capture.len());
    for (id, captured_at) in capture.iter() {
        let filtered_at = filter
            .get(id)
            .ok_or_else(|| missing(id, Stage::Capture, Stage::Filter))?;
        capture_to_filter.push(filtered_at - captured_at);
    }

    let mut filter_to_playback = Vec::with_capacity(filter.len());
    for (id, filtered_at) in filter.iter() {
        let played_at = playback
            .get(id)
            .ok_or_else(|| missing(id, Stage::Filter, Stage::Playback))?;
        filter_to_playback.push(played_at - filtered_at);
    }

    let total = match mode {
        TotalMode::Join => {
            // Summed as the two recorded deltas rather than playback-capture
            // so the aggregate is bit-identical to adding the two samples.
            let mut total = Vec::with_capacity(capture.len());
            for (id, captured_at) in capture.iter() {
                let filtered_at = filter
                    .get(id)
                    .ok_or_else(|| missing(id, Stage::Capture, Stage::Filter))?;
                let played_at = playback
                    .get(id)
                    .ok_or_else(|| missing(id, Stage::Filter, Stage::Playback))?;
                total.push((filtered_at - captured_at) + (played_at - filtered_at));
            }
            total
        }
        TotalMode::Positional => {
            let mut total = capture_to_filter.clone();
            if let Some(tail) = total.last_mut() {
                for delta in &filter_to_playback {
                    *tail += delta;
                }
            }
            total
        }
    };

    Ok(CorrelatedLatencies {
        capture_to_filter,
        filter_to_playback,
        total,
    })
}

/// Correlate three stage logs and summarize the resulting sequences.
///
/// In positional mode the aggregate sequence is measured against the sum of
/// the two pair means (the reference mean the legacy harness used), not its
/// own mean.
pub fn analyze(
    capture: &TimeLog,
    filter: &TimeLog,
    playback: &TimeLog,
    mode: TotalMode,
) -> Result<RunStatistics, AnalysisError> {
    let samples = correlate(capture, filter, playback, mode)?;

    let stats_err = |sequence: &'static str| move |source| AnalysisError::Stats { sequence, source };

    let capture_to_filter =
        summarize(&samples.capture_to_filter).map_err(stats_err("capture-to-filter"))?;
    let filter_to_playback =
        summarize(&samples.filter_to_playback).map_err(stats_err("filter-to-playback"))?;

    let total = match mode {
        TotalMode::Join => summarize(&samples.total).map_err(stats_err("total"))?,
        TotalMode::Positional => {
            let total_mean = capture_to_filter.mean + filter_to_playback.mean;
            let std_dev =
                sample_std_dev(&samples.total, total_mean).map_err(stats_err("total"))?;
            LatencySummary {
                mean: total_mean,
                std_dev,
            }
        }
    };

    Ok(RunStatistics {
        capture_to_filter,
        filter_to_playback,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn log(entries: &[(&str, f64)]) -> TimeLog {
        let mut log = TimeLog::new();
        for (id, ts) in entries {
            log.insert(*id, *ts);
        }
        log
    }

    fn three_event_logs() -> (TimeLog, TimeLog, TimeLog) {
        let capture = log(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let filter = log(&[("a", 1.5), ("b", 3.0), ("c", 3.25)]);
        let playback = log(&[("a", 2.5), ("b", 3.5), ("c", 5.25)]);
        (capture, filter, playback)
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < TOLERANCE, "got {a}, expected {e}");
        }
    }

    #[test]
    fn test_pair_deltas_match_hand_computation() {
        let (capture, filter, playback) = three_event_logs();
        let samples = correlate(&capture, &filter, &playback, TotalMode::Join).unwrap();

        assert_close(&samples.capture_to_filter, &[0.5, 1.0, 0.25]);
        assert_close(&samples.filter_to_playback, &[1.0, 0.5, 2.0]);
        assert_close(&samples.total, &[1.5, 1.5, 2.25]);
    }

    #[test]
    fn test_missing_filter_entry_is_fatal() {
        let capture = log(&[("a", 1.0), ("b", 2.0)]);
        let filter = log(&[("a", 1.5)]);
        let playback = log(&[("a", 2.5)]);

        let err = correlate(&capture, &filter, &playback, TotalMode::Join).unwrap_err();
        assert_eq!(err.event_id, "b");
        assert_eq!(err.upstream, Stage::Capture);
        assert_eq!(err.downstream, Stage::Filter);
    }

    #[test]
    fn test_missing_playback_entry_is_fatal() {
        let capture = log(&[("a", 1.0)]);
        let filter = log(&[("a", 1.5), ("x", 9.0)]);
        let playback = log(&[("a", 2.5)]);

        let err = correlate(&capture, &filter, &playback, TotalMode::Join).unwrap_err();
        assert_eq!(err.event_id, "x");
        assert_eq!(err.upstream, Stage::Filter);
        assert_eq!(err.downstream, Stage::Playback);
    }

    #[test]
    fn test_positional_total_accumulates_on_the_tail() {
        let (capture, filter, playback) = three_event_logs();
        let samples = correlate(&capture, &filter, &playback, TotalMode::Positional).unwrap();

        // Tail element absorbs the whole filter→playback sum (3.5).
        assert_close(&samples.total, &[0.5, 1.0, 3.75]);
    }

    #[test]
    fn test_positional_total_differs_when_orders_differ() {
        // Filter log traverses in a different order than capture; the join
        // total is order-insensitive, the positional one is not.
        let capture = log(&[("a", 1.0), ("b", 2.0)]);
        let filter = log(&[("b", 3.0), ("a", 1.5)]);
        let playback = log(&[("a", 2.0), ("b", 4.0)]);

        let join = correlate(&capture, &filter, &playback, TotalMode::Join).unwrap();
        assert_close(&join.total, &[1.0, 2.0]);

        let positional =
            correlate(&capture, &filter, &playback, TotalMode::Positional).unwrap();
        assert_close(&positional.total, &[0.5, 2.5]);
    }

    #[test]
    fn test_analyze_summaries() {
        // capture_to_filter = {1.0, 3.0}, filter_to_playback = {2.0, 4.0}
        let capture = log(&[("e1", 10.0), ("e2", 20.0)]);
        let filter = log(&[("e1", 11.0), ("e2", 23.0)]);
        let playback = log(&[("e1", 13.0), ("e2", 27.0)]);

        let stats = analyze(&capture, &filter, &playback, TotalMode::Join).unwrap();
        let sqrt2 = (2.0f64).sqrt();

        assert!((stats.capture_to_filter.mean - 2.0).abs() < TOLERANCE);
        assert!((stats.capture_to_filter.std_dev - sqrt2).abs() < TOLERANCE);
        assert!((stats.filter_to_playback.mean - 3.0).abs() < TOLERANCE);
        assert!((stats.filter_to_playback.std_dev - sqrt2).abs() < TOLERANCE);

        // Join totals {3.0, 7.0}: mean 5.0, std dev 2*sqrt(2).
        assert!((stats.total.mean - 5.0).abs() < TOLERANCE);
        assert!((stats.total.std_dev - 2.0 * sqrt2).abs() < TOLERANCE);
    }

    #[test]
    fn test_analyze_positional_uses_summed_pair_means() {
        let capture = log(&[("e1", 10.0), ("e2", 20.0)]);
        let filter = log(&[("e1", 11.0), ("e2", 23.0)]);
        let playback = log(&[("e1", 13.0), ("e2", 27.0)]);

        let stats = analyze(&capture, &filter, &playback, TotalMode::Positional).unwrap();

        // Positional totals are {1.0, 9.0}; the reference mean is
        // mean(capture_to_filter) + mean(filter_to_playback) = 5.0.
        assert!((stats.total.mean - 5.0).abs() < TOLERANCE);
        let expected = ((16.0 + 16.0) / 1.0f64).sqrt();
        assert!((stats.total.std_dev - expected).abs() < TOLERANCE);
    }

    #[test]
    fn test_single_sample_run_is_a_domain_error() {
        let capture = log(&[("only", 1.0)]);
        let filter = log(&[("only", 2.0)]);
        let playback = log(&[("only", 3.0)]);

        let err = analyze(&capture, &filter, &playback, TotalMode::Join).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Stats {
                source: StatsError::InsufficientSamples { count: 1 },
                ..
            }
        ));
    }

    #[test]
    fn test_total_mode_parsing() {
        assert_eq!("join".parse::<TotalMode>().unwrap(), TotalMode::Join);
        assert_eq!(
            "Positional".parse::<TotalMode>().unwrap(),
            TotalMode::Positional
        );
        assert!("both".parse::<TotalMode>().is_err());
    }
}
