#![warn(missing_docs)]
//! Pipebench Statistical Engine
//!
//! Central tendency and dispersion over latency samples:
//! - Arithmetic mean
//! - Unbiased (n-1 divisor) sample standard deviation
//!
//! Both refuse degenerate inputs with a typed error instead of returning
//! NaN or a negative-sqrt artifact.

mod summary;

pub use summary::{mean, sample_std_dev, summarize, LatencySummary, StatsError};
