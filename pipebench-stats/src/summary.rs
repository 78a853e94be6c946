//! Mean and Sample Standard Deviation
//!
//! The dispersion estimator is the unbiased sample standard deviation,
//! `sqrt(Σ(x - mean)² / (n - 1))`, not the population form. The n-1 divisor
//! makes fewer than two samples a domain error.

use thiserror::Error;

/// Errors from statistics over a sample sequence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    /// The mean of zero samples is undefined
    #[error("mean is undefined for an empty sample sequence")]
    EmptySamples,

    /// The n-1 divisor needs at least two samples
    #[error("sample standard deviation requires at least 2 samples, got {count}")]
    InsufficientSamples {
        /// Number of samples actually supplied
        count: usize,
    },
}

/// Mean plus sample standard deviation for one latency sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    /// Arithmetic mean, in seconds
    pub mean: f64,
    /// Unbiased sample standard deviation, in seconds
    pub std_dev: f64,
}

/// Arithmetic mean of `samples`.
pub fn mean(samples: &[f64]) -> Result<f64, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::EmptySamples);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Unbiased sample standard deviation of `samples` around `mean`.
///
/// The mean is a parameter rather than derived internally so a sequence can
/// be measured against a reference mean computed elsewhere (the aggregate
/// total in positional mode is measured against the sum of the two pair
/// means, not its own).
pub fn sample_std_dev(samples: &[f64], mean: f64) -> Result<f64, StatsError> {
    if samples.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            count: samples.len(),
        });
    }
    let square_sum: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum();
    Ok((square_sum / (samples.len() - 1) as f64).sqrt())
}

/// Compute mean and sample standard deviation for one sequence.
pub fn summarize(samples: &[f64]) -> Result<LatencySummary, StatsError> {
    let mean = mean(samples)?;
    let std_dev = sample_std_dev(samples, mean)?;
    Ok(LatencySummary { mean, std_dev })
}
