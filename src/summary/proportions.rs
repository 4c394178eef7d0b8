//! Count-category proportions with Wilson score intervals.

use crate::error::{Result, SamplingError};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Observed proportion for one strain-count category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountCategory {
    /// Strain count this category describes.
    pub count: u32,
    /// Number of samples with exactly this count.
    pub n: usize,
    /// Observed proportion.
    pub proportion: f64,
    /// Wilson interval lower bound.
    pub ci_lower: f64,
    /// Wilson interval upper bound.
    pub ci_upper: f64,
}

/// Tabulated proportions over all observed count categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountTable {
    /// One row per count value from 0 to the observed maximum.
    pub categories: Vec<CountCategory>,
    /// Total number of samples tabulated.
    pub n_total: usize,
    /// Confidence level used for the intervals.
    pub confidence: f64,
}

impl CountTable {
    /// Observed proportion at a count value, if tabulated.
    pub fn proportion_at(&self, count: u32) -> Option<f64> {
        self.categories
            .iter()
            .find(|c| c.count == count)
            .map(|c| c.proportion)
    }

    /// Largest tabulated count.
    pub fn max_count(&self) -> u32 {
        self.categories.last().map(|c| c.count).unwrap_or(0)
    }
}

/// Tabulate empirical proportions of each count value with Wilson intervals.
///
/// Rows cover every count from 0 to the observed maximum so the table aligns
/// with cumulative-distribution supports, including categories nobody hit.
pub fn tabulate(counts: &[u32], confidence: f64) -> Result<CountTable> {
    if counts.is_empty() {
        return Err(SamplingError::EmptyData(
            "No counts to tabulate".to_string(),
        ));
    }
    let n_total = counts.len();
    let max = counts.iter().copied().max().unwrap_or(0);

    let categories = (0..=max)
        .map(|value| {
            let n = counts.iter().filter(|&&k| k == value).count();
            let (ci_lower, ci_upper) = wilson_interval(n, n_total, confidence)?;
            Ok(CountCategory {
                count: value,
                n,
                proportion: n as f64 / n_total as f64,
                ci_lower,
                ci_upper,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CountTable {
        categories,
        n_total,
        confidence,
    })
}

/// Wilson score interval for a binomial proportion.
pub fn wilson_interval(successes: usize, n: usize, confidence: f64) -> Result<(f64, f64)> {
    if n == 0 {
        return Err(SamplingError::InvalidParameter(
            "Wilson interval requires n > 0".to_string(),
        ));
    }
    if !(0.0 < confidence && confidence < 1.0) {
        return Err(SamplingError::InvalidParameter(format!(
            "Confidence level must be in (0, 1), got {}",
            confidence
        )));
    }
    if successes > n {
        return Err(SamplingError::InvalidParameter(format!(
            "successes ({}) exceed trials ({})",
            successes, n
        )));
    }

    let normal = Normal::new(0.0, 1.0).unwrap();
    let z = normal.inverse_cdf(1.0 - (1.0 - confidence) / 2.0);
    let nf = n as f64;
    let p_hat = successes as f64 / nf;
    let z2 = z * z;

    let denom = 1.0 + z2 / nf;
    let center = (p_hat + z2 / (2.0 * nf)) / denom;
    let halfwidth = z / denom * (p_hat * (1.0 - p_hat) / nf + z2 / (4.0 * nf * nf)).sqrt();

    // Rounding at the extremes can push center - halfwidth a hair past the
    // point estimate; the interval must bracket it.
    let lower = (center - halfwidth).max(0.0).min(p_hat);
    let upper = (center + halfwidth).min(1.0).max(p_hat);
    Ok((lower, upper))
}
