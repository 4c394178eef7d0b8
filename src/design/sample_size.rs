//! Sample size for estimating a proportion to a target margin of error.

use crate::error::{Result, SamplingError};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Default margin: half-width 0.05, a confidence interval 10 percentage
/// points wide.
pub const DEFAULT_MARGIN: f64 = 0.05;

/// Default confidence level.
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Result of a sample-size calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSizePlan {
    /// Number of independent samples required.
    pub n_samples: usize,
    /// Assumed true proportion.
    pub proportion: f64,
    /// Target interval half-width.
    pub margin: f64,
    /// Confidence level.
    pub confidence: f64,
    /// Wilson half-width actually achieved at `n_samples`.
    pub achieved_halfwidth: f64,
}

/// Wilson score interval half-width for an assumed proportion and sample size.
pub fn wilson_halfwidth(p: f64, n: usize, confidence: f64) -> Result<f64> {
    if n == 0 {
        return Err(SamplingError::InvalidParameter(
            "Half-width requires n > 0".to_string(),
        ));
    }
    validate_unit_open(p, "proportion")?;
    validate_unit_open(confidence, "confidence")?;

    let z = standard_normal_quantile(confidence);
    let nf = n as f64;
    let z2 = z * z;
    let denom = 1.0 + z2 / nf;
    Ok(z / denom * (p * (1.0 - p) / nf + z2 / (4.0 * nf * nf)).sqrt())
}

/// Smallest number of samples whose Wilson interval half-width at the assumed
/// proportion is at or below `margin`.
///
/// Seeded by the Wald closed form `z^2 p (1-p) / margin^2`, then adjusted by
/// direct evaluation of the Wilson half-width.
pub fn samples_needed(p: f64, margin: f64, confidence: f64) -> Result<SampleSizePlan> {
    validate_unit_open(p, "proportion")?;
    validate_unit_open(confidence, "confidence")?;
    if !(0.0 < margin && margin < 0.5) {
        return Err(SamplingError::InvalidParameter(format!(
            "margin must be in (0, 0.5), got {}",
            margin
        )));
    }

    let z = standard_normal_quantile(confidence);
    let mut n = ((z * z * p * (1.0 - p) / (margin * margin)).ceil() as usize).max(1);

    while wilson_halfwidth(p, n, confidence)? > margin {
        n += 1;
    }
    while n > 1 && wilson_halfwidth(p, n - 1, confidence)? <= margin {
        n -= 1;
    }

    Ok(SampleSizePlan {
        n_samples: n,
        proportion: p,
        margin,
        confidence,
        achieved_halfwidth: wilson_halfwidth(p, n, confidence)?,
    })
}

fn standard_normal_quantile(confidence: f64) -> f64 {
    let normal = Normal::new(0.0, 1.0).unwrap();
    normal.inverse_cdf(1.0 - (1.0 - confidence) / 2.0)
}

fn validate_unit_open(value: f64, name: &str) -> Result<()> {
    if !(0.0 < value && value < 1.0) {
        return Err(SamplingError::InvalidParameter(format!(
            "{} must be in (0, 1), got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_worst_case_size() {
        // p = 0.5, half-width 0.05, 95%: Wald gives 385, Wilson trims to 381
        let plan = samples_needed(0.5, 0.05, 0.95).unwrap();
        assert_eq!(plan.n_samples, 381);
        assert!(plan.achieved_halfwidth <= 0.05);
    }

    #[test]
    fn test_minimality() {
        let plan = samples_needed(0.3, 0.04, 0.95).unwrap();
        assert!(wilson_halfwidth(0.3, plan.n_samples, 0.95).unwrap() <= 0.04);
        if plan.n_samples > 1 {
            assert!(wilson_halfwidth(0.3, plan.n_samples - 1, 0.95).unwrap() > 0.04);
        }
    }

    #[test]
    fn test_smaller_proportion_needs_fewer_samples() {
        let rare = samples_needed(0.05, 0.05, 0.95).unwrap();
        let worst = samples_needed(0.5, 0.05, 0.95).unwrap();
        assert!(rare.n_samples < worst.n_samples);
    }

    #[test]
    fn test_wider_margin_needs_fewer_samples() {
        let tight = samples_needed(0.2, 0.02, 0.95).unwrap();
        let loose = samples_needed(0.2, 0.1, 0.95).unwrap();
        assert!(loose.n_samples < tight.n_samples);
    }

    #[test]
    fn test_higher_confidence_needs_more_samples() {
        let ninety = samples_needed(0.3, 0.05, 0.90).unwrap();
        let ninety_nine = samples_needed(0.3, 0.05, 0.99).unwrap();
        assert!(ninety_nine.n_samples > ninety.n_samples);
    }

    #[test]
    fn test_halfwidth_shrinks_with_n() {
        let wide = wilson_halfwidth(0.4, 10, 0.95).unwrap();
        let narrow = wilson_halfwidth(0.4, 1000, 0.95).unwrap();
        assert!(narrow < wide);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(samples_needed(0.0, 0.05, 0.95).is_err());
        assert!(samples_needed(1.0, 0.05, 0.95).is_err());
        assert!(samples_needed(0.3, 0.0, 0.95).is_err());
        assert!(samples_needed(0.3, 0.5, 0.95).is_err());
        assert!(samples_needed(0.3, 0.05, 1.0).is_err());
        assert!(wilson_halfwidth(0.3, 0, 0.95).is_err());
    }
}
