//! Zero-truncated Poisson model for strain counts.
//!
//! The truncation conditions on at least one strain being observed: samples
//! where no target organism was recovered never enter the count data.

use crate::data::StrainCounts;
use crate::error::{Result, SamplingError};
use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;

/// Maximum Newton iterations for the rate estimate.
const MAX_ITER: usize = 50;

/// Relative convergence tolerance for the rate.
const TOL: f64 = 1e-10;

/// Lower bound for the rate (boundary of the parameter space).
const RATE_LOWER: f64 = 1e-8;

/// A fitted zero-truncated Poisson model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoissonFit {
    /// Estimated Poisson rate (lambda) of the untruncated distribution.
    pub rate: f64,
    /// Log-likelihood at the estimate.
    pub log_likelihood: f64,
    /// Number of observations used (positive counts only).
    pub n_obs: usize,
    /// Newton iterations performed.
    pub iterations: usize,
    /// Whether the estimate converged.
    pub converged: bool,
}

impl PoissonFit {
    /// Akaike information criterion (one free parameter).
    pub fn aic(&self) -> f64 {
        2.0 - 2.0 * self.log_likelihood
    }

    /// Mean of the zero-truncated distribution at the fitted rate.
    pub fn truncated_mean(&self) -> f64 {
        ztp_mean(self.rate)
    }
}

/// Fit a zero-truncated Poisson model by maximum likelihood.
///
/// The MLE solves `lambda / (1 - exp(-lambda)) = mean(k)` by Newton
/// iteration. Counts of zero are excluded before fitting.
pub fn fit_poisson(counts: &StrainCounts) -> Result<PoissonFit> {
    let ks = counts.positive_counts();
    if ks.is_empty() {
        return Err(SamplingError::EmptyData(
            "No positive strain counts to fit".to_string(),
        ));
    }
    let n = ks.len();
    let mean = ks.iter().map(|&k| k as f64).sum::<f64>() / n as f64;

    // Every sample carried exactly one strain: the MLE sits on the boundary
    // lambda -> 0 and the truncated distribution degenerates to a point mass.
    if mean <= 1.0 + 1e-12 {
        log::warn!("All strain counts are 1; zero-truncated Poisson rate pinned at boundary");
        let rate = RATE_LOWER;
        return Ok(PoissonFit {
            rate,
            log_likelihood: ztp_log_likelihood(&ks, rate),
            n_obs: n,
            iterations: 0,
            converged: true,
        });
    }

    let mut lambda = mean;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..MAX_ITER {
        iterations = iter + 1;
        let g = ztp_mean(lambda) - mean;
        let gp = ztp_mean_derivative(lambda);
        if gp.abs() < f64::MIN_POSITIVE {
            break;
        }
        let next = (lambda - g / gp).max(RATE_LOWER);
        let delta = (next - lambda).abs();
        lambda = next;
        if delta < TOL * lambda.max(1.0) {
            converged = true;
            break;
        }
    }

    if !converged {
        log::warn!(
            "Zero-truncated Poisson fit did not converge in {} iterations (rate {:.6})",
            iterations,
            lambda
        );
    }

    Ok(PoissonFit {
        rate: lambda,
        log_likelihood: ztp_log_likelihood(&ks, lambda),
        n_obs: n,
        iterations,
        converged,
    })
}

/// Mean of the zero-truncated Poisson: `lambda / (1 - exp(-lambda))`.
fn ztp_mean(lambda: f64) -> f64 {
    lambda / (-(-lambda).exp_m1())
}

/// Derivative of the zero-truncated mean with respect to lambda.
fn ztp_mean_derivative(lambda: f64) -> f64 {
    let one_minus = -(-lambda).exp_m1();
    (one_minus - lambda * (-lambda).exp()) / (one_minus * one_minus)
}

/// Zero-truncated Poisson probability mass at `k` (zero for `k == 0`).
pub fn ztp_pmf(k: u32, lambda: f64) -> f64 {
    if k == 0 || lambda <= 0.0 {
        return 0.0;
    }
    let kf = k as f64;
    let log_num = kf * lambda.ln() - lambda - ln_gamma(kf + 1.0);
    log_num.exp() / (-(-lambda).exp_m1())
}

/// Cumulative zero-truncated Poisson probability over `1..=n`.
pub fn ztp_cdf(n: u32, lambda: f64) -> f64 {
    (1..=n).map(|k| ztp_pmf(k, lambda)).sum::<f64>().min(1.0)
}

/// Log-likelihood of positive counts under the zero-truncated Poisson.
pub fn ztp_log_likelihood(ks: &[u32], lambda: f64) -> f64 {
    let log_trunc = (-(-lambda).exp_m1()).ln();
    ks.iter()
        .map(|&k| {
            let kf = k as f64;
            kf * lambda.ln() - lambda - ln_gamma(kf + 1.0) - log_trunc
        })
        .sum()
}
