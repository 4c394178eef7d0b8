//! Zero-truncated Poisson-lognormal model.
//!
//! Each subject carries a latent log-rate `mu + sigma * z` with `z ~ N(0, 1)`,
//! and the observed strain count is Poisson at that rate, conditioned on being
//! at least 1. With one observation per subject this is exactly the marginal
//! model of a Poisson GLMM with a per-subject random intercept, so the fit
//! maximizes the Gauss-Hermite approximated marginal likelihood over
//! `(mu, sigma)` directly.

use crate::data::StrainCounts;
use crate::error::{Result, SamplingError};
use crate::model::quadrature::{Quadrature, DEFAULT_NODES};
use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;

/// Configuration for Poisson-lognormal fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlnConfig {
    /// Maximum Newton iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the negative log-likelihood.
    pub tol: f64,
    /// Initial ridge added when the Hessian is not positive definite.
    pub ridge: f64,
    /// Lower bound for sigma (prevents collapse of the random effect).
    pub sigma_lower: f64,
    /// Number of Gauss-Hermite nodes.
    pub nodes: usize,
}

impl Default for PlnConfig {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol: 1e-8,
            ridge: 1e-6,
            sigma_lower: 1e-3,
            nodes: DEFAULT_NODES,
        }
    }
}

/// A fitted zero-truncated Poisson-lognormal model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlnFit {
    /// Mean of the log-rate distribution.
    pub mu: f64,
    /// Standard deviation of the log-rate distribution (the between-subject
    /// heterogeneity).
    pub sigma: f64,
    /// Marginal log-likelihood at the estimate.
    pub log_likelihood: f64,
    /// Number of observations used (positive counts only).
    pub n_obs: usize,
    /// Newton iterations performed.
    pub iterations: usize,
    /// Whether the estimate converged.
    pub converged: bool,
    /// Whether sigma was pinned at its lower bound (singular fit).
    pub boundary: bool,
    /// Number of quadrature nodes used.
    pub quadrature_nodes: usize,
}

impl PlnFit {
    /// Median subject rate: exp(mu).
    pub fn median_rate(&self) -> f64 {
        self.mu.exp()
    }

    /// Mean subject rate: exp(mu + sigma^2 / 2).
    pub fn mean_rate(&self) -> f64 {
        (self.mu + 0.5 * self.sigma * self.sigma).exp()
    }

    /// Akaike information criterion (two free parameters).
    pub fn aic(&self) -> f64 {
        4.0 - 2.0 * self.log_likelihood
    }

    /// Rebuild the quadrature rule this fit was computed with.
    pub fn quadrature(&self) -> Result<Quadrature> {
        Quadrature::gauss_hermite(self.quadrature_nodes)
    }
}

/// Fit with default configuration.
pub fn fit_pln(counts: &StrainCounts) -> Result<PlnFit> {
    fit_pln_with_config(counts, &PlnConfig::default())
}

/// Fit a zero-truncated Poisson-lognormal model by marginal maximum
/// likelihood.
///
/// Optimizes `(mu, log sigma)` with a damped Newton iteration on
/// finite-difference derivatives; the Hessian gets an escalating ridge when it
/// is not positive definite. Sigma is bounded below, and a fit pinned at the
/// bound is flagged as a boundary (singular) fit.
pub fn fit_pln_with_config(counts: &StrainCounts, config: &PlnConfig) -> Result<PlnFit> {
    let ks = counts.positive_counts();
    if ks.is_empty() {
        return Err(SamplingError::EmptyData(
            "No positive strain counts to fit".to_string(),
        ));
    }
    if ks.len() < 3 {
        return Err(SamplingError::Numerical(
            "Model is saturated (need at least 3 positive counts for 2 parameters)".to_string(),
        ));
    }

    let quad = Quadrature::gauss_hermite(config.nodes)?;
    let n = ks.len() as f64;
    let mean = ks.iter().map(|&k| k as f64).sum::<f64>() / n;
    let var = ks
        .iter()
        .map(|&k| {
            let d = k as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / (n - 1.0);

    // Moment initialization from the untruncated Poisson-lognormal:
    // E[K] = exp(mu + sigma^2/2), Var[K] = E[K] + E[K]^2 (exp(sigma^2) - 1)
    let ratio = (1.0 + (var - mean) / (mean * mean)).max(1.01);
    let sigma2_init = ratio.ln();
    let mu_init = mean.ln() - 0.5 * sigma2_init;
    let s_floor = config.sigma_lower.ln();
    let s_init = (0.5 * sigma2_init.ln()).max(s_floor + 1.0);

    let objective = |theta: &[f64; 2]| neg_log_likelihood(&ks, theta[0], theta[1].exp(), &quad);

    let mut theta = [mu_init, s_init];
    let mut nll = objective(&theta);
    let mut converged = false;
    let mut iterations = 0;
    let h = 1e-4;

    for iter in 0..config.max_iter {
        iterations = iter + 1;

        let (grad, hess) = fd_derivatives(&objective, &theta, h);

        // Escalating ridge until the 2x2 system is positive definite
        let mut ridge = 0.0;
        let step = loop {
            let a = hess[0] + ridge;
            let d = hess[1] + ridge;
            let b = hess[2];
            let det = a * d - b * b;
            if a > 0.0 && det > 1e-12 {
                break [
                    -(d * grad[0] - b * grad[1]) / det,
                    -(a * grad[1] - b * grad[0]) / det,
                ];
            }
            ridge = if ridge == 0.0 { config.ridge } else { ridge * 10.0 };
            if ridge > 1e8 {
                // Hopeless curvature: fall back to steepest descent
                let norm = (grad[0] * grad[0] + grad[1] * grad[1]).sqrt().max(1e-12);
                break [-grad[0] / norm, -grad[1] / norm];
            }
        };

        // Backtracking line search with the sigma floor enforced
        let mut alpha = 1.0;
        let mut accepted = false;
        for _ in 0..30 {
            let cand = [
                theta[0] + alpha * step[0],
                (theta[1] + alpha * step[1]).max(s_floor),
            ];
            let cand_nll = objective(&cand);
            if cand_nll.is_finite() && cand_nll < nll {
                let delta = nll - cand_nll;
                theta = cand;
                nll = cand_nll;
                accepted = true;
                if delta < config.tol * (1.0 + nll.abs()) {
                    converged = true;
                }
                break;
            }
            alpha *= 0.5;
        }

        if !accepted {
            // No descent direction improves the objective: treat a flat
            // gradient as convergence, anything else as a stall.
            let grad_norm = (grad[0] * grad[0] + grad[1] * grad[1]).sqrt();
            converged = grad_norm < 1e-4;
            break;
        }
        if converged {
            break;
        }
    }

    let sigma = theta[1].exp();
    let boundary = theta[1] <= s_floor + 1e-9;
    if boundary {
        log::warn!(
            "Poisson-lognormal sigma pinned at lower bound {:.0e} (singular fit)",
            config.sigma_lower
        );
    }
    if !converged {
        log::warn!(
            "Poisson-lognormal fit did not converge in {} iterations (mu {:.4}, sigma {:.4})",
            iterations,
            theta[0],
            sigma
        );
    }

    Ok(PlnFit {
        mu: theta[0],
        sigma,
        log_likelihood: -nll,
        n_obs: ks.len(),
        iterations,
        converged,
        boundary,
        quadrature_nodes: config.nodes,
    })
}

/// Central finite-difference gradient and Hessian of a 2-parameter objective.
///
/// Returns the gradient and `[h00, h11, h01]`.
fn fd_derivatives<F: Fn(&[f64; 2]) -> f64>(f: &F, theta: &[f64; 2], h: f64) -> ([f64; 2], [f64; 3]) {
    let f0 = f(theta);
    let fp0 = f(&[theta[0] + h, theta[1]]);
    let fm0 = f(&[theta[0] - h, theta[1]]);
    let fp1 = f(&[theta[0], theta[1] + h]);
    let fm1 = f(&[theta[0], theta[1] - h]);
    let fpp = f(&[theta[0] + h, theta[1] + h]);
    let fpm = f(&[theta[0] + h, theta[1] - h]);
    let fmp = f(&[theta[0] - h, theta[1] + h]);
    let fmm = f(&[theta[0] - h, theta[1] - h]);

    let grad = [(fp0 - fm0) / (2.0 * h), (fp1 - fm1) / (2.0 * h)];
    let hess = [
        (fp0 - 2.0 * f0 + fm0) / (h * h),
        (fp1 - 2.0 * f0 + fm1) / (h * h),
        (fpp - fpm - fmp + fmm) / (4.0 * h * h),
    ];
    (grad, hess)
}

/// Negative marginal log-likelihood of positive counts.
fn neg_log_likelihood(ks: &[u32], mu: f64, sigma: f64, quad: &Quadrature) -> f64 {
    let log_trunc = {
        let p0 = pln_pmf(0, mu, sigma, quad);
        if p0 >= 1.0 {
            return f64::INFINITY;
        }
        (1.0 - p0).ln()
    };
    -ks.iter()
        .map(|&k| pln_log_pmf(k, mu, sigma, quad) - log_trunc)
        .sum::<f64>()
}

/// Log of the (untruncated) Poisson-lognormal probability mass at `k`.
fn pln_log_pmf(k: u32, mu: f64, sigma: f64, quad: &Quadrature) -> f64 {
    let kf = k as f64;
    let ln_k_fact = ln_gamma(kf + 1.0);
    let terms: Vec<f64> = quad
        .nodes()
        .iter()
        .zip(quad.weights().iter())
        .map(|(&z, &w)| {
            let eta = mu + sigma * z;
            w.ln() + kf * eta - eta.exp() - ln_k_fact
        })
        .collect();
    log_sum_exp(&terms)
}

/// Poisson-lognormal probability mass at `k` (untruncated).
pub fn pln_pmf(k: u32, mu: f64, sigma: f64, quad: &Quadrature) -> f64 {
    pln_log_pmf(k, mu, sigma, quad).exp()
}

/// Zero-truncated Poisson-lognormal probability mass at `k`.
pub fn ztpln_pmf(k: u32, mu: f64, sigma: f64, quad: &Quadrature) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let p0 = pln_pmf(0, mu, sigma, quad);
    if p0 >= 1.0 {
        return 0.0;
    }
    pln_pmf(k, mu, sigma, quad) / (1.0 - p0)
}

/// Cumulative zero-truncated Poisson-lognormal probability over `1..=n`.
pub fn ztpln_cdf(n: u32, mu: f64, sigma: f64, quad: &Quadrature) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p0 = pln_pmf(0, mu, sigma, quad);
    if p0 >= 1.0 {
        return 0.0;
    }
    let sum: f64 = (1..=n).map(|k| pln_pmf(k, mu, sigma, quad)).sum();
    (sum / (1.0 - p0)).min(1.0)
}

/// Probability that the true strain count exceeds `n`, given at least one
/// strain: `P(K > n | K >= 1) = 1 - sum_{k=1..n} ztpln_pmf(k)`.
pub fn ztpln_tail(n: u32, mu: f64, sigma: f64, quad: &Quadrature) -> f64 {
    (1.0 - ztpln_cdf(n, mu, sigma, quad)).clamp(0.0, 1.0)
}

fn log_sum_exp(terms: &[f64]) -> f64 {
    let max = terms.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + terms.iter().map(|t| (t - max).exp()).sum::<f64>().ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StrainObservation;
    use crate::model::poisson::ztp_pmf;
    use approx::assert_relative_eq;

    fn counts_from(ks: &[u32]) -> StrainCounts {
        let obs = ks
            .iter()
            .enumerate()
            .map(|(i, &k)| StrainObservation::new(&format!("P{}", i + 1), k))
            .collect();
        StrainCounts::new(obs).unwrap()
    }

    fn quad() -> Quadrature {
        Quadrature::gauss_hermite(DEFAULT_NODES).unwrap()
    }

    #[test]
    fn test_ztpln_pmf_normalizes() {
        let q = quad();
        let total: f64 = (1..300).map(|k| ztpln_pmf(k, 0.3, 0.8, &q)).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-6);
        assert_eq!(ztpln_pmf(0, 0.3, 0.8, &q), 0.0);
    }

    #[test]
    fn test_small_sigma_matches_truncated_poisson() {
        // sigma -> 0 collapses the mixture to a plain zero-truncated Poisson
        let q = quad();
        let lambda = 1.4f64;
        for k in 1..6 {
            assert_relative_eq!(
                ztpln_pmf(k, lambda.ln(), 1e-4, &q),
                ztp_pmf(k, lambda),
                epsilon = 1e-5
            );
        }
    }

    #[test]
    fn test_tail_semantics() {
        let q = quad();
        assert_relative_eq!(ztpln_tail(0, 0.2, 0.7, &q), 1.0, epsilon = 1e-12);
        let mut prev = 1.0;
        for n in 1..20 {
            let tail = ztpln_tail(n, 0.2, 0.7, &q);
            assert!(tail <= prev, "tail must be non-increasing");
            assert!((0.0..=1.0).contains(&tail));
            prev = tail;
        }
        assert!(prev < 0.01, "tail should vanish for large cutoffs");
    }

    #[test]
    fn test_cdf_plus_tail_is_one() {
        let q = quad();
        for n in [1u32, 3, 7] {
            let total = ztpln_cdf(n, 0.1, 0.9, &q) + ztpln_tail(n, 0.1, 0.9, &q);
            assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fit_overdispersed_counts() {
        let counts = counts_from(&[1, 1, 2, 1, 3, 1, 2, 1, 6, 1]);
        let fit = fit_pln(&counts).unwrap();
        assert!(fit.sigma >= 1e-3);
        assert!(fit.log_likelihood.is_finite());
        assert_eq!(fit.n_obs, 10);
        // Heterogeneous counts should keep sigma off the boundary
        assert!(!fit.boundary, "overdispersed data should need a random effect");
    }

    #[test]
    fn test_homogeneous_counts_pin_sigma_at_floor() {
        // No between-subject heterogeneity: sigma collapses to its lower
        // bound and the fit must be flagged as singular
        let counts = counts_from(&[2, 2, 2, 2, 2, 2, 2, 2]);
        let fit = fit_pln(&counts).unwrap();
        assert!(fit.boundary, "identical counts should give a boundary fit");
        assert!(fit.sigma <= PlnConfig::default().sigma_lower * (1.0 + 1e-6));
        assert!(fit.log_likelihood.is_finite());
    }

    #[test]
    fn test_fit_is_a_local_maximum() {
        let counts = counts_from(&[1, 2, 1, 3, 1, 2, 1, 5]);
        let fit = fit_pln(&counts).unwrap();
        let q = quad();
        let ks = counts.positive_counts();
        let at_fit = -neg_log_likelihood(&ks, fit.mu, fit.sigma, &q);
        for (dm, ds) in [(0.5, 0.0), (-0.5, 0.0), (0.0, 0.5)] {
            let perturbed = -neg_log_likelihood(&ks, fit.mu + dm, fit.sigma + ds, &q);
            assert!(
                at_fit + 1e-6 >= perturbed,
                "perturbed ({}, {}) should not beat the fit",
                dm,
                ds
            );
        }
    }

    #[test]
    fn test_fit_rejects_small_samples() {
        assert!(fit_pln(&counts_from(&[1, 2])).is_err());
        assert!(fit_pln(&counts_from(&[0, 0, 0])).is_err());
    }

    #[test]
    fn test_fit_rate_accessors() {
        let counts = counts_from(&[1, 2, 1, 1, 3, 2, 1, 4]);
        let fit = fit_pln(&counts).unwrap();
        assert_relative_eq!(fit.median_rate(), fit.mu.exp(), epsilon = 1e-12);
        assert!(fit.mean_rate() >= fit.median_rate());
        assert_relative_eq!(fit.aic(), 4.0 - 2.0 * fit.log_likelihood, epsilon = 1e-12);
    }

    #[test]
    fn test_log_sum_exp() {
        let lse = log_sum_exp(&[0.0f64.ln(), 1.0f64.ln(), 2.0f64.ln()]);
        assert_relative_eq!(lse, 3.0f64.ln(), epsilon = 1e-12);
    }
}
