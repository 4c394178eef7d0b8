//! Seeded simulation of strain counts from fitted models.

use crate::error::{Result, SamplingError};
use crate::model::pln::PlnFit;
use crate::model::poisson::PoissonFit;
use crate::summary::ecdf::Ecdf;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson, StandardNormal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Rejection attempts before a zero-truncated draw falls back to 1.
///
/// The fallback is the correct limit: conditional on at least one strain, a
/// vanishing rate concentrates all mass on a single strain.
const MAX_REJECTIONS: usize = 1000;

/// Configuration for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of synthetic subjects to draw.
    pub n_subjects: usize,
    /// RNG seed; equal seeds give identical output.
    pub seed: u64,
    /// Condition each draw on at least one strain.
    pub zero_truncated: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            n_subjects: 10_000,
            seed: 42,
            zero_truncated: true,
        }
    }
}

impl SimConfig {
    /// Set the number of synthetic subjects.
    pub fn with_subjects(mut self, n: usize) -> Self {
        self.n_subjects = n;
        self
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Include zero counts in the output (untruncated draws).
    pub fn untruncated(mut self) -> Self {
        self.zero_truncated = false;
        self
    }
}

/// Counts drawn from a fitted model for synthetic subjects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedCounts {
    /// Simulated strain counts, one per synthetic subject.
    pub counts: Vec<u32>,
    /// Seed the draw used.
    pub seed: u64,
    /// Label of the generating model.
    pub model: String,
}

impl SimulatedCounts {
    /// Empirical CDF of the simulated counts.
    pub fn ecdf(&self) -> Ecdf {
        Ecdf::from_counts(&self.counts)
    }

    /// Proportion of subjects with more than `cutoff` strains.
    pub fn proportion_exceeding(&self, cutoff: u32) -> f64 {
        if self.counts.is_empty() {
            return 0.0;
        }
        let n_over = self.counts.iter().filter(|&&k| k > cutoff).count();
        n_over as f64 / self.counts.len() as f64
    }

    /// Largest simulated count.
    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Write the counts to a TSV file (one subject per row).
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "subject\tstrains")?;
        for (i, k) in self.counts.iter().enumerate() {
            writeln!(writer, "sim_{:06}\t{}", i + 1, k)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Simulate counts from a fitted zero-truncated Poisson model.
pub fn simulate_poisson(fit: &PoissonFit, config: &SimConfig) -> Result<SimulatedCounts> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let counts: Result<Vec<u32>> = (0..config.n_subjects)
        .map(|_| draw_count(&mut rng, fit.rate, config.zero_truncated))
        .collect();
    Ok(SimulatedCounts {
        counts: counts?,
        seed: config.seed,
        model: "zt_poisson".to_string(),
    })
}

/// Simulate counts from a fitted Poisson-lognormal model.
///
/// Each subject draws a latent log-rate `mu + sigma * z`, `z ~ N(0, 1)`, then
/// a Poisson count at that rate. Under zero truncation the whole (z, count)
/// pair is rejected on a zero: redrawing only the count at a fixed rate would
/// force low-rate subjects up to 1 instead of down-weighting them, and the
/// simulated marginal would no longer match the truncated mixture the fitted
/// likelihood uses.
pub fn simulate_pln(fit: &PlnFit, config: &SimConfig) -> Result<SimulatedCounts> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let counts: Result<Vec<u32>> = (0..config.n_subjects)
        .map(|_| {
            if !config.zero_truncated {
                let z: f64 = StandardNormal.sample(&mut rng);
                return poisson_draw(&mut rng, (fit.mu + fit.sigma * z).exp());
            }
            for _ in 0..MAX_REJECTIONS {
                let z: f64 = StandardNormal.sample(&mut rng);
                let draw = poisson_draw(&mut rng, (fit.mu + fit.sigma * z).exp())?;
                if draw >= 1 {
                    return Ok(draw);
                }
            }
            Ok(1)
        })
        .collect();
    Ok(SimulatedCounts {
        counts: counts?,
        seed: config.seed,
        model: "zt_poisson_lognormal".to_string(),
    })
}

/// One untruncated Poisson draw at the given rate.
fn poisson_draw(rng: &mut ChaCha8Rng, rate: f64) -> Result<u32> {
    let rate = rate.clamp(1e-12, 1e6);
    let poisson = Poisson::new(rate)
        .map_err(|e| SamplingError::Numerical(format!("Poisson rate {}: {}", rate, e)))?;
    let draw: f64 = poisson.sample(rng);
    Ok(draw.min(u32::MAX as f64) as u32)
}

fn draw_count(rng: &mut ChaCha8Rng, rate: f64, zero_truncated: bool) -> Result<u32> {
    if !zero_truncated {
        return poisson_draw(rng, rate);
    }
    for _ in 0..MAX_REJECTIONS {
        let draw = poisson_draw(rng, rate)?;
        if draw >= 1 {
            return Ok(draw);
        }
    }
    Ok(1)
}

/// Summary of repeated simulation runs at one pick cutoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateSummary {
    /// Pick cutoff the proportions refer to.
    pub cutoff: u32,
    /// Number of replicate runs.
    pub n_replicates: usize,
    /// Subjects per replicate.
    pub n_subjects: usize,
    /// Mean proportion of subjects exceeding the cutoff.
    pub mean_proportion: f64,
    /// 2.5% empirical quantile across replicates.
    pub lower: f64,
    /// 97.5% empirical quantile across replicates.
    pub upper: f64,
}

/// Run replicate Poisson-lognormal simulations and summarize the proportion
/// of subjects whose strain count exceeds `cutoff`.
///
/// Replicates run in parallel with deterministic per-replicate seeds derived
/// from the base seed.
pub fn simulate_replicates(
    fit: &PlnFit,
    config: &SimConfig,
    n_replicates: usize,
    cutoff: u32,
) -> Result<ReplicateSummary> {
    if n_replicates == 0 {
        return Err(SamplingError::InvalidParameter(
            "n_replicates must be positive".to_string(),
        ));
    }
    let mut proportions = (0..n_replicates)
        .into_par_iter()
        .map(|r| {
            let rep_config = config
                .clone()
                .with_seed(config.seed.wrapping_add((r as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)));
            simulate_pln(fit, &rep_config).map(|sim| sim.proportion_exceeding(cutoff))
        })
        .collect::<Result<Vec<f64>>>()?;
    proportions.sort_by(f64::total_cmp);

    let mean = proportions.iter().sum::<f64>() / proportions.len() as f64;
    Ok(ReplicateSummary {
        cutoff,
        n_replicates,
        n_subjects: config.n_subjects,
        mean_proportion: mean,
        lower: quantile_sorted(&proportions, 0.025),
        upper: quantile_sorted(&proportions, 0.975),
    })
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pln_fit() -> PlnFit {
        PlnFit {
            mu: 0.1,
            sigma: 0.7,
            log_likelihood: -10.0,
            n_obs: 8,
            iterations: 30,
            converged: true,
            boundary: false,
            quadrature_nodes: 40,
        }
    }

    fn poisson_fit() -> PoissonFit {
        PoissonFit {
            rate: 1.2,
            log_likelihood: -9.0,
            n_obs: 8,
            iterations: 6,
            converged: true,
        }
    }

    #[test]
    fn test_zero_truncated_draws_are_positive() {
        let config = SimConfig::default().with_subjects(2000).with_seed(7);
        let sim = simulate_pln(&pln_fit(), &config).unwrap();
        assert_eq!(sim.counts.len(), 2000);
        assert!(sim.counts.iter().all(|&k| k >= 1));
    }

    #[test]
    fn test_untruncated_includes_zeros() {
        let config = SimConfig::default()
            .with_subjects(5000)
            .with_seed(11)
            .untruncated();
        let sim = simulate_poisson(&poisson_fit(), &config).unwrap();
        // P(0) = exp(-1.2) ~ 0.30, so zeros are all but guaranteed
        assert!(sim.counts.iter().any(|&k| k == 0));
    }

    #[test]
    fn test_same_seed_reproduces() {
        let config = SimConfig::default().with_subjects(500).with_seed(99);
        let a = simulate_pln(&pln_fit(), &config).unwrap();
        let b = simulate_pln(&pln_fit(), &config).unwrap();
        assert_eq!(a.counts, b.counts);
    }

    #[test]
    fn test_different_seeds_differ() {
        let base = SimConfig::default().with_subjects(500);
        let a = simulate_pln(&pln_fit(), &base.clone().with_seed(1)).unwrap();
        let b = simulate_pln(&pln_fit(), &base.with_seed(2)).unwrap();
        assert_ne!(a.counts, b.counts);
    }

    #[test]
    fn test_poisson_mean_roughly_recovered() {
        let config = SimConfig::default()
            .with_subjects(50_000)
            .with_seed(3)
            .untruncated();
        let sim = simulate_poisson(&poisson_fit(), &config).unwrap();
        let mean = sim.counts.iter().map(|&k| k as f64).sum::<f64>() / sim.counts.len() as f64;
        assert_relative_eq!(mean, 1.2, epsilon = 0.05);
    }

    #[test]
    fn test_truncated_draws_match_marginal_tail() {
        // Truncation must act on the mixture, not per latent rate: the
        // simulated exceedance proportion has to land on the analytic tail
        // of the zero-truncated Poisson-lognormal.
        use crate::model::pln::ztpln_tail;
        use crate::model::quadrature::Quadrature;

        let f = pln_fit();
        let quad = Quadrature::gauss_hermite(f.quadrature_nodes).unwrap();
        let config = SimConfig::default().with_subjects(100_000).with_seed(23);
        let sim = simulate_pln(&f, &config).unwrap();
        for cutoff in [1u32, 2] {
            let analytic = ztpln_tail(cutoff, f.mu, f.sigma, &quad);
            let simulated = sim.proportion_exceeding(cutoff);
            assert!(
                (analytic - simulated).abs() < 0.01,
                "cutoff {}: analytic {:.4} vs simulated {:.4}",
                cutoff,
                analytic,
                simulated
            );
        }
    }

    #[test]
    fn test_proportion_exceeding() {
        let sim = SimulatedCounts {
            counts: vec![1, 1, 2, 3, 5],
            seed: 0,
            model: "test".to_string(),
        };
        assert_relative_eq!(sim.proportion_exceeding(1), 3.0 / 5.0, epsilon = 1e-12);
        assert_relative_eq!(sim.proportion_exceeding(10), 0.0, epsilon = 1e-12);
        assert_eq!(sim.max_count(), 5);
    }

    #[test]
    fn test_replicates_bracket_mean() {
        let config = SimConfig::default().with_subjects(2000);
        let summary = simulate_replicates(&pln_fit(), &config, 20, 2).unwrap();
        assert_eq!(summary.n_replicates, 20);
        assert!(summary.lower <= summary.mean_proportion);
        assert!(summary.mean_proportion <= summary.upper);
        assert!(summary.mean_proportion > 0.0 && summary.mean_proportion < 1.0);
    }

    #[test]
    fn test_replicates_reject_zero() {
        let config = SimConfig::default();
        assert!(simulate_replicates(&pln_fit(), &config, 0, 1).is_err());
    }

    #[test]
    fn test_to_tsv() {
        let sim = SimulatedCounts {
            counts: vec![1, 2],
            seed: 0,
            model: "test".to_string(),
        };
        let file = tempfile::NamedTempFile::new().unwrap();
        sim.to_tsv(file.path()).unwrap();
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("subject\tstrains\n"));
        assert!(content.contains("sim_000001\t1"));
    }
}
