//! Colony-pick planning from the fitted strain count distribution.
//!
//! Picking `n` colonies from a sample can recover at most `n` distinct
//! strains, so a sample whose true strain count exceeds the pick budget is
//! guaranteed to have at least one strain missed. The miss probability for a
//! budget is therefore the upper tail of the fitted zero-truncated
//! Poisson-lognormal distribution.

use crate::error::{Result, SamplingError};
use crate::model::pln::{ztpln_tail, PlnFit};
use crate::model::quadrature::Quadrature;
use crate::simulate::SimulatedCounts;
use serde::{Deserialize, Serialize};

/// Miss probability at one pick budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickCurvePoint {
    /// Number of colonies picked.
    pub picks: u32,
    /// Probability the sample carries more strains than picks.
    pub miss_probability: f64,
}

/// Chosen pick budget with the full miss-probability curve behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickPlan {
    /// Smallest pick count meeting the target.
    pub picks: u32,
    /// Miss probability at the chosen pick count.
    pub miss_probability: f64,
    /// Target miss probability the plan was built for.
    pub target_miss: f64,
    /// Miss probability for every budget from 1 to the chosen count.
    pub curve: Vec<PickCurvePoint>,
}

/// Probability that a sample carries more strains than `n_picks`.
pub fn miss_probability(fit: &PlnFit, n_picks: u32, quad: &Quadrature) -> f64 {
    ztpln_tail(n_picks, fit.mu, fit.sigma, quad)
}

/// Smallest pick budget whose miss probability is at or below `target_miss`.
///
/// Scans budgets 1..=`max_picks`; errors if the target is unreachable within
/// the scan range.
pub fn picks_needed(fit: &PlnFit, target_miss: f64, max_picks: u32) -> Result<PickPlan> {
    if !(0.0 < target_miss && target_miss < 1.0) {
        return Err(SamplingError::InvalidParameter(format!(
            "target_miss must be in (0, 1), got {}",
            target_miss
        )));
    }
    if max_picks == 0 {
        return Err(SamplingError::InvalidParameter(
            "max_picks must be positive".to_string(),
        ));
    }

    let quad = fit.quadrature()?;
    let mut curve = Vec::new();
    for picks in 1..=max_picks {
        let miss = miss_probability(fit, picks, &quad);
        curve.push(PickCurvePoint {
            picks,
            miss_probability: miss,
        });
        if miss <= target_miss {
            return Ok(PickPlan {
                picks,
                miss_probability: miss,
                target_miss,
                curve,
            });
        }
    }

    Err(SamplingError::Numerical(format!(
        "Miss probability stays above {} within {} picks (last: {:.4})",
        target_miss,
        max_picks,
        curve.last().map(|p| p.miss_probability).unwrap_or(1.0)
    )))
}

/// Simulation cross-check: observed fraction of synthetic subjects whose
/// count exceeds the pick budget.
pub fn simulated_miss_proportion(sim: &SimulatedCounts, n_picks: u32) -> f64 {
    sim.proportion_exceeding(n_picks)
}
