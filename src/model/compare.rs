//! AIC comparison between the fitted count models.

use crate::model::pln::PlnFit;
use crate::model::poisson::PoissonFit;
use serde::{Deserialize, Serialize};

/// Which model the comparison prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreferredModel {
    /// Zero-truncated Poisson (no between-subject heterogeneity needed).
    Poisson,
    /// Zero-truncated Poisson-lognormal (random intercept earns its keep).
    PoissonLognormal,
}

/// Strength of evidence for the preferred model, on the usual AIC-delta scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceStrength {
    /// Delta < 2: essentially indistinguishable.
    Negligible,
    /// Delta 2-6.
    Positive,
    /// Delta 6-10.
    Strong,
    /// Delta > 10.
    VeryStrong,
}

/// Result of comparing the two fitted models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    /// AIC of the zero-truncated Poisson fit.
    pub poisson_aic: f64,
    /// AIC of the zero-truncated Poisson-lognormal fit.
    pub pln_aic: f64,
    /// `poisson_aic - pln_aic` (positive favors the mixed model).
    pub delta_aic: f64,
    /// Preferred model.
    pub preferred: PreferredModel,
    /// Evidence strength for the preference.
    pub evidence: EvidenceStrength,
}

/// Compare the Poisson and Poisson-lognormal fits by AIC.
pub fn compare_fits(poisson: &PoissonFit, pln: &PlnFit) -> ModelComparison {
    let poisson_aic = poisson.aic();
    let pln_aic = pln.aic();
    let delta_aic = poisson_aic - pln_aic;
    let preferred = if delta_aic > 0.0 {
        PreferredModel::PoissonLognormal
    } else {
        PreferredModel::Poisson
    };
    let evidence = match delta_aic.abs() {
        d if d < 2.0 => EvidenceStrength::Negligible,
        d if d < 6.0 => EvidenceStrength::Positive,
        d if d < 10.0 => EvidenceStrength::Strong,
        _ => EvidenceStrength::VeryStrong,
    };
    ModelComparison {
        poisson_aic,
        pln_aic,
        delta_aic,
        preferred,
        evidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poisson_fit(ll: f64) -> PoissonFit {
        PoissonFit {
            rate: 1.0,
            log_likelihood: ll,
            n_obs: 10,
            iterations: 5,
            converged: true,
        }
    }

    fn pln_fit(ll: f64) -> PlnFit {
        PlnFit {
            mu: 0.0,
            sigma: 0.5,
            log_likelihood: ll,
            n_obs: 10,
            iterations: 20,
            converged: true,
            boundary: false,
            quadrature_nodes: 40,
        }
    }

    #[test]
    fn test_prefers_better_likelihood() {
        // PLN pays one extra parameter; it needs > 1 log-likelihood unit to win
        let cmp = compare_fits(&poisson_fit(-12.0), &pln_fit(-8.0));
        assert_eq!(cmp.preferred, PreferredModel::PoissonLognormal);
        assert!(cmp.delta_aic > 0.0);

        let cmp = compare_fits(&poisson_fit(-10.0), &pln_fit(-9.8));
        assert_eq!(cmp.preferred, PreferredModel::Poisson);
    }

    #[test]
    fn test_evidence_scale() {
        let cmp = compare_fits(&poisson_fit(-20.0), &pln_fit(-12.0));
        // delta = (2 + 40) - (4 + 24) = 14
        assert_eq!(cmp.evidence, EvidenceStrength::VeryStrong);

        let cmp = compare_fits(&poisson_fit(-10.0), &pln_fit(-9.5));
        assert_eq!(cmp.evidence, EvidenceStrength::Negligible);
    }
}
