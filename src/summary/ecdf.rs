//! Empirical cumulative distributions and their comparison.

use serde::{Deserialize, Serialize};

/// Empirical cumulative distribution of integer counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ecdf {
    /// Support points 0..=max.
    pub support: Vec<u32>,
    /// Cumulative proportion at each support point.
    pub cumulative: Vec<f64>,
    /// Number of observations.
    pub n: usize,
}

impl Ecdf {
    /// Build the ECDF of a count sample.
    pub fn from_counts(counts: &[u32]) -> Self {
        let n = counts.len();
        if n == 0 {
            return Self {
                support: Vec::new(),
                cumulative: Vec::new(),
                n: 0,
            };
        }
        let max = counts.iter().copied().max().unwrap_or(0);
        let mut cumulative = Vec::with_capacity(max as usize + 1);
        let mut acc = 0usize;
        for value in 0..=max {
            acc += counts.iter().filter(|&&k| k == value).count();
            cumulative.push(acc as f64 / n as f64);
        }
        Self {
            support: (0..=max).collect(),
            cumulative,
            n,
        }
    }

    /// `P(K <= k)` under the empirical distribution.
    ///
    /// Returns NaN for an empty sample.
    pub fn value_at(&self, k: u32) -> f64 {
        if self.support.is_empty() {
            return f64::NAN;
        }
        let max = *self.support.last().unwrap_or(&0);
        if k >= max {
            1.0
        } else {
            self.cumulative[k as usize]
        }
    }

    /// Largest observed count.
    pub fn max_count(&self) -> u32 {
        self.support.last().copied().unwrap_or(0)
    }
}

/// One support point of an empirical-vs-simulated comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcdfComparisonRow {
    /// Count value.
    pub count: u32,
    /// Empirical cumulative proportion.
    pub empirical: f64,
    /// Simulated cumulative proportion.
    pub simulated: f64,
    /// `simulated - empirical`.
    pub diff: f64,
}

/// Comparison of an observed ECDF against a simulated one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcdfComparison {
    /// Per-support-point rows over the merged support.
    pub rows: Vec<EcdfComparisonRow>,
    /// Maximum absolute difference between the curves (KS-style distance).
    pub max_abs_diff: f64,
    /// Observations behind the empirical curve.
    pub empirical_n: usize,
    /// Observations behind the simulated curve.
    pub simulated_n: usize,
}

impl EcdfComparison {
    /// Compare two ECDFs over their merged support.
    pub fn new(empirical: &Ecdf, simulated: &Ecdf) -> Self {
        let max = empirical.max_count().max(simulated.max_count());
        let rows: Vec<EcdfComparisonRow> = (0..=max)
            .map(|k| {
                let e = empirical.value_at(k);
                let s = simulated.value_at(k);
                EcdfComparisonRow {
                    count: k,
                    empirical: e,
                    simulated: s,
                    diff: s - e,
                }
            })
            .collect();
        let max_abs_diff = rows
            .iter()
            .map(|r| r.diff.abs())
            .fold(0.0f64, f64::max);
        Self {
            rows,
            max_abs_diff,
            empirical_n: empirical.n,
            simulated_n: simulated.n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ecdf_from_counts() {
        let ecdf = Ecdf::from_counts(&[1, 1, 2, 4]);
        assert_eq!(ecdf.support, vec![0, 1, 2, 3, 4]);
        assert_relative_eq!(ecdf.value_at(0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(ecdf.value_at(1), 0.5, epsilon = 1e-12);
        assert_relative_eq!(ecdf.value_at(2), 0.75, epsilon = 1e-12);
        assert_relative_eq!(ecdf.value_at(3), 0.75, epsilon = 1e-12);
        assert_relative_eq!(ecdf.value_at(4), 1.0, epsilon = 1e-12);
        // Beyond the support the ECDF stays at 1
        assert_relative_eq!(ecdf.value_at(100), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ecdf_monotone() {
        let ecdf = Ecdf::from_counts(&[3, 1, 1, 5, 2, 2, 2]);
        for w in ecdf.cumulative.windows(2) {
            assert!(w[0] <= w[1]);
        }
        assert_relative_eq!(*ecdf.cumulative.last().unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_ecdf() {
        let ecdf = Ecdf::from_counts(&[]);
        assert_eq!(ecdf.n, 0);
        assert!(ecdf.value_at(0).is_nan());
    }

    #[test]
    fn test_comparison_identical_curves() {
        let a = Ecdf::from_counts(&[1, 2, 2, 3]);
        let cmp = EcdfComparison::new(&a, &a);
        assert_relative_eq!(cmp.max_abs_diff, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_comparison_merged_support() {
        let emp = Ecdf::from_counts(&[1, 1, 2]);
        let sim = Ecdf::from_counts(&[1, 2, 3, 6]);
        let cmp = EcdfComparison::new(&emp, &sim);
        assert_eq!(cmp.rows.len(), 7); // 0..=6
        assert!(cmp.max_abs_diff > 0.0);
        assert_eq!(cmp.empirical_n, 3);
        assert_eq!(cmp.simulated_n, 4);
        // Empirical curve is flat at 1 past its own max
        assert_relative_eq!(cmp.rows[6].empirical, 1.0, epsilon = 1e-12);
    }
}
