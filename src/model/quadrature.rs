//! Gauss-Hermite quadrature for expectations against the standard normal.

use crate::error::{Result, SamplingError};
use nalgebra::{DMatrix, SymmetricEigen};

/// Default number of quadrature nodes used by the Poisson-lognormal fitter.
pub const DEFAULT_NODES: usize = 40;

/// A Gauss-Hermite rule in probabilists' form.
///
/// Approximates `E[f(Z)]` for `Z ~ N(0, 1)` as a weighted sum over nodes.
/// Weights sum to 1.
#[derive(Debug, Clone)]
pub struct Quadrature {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl Quadrature {
    /// Build an n-node rule via the Golub-Welsch eigendecomposition of the
    /// symmetric Jacobi matrix for probabilists' Hermite polynomials.
    pub fn gauss_hermite(n: usize) -> Result<Self> {
        if n < 2 {
            return Err(SamplingError::InvalidParameter(
                "Quadrature requires at least 2 nodes".to_string(),
            ));
        }

        // Jacobi matrix: zero diagonal, off-diagonal sqrt(k)
        let mut jacobi = DMatrix::zeros(n, n);
        for k in 1..n {
            let b = (k as f64).sqrt();
            jacobi[(k - 1, k)] = b;
            jacobi[(k, k - 1)] = b;
        }

        let eigen = SymmetricEigen::new(jacobi);

        // Node = eigenvalue, weight = squared first eigenvector component.
        // Eigenvectors are orthonormal, so the weights sum to 1 exactly.
        let mut pairs: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let node = eigen.eigenvalues[i];
                let weight = eigen.eigenvectors[(0, i)] * eigen.eigenvectors[(0, i)];
                (node, weight)
            })
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(Self {
            nodes: pairs.iter().map(|p| p.0).collect(),
            weights: pairs.iter().map(|p| p.1).collect(),
        })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the rule is empty (never true for a constructed rule).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Quadrature nodes, ascending.
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// Quadrature weights, aligned with nodes.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Approximate `E[f(Z)]` for `Z ~ N(0, 1)`.
    pub fn expect<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        self.nodes
            .iter()
            .zip(self.weights.iter())
            .map(|(&x, &w)| w * f(x))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_degenerate_rule() {
        assert!(Quadrature::gauss_hermite(0).is_err());
        assert!(Quadrature::gauss_hermite(1).is_err());
    }

    #[test]
    fn test_weights_sum_to_one() {
        let quad = Quadrature::gauss_hermite(20).unwrap();
        let total: f64 = quad.weights().iter().sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_nodes_symmetric_and_sorted() {
        let quad = Quadrature::gauss_hermite(15).unwrap();
        let nodes = quad.nodes();
        for w in nodes.windows(2) {
            assert!(w[0] < w[1]);
        }
        // Symmetric rule: nodes come in +/- pairs
        assert_relative_eq!(nodes[0], -nodes[nodes.len() - 1], epsilon = 1e-8);
    }

    #[test]
    fn test_normal_moments() {
        let quad = Quadrature::gauss_hermite(30).unwrap();
        assert_relative_eq!(quad.expect(|z| z), 0.0, epsilon = 1e-10);
        assert_relative_eq!(quad.expect(|z| z * z), 1.0, epsilon = 1e-8);
        assert_relative_eq!(quad.expect(|z| z * z * z * z), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_lognormal_mean() {
        // E[exp(Z)] = exp(1/2) for standard normal Z
        let quad = Quadrature::gauss_hermite(40).unwrap();
        assert_relative_eq!(quad.expect(|z| z.exp()), (0.5f64).exp(), epsilon = 1e-8);
    }
}
