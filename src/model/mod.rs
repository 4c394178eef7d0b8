//! Count-distribution models for per-participant strain counts.
//!
//! Both models are zero-truncated: fitting conditions on at least one strain
//! being recovered from a sample.

pub mod compare;
pub mod pln;
pub mod poisson;
pub mod quadrature;

pub use compare::{compare_fits, EvidenceStrength, ModelComparison, PreferredModel};
pub use pln::{fit_pln, fit_pln_with_config, PlnConfig, PlnFit};
pub use poisson::{fit_poisson, PoissonFit};
pub use quadrature::Quadrature;
