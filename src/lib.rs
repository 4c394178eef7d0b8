//! Colony-pick and sample-size planning for strain diversity studies.
//!
//! This library plans microbiology studies of strain diversity (distinct
//! sequence types of ESBL-producing *E. coli* per stool sample): how many
//! colonies to pick per specimen to capture the diversity present, and how
//! many specimens a study needs.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: strain count observations and embedded published datasets
//! - **model**: zero-truncated Poisson and Poisson-lognormal fits
//! - **simulate**: seeded draws of synthetic counts from fitted models
//! - **summary**: proportions with Wilson intervals, ECDF comparison, plots
//! - **design**: pick-budget and specimen-count calculations
//! - **plan**: the full workflow with a serialized report
//!
//! # Example
//!
//! ```no_run
//! use strain_sampling::prelude::*;
//!
//! let config = PlanConfig::for_dataset(PublishedDataset::PilotCarriage)
//!     .with_target_miss(0.05)
//!     .with_picks_budget(5);
//! let plan = StudyPlan::run(&config).unwrap();
//!
//! println!(
//!     "pick {} colonies; {} specimens for a ±{:.0}pp miss estimate",
//!     plan.report.pick_plan.picks,
//!     plan.report.sample_size.n_samples,
//!     plan.report.sample_size.margin * 100.0,
//! );
//! ```

pub mod data;
pub mod design;
pub mod error;
pub mod model;
pub mod plan;
pub mod simulate;
pub mod summary;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{list_datasets, PublishedDataset, StrainCounts, StrainObservation};
    pub use crate::design::{
        miss_probability, picks_needed, samples_needed, simulated_miss_proportion,
        wilson_halfwidth, PickCurvePoint, PickPlan, SampleSizePlan,
    };
    pub use crate::error::{Result, SamplingError};
    pub use crate::model::{
        compare_fits, fit_pln, fit_pln_with_config, fit_poisson, EvidenceStrength,
        ModelComparison, PlnConfig, PlnFit, PoissonFit, PreferredModel, Quadrature,
    };
    pub use crate::plan::{PlanConfig, PlanReport, PlanSource, StudyPlan};
    pub use crate::simulate::{
        simulate_pln, simulate_poisson, simulate_replicates, ReplicateSummary, SimConfig,
        SimulatedCounts,
    };
    pub use crate::summary::{
        plot_count_table, plot_ecdf_comparison, tabulate, wilson_interval, CountCategory,
        CountTable, Ecdf, EcdfComparison,
    };
}
