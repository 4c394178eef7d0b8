//! Study design calculations: pick budgets and specimen counts.

pub mod picks;
pub mod sample_size;

pub use picks::{miss_probability, picks_needed, simulated_miss_proportion, PickCurvePoint, PickPlan};
pub use sample_size::{
    samples_needed, wilson_halfwidth, SampleSizePlan, DEFAULT_CONFIDENCE, DEFAULT_MARGIN,
};
