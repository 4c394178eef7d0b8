//! Composition of the full study-planning workflow.

mod runner;

pub use runner::{PlanConfig, PlanReport, PlanSource, StudyPlan};
