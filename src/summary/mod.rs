//! Summaries of observed and simulated count distributions.

pub mod ecdf;
pub mod plot;
pub mod proportions;

pub use ecdf::{Ecdf, EcdfComparison, EcdfComparisonRow};
pub use plot::{plot_count_table, plot_ecdf_comparison};
pub use proportions::{tabulate, wilson_interval, CountCategory, CountTable};
