//! Study plan runner: load, fit, simulate, summarize, size.

use crate::data::{PublishedDataset, StrainCounts};
use crate::design::picks::{miss_probability, picks_needed, PickPlan};
use crate::design::sample_size::{
    samples_needed, SampleSizePlan, DEFAULT_CONFIDENCE, DEFAULT_MARGIN,
};
use crate::error::Result;
use crate::model::compare::{compare_fits, ModelComparison};
use crate::model::pln::{fit_pln_with_config, PlnConfig, PlnFit};
use crate::model::poisson::{fit_poisson, PoissonFit};
use crate::simulate::{simulate_pln, SimConfig, SimulatedCounts};
use crate::summary::ecdf::{Ecdf, EcdfComparison};
use crate::summary::plot::{plot_count_table, plot_ecdf_comparison};
use crate::summary::proportions::{tabulate, CountTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the observations come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlanSource {
    /// An embedded published dataset.
    Dataset(PublishedDataset),
    /// A TSV file of observations.
    Tsv(PathBuf),
}

impl PlanSource {
    fn load(&self) -> Result<StrainCounts> {
        match self {
            Self::Dataset(dataset) => dataset.load(),
            Self::Tsv(path) => StrainCounts::from_tsv(path),
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Dataset(dataset) => dataset.name().to_string(),
            Self::Tsv(path) => path.display().to_string(),
        }
    }
}

/// Configuration for a full study-plan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Observation source.
    pub source: PlanSource,
    /// Poisson-lognormal fitting configuration.
    pub pln: PlnConfig,
    /// Simulation configuration.
    pub sim: SimConfig,
    /// Confidence level for intervals and the sample-size target.
    pub confidence: f64,
    /// Target half-width for the miss-proportion estimate.
    pub margin: f64,
    /// Acceptable per-sample miss probability when choosing the pick budget.
    pub target_miss: f64,
    /// Largest pick budget the plan will consider.
    pub max_picks: u32,
    /// Fixed pick budget the sample-size question is asked about.
    pub picks_budget: u32,
    /// Render SVG plots in `write_to_dir`.
    pub render_plots: bool,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            source: PlanSource::Dataset(PublishedDataset::PilotCarriage),
            pln: PlnConfig::default(),
            sim: SimConfig::default(),
            confidence: DEFAULT_CONFIDENCE,
            margin: DEFAULT_MARGIN,
            target_miss: 0.05,
            max_picks: 20,
            picks_budget: 5,
            render_plots: true,
        }
    }
}

impl PlanConfig {
    /// Plan from an embedded dataset.
    pub fn for_dataset(dataset: PublishedDataset) -> Self {
        Self {
            source: PlanSource::Dataset(dataset),
            ..Default::default()
        }
    }

    /// Plan from a TSV file.
    pub fn for_tsv<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source: PlanSource::Tsv(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Set the target miss probability for the pick plan.
    pub fn with_target_miss(mut self, target: f64) -> Self {
        self.target_miss = target;
        self
    }

    /// Set the pick budget the sample-size question refers to.
    pub fn with_picks_budget(mut self, picks: u32) -> Self {
        self.picks_budget = picks;
        self
    }

    /// Set the sample-size margin (interval half-width).
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Set the simulation seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.sim.seed = seed;
        self
    }

    /// Disable plot rendering.
    pub fn without_plots(mut self) -> Self {
        self.render_plots = false;
        self
    }
}

/// Everything a study-plan run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    /// Label of the observation source.
    pub source: String,
    /// Observations loaded (including zero counts).
    pub n_observations: usize,
    /// Distinct subjects.
    pub n_subjects: usize,
    /// Zero-truncated Poisson fit.
    pub poisson: PoissonFit,
    /// Zero-truncated Poisson-lognormal fit.
    pub pln: PlnFit,
    /// AIC comparison of the two fits.
    pub comparison: ModelComparison,
    /// Observed count-category proportions with Wilson intervals.
    pub count_table: CountTable,
    /// Observed-vs-simulated cumulative distribution comparison.
    pub ecdf_comparison: EcdfComparison,
    /// Pick budget meeting the target miss probability.
    pub pick_plan: PickPlan,
    /// Pick budget the sample-size question was asked about.
    pub picks_budget: u32,
    /// Miss probability at that budget.
    pub budget_miss_probability: f64,
    /// Specimens needed to estimate the miss proportion to the margin.
    pub sample_size: SampleSizePlan,
}

impl PlanReport {
    /// Serialize the report to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serialize the report to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A completed study-plan run: the report plus its supporting artifacts.
#[derive(Debug, Clone)]
pub struct StudyPlan {
    /// The run configuration.
    pub config: PlanConfig,
    /// Loaded observations.
    pub observations: StrainCounts,
    /// Simulated counts behind the report's comparison.
    pub simulated: SimulatedCounts,
    /// The report.
    pub report: PlanReport,
}

impl StudyPlan {
    /// Run the full plan: load, fit both models, simulate, summarize, and
    /// size the study.
    pub fn run(config: &PlanConfig) -> Result<Self> {
        let observations = config.source.load()?;
        log::info!(
            "Planning from '{}': {} observations, {} subjects",
            config.source.label(),
            observations.len(),
            observations.n_subjects()
        );

        let poisson = fit_poisson(&observations)?;
        let pln = fit_pln_with_config(&observations, &config.pln)?;
        let comparison = compare_fits(&poisson, &pln);

        let simulated = simulate_pln(&pln, &config.sim)?;

        let positive = observations.positive_counts();
        let count_table = tabulate(&positive, config.confidence)?;
        let ecdf_comparison =
            EcdfComparison::new(&Ecdf::from_counts(&positive), &simulated.ecdf());

        let pick_plan = picks_needed(&pln, config.target_miss, config.max_picks)?;

        let quad = pln.quadrature()?;
        let budget_miss = miss_probability(&pln, config.picks_budget, &quad);
        // Degenerate tails clamp into the open interval the formula needs
        let p = budget_miss.clamp(1e-9, 1.0 - 1e-9);
        let sample_size = samples_needed(p, config.margin, config.confidence)?;

        let report = PlanReport {
            source: config.source.label(),
            n_observations: observations.len(),
            n_subjects: observations.n_subjects(),
            poisson,
            pln,
            comparison,
            count_table,
            ecdf_comparison,
            pick_plan,
            picks_budget: config.picks_budget,
            budget_miss_probability: budget_miss,
            sample_size,
        };

        Ok(Self {
            config: config.clone(),
            observations,
            simulated,
            report,
        })
    }

    /// Write the run to a directory: `report.yaml`, `observations.tsv`,
    /// `simulated_counts.tsv`, and the SVG plots unless disabled.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        std::fs::write(dir.join("report.yaml"), self.report.to_yaml()?)?;
        self.observations.to_tsv(dir.join("observations.tsv"))?;
        self.simulated.to_tsv(dir.join("simulated_counts.tsv"))?;

        if self.config.render_plots {
            plot_ecdf_comparison(
                &self.report.ecdf_comparison,
                &dir.join("ecdf_comparison.svg"),
                &format!("{}: observed vs simulated", self.report.source),
            )?;
            plot_count_table(
                &self.report.count_table,
                &dir.join("count_proportions.svg"),
                &format!("{}: strain count proportions", self.report.source),
            )?;
        }
        Ok(())
    }
}
