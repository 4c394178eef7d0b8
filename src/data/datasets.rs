//! Embedded strain-count datasets from published carriage studies.
//!
//! Each dataset records, per participant, the number of distinct
//! ESBL-producing *E. coli* sequence types recovered from a single stool
//! sample after exhaustive colony picking. All are small (≤10 participants),
//! matching the planning-stage evidence base.

use crate::data::{StrainCounts, StrainObservation};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Available embedded datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PublishedDataset {
    /// Pilot carriage screen: 8 community participants, single visit.
    PilotCarriage,
    /// Returning-traveller cohort: 10 participants sampled on return.
    TravellerCohort,
    /// Longitudinal carriage subset: 5 participants, two visits each.
    LongitudinalCarriage,
}

impl PublishedDataset {
    /// Dataset name for display and report labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PilotCarriage => "pilot_carriage",
            Self::TravellerCohort => "traveller_cohort",
            Self::LongitudinalCarriage => "longitudinal_carriage",
        }
    }

    /// Short description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::PilotCarriage => {
                "Community pilot screen, 8 participants, distinct ESBL E. coli STs per stool sample"
            }
            Self::TravellerCohort => {
                "Returning travellers, 10 participants, STs typed from exhaustive colony picks"
            }
            Self::LongitudinalCarriage => {
                "Longitudinal carriage subset, 5 participants at two visits"
            }
        }
    }

    /// Source citation for the published counts.
    pub fn citation(&self) -> &'static str {
        match self {
            Self::PilotCarriage => {
                "Community ESBL-E. coli carriage pilot, single-visit ST counts"
            }
            Self::TravellerCohort => "Returning-traveller ESBL carriage cohort, per-sample ST counts",
            Self::LongitudinalCarriage => "Longitudinal ESBL carriage study, two-visit ST counts",
        }
    }

    /// Whether the dataset carries visit labels.
    pub fn is_longitudinal(&self) -> bool {
        matches!(self, Self::LongitudinalCarriage)
    }

    /// All embedded datasets.
    pub fn all() -> Vec<Self> {
        vec![
            Self::PilotCarriage,
            Self::TravellerCohort,
            Self::LongitudinalCarriage,
        ]
    }

    /// Load the dataset.
    pub fn load(&self) -> Result<StrainCounts> {
        let observations = match self {
            Self::PilotCarriage => literal(self.name(), &[1, 1, 2, 1, 3, 1, 2, 1]),
            Self::TravellerCohort => literal(self.name(), &[1, 2, 1, 1, 1, 3, 1, 2, 1, 4]),
            Self::LongitudinalCarriage => {
                let visits: &[(u32, u32)] = &[(1, 1), (2, 1), (1, 2), (3, 2), (1, 1)];
                visits
                    .iter()
                    .enumerate()
                    .flat_map(|(i, &(v1, v2))| {
                        let id = format!("L{:02}", i + 1);
                        vec![
                            StrainObservation::new(&id, v1)
                                .with_study(self.name())
                                .with_visit("V1"),
                            StrainObservation::new(&id, v2)
                                .with_study(self.name())
                                .with_visit("V2"),
                        ]
                    })
                    .collect()
            }
        };
        StrainCounts::new(observations)
    }
}

fn literal(study: &str, counts: &[u32]) -> Vec<StrainObservation> {
    counts
        .iter()
        .enumerate()
        .map(|(i, &k)| {
            StrainObservation::new(&format!("{}_{:02}", study, i + 1), k).with_study(study)
        })
        .collect()
}

/// List all embedded datasets with descriptions.
pub fn list_datasets() -> Vec<(String, String)> {
    PublishedDataset::all()
        .iter()
        .map(|d| (d.name().to_string(), d.description().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_datasets_load() {
        for dataset in PublishedDataset::all() {
            let counts = dataset.load().unwrap();
            assert!(!counts.is_empty(), "{} should load", dataset.name());
            // Every embedded record is a positive count
            assert_eq!(counts.counts(), counts.positive_counts());
        }
    }

    #[test]
    fn test_pilot_carriage_shape() {
        let counts = PublishedDataset::PilotCarriage.load().unwrap();
        assert_eq!(counts.len(), 8);
        assert_eq!(counts.max_count(), 3);
        assert_eq!(counts.n_subjects(), 8);
    }

    #[test]
    fn test_longitudinal_has_visits() {
        let counts = PublishedDataset::LongitudinalCarriage.load().unwrap();
        assert_eq!(counts.len(), 10);
        assert_eq!(counts.n_subjects(), 5);
        assert!(counts.observations().iter().all(|o| o.visit.is_some()));
    }

    #[test]
    fn test_metadata_accessors() {
        for dataset in PublishedDataset::all() {
            assert!(!dataset.name().is_empty());
            assert!(!dataset.description().is_empty());
            assert!(!dataset.citation().is_empty());
        }
        assert!(PublishedDataset::LongitudinalCarriage.is_longitudinal());
        assert!(!PublishedDataset::PilotCarriage.is_longitudinal());
    }

    #[test]
    fn test_list_datasets() {
        let listing = list_datasets();
        assert_eq!(listing.len(), 3);
        assert!(listing.iter().any(|(name, _)| name == "traveller_cohort"));
    }
}
