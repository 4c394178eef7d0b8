//! Per-participant strain count observations.

use crate::error::{Result, SamplingError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A single observation: distinct strains recovered from one stool sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrainObservation {
    /// Participant identifier.
    pub subject_id: String,
    /// Number of distinct strains (sequence types) observed.
    pub strains: u32,
    /// Source study label, if the record came from a pooled dataset.
    pub study: Option<String>,
    /// Visit label for longitudinal designs.
    pub visit: Option<String>,
}

impl StrainObservation {
    /// Create an observation with no study or visit label.
    pub fn new(subject_id: &str, strains: u32) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            strains,
            study: None,
            visit: None,
        }
    }

    /// Attach a study label.
    pub fn with_study(mut self, study: &str) -> Self {
        self.study = Some(study.to_string());
        self
    }

    /// Attach a visit label.
    pub fn with_visit(mut self, visit: &str) -> Self {
        self.visit = Some(visit.to_string());
        self
    }
}

/// A validated collection of strain count observations.
///
/// Counts are non-negative; model fitting consumes only the positive counts
/// (zero-strain samples are excluded under zero truncation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrainCounts {
    observations: Vec<StrainObservation>,
}

impl StrainCounts {
    /// Create a collection from observations.
    ///
    /// Rejects empty input and duplicate (subject, visit) pairs.
    pub fn new(observations: Vec<StrainObservation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(SamplingError::EmptyData(
                "No strain count observations".to_string(),
            ));
        }
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for obs in &observations {
            let visit = obs.visit.clone().unwrap_or_default();
            if !seen.insert((obs.subject_id.clone(), visit.clone())) {
                return Err(SamplingError::DuplicateObservation {
                    subject: obs.subject_id.clone(),
                    visit,
                });
            }
        }
        Ok(Self { observations })
    }

    /// Load observations from a TSV file.
    ///
    /// Expected format:
    /// - Header: `subject_id<TAB>strains` with optional `study` and `visit` columns
    /// - One observation per subsequent row
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| SamplingError::EmptyData("Empty TSV file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 || header[0] != "subject_id" || header[1] != "strains" {
            return Err(SamplingError::EmptyData(
                "TSV header must start with subject_id<TAB>strains".to_string(),
            ));
        }
        let study_col = header.iter().position(|h| *h == "study");
        let visit_col = header.iter().position(|h| *h == "visit");

        let mut observations = Vec::new();
        for (line_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 {
                return Err(SamplingError::InvalidCount {
                    value: line.clone(),
                    line: line_idx + 2,
                });
            }
            let strains: u32 =
                fields[1]
                    .trim()
                    .parse()
                    .map_err(|_| SamplingError::InvalidCount {
                        value: fields[1].to_string(),
                        line: line_idx + 2,
                    })?;
            let mut obs = StrainObservation::new(fields[0], strains);
            if let Some(c) = study_col {
                if let Some(v) = fields.get(c).filter(|v| !v.is_empty()) {
                    obs.study = Some(v.to_string());
                }
            }
            if let Some(c) = visit_col {
                if let Some(v) = fields.get(c).filter(|v| !v.is_empty()) {
                    obs.visit = Some(v.to_string());
                }
            }
            observations.push(obs);
        }

        Self::new(observations)
    }

    /// Write observations to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let has_study = self.observations.iter().any(|o| o.study.is_some());
        let has_visit = self.observations.iter().any(|o| o.visit.is_some());

        let mut header = vec!["subject_id", "strains"];
        if has_study {
            header.push("study");
        }
        if has_visit {
            header.push("visit");
        }
        writeln!(writer, "{}", header.join("\t"))?;

        for obs in &self.observations {
            let mut fields = vec![obs.subject_id.clone(), obs.strains.to_string()];
            if has_study {
                fields.push(obs.study.clone().unwrap_or_default());
            }
            if has_visit {
                fields.push(obs.visit.clone().unwrap_or_default());
            }
            writeln!(writer, "{}", fields.join("\t"))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Check if empty (never true for a validated collection).
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// All observations.
    pub fn observations(&self) -> &[StrainObservation] {
        &self.observations
    }

    /// All strain counts, including zeros.
    pub fn counts(&self) -> Vec<u32> {
        self.observations.iter().map(|o| o.strains).collect()
    }

    /// Strain counts with zero-strain samples excluded (the fitting input).
    pub fn positive_counts(&self) -> Vec<u32> {
        self.observations
            .iter()
            .map(|o| o.strains)
            .filter(|&k| k > 0)
            .collect()
    }

    /// Number of distinct subjects.
    pub fn n_subjects(&self) -> usize {
        self.observations
            .iter()
            .map(|o| o.subject_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Largest observed strain count.
    pub fn max_count(&self) -> u32 {
        self.observations.iter().map(|o| o.strains).max().unwrap_or(0)
    }

    /// Mean strain count over all observations.
    pub fn mean_count(&self) -> f64 {
        let sum: u64 = self.observations.iter().map(|o| o.strains as u64).sum();
        sum as f64 / self.observations.len() as f64
    }

    /// Observations belonging to one study label.
    pub fn subset_by_study(&self, study: &str) -> Result<StrainCounts> {
        let subset: Vec<StrainObservation> = self
            .observations
            .iter()
            .filter(|o| o.study.as_deref() == Some(study))
            .cloned()
            .collect();
        if subset.is_empty() {
            return Err(SamplingError::EmptyData(format!(
                "No observations with study label '{}'",
                study
            )));
        }
        StrainCounts::new(subset)
    }
}
