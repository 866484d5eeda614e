//! Run configuration.
//!
//! Defaults reproduce the layout of the integrated gnomAD / COSMIC analysis:
//! both merged tables live in `data/integrated_analysis/` under the project
//! root, and results go to sub-directories next to them. A JSON file may
//! override any subset of fields.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::analysis::thresholds::ThresholdParams;
use crate::error::{PipelineError, Result};
use crate::helper_functions::project_root;

/// Column names expected in the input tables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub entity: String,
    /// Versioned feature id (`ENSP00000269305.4`) the entity can be derived from.
    pub feature: String,
    pub score: String,
    pub residue_from: String,
    pub residue_to: String,
    pub group_from: String,
    pub group_to: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            entity: "ENSP_core".into(),
            feature: "ENSP_or_Feature".into(),
            score: "ddg".into(),
            residue_from: "AA_ref".into(),
            residue_to: "AA_alt".into(),
            group_from: "AA_ref_group".into(),
            group_to: "AA_alt_group".into(),
        }
    }
}

/// A dataset label paired with its file name under `base_dir`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedInput {
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub base_dir: PathBuf,
    pub reference_file: String,
    pub query_file: String,

    pub significance_dir: String,
    pub thresholds_file: String,
    pub significance_file: String,

    pub transition_dir: String,
    pub transition_datasets: Vec<NamedInput>,

    pub lower_pct: f64,
    pub upper_pct: f64,
    pub min_variants: usize,

    /// Write only `Extreme_*` rows to the significance table.
    pub significant_only: bool,
    pub render_heatmaps: bool,

    pub columns: ColumnConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_dir: project_root().join("data/integrated_analysis"),
            reference_file: "Gnomad_with_ACDC_merged.tsv".into(),
            query_file: "Cosmic_with_ACDC_merged.tsv".into(),
            significance_dir: "significant_variants".into(),
            thresholds_file: "ENSP_Specific_Thresholds.tsv".into(),
            significance_file: "Cosmic_ENSP_Specific_Significant.tsv".into(),
            transition_dir: "transition_analysis".into(),
            transition_datasets: vec![
                NamedInput {
                    name: "Cosmic".into(),
                    file: "Cosmic_with_ACDC_merged.tsv".into(),
                },
                NamedInput {
                    name: "Gnomad".into(),
                    file: "Gnomad_with_ACDC_merged.tsv".into(),
                },
            ],
            lower_pct: 2.5,
            upper_pct: 97.5,
            min_variants: 10,
            significant_only: true,
            render_heatmaps: true,
            columns: ColumnConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingInput {
                path: path.to_path_buf(),
            });
        }
        info!("Reading configuration from {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        let config: AnalysisConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(self.lower_pct) || !in_range(self.upper_pct) {
            return Err(PipelineError::Config(format!(
                "percentiles must lie in [0, 100], got {} and {}",
                self.lower_pct, self.upper_pct
            )));
        }
        if self.lower_pct >= self.upper_pct {
            return Err(PipelineError::Config(format!(
                "lower_pct ({}) must be below upper_pct ({})",
                self.lower_pct, self.upper_pct
            )));
        }
        if self.min_variants == 0 {
            return Err(PipelineError::Config("min_variants must be at least 1".into()));
        }
        Ok(())
    }

    pub fn threshold_params(&self) -> ThresholdParams {
        ThresholdParams {
            lower_pct: self.lower_pct,
            upper_pct: self.upper_pct,
            min_count: self.min_variants,
        }
    }

    pub fn reference_path(&self) -> PathBuf {
        self.base_dir.join(&self.reference_file)
    }

    pub fn query_path(&self) -> PathBuf {
        self.base_dir.join(&self.query_file)
    }

    pub fn significance_output_dir(&self) -> PathBuf {
        self.base_dir.join(&self.significance_dir)
    }

    pub fn transition_output_dir(&self) -> PathBuf {
        self.base_dir.join(&self.transition_dir)
    }
}
