//! End-to-end runs over files on disk.
//!
//! Pipeline A: reference table -> thresholds -> query classification.
//! Pipeline B: one transition matrix per configured dataset.
//! The two share nothing and either can run alone.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::analysis::heatmap::{plot_heatmap, HeatPalette};
use crate::analysis::significance::{classify, summarize, write_significance, SignificanceSummary};
use crate::analysis::thresholds::{estimate, write_thresholds, ThresholdTable};
use crate::analysis::transitions::{build, write_transition_tables, TransitionTables};
use crate::config::AnalysisConfig;
use crate::data_handling::variant_dataset::{
    residue_records, scored_records, with_entity_column, ResidueSource, VariantDataset,
};
use crate::error::{PipelineError, Result};
use crate::helper_functions::ensure_dir;
use crate::models::{Category, Dataset, ResidueClassifier};

/// Loads the reference dataset, estimates per-entity thresholds and writes
/// the threshold table.
pub fn run_thresholds(config: &AnalysisConfig) -> Result<ThresholdTable> {
    config.validate()?;
    let out_dir = config.significance_output_dir();
    ensure_dir(&out_dir)?;

    info!("Step 1: Loading reference data for null distribution...");
    let reference = VariantDataset::new("reference", config.reference_path());
    let df = with_entity_column(reference.load()?, &config.columns)?;
    let records = scored_records(&df, &config.columns)?;

    info!("Step 2: Calculating thresholds per protein...");
    let table = estimate(&records, &config.threshold_params());
    if table.dropped > 0 {
        info!(
            "Dropped {} of {} reference rows without a usable score or entity",
            table.dropped,
            records.len()
        );
    }
    write_thresholds(&table, &config.columns.entity, &out_dir.join(&config.thresholds_file))?;
    Ok(table)
}

/// Runs pipeline A: thresholds from the reference set, then classification
/// of the query set.
pub fn run_significance(config: &AnalysisConfig) -> Result<SignificanceSummary> {
    let table = run_thresholds(config)?;

    info!("Step 3: Processing query data...");
    let query = VariantDataset::new("query", config.query_path());
    let df = with_entity_column(query.load()?, &config.columns)?;
    let records = scored_records(&df, &config.columns)?;

    let classified = classify(&records, &table);
    let summary = summarize(&classified);

    let out_path = config.significance_output_dir().join(&config.significance_file);
    write_significance(&df, &classified, config.significant_only, &out_path)?;

    info!("Summary of Analysis:");
    info!(" - Total query variants: {}", summary.total);
    info!(
        " - Significant variants: {} ({:.2}%)",
        summary.significant(),
        summary.significant_pct()
    );
    info!(
        " - Destabilizing: {}, stabilizing: {}",
        summary.destabilizing, summary.stabilizing
    );
    info!(
        " - Without threshold: {}, unreliable threshold: {}, without score: {}",
        summary.unmatched, summary.unreliable, summary.unscored
    );
    Ok(summary)
}

#[derive(Debug, Clone)]
pub struct TransitionReport {
    pub name: String,
    pub tables: TransitionTables,
    pub counts_path: PathBuf,
    pub percent_path: PathBuf,
}

/// Outcome of pipeline B across all configured datasets.
#[derive(Debug, Default)]
pub struct TransitionRun {
    pub completed: Vec<TransitionReport>,
    /// Datasets whose input file does not exist.
    pub skipped: Vec<String>,
    pub failed: Vec<(String, PipelineError)>,
}

impl TransitionRun {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

fn transition_for_dataset(
    dataset: &VariantDataset,
    config: &AnalysisConfig,
) -> Result<TransitionReport> {
    info!("Analyzing {} transition matrix...", dataset.name());
    let df = dataset.load()?;
    let (records, source) = residue_records(&df, &config.columns)?;
    let classifier = match source {
        ResidueSource::Codes => ResidueClassifier::standard(),
        ResidueSource::Categories => ResidueClassifier::category_labels(),
    };
    let tables = build(&records, &classifier, &Category::ORDER);

    let out_dir = config.transition_output_dir();
    let prefix = format!("{}_transition", dataset.name().to_lowercase());
    write_transition_tables(&tables, &out_dir, &prefix)?;

    if config.render_heatmaps {
        let labels: Vec<&str> = Category::ORDER.iter().map(|c| c.as_str()).collect();
        plot_heatmap(
            &tables.counts.counts().mapv(|c| c as f64),
            &labels,
            &format!("{} Variant Transition Counts", dataset.name()),
            "Count",
            HeatPalette::Blues,
            0,
            &out_dir.join(format!("{prefix}_counts.png")),
        )?;
        plot_heatmap(
            tables.percent.values(),
            &labels,
            &format!("{} Variant Transition (Row %)", dataset.name()),
            "Percentage",
            HeatPalette::Greens,
            1,
            &out_dir.join(format!("{prefix}_percent.png")),
        )?;
    }

    Ok(TransitionReport {
        name: dataset.name().to_string(),
        counts_path: out_dir.join(format!("{prefix}_counts.csv")),
        percent_path: out_dir.join(format!("{prefix}_percent.csv")),
        tables,
    })
}

/// Runs pipeline B for every configured dataset.
///
/// Missing files are skipped; a failure in one dataset does not stop the rest.
pub fn run_transitions(config: &AnalysisConfig) -> Result<TransitionRun> {
    ensure_dir(&config.transition_output_dir())?;

    let mut run = TransitionRun::default();
    for input in &config.transition_datasets {
        let dataset = VariantDataset::new(&input.name, config.base_dir.join(&input.file));
        match transition_for_dataset(&dataset, config) {
            Ok(report) => run.completed.push(report),
            Err(PipelineError::MissingInput { path }) => {
                warn!("Skipping {}: {} not found", input.name, path.display());
                run.skipped.push(input.name.clone());
            }
            Err(e) => {
                error!("Transition analysis for {} failed: {}", input.name, e);
                run.failed.push((input.name.clone(), e));
            }
        }
    }

    info!(
        "Transition analysis completed: {} written, {} skipped, {} failed",
        run.completed.len(),
        run.skipped.len(),
        run.failed.len()
    );
    Ok(run)
}
