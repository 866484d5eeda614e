use std::cmp::Ordering;
use std::path::Path;

use polars::prelude::*;
use tracing::{info, warn};

use crate::analysis::thresholds::ThresholdTable;
use crate::error::Result;
use crate::helper_functions::{has_column, write_table};
use crate::models::{ClassifiedVariant, SignificanceType, ThresholdRecord, VariantRecord};

pub const SIGNIFICANCE_COL: &str = "Significance_Type";

/// Columns appended to the query table, in output order.
const ADDED_COLS: [&str; 5] = ["count", "lower_bound", "upper_bound", "reliable", SIGNIFICANCE_COL];

/// Suffix given to a query column whose name collides with an added column.
pub const QUERY_SUFFIX: &str = "_query";

/// Labels a single score against an optional threshold.
///
/// Only a reliable threshold can make a score significant, and only by strict
/// inequality: a score equal to a bound is inside the normal range.
pub fn classify_score(score: Option<f64>, threshold: Option<&ThresholdRecord>) -> SignificanceType {
    let (Some(score), Some(t)) = (score, threshold) else {
        return SignificanceType::NotSignificant;
    };
    if !t.reliable {
        return SignificanceType::NotSignificant;
    }
    if score < t.lower_bound {
        SignificanceType::ExtremeDestabilizing
    } else if score > t.upper_bound {
        SignificanceType::ExtremeStabilizing
    } else {
        SignificanceType::NotSignificant
    }
}

/// Ascending by score; records without a score go last.
fn by_score(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Left-joins every query record with its entity's threshold and labels it.
///
/// The result holds exactly one entry per input record, sorted ascending by
/// score with unscored records at the end; equal keys keep input order.
pub fn classify<'a>(
    records: &'a [VariantRecord],
    thresholds: &'a ThresholdTable,
) -> Vec<ClassifiedVariant<'a>> {
    let mut classified: Vec<ClassifiedVariant<'a>> = records
        .iter()
        .map(|record| {
            let threshold = thresholds.get(&record.entity_id);
            ClassifiedVariant {
                record,
                threshold,
                significance: classify_score(record.score, threshold),
            }
        })
        .collect();
    classified.sort_by(|a, b| by_score(a.record.score, b.record.score));
    classified
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignificanceSummary {
    pub total: usize,
    pub destabilizing: usize,
    pub stabilizing: usize,
    /// Entity absent from the threshold table.
    pub unmatched: usize,
    /// Matched, but the threshold is unreliable.
    pub unreliable: usize,
    pub unscored: usize,
}

impl SignificanceSummary {
    pub fn significant(&self) -> usize {
        self.destabilizing + self.stabilizing
    }

    pub fn significant_pct(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.significant() as f64 / self.total as f64 * 100.0
        }
    }
}

pub fn summarize(classified: &[ClassifiedVariant<'_>]) -> SignificanceSummary {
    let mut summary = SignificanceSummary {
        total: classified.len(),
        ..SignificanceSummary::default()
    };
    for c in classified {
        match c.significance {
            SignificanceType::ExtremeDestabilizing => summary.destabilizing += 1,
            SignificanceType::ExtremeStabilizing => summary.stabilizing += 1,
            SignificanceType::NotSignificant => {}
        }
        match c.threshold {
            None => summary.unmatched += 1,
            Some(t) if !t.reliable => summary.unreliable += 1,
            Some(_) => {}
        }
        if c.record.score.is_none() {
            summary.unscored += 1;
        }
    }
    summary
}

/// Re-attaches the query's original columns to the classification.
///
/// Rows follow the order of `classified`. Threshold columns are null for
/// unmatched records. A query column sharing a name with one of the added
/// columns is kept under that name plus [`QUERY_SUFFIX`].
pub fn significance_frame(
    query: &DataFrame,
    classified: &[ClassifiedVariant<'_>],
    significant_only: bool,
) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = classified.iter().map(|c| c.record.row as IdxSize).collect();
    let mut df = query.take(&IdxCa::from_vec("row".into(), idx))?;

    for name in ADDED_COLS {
        if has_column(&df, name) {
            let renamed = format!("{name}{QUERY_SUFFIX}");
            warn!("Query column '{}' renamed to '{}'", name, renamed);
            df.rename(name, renamed.into())?;
        }
    }

    let count: Vec<Option<u32>> = classified
        .iter()
        .map(|c| c.threshold.map(|t| t.count as u32))
        .collect();
    let lower: Vec<Option<f64>> = classified
        .iter()
        .map(|c| c.threshold.map(|t| t.lower_bound))
        .collect();
    let upper: Vec<Option<f64>> = classified
        .iter()
        .map(|c| c.threshold.map(|t| t.upper_bound))
        .collect();
    let reliable: Vec<Option<bool>> = classified
        .iter()
        .map(|c| c.threshold.map(|t| t.reliable))
        .collect();
    let label: Vec<&str> = classified.iter().map(|c| c.significance.as_str()).collect();

    df.with_column(Series::new("count".into(), count))?;
    df.with_column(Series::new("lower_bound".into(), lower))?;
    df.with_column(Series::new("upper_bound".into(), upper))?;
    df.with_column(Series::new("reliable".into(), reliable))?;
    df.with_column(Series::new(SIGNIFICANCE_COL.into(), label))?;

    if !significant_only {
        return Ok(df);
    }
    let df = df
        .lazy()
        .filter(col(SIGNIFICANCE_COL).neq(lit(SignificanceType::NotSignificant.as_str())))
        .collect()?;
    Ok(df)
}

pub fn write_significance(
    query: &DataFrame,
    classified: &[ClassifiedVariant<'_>],
    significant_only: bool,
    path: &Path,
) -> Result<()> {
    let mut df = significance_frame(query, classified, significant_only)?;
    write_table(&mut df, path, b'\t')?;
    info!(" - Results saved to: {}", path.display());
    Ok(())
}
