//! Per-entity null-distribution thresholds.
//!
//! Reference scores are grouped by entity id and each group is reduced to its
//! lower and upper percentile. Percentiles use linear interpolation between
//! order statistics: for `n` sorted values and percentile `p`, the rank is
//! `p / 100 * (n - 1)` and the result interpolates between the two neighbouring
//! values (the default of numpy's `percentile`).

use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array1;
use ndarray_stats::interpolate::Linear;
use ndarray_stats::Quantile1dExt;
use noisy_float::types::{n64, N64};
use polars::prelude::*;
use tracing::{debug, info};

use crate::error::Result;
use crate::helper_functions::write_table;
use crate::models::{ThresholdRecord, VariantRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdParams {
    pub lower_pct: f64,
    pub upper_pct: f64,
    /// Minimum number of reference scores for an entity to be reliable.
    pub min_count: usize,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            lower_pct: 2.5,
            upper_pct: 97.5,
            min_count: 10,
        }
    }
}

/// Thresholds keyed by entity id, plus the number of reference records that
/// could not contribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdTable {
    pub entries: BTreeMap<String, ThresholdRecord>,
    pub dropped: usize,
}

impl ThresholdTable {
    pub fn get(&self, entity_id: &str) -> Option<&ThresholdRecord> {
        self.entries.get(entity_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reliable_count(&self) -> usize {
        self.entries.values().filter(|t| t.reliable).count()
    }

    /// Columns: `<entity_col>, count, lower_bound, upper_bound, reliable`,
    /// one row per entity in id order.
    pub fn to_dataframe(&self, entity_col: &str) -> PolarsResult<DataFrame> {
        let rows = self.entries.values();
        let ids: Vec<&str> = rows.clone().map(|t| t.entity_id.as_str()).collect();
        let counts: Vec<u32> = rows.clone().map(|t| t.count as u32).collect();
        let lower: Vec<f64> = rows.clone().map(|t| t.lower_bound).collect();
        let upper: Vec<f64> = rows.clone().map(|t| t.upper_bound).collect();
        let reliable: Vec<bool> = rows.map(|t| t.reliable).collect();

        DataFrame::new(vec![
            Column::from(Series::new(entity_col.into(), ids)),
            Column::from(Series::new("count".into(), counts)),
            Column::from(Series::new("lower_bound".into(), lower)),
            Column::from(Series::new("upper_bound".into(), upper)),
            Column::from(Series::new("reliable".into(), reliable)),
        ])
    }
}

fn percentile(sorted: &mut Array1<N64>, pct: f64) -> Option<f64> {
    sorted
        .quantile_mut(n64(pct / 100.0), &Linear)
        .ok()
        .map(|v| v.raw())
}

/// Builds one [`ThresholdRecord`] per entity that has at least one valid score.
///
/// Records without a score or without an entity id are dropped before
/// grouping and do not count towards `count`.
pub fn estimate(records: &[VariantRecord], params: &ThresholdParams) -> ThresholdTable {
    debug_assert!(0.0 <= params.lower_pct && params.lower_pct < params.upper_pct);
    debug_assert!(params.upper_pct <= 100.0);
    debug_assert!(params.min_count >= 1);

    let mut groups: BTreeMap<&str, Vec<N64>> = BTreeMap::new();
    let mut dropped = 0;
    for record in records {
        match record.score {
            Some(score) if !record.entity_id.is_empty() => groups
                .entry(record.entity_id.as_str())
                .or_default()
                .push(n64(score)),
            _ => dropped += 1,
        }
    }

    let entries: BTreeMap<String, ThresholdRecord> = groups
        .into_iter()
        .filter_map(|(entity_id, scores)| {
            let count = scores.len();
            let mut scores = Array1::from_vec(scores);
            let lower_bound = percentile(&mut scores, params.lower_pct)?;
            let upper_bound = percentile(&mut scores, params.upper_pct)?;
            Some((
                entity_id.to_string(),
                ThresholdRecord {
                    entity_id: entity_id.to_string(),
                    count,
                    lower_bound,
                    upper_bound,
                    reliable: count >= params.min_count,
                },
            ))
        })
        .collect();

    debug!(
        "Estimated thresholds for {} entities ({} reference records dropped)",
        entries.len(),
        dropped
    );
    ThresholdTable { entries, dropped }
}

/// Writes the threshold table tab-delimited, sorted by entity id.
pub fn write_thresholds(table: &ThresholdTable, entity_col: &str, path: &Path) -> Result<()> {
    let mut df = table.to_dataframe(entity_col)?;
    write_table(&mut df, path, b'\t')?;
    info!(" -> Analyzable proteins: {}", table.reliable_count());
    Ok(())
}
