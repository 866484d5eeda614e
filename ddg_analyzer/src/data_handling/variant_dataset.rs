use std::path::PathBuf;

use polars::prelude::*;
use tracing::{debug, error, info, warn};

use crate::config::ColumnConfig;
use crate::error::{PipelineError, Result};
use crate::helper_functions::{has_column, read_tsv};
use crate::models::{Dataset, VariantRecord};

/// A merged variant table (gnomAD or COSMIC with stability predictions).
pub struct VariantDataset {
    pub name: String,
    pub path: PathBuf,
}

impl VariantDataset {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl Dataset for VariantDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<DataFrame> {
        if !self.path.exists() {
            error!("{} not found", self.path.display());
            return Err(PipelineError::MissingInput {
                path: self.path.clone(),
            });
        }

        info!("Reading {} data from {}", self.name, self.path.display());
        let df = match read_tsv(&self.path) {
            Ok(df) => df,
            Err(e) => {
                error!("Failed to read {} table: {}", self.name, e);
                return Err(e.into());
            }
        };
        debug!("Loaded {} rows, {} columns", df.height(), df.width());
        Ok(df)
    }
}

/// Which columns residue labels were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidueSource {
    /// One-letter amino-acid codes.
    Codes,
    /// Pre-computed category labels.
    Categories,
}

/// Makes sure the entity column exists, deriving it from the versioned
/// feature id (everything before the first `.`) when necessary.
pub fn with_entity_column(mut df: DataFrame, columns: &ColumnConfig) -> Result<DataFrame> {
    if has_column(&df, &columns.entity) {
        return Ok(df);
    }
    if !has_column(&df, &columns.feature) {
        error!(
            "Neither '{}' nor '{}' present; entity information missing",
            columns.entity, columns.feature
        );
        return Err(PipelineError::schema(&columns.entity));
    }

    debug!("Deriving '{}' from '{}'", columns.entity, columns.feature);
    let feature = df.column(&columns.feature)?.cast(&DataType::String)?;
    let derived: Vec<Option<String>> = feature
        .str()?
        .into_iter()
        .map(|v| v.map(|id| strip_version(id).to_string()))
        .collect();
    df.with_column(Series::new(PlSmallStr::from(columns.entity.as_str()), derived))?;
    Ok(df)
}

fn strip_version(feature_id: &str) -> &str {
    feature_id.split('.').next().unwrap_or(feature_id)
}

fn parse_score(value: Option<f64>) -> Option<f64> {
    value.filter(|s| s.is_finite())
}

/// Extracts `(entity_id, score)` records, one per row, in row order.
///
/// The entity column must already exist (see [`with_entity_column`]). A missing
/// entity becomes an empty id; an unparseable score becomes `None`. Surrounding
/// whitespace around a score is ignored.
pub fn scored_records(df: &DataFrame, columns: &ColumnConfig) -> Result<Vec<VariantRecord>> {
    if !has_column(df, &columns.score) {
        return Err(PipelineError::schema(&columns.score));
    }
    if !has_column(df, &columns.entity) {
        return Err(PipelineError::schema(&columns.entity));
    }

    let entity = df.column(&columns.entity)?.cast(&DataType::String)?;
    let scores = df
        .clone()
        .lazy()
        .select([col(columns.score.as_str())
            .cast(DataType::String)
            .str()
            .strip_chars(lit(Null {}))
            .cast(DataType::Float64)])
        .collect()?;
    let entity = entity.str()?;
    let score = scores.column(&columns.score)?.f64()?;

    let records: Vec<VariantRecord> = entity
        .into_iter()
        .zip(score.into_iter())
        .enumerate()
        .map(|(row, (id, s))| VariantRecord::scored(row, id.unwrap_or_default(), parse_score(s)))
        .collect();

    let unscored = records.iter().filter(|r| r.score.is_none()).count();
    if unscored > 0 {
        warn!(
            "{} of {} rows have a missing or non-numeric '{}'",
            unscored,
            records.len(),
            columns.score
        );
    }
    Ok(records)
}

/// Extracts origin/destination residue labels, one record per row.
///
/// Pre-computed category columns take precedence over residue code columns.
pub fn residue_records(
    df: &DataFrame,
    columns: &ColumnConfig,
) -> Result<(Vec<VariantRecord>, ResidueSource)> {
    let (from_col, to_col, source) =
        if has_column(df, &columns.group_from) && has_column(df, &columns.group_to) {
            (&columns.group_from, &columns.group_to, ResidueSource::Categories)
        } else {
            (&columns.residue_from, &columns.residue_to, ResidueSource::Codes)
        };
    for name in [from_col, to_col] {
        if !has_column(df, name) {
            return Err(PipelineError::schema(name));
        }
    }
    debug!("Reading residue labels from '{}' -> '{}'", from_col, to_col);

    let from = df.column(from_col)?.cast(&DataType::String)?;
    let to = df.column(to_col)?.cast(&DataType::String)?;
    let entity = if has_column(df, &columns.entity) {
        Some(df.column(&columns.entity)?.cast(&DataType::String)?)
    } else {
        None
    };
    let entity = entity.as_ref().map(|c| c.str()).transpose()?;

    let records = from
        .str()?
        .into_iter()
        .zip(to.str()?.into_iter())
        .enumerate()
        .map(|(row, (f, t))| VariantRecord {
            row,
            entity_id: entity
                .and_then(|ca| ca.get(row))
                .unwrap_or_default()
                .to_string(),
            score: None,
            residue_from: f.map(str::to_string),
            residue_to: t.map(str::to_string),
        })
        .collect();
    Ok((records, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn columns() -> ColumnConfig {
        ColumnConfig::default()
    }

    #[test]
    fn derives_entity_from_versioned_feature() {
        let df = df![
            "ENSP_or_Feature" => &["ENSP0001.3", "ENSP0002", "ENSP0003.1.2"],
            "ddg" => &["1.0", "2.0", "3.0"]
        ]
        .unwrap();

        let df = with_entity_column(df, &columns()).unwrap();
        let ids: Vec<Option<&str>> =
            df.column("ENSP_core").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some("ENSP0001"), Some("ENSP0002"), Some("ENSP0003")]);
    }

    #[test]
    fn existing_entity_column_is_kept() {
        let df = df![
            "ENSP_core" => &["A"],
            "ENSP_or_Feature" => &["B.1"]
        ]
        .unwrap();
        let df = with_entity_column(df, &columns()).unwrap();
        assert_eq!(df.column("ENSP_core").unwrap().str().unwrap().get(0), Some("A"));
    }

    #[test]
    fn missing_entity_information_is_a_schema_error() {
        let df = df!["ddg" => &["1.0"]].unwrap();
        match with_entity_column(df, &columns()) {
            Err(PipelineError::Schema { column }) => assert_eq!(column, "ENSP_core"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_scores_become_none() {
        let df = df![
            "ENSP_core" => &["E1", "E1", "E2", "E2"],
            "ddg" => &[Some("1.5"), Some("abc"), None, Some("NaN")]
        ]
        .unwrap();

        let records = scored_records(&df, &columns()).unwrap();
        let scores: Vec<Option<f64>> = records.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![Some(1.5), None, None, None]);
        assert_eq!(records[2].entity_id, "E2");
        assert_eq!(records[3].row, 3);
    }

    #[test]
    fn padded_scores_are_trimmed_before_parsing() {
        let df = df![
            "ENSP_core" => &["E1", "E1", "E1", "E1", "E1"],
            "ddg" => &[" 1.5 ", "1e1", "+2", "1.5 ", "\t1.5"]
        ]
        .unwrap();

        let scores: Vec<Option<f64>> = scored_records(&df, &columns())
            .unwrap()
            .iter()
            .map(|r| r.score)
            .collect();
        assert_eq!(scores, vec![Some(1.5), Some(10.0), Some(2.0), Some(1.5), Some(1.5)]);
    }

    #[test]
    fn missing_score_column_is_a_schema_error() {
        let df = df!["ENSP_core" => &["E1"]].unwrap();
        assert!(matches!(
            scored_records(&df, &columns()),
            Err(PipelineError::Schema { .. })
        ));
    }

    #[test]
    fn residue_records_prefer_precomputed_groups() {
        let df = df![
            "AA_ref" => &["G", "K"],
            "AA_alt" => &["D", "E"],
            "AA_ref_group" => &["Nonpolar", "Positive"],
            "AA_alt_group" => &["Negative", "Negative"]
        ]
        .unwrap();

        let (records, source) = residue_records(&df, &columns()).unwrap();
        assert_eq!(source, ResidueSource::Categories);
        assert_eq!(records[1].residue_from.as_deref(), Some("Positive"));
    }

    #[test]
    fn residue_records_fall_back_to_codes() {
        let df = df![
            "AA_ref" => &[Some("G"), None],
            "AA_alt" => &[Some("D"), Some("*")]
        ]
        .unwrap();

        let (records, source) = residue_records(&df, &columns()).unwrap();
        assert_eq!(source, ResidueSource::Codes);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].residue_to.as_deref(), Some("D"));
        assert_eq!(records[1].residue_from, None);
        assert_eq!(records[1].entity_id, "");
    }
}
