//! Residue-category transition matrices.
//!
//! Rows are the category of the reference residue, columns the category of
//! the substituted residue. Axes always follow the order given to [`build`],
//! so the shape never depends on which categories occur in the data.

use std::path::Path;

use ndarray::{Array2, Axis};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::Result;
use crate::helper_functions::write_table;
use crate::models::{Category, ResidueClassifier, VariantRecord};

pub const ROW_LABEL_COL: &str = "from_category";

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix {
    order: Vec<Category>,
    counts: Array2<u64>,
}

/// Row-normalised view of a [`TransitionMatrix`], in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentMatrix {
    order: Vec<Category>,
    values: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTables {
    pub counts: TransitionMatrix,
    pub percent: PercentMatrix,
    /// Records dropped because either residue had no category on the axes.
    pub excluded: usize,
}

fn index_of(order: &[Category], category: Category) -> Option<usize> {
    order.iter().position(|c| *c == category)
}

fn row_labels(order: &[Category]) -> Column {
    let labels: Vec<&str> = order.iter().map(|c| c.as_str()).collect();
    Column::from(Series::new(ROW_LABEL_COL.into(), labels))
}

fn labelled_frame<T>(order: &[Category], values: &Array2<T>) -> PolarsResult<DataFrame>
where
    T: Clone,
    Series: NamedFrom<Vec<T>, [T]>,
{
    let mut columns = vec![row_labels(order)];
    for (j, category) in order.iter().enumerate() {
        let cells: Vec<T> = values.column(j).to_vec();
        columns.push(Column::from(Series::new(category.as_str().into(), cells)));
    }
    DataFrame::new(columns)
}

impl TransitionMatrix {
    /// All-zero matrix over `order`.
    pub fn new(order: &[Category]) -> Self {
        let n = order.len();
        Self {
            order: order.to_vec(),
            counts: Array2::zeros((n, n)),
        }
    }

    pub fn order(&self) -> &[Category] {
        &self.order
    }

    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    /// Returns `false` (and counts nothing) when a category is not on the axes.
    pub fn record(&mut self, from: Category, to: Category) -> bool {
        match (index_of(&self.order, from), index_of(&self.order, to)) {
            (Some(i), Some(j)) => {
                self.counts[[i, j]] += 1;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, from: Category, to: Category) -> u64 {
        match (index_of(&self.order, from), index_of(&self.order, to)) {
            (Some(i), Some(j)) => self.counts[[i, j]],
            _ => 0,
        }
    }

    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.sum_axis(Axis(1)).to_vec()
    }

    pub fn total(&self) -> u64 {
        self.counts.sum()
    }

    /// Divides each cell by its row total and scales to 100. Rows without any
    /// observation stay at zero.
    pub fn percent(&self) -> PercentMatrix {
        let mut values = self.counts.mapv(|c| c as f64);
        for mut row in values.axis_iter_mut(Axis(0)) {
            let total = row.sum();
            if total > 0.0 {
                row.mapv_inplace(|c| c / total * 100.0);
            }
        }
        PercentMatrix {
            order: self.order.clone(),
            values,
        }
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        labelled_frame(&self.order, &self.counts)
    }
}

impl PercentMatrix {
    pub fn order(&self) -> &[Category] {
        &self.order
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn get(&self, from: Category, to: Category) -> f64 {
        match (index_of(&self.order, from), index_of(&self.order, to)) {
            (Some(i), Some(j)) => self.values[[i, j]],
            _ => 0.0,
        }
    }

    pub fn row_sums(&self) -> Vec<f64> {
        self.values.sum_axis(Axis(1)).to_vec()
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        labelled_frame(&self.order, &self.values)
    }
}

/// Tallies `(origin, destination)` category pairs over `records`.
///
/// A record is excluded when either residue label is missing, unknown to
/// `classifier`, or maps to a category absent from `order`.
pub fn build(
    records: &[VariantRecord],
    classifier: &ResidueClassifier,
    order: &[Category],
) -> TransitionTables {
    debug_assert!(
        order.iter().enumerate().all(|(i, c)| !order[..i].contains(c)),
        "category order must not repeat a category"
    );

    let mut counts = TransitionMatrix::new(order);
    let mut excluded = 0;
    for record in records {
        let from = record.residue_from.as_deref().and_then(|c| classifier.category_of(c));
        let to = record.residue_to.as_deref().and_then(|c| classifier.category_of(c));
        let counted = match (from, to) {
            (Some(from), Some(to)) => counts.record(from, to),
            _ => false,
        };
        if !counted {
            excluded += 1;
        }
    }

    if excluded > 0 {
        warn!(
            "Excluded {} of {} records with an undefined residue category",
            excluded,
            records.len()
        );
    }
    debug!("Counted {} transitions", counts.total());

    let percent = counts.percent();
    TransitionTables {
        counts,
        percent,
        excluded,
    }
}

/// Writes `<prefix>_counts.csv` and `<prefix>_percent.csv`.
pub fn write_transition_tables(tables: &TransitionTables, dir: &Path, prefix: &str) -> Result<()> {
    let mut counts = tables.counts.to_dataframe()?;
    write_table(&mut counts, &dir.join(format!("{prefix}_counts.csv")), b',')?;
    let mut percent = tables.percent.to_dataframe()?;
    write_table(&mut percent, &dir.join(format!("{prefix}_percent.csv")), b',')?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use Category::{Negative, Nonpolar, Polar, Positive};

    fn subs(pairs: &[(&str, &str)]) -> Vec<VariantRecord> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (f, t))| VariantRecord::substitution(i, f, t))
            .collect()
    }

    #[test]
    fn glycine_to_aspartate_is_nonpolar_to_negative() {
        let tables = build(&subs(&[("G", "D")]), &ResidueClassifier::standard(), &Category::ORDER);

        assert_eq!(tables.counts.get(Nonpolar, Negative), 1);
        assert_eq!(tables.counts.total(), 1);
        assert_eq!(tables.excluded, 0);
    }

    #[test]
    fn unmapped_codes_contribute_nothing() {
        let mut records = subs(&[("G", "*"), ("X", "A"), ("K", "R")]);
        records.push(VariantRecord {
            residue_to: None,
            ..VariantRecord::substitution(3, "L", "L")
        });
        let tables = build(&records, &ResidueClassifier::standard(), &Category::ORDER);

        assert_eq!(tables.counts.total(), 1);
        assert_eq!(tables.counts.get(Positive, Positive), 1);
        assert_eq!(tables.excluded, 3);
    }

    #[test]
    fn shape_is_fixed_even_for_sparse_input() {
        let empty = build(&[], &ResidueClassifier::standard(), &Category::ORDER);
        assert_eq!(empty.counts.counts().dim(), (4, 4));
        assert_eq!(empty.percent.values().dim(), (4, 4));
        assert!(empty.percent.values().iter().all(|v| *v == 0.0));

        let df = empty.counts.to_dataframe().unwrap();
        assert_eq!(df.shape(), (4, 5));
        let names: Vec<&str> = df.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec![ROW_LABEL_COL, "Nonpolar", "Polar", "Negative", "Positive"]);
    }

    #[test]
    fn percent_rows_sum_to_hundred_or_zero() {
        let records = subs(&[("G", "D"), ("A", "V"), ("L", "S"), ("S", "T"), ("D", "E")]);
        let tables = build(&records, &ResidueClassifier::standard(), &Category::ORDER);

        let sums = tables.percent.row_sums();
        let totals = tables.counts.row_totals();
        for (sum, total) in sums.iter().zip(totals) {
            if total > 0 {
                assert!((sum - 100.0).abs() < 1e-9, "row sum {sum}");
            } else {
                assert_eq!(*sum, 0.0);
            }
        }
        assert!((tables.percent.get(Nonpolar, Negative) - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(totals_for(&tables, Positive), 0);
    }

    fn totals_for(tables: &TransitionTables, cat: Category) -> u64 {
        Category::ORDER.iter().map(|to| tables.counts.get(cat, *to)).sum()
    }

    #[test]
    fn permuted_input_gives_identical_matrices() {
        let forward = subs(&[("G", "D"), ("K", "E"), ("S", "P"), ("W", "C"), ("H", "Y")]);
        let mut backward = forward.clone();
        backward.reverse();
        let classifier = ResidueClassifier::standard();

        assert_eq!(
            build(&forward, &classifier, &Category::ORDER).counts,
            build(&backward, &classifier, &Category::ORDER).counts
        );
    }

    #[test]
    fn alternate_classifier_can_be_injected() {
        let classifier = ResidueClassifier::from_pairs([("x", Polar), ("y", Negative)]);
        let tables = build(&subs(&[("x", "y"), ("G", "D")]), &classifier, &Category::ORDER);

        assert_eq!(tables.counts.get(Polar, Negative), 1);
        assert_eq!(tables.excluded, 1);
    }

    #[test]
    fn categories_outside_the_order_are_excluded() {
        let order = [Nonpolar, Negative];
        let tables = build(
            &subs(&[("G", "D"), ("G", "S")]),
            &ResidueClassifier::standard(),
            &order,
        );

        assert_eq!(tables.counts.counts().dim(), (2, 2));
        assert_eq!(tables.counts.get(Nonpolar, Negative), 1);
        assert_eq!(tables.excluded, 1);
    }

    #[test]
    fn category_label_records_use_identity_classifier() {
        let tables = build(
            &subs(&[("Positive", "Negative"), ("Aromatic", "Polar")]),
            &ResidueClassifier::category_labels(),
            &Category::ORDER,
        );
        assert_eq!(tables.counts.get(Positive, Negative), 1);
        assert_eq!(tables.excluded, 1);
    }
}
