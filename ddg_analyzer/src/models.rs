use std::collections::HashMap;
use std::fmt;

use polars::frame::DataFrame;

use crate::error::Result;

/// A tabular source of variant rows (reference or query dataset).
pub trait Dataset {
    /// Label used in log messages and output file names.
    fn name(&self) -> &str;

    fn load(&self) -> Result<DataFrame>;
}

/// One observed substitution, as read from a dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    /// Position of the row in the source frame, used to re-attach the
    /// original columns when writing results.
    pub row: usize,
    pub entity_id: String,
    /// `None` when the field was empty, non-numeric or non-finite.
    pub score: Option<f64>,
    pub residue_from: Option<String>,
    pub residue_to: Option<String>,
}

impl VariantRecord {
    pub fn scored(row: usize, entity_id: impl Into<String>, score: Option<f64>) -> Self {
        Self {
            row,
            entity_id: entity_id.into(),
            score,
            residue_from: None,
            residue_to: None,
        }
    }

    pub fn substitution(row: usize, from: &str, to: &str) -> Self {
        Self {
            row,
            entity_id: String::new(),
            score: None,
            residue_from: Some(from.to_string()),
            residue_to: Some(to.to_string()),
        }
    }
}

/// Null-distribution summary for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRecord {
    pub entity_id: String,
    pub count: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub reliable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignificanceType {
    ExtremeDestabilizing,
    ExtremeStabilizing,
    NotSignificant,
}

impl SignificanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignificanceType::ExtremeDestabilizing => "Extreme_Destabilizing",
            SignificanceType::ExtremeStabilizing => "Extreme_Stabilizing",
            SignificanceType::NotSignificant => "Not_Significant",
        }
    }

    pub fn is_significant(&self) -> bool {
        !matches!(self, SignificanceType::NotSignificant)
    }
}

impl fmt::Display for SignificanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query record joined with its (optional) threshold and labelled.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedVariant<'a> {
    pub record: &'a VariantRecord,
    pub threshold: Option<&'a ThresholdRecord>,
    pub significance: SignificanceType,
}

/// Chemical class of an amino-acid residue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Nonpolar,
    Polar,
    Negative,
    Positive,
}

impl Category {
    /// Canonical row/column order of transition matrices.
    pub const ORDER: [Category; 4] = [
        Category::Nonpolar,
        Category::Polar,
        Category::Negative,
        Category::Positive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Nonpolar => "Nonpolar",
            Category::Polar => "Polar",
            Category::Negative => "Negative",
            Category::Positive => "Positive",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup table from residue code to [`Category`].
///
/// Codes absent from the table are undefined and get excluded from
/// transition analysis.
#[derive(Debug, Clone, Default)]
pub struct ResidueClassifier {
    map: HashMap<String, Category>,
}

impl ResidueClassifier {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Category)>,
        S: Into<String>,
    {
        Self {
            map: pairs.into_iter().map(|(code, cat)| (code.into(), cat)).collect(),
        }
    }

    /// The 20 standard amino acids, one-letter codes.
    pub fn standard() -> Self {
        use Category::{Negative, Nonpolar, Polar, Positive};

        let groups: [(&str, Category); 4] = [
            ("GAVLIMPFW", Nonpolar),
            ("STCNQY", Polar),
            ("KRH", Positive),
            ("DE", Negative),
        ];
        Self::from_pairs(
            groups
                .iter()
                .flat_map(|(codes, cat)| codes.chars().map(move |c| (c.to_string(), *cat))),
        )
    }

    /// Identity mapping for datasets that already carry category labels.
    pub fn category_labels() -> Self {
        Self::from_pairs(Category::ORDER.iter().map(|c| (c.as_str(), *c)))
    }

    pub fn category_of(&self, code: &str) -> Option<Category> {
        self.map.get(code).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_map_covers_twenty_amino_acids() {
        let classifier = ResidueClassifier::standard();
        let defined = "ACDEFGHIKLMNPQRSTVWY"
            .chars()
            .filter(|c| classifier.category_of(&c.to_string()).is_some())
            .count();
        assert_eq!(defined, 20);
        assert_eq!(classifier.category_of("G"), Some(Category::Nonpolar));
        assert_eq!(classifier.category_of("Y"), Some(Category::Polar));
        assert_eq!(classifier.category_of("H"), Some(Category::Positive));
        assert_eq!(classifier.category_of("E"), Some(Category::Negative));
    }

    #[test]
    fn unknown_codes_are_undefined() {
        let classifier = ResidueClassifier::standard();
        assert_eq!(classifier.category_of("*"), None);
        assert_eq!(classifier.category_of("X"), None);
        assert_eq!(classifier.category_of("g"), None);
    }

    #[test]
    fn category_labels_round_trip_names() {
        let classifier = ResidueClassifier::category_labels();
        for cat in Category::ORDER {
            assert_eq!(classifier.category_of(cat.as_str()), Some(cat));
        }
        assert_eq!(classifier.category_of("Aromatic"), None);
    }

    #[test]
    fn significance_labels() {
        assert_eq!(
            SignificanceType::ExtremeDestabilizing.to_string(),
            "Extreme_Destabilizing"
        );
        assert!(SignificanceType::ExtremeStabilizing.is_significant());
        assert!(!SignificanceType::NotSignificant.is_significant());
    }
}
