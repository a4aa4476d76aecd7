//! Catalog domain model
//!
//! A [`CatalogRecord`] is one card of the catalog. Records are value objects:
//! a sync never patches one in place, it replaces the whole set.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;

/// One catalog entry, keyed by `number`.
///
/// Wire names are camelCase (`generalMeanings`, `yearPrediction`, ...).
/// Every field is required when decoding; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Natural key, unique within the catalog
    pub number: String,
    pub name: String,
    pub keywords: String,
    pub general_meanings: String,
    pub astrological_influence: String,
    pub archetype_figure: String,
    pub spiritual_plane: String,
    pub mental_plane: String,
    pub emotional_plane: String,
    pub material_plane: String,
    pub physical_plane: String,
    pub positive_points: String,
    pub negative_points: String,
    pub year_prediction: String,
    pub time: String,
}

impl CatalogRecord {
    /// Record with the key fields set and every descriptive field empty.
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            keywords: String::new(),
            general_meanings: String::new(),
            astrological_influence: String::new(),
            archetype_figure: String::new(),
            spiritual_plane: String::new(),
            mental_plane: String::new(),
            emotional_plane: String::new(),
            material_plane: String::new(),
            physical_plane: String::new(),
            positive_points: String::new(),
            negative_points: String::new(),
            year_prediction: String::new(),
            time: String::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = keywords.into();
        self
    }

    pub fn with_general_meanings(mut self, meanings: impl Into<String>) -> Self {
        self.general_meanings = meanings.into();
        self
    }

    /// Validate the record before it is persisted
    pub fn validate(&self) -> Result<(), String> {
        if self.number.trim().is_empty() {
            return Err("Record number cannot be empty".to_string());
        }

        if self.number.trim() != self.number {
            return Err(format!(
                "Record number '{}' has surrounding whitespace",
                self.number
            ));
        }

        if self.name.trim().is_empty() {
            return Err(format!("Record {} has an empty name", self.number));
        }

        Ok(())
    }

    /// Lookup form of a name: trimmed and lowercased.
    pub fn normalize(s: &str) -> String {
        s.trim().to_lowercase()
    }

    /// Numeric value of the key, if it is an unsigned integer.
    pub fn numeric_key(&self) -> Option<u64> {
        self.number.parse().ok()
    }
}

/// Natural-key order.
///
/// Integer keys sort numerically and before any non-integer key; non-integer
/// keys sort lexicographically. Equal integers (`"01"`, `"1"`) fall back to
/// lexicographic order so the ordering stays total.
pub fn natural_key_cmp(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sort records in natural-key order.
pub fn sort_natural(records: &mut [CatalogRecord]) {
    records.sort_by(|a, b| natural_key_cmp(&a.number, &b.number));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(CatalogRecord::new("1", "Cavaleiro").validate().is_ok());
        assert!(CatalogRecord::new("", "Cavaleiro").validate().is_err());
        assert!(CatalogRecord::new("  ", "Cavaleiro").validate().is_err());
        assert!(CatalogRecord::new(" 1", "Cavaleiro").validate().is_err());
        assert!(CatalogRecord::new("1", " ").validate().is_err());
    }

    #[test]
    fn test_natural_key_cmp_numeric_before_lexical() {
        assert_eq!(natural_key_cmp("2", "10"), Ordering::Less);
        assert_eq!(natural_key_cmp("10", "2"), Ordering::Greater);
        assert_eq!(natural_key_cmp("36", "joker"), Ordering::Less);
        assert_eq!(natural_key_cmp("b", "a"), Ordering::Greater);
        assert_eq!(natural_key_cmp("01", "1"), Ordering::Less);
        assert_eq!(natural_key_cmp("7", "7"), Ordering::Equal);
    }

    #[test]
    fn test_sort_natural() {
        let mut records: Vec<_> = ["10", "2", "x", "1", "36"]
            .iter()
            .map(|n| CatalogRecord::new(*n, "card"))
            .collect();

        sort_natural(&mut records);

        let numbers: Vec<_> = records.iter().map(|r| r.number.as_str()).collect();
        assert_eq!(numbers, vec!["1", "2", "10", "36", "x"]);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(CatalogRecord::normalize("  Árvore "), "árvore");
    }

    #[test]
    fn test_decode_camel_case_ignores_unknown_fields() {
        let json = serde_json::json!({
            "number": "5",
            "name": "Árvore",
            "keywords": "saúde",
            "generalMeanings": "g",
            "astrologicalInfluence": "a",
            "archetypeFigure": "f",
            "spiritualPlane": "s",
            "mentalPlane": "m",
            "emotionalPlane": "e",
            "materialPlane": "ma",
            "physicalPlane": "p",
            "positivePoints": "pp",
            "negativePoints": "np",
            "yearPrediction": "y",
            "time": "t",
            "imageUrl": "ignored"
        });

        let record: CatalogRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.number, "5");
        assert_eq!(record.general_meanings, "g");
        assert_eq!(record.year_prediction, "y");
        assert_eq!(record.numeric_key(), Some(5));
    }

    #[test]
    fn test_decode_missing_field_fails() {
        let json = serde_json::json!({ "number": "5", "name": "Árvore" });
        assert!(serde_json::from_value::<CatalogRecord>(json).is_err());
    }
}
