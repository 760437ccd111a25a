use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Engineered feature name -> value for one record.
///
/// A `BTreeMap` keeps iteration order deterministic, which in turn keeps
/// scoring bit-identical for identical input.
pub type FeatureVector = BTreeMap<String, f64>;

/// Lead time above which a part with zero inventory is considered
/// unobtainable.
pub const UNAVAILABLE_LEADTIME_WEEKS: f64 = 12.0;

/// One electronic component's attributes, as loaded from the warehouse.
///
/// Records are immutable input: scoring never mutates them, it produces
/// [`ScoredPart`] values that carry a copy alongside the derived fields.
/// All numeric attributes are optional; transforms fill absent values with
/// their documented defaults instead of failing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PartRecord {
    /// Manufacturer part number. Unique key for joins and dedup.
    pub part_number: String,

    /// Units on hand. Absent is treated as 0.
    #[serde(default)]
    pub inventory: Option<f64>,

    /// Quoted factory lead time in weeks.
    #[serde(default)]
    pub leadtime_weeks: Option<f64>,

    /// Minimum order quantity. Absent defaults to 1 where a floor is needed.
    #[serde(default)]
    pub moq: Option<f64>,

    /// First-break unit price.
    #[serde(default)]
    pub price: Option<f64>,

    /// All-time demand signal. Absent is treated as 0.
    #[serde(default)]
    pub demand_all_time: Option<f64>,

    /// Sourcing channel; `"Authorized"` is the recognized value.
    #[serde(default)]
    pub source_type: Option<String>,

    /// Datasheet reference; presence drives the `has_datasheet` feature.
    #[serde(default)]
    pub datasheet: Option<String>,
}

impl PartRecord {
    /// Look up a raw numeric attribute by name. Returns `None` both for
    /// unknown names and for known-but-absent values; use
    /// [`PartRecord::is_numeric_field`] to tell the two apart.
    pub fn numeric_field(&self, name: &str) -> Option<f64> {
        match name {
            "inventory" => self.inventory,
            "leadtime_weeks" => self.leadtime_weeks,
            "moq" => self.moq,
            "price" => self.price,
            "demand_all_time" => self.demand_all_time,
            _ => None,
        }
    }

    /// Whether `name` is one of the record's numeric attributes.
    pub fn is_numeric_field(name: &str) -> bool {
        matches!(
            name,
            "inventory" | "leadtime_weeks" | "moq" | "price" | "demand_all_time"
        )
    }

    /// Inventory with the absent-means-zero fill applied.
    pub fn inventory_or_zero(&self) -> f64 {
        self.inventory.unwrap_or(0.0)
    }

    /// A part is unobtainable when it has no stock and a lead time beyond
    /// the 12-week horizon. An unknown lead time does not gate.
    pub fn is_unavailable(&self) -> bool {
        self.inventory_or_zero() == 0.0
            && matches!(self.leadtime_weeks, Some(weeks) if weeks > UNAVAILABLE_LEADTIME_WEEKS)
    }
}

/// One record's scoring output: the input row plus every derived field.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPart {
    pub record: PartRecord,
    /// Engineered features, post-scaling. Fresh per scoring run.
    pub features: FeatureVector,
    /// Weighted sum of engineered features, after the availability gate.
    pub base_score: f64,
    /// Base score with business boosts compounded in.
    pub boosted_score: f64,
    /// Final bounded score; what the batch is ranked by.
    pub priority_score: f64,
    /// Percentile rank of `priority_score` within the batch, 0-100.
    pub score_percentile: f64,
}

/// A scored batch, sorted by descending priority. The id and timestamp
/// together key the batch for downstream storage.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredBatch {
    pub batch_id: Option<String>,
    pub scored_at: DateTime<Utc>,
    pub parts: Vec<ScoredPart>,
}

impl ScoredBatch {
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(inventory: Option<f64>, leadtime_weeks: Option<f64>) -> PartRecord {
        PartRecord {
            part_number: "PART001".to_string(),
            inventory,
            leadtime_weeks,
            moq: None,
            price: None,
            demand_all_time: None,
            source_type: None,
            datasheet: None,
        }
    }

    #[test]
    fn test_unavailable_requires_zero_stock_and_long_leadtime() {
        assert!(record(Some(0.0), Some(16.0)).is_unavailable());
        assert!(record(None, Some(16.0)).is_unavailable());
        assert!(!record(Some(1.0), Some(16.0)).is_unavailable());
        assert!(!record(Some(0.0), Some(12.0)).is_unavailable());
        assert!(!record(Some(0.0), Some(8.0)).is_unavailable());
    }

    #[test]
    fn test_unknown_leadtime_does_not_gate() {
        assert!(!record(Some(0.0), None).is_unavailable());
    }

    #[test]
    fn test_numeric_field_lookup() {
        let mut r = record(Some(5.0), None);
        r.moq = Some(2.0);
        assert_eq!(r.numeric_field("inventory"), Some(5.0));
        assert_eq!(r.numeric_field("moq"), Some(2.0));
        assert_eq!(r.numeric_field("leadtime_weeks"), None);
        assert_eq!(r.numeric_field("source_type"), None);
        assert!(PartRecord::is_numeric_field("demand_all_time"));
        assert!(!PartRecord::is_numeric_field("source_type"));
    }

    #[test]
    fn test_record_parses_from_sparse_json() {
        let r: PartRecord =
            serde_json::from_str(r#"{"part_number": "PART002", "inventory": 40}"#).unwrap();
        assert_eq!(r.part_number, "PART002");
        assert_eq!(r.inventory, Some(40.0));
        assert!(r.leadtime_weeks.is_none());
        assert!(r.datasheet.is_none());
    }
}
