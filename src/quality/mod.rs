//! Data-quality validation, independent of scoring.
//!
//! The validator consumes the same immutable record batch the scoring
//! engine does and produces a [`ValidationReport`]. It never alters
//! records or scores; rejecting a batch below a quality threshold is a
//! caller-level policy decision.

pub mod report;

pub use report::{FieldCoverage, Issue, Severity, ValidationReport};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use crate::record::PartRecord;

/// Every record attribute the coverage pass reports on.
const ALL_FIELDS: [&str; 8] = [
    "part_number",
    "inventory",
    "leadtime_weeks",
    "moq",
    "price",
    "demand_all_time",
    "source_type",
    "datasheet",
];

/// Fields a batch cannot do without.
const REQUIRED_FIELDS: [&str; 2] = ["part_number", "inventory"];

/// Inclusive bounds for a numeric field's range check.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRange {
    pub min: f64,
    pub max: f64,
}

/// Quality-threshold configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QualityConfig {
    /// Field name -> minimum coverage percentage. Fields below their
    /// threshold produce a warning.
    #[serde(default)]
    pub required_coverage: BTreeMap<String, f64>,

    /// Numeric field name -> accepted value bounds.
    #[serde(default = "default_ranges")]
    pub ranges: BTreeMap<String, FieldRange>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            required_coverage: BTreeMap::new(),
            ranges: default_ranges(),
        }
    }
}

fn default_ranges() -> BTreeMap<String, FieldRange> {
    BTreeMap::from([
        (
            "inventory".to_string(),
            FieldRange {
                min: 0.0,
                max: 1_000_000.0,
            },
        ),
        (
            "price".to_string(),
            FieldRange {
                min: 0.01,
                max: 100_000.0,
            },
        ),
        (
            "moq".to_string(),
            FieldRange {
                min: 1.0,
                max: 100_000.0,
            },
        ),
        (
            "leadtime_weeks".to_string(),
            FieldRange {
                min: 0.0,
                max: 52.0,
            },
        ),
    ])
}

/// Comprehensive data validation for a record batch.
#[derive(Debug, Clone, Default)]
pub struct DataValidator {
    config: QualityConfig,
}

impl DataValidator {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    /// Validate a batch: structure, field coverage, numeric ranges, and
    /// business rules. Read-only; safe to run concurrently with scoring
    /// on the same slice.
    pub fn validate_batch(
        &self,
        records: &[PartRecord],
        batch_id: Option<&str>,
    ) -> ValidationReport {
        info!(
            batch = batch_id.unwrap_or("-"),
            rows = records.len(),
            "validating batch"
        );

        let mut issues = Vec::new();
        self.check_structure(records, &mut issues);

        let field_coverage = coverage(records);
        self.check_coverage(&field_coverage, &mut issues);
        self.check_ranges(records, &mut issues);
        self.check_business_rules(records, &mut issues);

        let critical_rows: usize = issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .map(|i| i.affected_rows)
            .sum();
        let is_valid = !issues.iter().any(|i| i.severity == Severity::Critical);
        let quality_score = quality_score(&issues, &field_coverage);

        let report = ValidationReport {
            is_valid,
            total_rows: records.len(),
            valid_rows: records.len().saturating_sub(critical_rows),
            issues,
            field_coverage,
            quality_score,
        };

        info!(
            batch = batch_id.unwrap_or("-"),
            quality_score = report.quality_score,
            valid_rows = report.valid_rows,
            total_rows = report.total_rows,
            "validation complete"
        );
        for issue in &report.issues {
            match issue.severity {
                Severity::Critical => error!(kind = %issue.kind, "{}", issue.message),
                _ => warn!(kind = %issue.kind, "{}", issue.message),
            }
        }

        report
    }

    fn check_structure(&self, records: &[PartRecord], issues: &mut Vec<Issue>) {
        if records.is_empty() {
            issues.push(Issue {
                kind: "empty_batch".to_string(),
                severity: Severity::Critical,
                message: "batch is empty".to_string(),
                affected_rows: 0,
                examples: Vec::new(),
            });
            return;
        }

        // A required field is missing when no record carries a value.
        for field in REQUIRED_FIELDS {
            if !records.iter().any(|r| has_value(r, field)) {
                issues.push(Issue {
                    kind: "missing_required_field".to_string(),
                    severity: Severity::Critical,
                    message: format!("required field '{}' has no values", field),
                    affected_rows: records.len(),
                    examples: Vec::new(),
                });
            }
        }
    }

    fn check_coverage(
        &self,
        field_coverage: &BTreeMap<String, FieldCoverage>,
        issues: &mut Vec<Issue>,
    ) {
        for (field, required_pct) in &self.config.required_coverage {
            let Some(actual) = field_coverage.get(field) else {
                continue;
            };
            if actual.coverage_pct < *required_pct {
                issues.push(Issue {
                    kind: "insufficient_coverage".to_string(),
                    severity: Severity::Warning,
                    message: format!(
                        "{} coverage {:.1}% below required {}%",
                        field, actual.coverage_pct, required_pct
                    ),
                    affected_rows: actual.null_count,
                    examples: Vec::new(),
                });
            }
        }
    }

    fn check_ranges(&self, records: &[PartRecord], issues: &mut Vec<Issue>) {
        for (field, range) in &self.config.ranges {
            if !PartRecord::is_numeric_field(field) {
                warn!(field = %field, "range check configured for unknown numeric field");
                continue;
            }
            let out_of_range: Vec<f64> = records
                .iter()
                .filter_map(|r| r.numeric_field(field))
                .filter(|v| *v < range.min || *v > range.max)
                .collect();
            if !out_of_range.is_empty() {
                issues.push(Issue {
                    kind: "out_of_range".to_string(),
                    severity: Severity::Warning,
                    message: format!(
                        "{} {} values out of range [{}, {}]",
                        out_of_range.len(),
                        field,
                        range.min,
                        range.max
                    ),
                    affected_rows: out_of_range.len(),
                    examples: out_of_range.into_iter().take(5).collect(),
                });
            }
        }
    }

    fn check_business_rules(&self, records: &[PartRecord], issues: &mut Vec<Issue>) {
        let unavailable = records.iter().filter(|r| r.is_unavailable()).count();
        if unavailable > 0 {
            issues.push(Issue {
                kind: "unavailable_parts".to_string(),
                severity: Severity::Info,
                message: format!(
                    "{} parts are unavailable (no stock, lead time beyond 12 weeks)",
                    unavailable
                ),
                affected_rows: unavailable,
                examples: Vec::new(),
            });
        }

        let missing_price = records
            .iter()
            .filter(|r| r.inventory_or_zero() > 0.0 && r.price.is_none())
            .count();
        if missing_price > 0 {
            issues.push(Issue {
                kind: "missing_price_data".to_string(),
                severity: Severity::Warning,
                message: format!("{} in-stock parts missing price data", missing_price),
                affected_rows: missing_price,
                examples: Vec::new(),
            });
        }
    }
}

fn has_value(record: &PartRecord, field: &str) -> bool {
    match field {
        "part_number" => !record.part_number.trim().is_empty(),
        "source_type" => record.source_type.is_some(),
        "datasheet" => record.datasheet.is_some(),
        _ => record.numeric_field(field).is_some(),
    }
}

fn coverage(records: &[PartRecord]) -> BTreeMap<String, FieldCoverage> {
    if records.is_empty() {
        return BTreeMap::new();
    }
    let total = records.len();
    ALL_FIELDS
        .iter()
        .map(|&field| {
            let null_count = records.iter().filter(|r| !has_value(r, field)).count();
            let coverage_pct = (total - null_count) as f64 / total as f64 * 100.0;
            (
                field.to_string(),
                FieldCoverage {
                    null_count,
                    coverage_pct,
                },
            )
        })
        .collect()
}

/// 100 minus fixed penalties per issue severity, minus a coverage penalty
/// when average field coverage falls below 95%. Clamped to [0, 100].
fn quality_score(issues: &[Issue], field_coverage: &BTreeMap<String, FieldCoverage>) -> f64 {
    let mut score = 100.0;
    for issue in issues {
        score -= match issue.severity {
            Severity::Critical => 25.0,
            Severity::Warning => 10.0,
            Severity::Info => 2.0,
        };
    }

    if !field_coverage.is_empty() {
        let avg: f64 = field_coverage
            .values()
            .map(|fc| fc.coverage_pct)
            .sum::<f64>()
            / field_coverage.len() as f64;
        score -= ((95.0 - avg) * 0.5).max(0.0);
    }

    score.clamp(0.0, 100.0)
}
