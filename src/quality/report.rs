use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How bad a validation finding is. Critical findings make the batch
/// invalid; warnings and infos only lower the quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Issue {
    /// Stable machine-readable kind, e.g. `out_of_range`.
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    /// Number of records the finding applies to.
    pub affected_rows: usize,
    /// Up to a handful of offending values, for range findings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<f64>,
}

/// Per-field population statistics.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldCoverage {
    pub null_count: usize,
    /// Percentage of records carrying a value, 0-100.
    pub coverage_pct: f64,
}

/// Result of validating one batch. Read-only with respect to the input;
/// whether a low-quality batch still gets scored is the caller's policy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ValidationReport {
    /// True when no critical issue was found.
    pub is_valid: bool,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub issues: Vec<Issue>,
    pub field_coverage: BTreeMap<String, FieldCoverage>,
    /// 0-100 summary of the batch's data-quality health.
    pub quality_score: f64,
}

impl ValidationReport {
    pub fn critical_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .count()
    }
}
