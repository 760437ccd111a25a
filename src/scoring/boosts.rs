use anyhow::{bail, Result};
use tracing::{info, warn};

use super::config::BoostSpec;
use crate::record::{FeatureVector, PartRecord};

/// Comparison operators recognized in boost conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Equal,
    NotEqual,
}

impl CmpOp {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::LessThan => lhs < rhs,
            CmpOp::LessEqual => lhs <= rhs,
            CmpOp::GreaterThan => lhs > rhs,
            CmpOp::GreaterEqual => lhs >= rhs,
            CmpOp::Equal => lhs == rhs,
            CmpOp::NotEqual => lhs != rhs,
        }
    }
}

/// Right-hand side of a numeric comparison: a literal, or another field
/// with an optional scale factor (`10 * moq`).
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(f64),
    Field { factor: f64, field: String },
}

/// A boost condition over a record's raw and engineered fields.
///
/// Conditions form a small closed set: numeric comparisons, string
/// equality, and conjunction. They are parsed from the expression strings
/// in [`BoostSpec`] and interpreted directly; there is no dynamic
/// evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        field: String,
        op: CmpOp,
        value: Operand,
    },
    TextEquals {
        field: String,
        value: String,
    },
    All(Vec<Condition>),
}

impl Condition {
    /// Parse a condition expression such as `"inventory >= 10 * moq"`,
    /// `"leadtime_weeks == 0"`, `"source_type == 'Authorized'"`, or a
    /// conjunction of those joined with `AND`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            bail!("empty condition");
        }

        let clauses: Vec<&str> = s.split(" AND ").collect();
        if clauses.len() > 1 {
            let parsed = clauses
                .iter()
                .map(|clause| Self::parse_comparison(clause))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Condition::All(parsed));
        }

        Self::parse_comparison(s)
    }

    fn parse_comparison(s: &str) -> Result<Self> {
        let s = s.trim();

        // Two-character operators first so ">=" is not read as ">".
        const OPS: [(&str, CmpOp); 6] = [
            (">=", CmpOp::GreaterEqual),
            ("<=", CmpOp::LessEqual),
            ("==", CmpOp::Equal),
            ("!=", CmpOp::NotEqual),
            (">", CmpOp::GreaterThan),
            ("<", CmpOp::LessThan),
        ];

        for (symbol, op) in OPS {
            if let Some((lhs, rhs)) = s.split_once(symbol) {
                let field = parse_identifier(lhs)?;
                let rhs = rhs.trim();

                if let Some(text) = parse_quoted(rhs) {
                    if op != CmpOp::Equal {
                        bail!("string comparison supports == only: {}", s);
                    }
                    return Ok(Condition::TextEquals {
                        field,
                        value: text.to_string(),
                    });
                }

                let value = parse_operand(rhs)?;
                return Ok(Condition::Compare { field, op, value });
            }
        }

        bail!("unrecognized condition shape: {}", s)
    }

    /// Collect every field name the condition reads.
    pub fn fields(&self, out: &mut Vec<String>) {
        match self {
            Condition::Compare { field, value, .. } => {
                out.push(field.clone());
                if let Operand::Field { field, .. } = value {
                    out.push(field.clone());
                }
            }
            Condition::TextEquals { field, .. } => out.push(field.clone()),
            Condition::All(clauses) => {
                for clause in clauses {
                    clause.fields(out);
                }
            }
        }
    }

    /// Evaluate against one record. A null value on either side of a
    /// numeric comparison makes the comparison false, never an error.
    pub fn eval(&self, record: &PartRecord, features: &FeatureVector) -> bool {
        match self {
            Condition::Compare { field, op, value } => {
                let Some(lhs) = lookup_numeric(field, record, features) else {
                    return false;
                };
                let rhs = match value {
                    Operand::Literal(v) => *v,
                    Operand::Field { factor, field } => {
                        match lookup_numeric(field, record, features) {
                            Some(v) => factor * v,
                            None => return false,
                        }
                    }
                };
                op.holds(lhs, rhs)
            }
            Condition::TextEquals { field, value } => match field.as_str() {
                "source_type" => record.source_type.as_deref() == Some(value.as_str()),
                "part_number" => record.part_number == *value,
                _ => false,
            },
            Condition::All(clauses) => clauses.iter().all(|c| c.eval(record, features)),
        }
    }
}

fn lookup_numeric(field: &str, record: &PartRecord, features: &FeatureVector) -> Option<f64> {
    if PartRecord::is_numeric_field(field) {
        record.numeric_field(field)
    } else {
        features.get(field).copied()
    }
}

fn parse_identifier(s: &str) -> Result<String> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("invalid field name: '{}'", s);
    }
    Ok(s.to_string())
}

fn parse_quoted(s: &str) -> Option<&str> {
    let stripped = s
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .or_else(|| s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')));
    stripped.filter(|inner| !inner.is_empty())
}

fn parse_operand(s: &str) -> Result<Operand> {
    if let Some((a, b)) = s.split_once('*') {
        let (a, b) = (a.trim(), b.trim());
        if let Ok(factor) = a.parse::<f64>() {
            return Ok(Operand::Field {
                factor,
                field: parse_identifier(b)?,
            });
        }
        if let Ok(factor) = b.parse::<f64>() {
            return Ok(Operand::Field {
                factor,
                field: parse_identifier(a)?,
            });
        }
        bail!("scaled comparison needs one numeric factor: '{}'", s);
    }
    if let Ok(value) = s.parse::<f64>() {
        return Ok(Operand::Literal(value));
    }
    // Bare field name: compare against the other field directly.
    Ok(Operand::Field {
        factor: 1.0,
        field: parse_identifier(s)?,
    })
}

/// A compiled boost rule. Rules are evaluated independently and applied
/// in listed order; multipliers compound across matching rules.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostRule {
    pub name: String,
    pub condition: Condition,
    pub multiplier: f64,
}

impl BoostRule {
    pub fn from_spec(spec: &BoostSpec) -> Result<Self> {
        if !(spec.multiplier > 0.0 && spec.multiplier.is_finite()) {
            bail!("multiplier must be positive and finite, got {}", spec.multiplier);
        }
        Ok(Self {
            name: spec.name.clone(),
            condition: Condition::parse(&spec.when)?,
            multiplier: spec.multiplier,
        })
    }
}

/// Compile boost specs, skipping any with an unrecognized condition or a
/// bad multiplier. Skipping is a warning, never an error.
pub fn compile_rules(specs: &[BoostSpec]) -> Vec<BoostRule> {
    specs
        .iter()
        .filter_map(|spec| match BoostRule::from_spec(spec) {
            Ok(rule) => Some(rule),
            Err(e) => {
                warn!(rule = %spec.name, error = %e, "skipping boost rule");
                None
            }
        })
        .collect()
}

/// Apply boost rules to `scores` in place.
///
/// A rule referencing a field absent from the entire batch is skipped for
/// the whole batch with a warning. Only positive scores are multiplied: a
/// gated zero cannot be resurrected, and a multiplier above 1 must never
/// push a negative score further down.
pub fn apply_boosts(
    records: &[PartRecord],
    vectors: &[FeatureVector],
    scores: &mut [f64],
    rules: &[BoostRule],
) {
    for rule in rules {
        let mut fields = Vec::new();
        rule.condition.fields(&mut fields);
        if let Some(missing) = fields.iter().find(|f| !field_known(f, vectors)) {
            warn!(
                rule = %rule.name,
                field = %missing,
                "condition references a field absent from the batch, skipping rule"
            );
            continue;
        }

        let mut applied = 0usize;
        for ((record, vector), score) in records.iter().zip(vectors).zip(scores.iter_mut()) {
            if *score > 0.0 && rule.condition.eval(record, vector) {
                *score *= rule.multiplier;
                applied += 1;
            }
        }
        if applied > 0 {
            info!(rule = %rule.name, multiplier = rule.multiplier, applied, "applied boost");
        }
    }
}

fn field_known(field: &str, vectors: &[FeatureVector]) -> bool {
    PartRecord::is_numeric_field(field)
        || field == "source_type"
        || field == "part_number"
        || vectors.iter().any(|v| v.contains_key(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::config::ScoringConfig;

    fn record(
        inventory: Option<f64>,
        leadtime_weeks: Option<f64>,
        moq: Option<f64>,
        demand: Option<f64>,
        authorized: bool,
    ) -> PartRecord {
        PartRecord {
            part_number: "PART001".to_string(),
            inventory,
            leadtime_weeks,
            moq,
            price: None,
            demand_all_time: demand,
            source_type: Some(if authorized { "Authorized" } else { "Broker" }.to_string()),
            datasheet: None,
        }
    }

    #[test]
    fn test_parse_literal_comparison() {
        let c = Condition::parse("demand_all_time > 100").unwrap();
        assert_eq!(
            c,
            Condition::Compare {
                field: "demand_all_time".to_string(),
                op: CmpOp::GreaterThan,
                value: Operand::Literal(100.0),
            }
        );
    }

    #[test]
    fn test_parse_scaled_field_comparison() {
        let c = Condition::parse("inventory >= 10 * moq").unwrap();
        assert_eq!(
            c,
            Condition::Compare {
                field: "inventory".to_string(),
                op: CmpOp::GreaterEqual,
                value: Operand::Field {
                    factor: 10.0,
                    field: "moq".to_string()
                },
            }
        );
    }

    #[test]
    fn test_parse_text_equality() {
        let c = Condition::parse("source_type == 'Authorized'").unwrap();
        assert_eq!(
            c,
            Condition::TextEquals {
                field: "source_type".to_string(),
                value: "Authorized".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_conjunction() {
        let c = Condition::parse("demand_all_time > 100 AND price < 10").unwrap();
        match c {
            Condition::All(clauses) => assert_eq!(clauses.len(), 2),
            other => panic!("expected conjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bare_field_comparison() {
        let c = Condition::parse("inventory >= moq").unwrap();
        assert_eq!(
            c,
            Condition::Compare {
                field: "inventory".to_string(),
                op: CmpOp::GreaterEqual,
                value: Operand::Field {
                    factor: 1.0,
                    field: "moq".to_string()
                },
            }
        );
    }

    #[test]
    fn test_parse_rejects_unrecognized_shapes() {
        assert!(Condition::parse("").is_err());
        assert!(Condition::parse("inventory").is_err());
        assert!(Condition::parse("inventory ~ 5").is_err());
        assert!(Condition::parse("source_type > 'Authorized'").is_err());
        assert!(Condition::parse("max(inventory) > 5").is_err());
    }

    #[test]
    fn test_default_boost_specs_compile() {
        let rules = compile_rules(&ScoringConfig::default().boosts);
        assert_eq!(rules.len(), 4);
        assert_eq!(rules[0].name, "ample_stock");
        assert_eq!(rules[1].multiplier, 1.15);
    }

    #[test]
    fn test_compile_skips_bad_rules() {
        let specs = vec![
            BoostSpec {
                name: "good".to_string(),
                when: "inventory > 0".to_string(),
                multiplier: 1.2,
            },
            BoostSpec {
                name: "bad_condition".to_string(),
                when: "inventory !!! 0".to_string(),
                multiplier: 1.2,
            },
            BoostSpec {
                name: "bad_multiplier".to_string(),
                when: "inventory > 0".to_string(),
                multiplier: 0.0,
            },
        ];
        let rules = compile_rules(&specs);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "good");
    }

    #[test]
    fn test_eval_null_field_is_false() {
        let r = record(None, None, None, None, false);
        let features = FeatureVector::new();
        let c = Condition::parse("leadtime_weeks == 0").unwrap();
        assert!(!c.eval(&r, &features));
        let c = Condition::parse("inventory >= 10 * moq").unwrap();
        assert!(!c.eval(&r, &features));
    }

    #[test]
    fn test_eval_reads_engineered_features() {
        let r = record(Some(1.0), None, None, None, false);
        let mut features = FeatureVector::new();
        features.insert("has_datasheet".to_string(), 1.0);
        let c = Condition::parse("has_datasheet == 1").unwrap();
        assert!(c.eval(&r, &features));
    }

    #[test]
    fn test_boosts_compound() {
        let records = vec![record(Some(100.0), Some(0.0), Some(1.0), Some(500.0), true)];
        let vectors = vec![FeatureVector::new()];
        let mut scores = vec![1.0];
        let rules = compile_rules(&ScoringConfig::default().boosts);
        apply_boosts(&records, &vectors, &mut scores, &rules);
        // ample_stock, immediate_ship, authorized_source, high_demand all hold.
        assert!((scores[0] - 1.10 * 1.15 * 1.05 * 1.08).abs() < 1e-12);
    }

    #[test]
    fn test_boost_cannot_resurrect_gated_score() {
        let records = vec![record(Some(100.0), Some(0.0), Some(1.0), Some(500.0), true)];
        let vectors = vec![FeatureVector::new()];
        let mut scores = vec![0.0];
        apply_boosts(
            &records,
            &vectors,
            &mut scores,
            &compile_rules(&ScoringConfig::default().boosts),
        );
        assert_eq!(scores[0], 0.0);
    }

    #[test]
    fn test_boost_leaves_negative_scores_alone() {
        let records = vec![record(Some(100.0), Some(0.0), Some(1.0), Some(500.0), true)];
        let vectors = vec![FeatureVector::new()];
        let mut scores = vec![-0.5];
        apply_boosts(
            &records,
            &vectors,
            &mut scores,
            &compile_rules(&ScoringConfig::default().boosts),
        );
        assert_eq!(scores[0], -0.5);
    }

    #[test]
    fn test_rule_with_unknown_field_skips_whole_batch() {
        let records = vec![
            record(Some(100.0), Some(0.0), Some(1.0), Some(500.0), true),
            record(Some(50.0), Some(0.0), Some(1.0), Some(200.0), true),
        ];
        let vectors = vec![FeatureVector::new(), FeatureVector::new()];
        let mut scores = vec![1.0, 1.0];
        let specs = vec![
            BoostSpec {
                name: "phantom".to_string(),
                when: "blast_radius > 3".to_string(),
                multiplier: 2.0,
            },
            BoostSpec {
                name: "immediate_ship".to_string(),
                when: "leadtime_weeks == 0".to_string(),
                multiplier: 1.15,
            },
        ];
        apply_boosts(&records, &vectors, &mut scores, &compile_rules(&specs));
        // The phantom rule is skipped batch-wide; the second still applies.
        assert!((scores[0] - 1.15).abs() < 1e-12);
        assert!((scores[1] - 1.15).abs() < 1e-12);
    }
}
