use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::features::ScaleStats;

/// Main scoring configuration.
///
/// Defines how part priority scores are calculated: which feature
/// transforms run, how engineered features are weighted, which business
/// boosts apply, and the target range of the final score.
///
/// Example YAML:
/// ```yaml
/// scoring:
///   weights:
///     demand_score: 0.35
///     availability_score: 0.35
///     inv_leadtime_weeks: 0.15
///     inv_moq: 0.10
///     is_authorized: 0.05
///   boosts:
///     - { name: immediate_ship, when: "leadtime_weeks == 0", multiplier: 1.15 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Feature engineering configuration.
    #[serde(default)]
    pub features: FeatureConfig,

    /// Engineered feature name -> signed weight. Expected (not required)
    /// to sum to 1.0; deviation is warned about at scorer construction.
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<String, f64>,

    /// Ordered business boost rules. Later rules compound with earlier ones.
    #[serde(default = "default_boosts")]
    pub boosts: Vec<BoostSpec>,

    /// Target range for the final priority score.
    #[serde(default)]
    pub normalization: NormalizationRange,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            weights: default_weights(),
            boosts: default_boosts(),
            normalization: NormalizationRange::default(),
        }
    }
}

fn default_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("demand_score".to_string(), 0.35),
        ("availability_score".to_string(), 0.35),
        ("inv_leadtime_weeks".to_string(), 0.15),
        ("inv_moq".to_string(), 0.10),
        ("is_authorized".to_string(), 0.05),
    ])
}

fn default_boosts() -> Vec<BoostSpec> {
    vec![
        BoostSpec {
            name: "ample_stock".to_string(),
            when: "inventory >= 10 * moq".to_string(),
            multiplier: 1.10,
        },
        BoostSpec {
            name: "immediate_ship".to_string(),
            when: "leadtime_weeks == 0".to_string(),
            multiplier: 1.15,
        },
        BoostSpec {
            name: "authorized_source".to_string(),
            when: "source_type == 'Authorized'".to_string(),
            multiplier: 1.05,
        },
        BoostSpec {
            name: "high_demand".to_string(),
            when: "demand_all_time > 100".to_string(),
            multiplier: 1.08,
        },
    ]
}

/// Feature engineering configuration: which raw fields get which
/// transforms, and how the derived features are rescaled.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FeatureConfig {
    /// Raw fields to log-transform (`log_<field> = ln(1 + max(x, 0))`).
    #[serde(default = "default_log_transforms")]
    pub log_transforms: Vec<String>,

    /// "Lower is better" raw fields to invert (`inv_<field> = 1 / (1 + max(x, 0))`).
    #[serde(default = "default_inverse_transforms")]
    pub inverse_transforms: Vec<String>,

    /// Binary indicator features to derive.
    #[serde(default = "default_binary_features")]
    pub binary_features: Vec<String>,

    /// Composite features to derive from the transformed fields.
    #[serde(default = "default_composite_features")]
    pub composite_features: Vec<String>,

    /// How derived features are rescaled to comparable ranges.
    #[serde(default)]
    pub scaling: ScalingPolicy,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            log_transforms: default_log_transforms(),
            inverse_transforms: default_inverse_transforms(),
            binary_features: default_binary_features(),
            composite_features: default_composite_features(),
            scaling: ScalingPolicy::default(),
        }
    }
}

fn default_log_transforms() -> Vec<String> {
    vec!["inventory".to_string(), "moq".to_string()]
}

fn default_inverse_transforms() -> Vec<String> {
    vec!["leadtime_weeks".to_string(), "moq".to_string()]
}

fn default_binary_features() -> Vec<String> {
    vec![
        "is_authorized".to_string(),
        "has_datasheet".to_string(),
        "in_stock".to_string(),
        "immediate_availability".to_string(),
    ]
}

fn default_composite_features() -> Vec<String> {
    vec!["availability_score".to_string(), "demand_score".to_string()]
}

/// Where robust-scaling statistics come from.
///
/// `BatchLocal` fits median/IQR on every batch independently, so the same
/// record can score differently depending on which batch it was scored in.
/// `Fixed` applies externally fitted statistics (see
/// [`super::features::fit_scale_stats`]) and keeps independently loaded
/// batches comparable.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ScalingPolicy {
    #[default]
    BatchLocal,
    Fixed {
        stats: BTreeMap<String, ScaleStats>,
    },
}

/// Target range for the final priority score. Gated records score exactly
/// 0 under either policy.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationRange {
    ZeroToHundred,
    #[default]
    OneToHundred,
}

impl NormalizationRange {
    /// Bounds for non-gated records.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            NormalizationRange::ZeroToHundred => (0.0, 100.0),
            NormalizationRange::OneToHundred => (1.0, 100.0),
        }
    }
}

/// One business boost rule as written in configuration. The `when`
/// condition is parsed into [`super::boosts::Condition`] when the scorer
/// is built; an unrecognized condition shape skips the rule with a
/// warning rather than failing the batch.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BoostSpec {
    pub name: String,

    /// Condition expression, e.g. `"inventory >= 10 * moq"` or
    /// `"source_type == 'Authorized'"`. Conditions may be joined with `AND`.
    pub when: String,

    /// Multiplier applied to matching records. Must be positive.
    pub multiplier: f64,
}
