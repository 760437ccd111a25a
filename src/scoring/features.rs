use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::config::{FeatureConfig, ScalingPolicy};
use super::stats;
use crate::record::{FeatureVector, PartRecord};

/// Features whose names start with one of these prefixes are rescaled;
/// binary indicators and the raw record fields are not.
const SCALED_PREFIXES: [&str; 4] = ["log_", "inv_", "availability_", "demand_"];

/// Robust scaling statistics for one feature: median and interquartile
/// range, outlier-resistant counterparts of mean and variance.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct ScaleStats {
    pub median: f64,
    pub iqr: f64,
}

impl ScaleStats {
    /// Fit statistics over one feature's batch values.
    pub fn fit(values: &[f64]) -> Self {
        Self {
            median: stats::median(values),
            iqr: stats::iqr(values),
        }
    }

    /// Rescale one value. A zero IQR (constant feature) degrades to plain
    /// median-centering instead of dividing by zero.
    pub fn apply(&self, x: f64) -> f64 {
        if self.iqr == 0.0 {
            x - self.median
        } else {
            (x - self.median) / self.iqr
        }
    }
}

/// Fit robust-scaling statistics for every scalable feature present in
/// `vectors`. Callers wanting cross-batch comparability fit these once on
/// a representative sample and pass them back via
/// [`ScalingPolicy::Fixed`].
pub fn fit_scale_stats(vectors: &[FeatureVector]) -> BTreeMap<String, ScaleStats> {
    let mut fitted = BTreeMap::new();
    for name in scaled_feature_names(vectors) {
        let values: Vec<f64> = vectors.iter().filter_map(|v| v.get(&name).copied()).collect();
        if values.is_empty() {
            continue;
        }
        fitted.insert(name, ScaleStats::fit(&values));
    }
    fitted
}

/// Derive the engineered feature vector for every record, in input order.
///
/// Transform order matters: log and inverse transforms first, then binary
/// indicators, then composites that consume them, then rescaling. Missing
/// raw fields are soft: the dependent feature is skipped or defaults to 0.
pub fn engineer(records: &[PartRecord], config: &FeatureConfig) -> Vec<FeatureVector> {
    for field in config
        .log_transforms
        .iter()
        .chain(config.inverse_transforms.iter())
    {
        if !PartRecord::is_numeric_field(field) {
            warn!(field = %field, "configured transform field is not a record attribute, skipping");
        }
    }

    let mut vectors: Vec<FeatureVector> = records
        .iter()
        .map(|record| engineer_record(record, config))
        .collect();

    scale_features(&mut vectors, &config.scaling);
    vectors
}

fn engineer_record(record: &PartRecord, config: &FeatureConfig) -> FeatureVector {
    let mut features = FeatureVector::new();

    for field in &config.log_transforms {
        if PartRecord::is_numeric_field(field) {
            let filled = record.numeric_field(field).unwrap_or(0.0).max(0.0);
            features.insert(format!("log_{}", field), filled.ln_1p());
        }
    }

    for field in &config.inverse_transforms {
        if PartRecord::is_numeric_field(field) {
            let filled = record.numeric_field(field).unwrap_or(0.0).max(0.0);
            features.insert(format!("inv_{}", field), 1.0 / (1.0 + filled));
        }
    }

    for name in &config.binary_features {
        let value = match name.as_str() {
            "is_authorized" => (record.source_type.as_deref() == Some("Authorized")) as u8,
            "has_datasheet" => record.datasheet.is_some() as u8,
            "in_stock" => (record.inventory_or_zero() > 0.0) as u8,
            "immediate_availability" => (record.leadtime_weeks == Some(0.0)) as u8,
            other => {
                warn!(feature = %other, "unknown binary feature, defaulting to 0");
                0
            }
        };
        features.insert(name.clone(), f64::from(value));
    }

    features.insert("availability_tier".to_string(), availability_tier(record));

    for name in &config.composite_features {
        match name.as_str() {
            "availability_score" => {
                // Needs both raw signals; a record missing either simply
                // lacks the feature and it contributes zero downstream.
                if let (Some(inventory), Some(moq)) = (record.inventory, record.moq) {
                    let in_stock = features.get("in_stock").copied().unwrap_or(0.0);
                    let immediate = features
                        .get("immediate_availability")
                        .copied()
                        .unwrap_or(0.0);
                    let inventory_ratio = (inventory / moq.max(1.0)).min(10.0);
                    let score = (in_stock * 0.5 + immediate * 0.3 + inventory_ratio * 0.2)
                        .clamp(0.0, 2.0);
                    features.insert(name.clone(), score);
                }
            }
            "demand_score" => {
                features.insert(name.clone(), record.demand_all_time.unwrap_or(0.0));
            }
            "economic_score" => {
                let score = match (features.get("inv_price"), features.get("inv_moq")) {
                    (Some(inv_price), Some(inv_moq)) => inv_price * 0.6 + inv_moq * 0.4,
                    _ => 0.0,
                };
                features.insert(name.clone(), score);
            }
            other => {
                warn!(feature = %other, "unknown composite feature, skipping");
            }
        }
    }

    features
}

/// Availability tiers: 1 = on the shelf and shipping now, 2 = short-term
/// (≤4 weeks), 3 = medium-term (≤12 weeks), 4 = long-term or special order.
fn availability_tier(record: &PartRecord) -> f64 {
    let in_stock = record.inventory_or_zero() > 0.0;
    match record.leadtime_weeks {
        Some(weeks) if in_stock && weeks == 0.0 => 1.0,
        Some(weeks) if in_stock && weeks <= 4.0 => 2.0,
        Some(weeks) if in_stock && weeks <= 12.0 => 3.0,
        _ => 4.0,
    }
}

fn scaled_feature_names(vectors: &[FeatureVector]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for vector in vectors {
        for name in vector.keys() {
            if SCALED_PREFIXES.iter().any(|p| name.starts_with(p))
                && !names.iter().any(|n| n == name)
            {
                names.push(name.clone());
            }
        }
    }
    names.sort();
    names
}

/// Rescale derived features in place. A feature that cannot be scaled
/// (non-finite values, or no fixed statistics supplied for it) is left
/// unscaled with a warning; scaling trouble never aborts the pipeline.
fn scale_features(vectors: &mut [FeatureVector], policy: &ScalingPolicy) {
    let fitted;
    let stats_by_name = match policy {
        ScalingPolicy::BatchLocal => {
            fitted = fit_scale_stats(vectors);
            &fitted
        }
        ScalingPolicy::Fixed { stats } => stats,
    };

    for name in scaled_feature_names(vectors) {
        let Some(scale) = stats_by_name.get(&name) else {
            warn!(feature = %name, "no scaling statistics for feature, leaving unscaled");
            continue;
        };
        if !scale.median.is_finite() || !scale.iqr.is_finite() {
            warn!(feature = %name, "non-finite scaling statistics, leaving feature unscaled");
            continue;
        }
        debug!(feature = %name, median = scale.median, iqr = scale.iqr, "scaling feature");
        for vector in vectors.iter_mut() {
            if let Some(value) = vector.get_mut(&name) {
                *value = scale.apply(*value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PartRecord;

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
            source_type: authorized.then(|| "Authorized".to_string()),
            datasheet: None,
        }
    }

    fn unscaled_config() -> FeatureConfig {
        // Fixed policy with empty stats leaves every feature raw, which
        // makes individual transform values easy to assert.
        FeatureConfig {
            scaling: ScalingPolicy::Fixed {
                stats: BTreeMap::new(),
            },
            ..FeatureConfig::default()
        }
    }

    #[test]
    fn test_log_transform_fills_missing_with_zero() {
        let records = [
            record(Some(100.0), None, Some(1.0), None, false),
            record(None, None, Some(1.0), None, false),
        ];
        let vectors = engineer(&records, &unscaled_config());
        assert!((vectors[0]["log_inventory"] - 100.0_f64.ln_1p()).abs() < 1e-12);
        assert_eq!(vectors[1]["log_inventory"], 0.0);
    }

    #[test]
    fn test_inverse_transform_maps_small_to_near_one() {
        let records = [
            record(Some(1.0), Some(0.0), Some(1.0), None, false),
            record(Some(1.0), Some(9.0), Some(1.0), None, false),
        ];
        let vectors = engineer(&records, &unscaled_config());
        assert_eq!(vectors[0]["inv_leadtime_weeks"], 1.0);
        assert_eq!(vectors[1]["inv_leadtime_weeks"], 0.1);
        assert_eq!(vectors[0]["inv_moq"], 0.5);
    }

    #[test]
    fn test_binary_indicators() {
        let mut r = record(Some(3.0), Some(0.0), Some(1.0), None, true);
        r.datasheet = Some("https://example.com/ds.pdf".to_string());
        let vectors = engineer(&[r], &unscaled_config());
        assert_eq!(vectors[0]["is_authorized"], 1.0);
        assert_eq!(vectors[0]["has_datasheet"], 1.0);
        assert_eq!(vectors[0]["in_stock"], 1.0);
        assert_eq!(vectors[0]["immediate_availability"], 1.0);

        let vectors = engineer(
            &[record(Some(0.0), Some(2.0), Some(1.0), None, false)],
            &unscaled_config(),
        );
        assert_eq!(vectors[0]["is_authorized"], 0.0);
        assert_eq!(vectors[0]["has_datasheet"], 0.0);
        assert_eq!(vectors[0]["in_stock"], 0.0);
        assert_eq!(vectors[0]["immediate_availability"], 0.0);
    }

    #[test]
    fn test_availability_score_clips_at_two() {
        // in_stock 0.5 + immediate 0.3 + capped ratio 2.0 = 2.8, clipped.
        let records = [record(Some(1000.0), Some(0.0), Some(1.0), None, false)];
        let vectors = engineer(&records, &unscaled_config());
        assert_eq!(vectors[0]["availability_score"], 2.0);
    }

    #[test]
    fn test_availability_score_partial_components() {
        // 50/10 = 5 ratio, in stock, not immediate: 0.5 + 0 + 1.0 = 1.5.
        let records = [record(Some(50.0), Some(2.0), Some(10.0), None, false)];
        let vectors = engineer(&records, &unscaled_config());
        assert_eq!(vectors[0]["availability_score"], 1.5);
    }

    #[test]
    fn test_availability_score_requires_inventory_and_moq() {
        let records = [record(Some(50.0), Some(2.0), None, None, false)];
        let vectors = engineer(&records, &unscaled_config());
        assert!(!vectors[0].contains_key("availability_score"));
    }

    #[test]
    fn test_demand_score_fills_missing_with_zero() {
        let records = [
            record(Some(1.0), None, Some(1.0), Some(250.0), false),
            record(Some(1.0), None, Some(1.0), None, false),
        ];
        let vectors = engineer(&records, &unscaled_config());
        assert_eq!(vectors[0]["demand_score"], 250.0);
        assert_eq!(vectors[1]["demand_score"], 0.0);
    }

    #[test]
    fn test_availability_tiers() {
        let tiers: Vec<f64> = [
            record(Some(10.0), Some(0.0), Some(1.0), None, false),
            record(Some(10.0), Some(3.0), Some(1.0), None, false),
            record(Some(10.0), Some(10.0), Some(1.0), None, false),
            record(Some(10.0), Some(20.0), Some(1.0), None, false),
            record(Some(0.0), Some(0.0), Some(1.0), None, false),
            record(Some(10.0), None, Some(1.0), None, false),
        ]
        .iter()
        .map(|r| availability_tier(r))
        .collect();
        assert_eq!(tiers, vec![1.0, 2.0, 3.0, 4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_economic_score_when_configured() {
        let mut config = unscaled_config();
        config.inverse_transforms.push("price".to_string());
        config.composite_features.push("economic_score".to_string());

        let mut r = record(Some(1.0), Some(1.0), Some(1.0), None, false);
        r.price = Some(4.0);
        let vectors = engineer(&[r], &config);
        // inv_price = 1/5, inv_moq = 1/2.
        assert!((vectors[0]["economic_score"] - (0.2 * 0.6 + 0.5 * 0.4)).abs() < 1e-12);
    }

    #[test]
    fn test_batch_local_scaling_centers_on_median() {
        let records = [
            record(Some(1.0), Some(1.0), Some(1.0), Some(20.0), false),
            record(Some(1.0), Some(1.0), Some(1.0), Some(200.0), false),
            record(Some(1.0), Some(1.0), Some(1.0), Some(500.0), false),
            record(Some(1.0), Some(1.0), Some(1.0), Some(1000.0), false),
        ];
        let vectors = engineer(&records, &FeatureConfig::default());
        // demand column [20, 200, 500, 1000]: median 350, q25 155, q75 625.
        let expect = |x: f64| (x - 350.0) / 470.0;
        assert!((vectors[0]["demand_score"] - expect(20.0)).abs() < 1e-9);
        assert!((vectors[3]["demand_score"] - expect(1000.0)).abs() < 1e-9);
    }

    #[test]
    fn test_constant_feature_degrades_to_centering() {
        let records = [
            record(Some(1.0), Some(1.0), Some(1.0), Some(50.0), false),
            record(Some(1.0), Some(1.0), Some(1.0), Some(50.0), false),
        ];
        let vectors = engineer(&records, &FeatureConfig::default());
        assert_eq!(vectors[0]["demand_score"], 0.0);
        assert_eq!(vectors[1]["demand_score"], 0.0);
    }

    #[test]
    fn test_fixed_scaling_is_batch_independent() {
        let shared = record(Some(100.0), Some(2.0), Some(10.0), Some(300.0), true);
        let other = record(Some(5.0), Some(30.0), Some(500.0), Some(1.0), false);

        let config = FeatureConfig {
            scaling: ScalingPolicy::Fixed {
                stats: BTreeMap::from([(
                    "demand_score".to_string(),
                    ScaleStats {
                        median: 150.0,
                        iqr: 200.0,
                    },
                )]),
            },
            ..FeatureConfig::default()
        };

        let alone = engineer(std::slice::from_ref(&shared), &config);
        let together = engineer(&[other, shared.clone()], &config);
        assert_eq!(alone[0]["demand_score"], together[1]["demand_score"]);
        assert_eq!(alone[0]["demand_score"], (300.0 - 150.0) / 200.0);
    }

    #[test]
    fn test_fit_scale_stats_roundtrip() {
        let records = [
            record(Some(1.0), Some(1.0), Some(1.0), Some(10.0), false),
            record(Some(1.0), Some(1.0), Some(1.0), Some(30.0), false),
        ];
        let config = unscaled_config();
        let vectors = engineer(&records, &config);
        let fitted = fit_scale_stats(&vectors);
        assert_eq!(fitted["demand_score"].median, 20.0);
        assert_eq!(fitted["demand_score"].iqr, 10.0);
        assert!(fitted.contains_key("log_inventory"));
        assert!(!fitted.contains_key("is_authorized"));
    }

    #[test]
    fn test_unknown_configured_field_is_soft() {
        let mut config = unscaled_config();
        config.log_transforms.push("flux_capacitance".to_string());
        config.binary_features.push("is_vaporware".to_string());
        let vectors = engineer(
            &[record(Some(1.0), Some(1.0), Some(1.0), None, false)],
            &config,
        );
        assert!(!vectors[0].contains_key("log_flux_capacitance"));
        assert_eq!(vectors[0]["is_vaporware"], 0.0);
    }
}
