use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::boosts::{self, BoostRule};
use super::config::ScoringConfig;
use super::features;
use super::normalize;
use crate::record::{FeatureVector, PartRecord, ScoredBatch, ScoredPart};

/// Weights are expected to sum to 1.0 within this tolerance; deviation is
/// warned about, never blocked on.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// The scoring engine: a pure, single-pass batch transform.
///
/// Given the same batch and configuration the output is bit-identical;
/// all intermediate state (scaling statistics, normalization bounds) is
/// local to one [`Scorer::score_batch`] call and discarded afterward. The
/// engine performs no I/O and never fails on record-level problems.
#[derive(Debug, Clone)]
pub struct Scorer {
    config: ScoringConfig,
    rules: Vec<BoostRule>,
}

impl Scorer {
    /// Build a scorer, compiling boost rules up front. Rules that do not
    /// compile are skipped with a warning; a weight table that does not
    /// sum to 1.0 is warned about.
    pub fn new(config: ScoringConfig) -> Self {
        let weight_sum: f64 = config.weights.values().sum();
        if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warn!(weight_sum, "scoring weights do not sum to 1.0");
        }
        let rules = boosts::compile_rules(&config.boosts);
        Self { config, rules }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a batch: engineer features, aggregate the weighted base
    /// score, gate unobtainable parts, apply boosts, normalize, rank, and
    /// sort by descending priority. Input order and cardinality are
    /// preserved up to the final sort; ties keep their input order.
    pub fn score_batch(&self, records: &[PartRecord], batch_id: Option<&str>) -> ScoredBatch {
        let scored_at = Utc::now();
        let batch_id = batch_id.map(str::to_string);

        if records.is_empty() {
            info!("scoring empty batch");
            return ScoredBatch {
                batch_id,
                scored_at,
                parts: Vec::new(),
            };
        }

        info!(
            batch = batch_id.as_deref().unwrap_or("-"),
            rows = records.len(),
            "scoring batch"
        );

        let vectors = features::engineer(records, &self.config.features);
        let base = self.base_scores(records, &vectors);

        let mut boosted = base.clone();
        boosts::apply_boosts(records, &vectors, &mut boosted, &self.rules);

        let priority = normalize::normalize_scores(&boosted, self.config.normalization);
        let percentile = normalize::percentiles(&priority);

        let mut parts: Vec<ScoredPart> = records
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (record, features))| ScoredPart {
                record: record.clone(),
                features,
                base_score: base[i],
                boosted_score: boosted[i],
                priority_score: priority[i],
                score_percentile: percentile[i],
            })
            .collect();
        normalize::sort_by_priority(&mut parts);

        ScoredBatch {
            batch_id,
            scored_at,
            parts,
        }
    }

    /// Weighted sum of engineered features, then the availability gate:
    /// a part with no stock and a lead time beyond 12 weeks scores 0 no
    /// matter what its other signals say.
    fn base_scores(&self, records: &[PartRecord], vectors: &[FeatureVector]) -> Vec<f64> {
        let present: BTreeSet<&str> = vectors
            .iter()
            .flat_map(|v| v.keys().map(String::as_str))
            .collect();

        let mut scores = vec![0.0; records.len()];
        for (feature, weight) in &self.config.weights {
            if !present.contains(feature.as_str()) {
                warn!(feature = %feature, "weight feature not found in engineered batch");
                continue;
            }
            debug!(feature = %feature, weight, "aggregating feature");
            for (score, vector) in scores.iter_mut().zip(vectors) {
                // A record lacking the feature contributes zero for it.
                *score += weight * vector.get(feature).copied().unwrap_or(0.0);
            }
        }

        for (score, record) in scores.iter_mut().zip(records) {
            if record.is_unavailable() {
                *score = 0.0;
            }
        }
        scores
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
