use tracing::warn;

use super::config::NormalizationRange;
use super::stats;
use crate::record::ScoredPart;

/// Rescale boosted scores into the configured target range.
///
/// Handled in priority order: an empty batch stays empty; a batch with no
/// discriminating signal (all scores equal, including all-zero) takes the
/// midpoint 50 everywhere; otherwise gated records (score exactly 0) are
/// pinned to 0 and the non-zero subset is min-max rescaled into the
/// target range. A degenerate non-zero subset (all equal, alongside
/// gated zeros) takes the midpoint rather than being dropped. Results are
/// rounded to 2 decimals.
pub fn normalize_scores(boosted: &[f64], range: NormalizationRange) -> Vec<f64> {
    if boosted.is_empty() {
        return Vec::new();
    }

    let scores: Vec<f64> = boosted
        .iter()
        .map(|&score| {
            if score.is_finite() {
                score
            } else {
                warn!(score, "non-finite boosted score, treating as 0");
                0.0
            }
        })
        .collect();

    let max = scores.iter().copied().fold(f64::MIN, f64::max);
    let min = scores.iter().copied().fold(f64::MAX, f64::min);
    if max == min {
        return vec![50.0; scores.len()];
    }

    let (lo, hi) = range.bounds();
    let nonzero: Vec<f64> = scores.iter().copied().filter(|&s| s != 0.0).collect();
    let sub_min = nonzero.iter().copied().fold(f64::MAX, f64::min);
    let sub_max = nonzero.iter().copied().fold(f64::MIN, f64::max);

    scores
        .iter()
        .map(|&score| {
            if score == 0.0 {
                // Gated records stay at exactly 0 regardless of the
                // target-range floor.
                0.0
            } else if sub_max == sub_min {
                50.0
            } else {
                let scaled = lo + (score - sub_min) / (sub_max - sub_min) * (hi - lo);
                round2(scaled.clamp(lo, hi))
            }
        })
        .collect()
}

/// Percentile rank of each score within the batch, 0-100, with tied
/// scores sharing the average rank.
pub fn percentiles(scores: &[f64]) -> Vec<f64> {
    let n = scores.len();
    if n == 0 {
        return Vec::new();
    }
    stats::average_ranks(scores)
        .into_iter()
        .map(|rank| rank / n as f64 * 100.0)
        .collect()
}

/// Stable sort by descending priority; tied records keep their original
/// relative order.
pub fn sort_by_priority(parts: &mut [ScoredPart]) {
    parts.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
