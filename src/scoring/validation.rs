use super::boosts::Condition;
use super::config::ScoringConfig;

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
///
/// The engine itself degrades gracefully on these problems (bad boost
/// rules are skipped, weights are used as given); this check exists for
/// callers that prefer to reject a configuration outright before scoring.
pub fn validate_config(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (feature, weight) in &config.weights {
        if !weight.is_finite() {
            errors.push(format!("scoring.weights.{}: must be finite", feature));
        }
    }

    for (i, boost) in config.boosts.iter().enumerate() {
        if boost.name.trim().is_empty() {
            errors.push(format!("scoring.boosts[{}].name: must not be empty", i));
        }
        if !(boost.multiplier > 0.0 && boost.multiplier.is_finite()) {
            errors.push(format!(
                "scoring.boosts[{}].multiplier: must be positive, got {}",
                i, boost.multiplier
            ));
        }
        if let Err(e) = Condition::parse(&boost.when) {
            errors.push(format!(
                "scoring.boosts[{}].when: invalid '{}' - {}",
                i, boost.when, e
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
