use serde::{Deserialize, Serialize};

use crate::quality::QualityConfig;
use crate::scoring::ScoringConfig;

/// Top-level configuration file schema.
///
/// Both sections are optional; an absent section uses its defaults, so an
/// empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,

    #[serde(default)]
    pub quality: Option<QualityConfig>,
}

impl Config {
    /// Scoring section, or defaults when the file omits it.
    pub fn effective_scoring(&self) -> ScoringConfig {
        self.scoring.clone().unwrap_or_default()
    }

    /// Quality section, or defaults when the file omits it.
    pub fn effective_quality(&self) -> QualityConfig {
        self.quality.clone().unwrap_or_default()
    }
}
