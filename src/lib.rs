//! Priority scoring for electronic-component part records.
//!
//! Combines availability, demand, and sourcing signals into a single
//! 0-100 rank usable for procurement and allocation decisions. The
//! pipeline runs in five stages over an immutable record batch:
//!
//! 1. **Feature engineering** ([`scoring::features`]) — log, inverse,
//!    binary, and composite transforms, then robust (median/IQR)
//!    rescaling of the derived features.
//! 2. **Aggregation** ([`scoring::engine`]) — weighted sum of engineered
//!    features, with parts that have no stock and a lead time beyond 12
//!    weeks gated to a base score of exactly 0.
//! 3. **Boosts** ([`scoring::boosts`]) — ordered, data-driven business
//!    rules whose multipliers compound on matching records.
//! 4. **Normalization and ranking** ([`scoring::normalize`]) — bounded
//!    rescale, percentile ranks, stable descending sort.
//! 5. Independently, **validation** ([`quality`]) — a read-only
//!    data-quality report over the same batch.
//!
//! ```
//! use part_priority::{PartRecord, Scorer};
//!
//! let records = vec![PartRecord {
//!     part_number: "LM358".to_string(),
//!     inventory: Some(1200.0),
//!     leadtime_weeks: Some(0.0),
//!     moq: Some(10.0),
//!     price: Some(0.35),
//!     demand_all_time: Some(840.0),
//!     source_type: Some("Authorized".to_string()),
//!     datasheet: None,
//! }];
//!
//! let batch = Scorer::default().score_batch(&records, Some("demo"));
//! assert_eq!(batch.parts[0].priority_score, 50.0); // single record, no signal
//! ```
//!
//! Scoring is deterministic and side-effect-free apart from `tracing`
//! logs: scaling statistics and normalization bounds live only inside one
//! [`Scorer::score_batch`] call. By default they are fit per batch, so
//! scores are not comparable across independently scored batches; fit
//! statistics once with [`scoring::fit_scale_stats`] and pass them back
//! via [`scoring::ScalingPolicy::Fixed`] when cross-batch comparability
//! matters.

pub mod config;
pub mod quality;
pub mod record;
pub mod scoring;
pub mod source;

pub use config::{load_config, parse_config, Config};
pub use quality::{DataValidator, QualityConfig, ValidationReport};
pub use record::{FeatureVector, PartRecord, ScoredBatch, ScoredPart};
pub use scoring::{Scorer, ScoringConfig};
pub use source::{MemorySink, MemorySource, PartSource, ScoreSink};
