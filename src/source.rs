//! Collaborator interfaces around the engine.
//!
//! The engine itself never performs I/O. Batches arrive through a
//! [`PartSource`] and scored output leaves through a [`ScoreSink`]; a
//! warehouse-backed implementation of either lives with the caller. The
//! in-memory implementations here back the tests and document the
//! expected semantics.

use anyhow::Result;

use crate::record::{PartRecord, ScoredBatch};

/// Yields record batches for scoring.
pub trait PartSource {
    /// Load everything up to `limit` rows, in source order.
    fn load_sample(&mut self, limit: usize) -> Result<Vec<PartRecord>>;

    /// Load one fixed-size batch starting at `offset`. Returns `None`
    /// once the source is exhausted; the offset makes interrupted runs
    /// resumable.
    fn load_batch(&mut self, batch_size: usize, offset: usize) -> Result<Option<Vec<PartRecord>>>;
}

/// Durably stores scored batches, keyed by batch id and `scored_at`.
pub trait ScoreSink {
    fn store(&mut self, batch: &ScoredBatch) -> Result<()>;
}

/// A [`PartSource`] over an in-memory record list.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<PartRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<PartRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PartSource for MemorySource {
    fn load_sample(&mut self, limit: usize) -> Result<Vec<PartRecord>> {
        Ok(self.records.iter().take(limit).cloned().collect())
    }

    fn load_batch(&mut self, batch_size: usize, offset: usize) -> Result<Option<Vec<PartRecord>>> {
        if offset >= self.records.len() {
            return Ok(None);
        }
        let end = (offset + batch_size).min(self.records.len());
        Ok(Some(self.records[offset..end].to_vec()))
    }
}

/// A [`ScoreSink`] that keeps stored batches in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Vec<ScoredBatch>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[ScoredBatch] {
        &self.batches
    }

    /// Look up a stored batch by its id.
    pub fn find(&self, batch_id: &str) -> Option<&ScoredBatch> {
        self.batches
            .iter()
            .find(|b| b.batch_id.as_deref() == Some(batch_id))
    }
}

impl ScoreSink for MemorySink {
    fn store(&mut self, batch: &ScoredBatch) -> Result<()> {
        self.batches.push(batch.clone());
        Ok(())
    }
}
