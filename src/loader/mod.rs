//! Batch ingestion of cleaned records into a collection.
//!
//! A load is a full replace: the collection is cleared, then records are
//! written in order in fixed-size batches. A failed batch is retried once
//! after a backoff; a second failure aborts the load. Batches committed
//! before the abort stay in the collection (there is no rollback).

use std::thread;
use std::time::Duration;

use crate::domain::CleanRecord;
use crate::store::{Collection, Document, Filter, StoreError, record_to_document};

pub mod progress;

pub use progress::*;

pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

/// Delays applied around batch writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before the single retry of a failed batch.
    pub backoff: Duration,
    /// Wait between consecutive batches.
    pub pacing: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_RETRY_BACKOFF,
            pacing: DEFAULT_PACING,
        }
    }
}

impl RetryPolicy {
    pub fn immediate() -> Self {
        Self {
            backoff: Duration::ZERO,
            pacing: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub inserted: usize,
    pub batches: usize,
    pub retries: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to clear collection `{collection}`: {source}")]
    Clear {
        collection: String,
        #[source]
        source: StoreError,
    },
    #[error("batch at offset {offset} ({size} records) failed after retry: {source}")]
    BatchInsert {
        offset: usize,
        size: usize,
        #[source]
        source: StoreError,
    },
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}

/// Writes cleaned records into one collection.
pub struct BatchIngestor<'a, C: Collection + ?Sized> {
    collection: &'a C,
    batch_size: usize,
    policy: RetryPolicy,
}

impl<'a, C: Collection + ?Sized> BatchIngestor<'a, C> {
    pub fn new(collection: &'a C, batch_size: usize) -> Self {
        Self {
            collection,
            batch_size,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ingest(
        &self,
        records: &[CleanRecord],
        progress: &mut dyn ProgressSink,
    ) -> Result<IngestOutcome, IngestError> {
        if self.batch_size == 0 {
            return Err(IngestError::ZeroBatchSize);
        }

        let name = self.collection.name().to_string();
        let removed = self
            .collection
            .delete_many(&Filter::all())
            .map_err(|source| IngestError::Clear {
                collection: name.clone(),
                source,
            })?;
        tracing::info!(collection = %name, removed, "cleared collection");

        let mut outcome = IngestOutcome::default();
        if records.is_empty() {
            tracing::warn!(collection = %name, "no records to insert");
            return Ok(outcome);
        }

        let total = records.len();
        for (idx, chunk) in records.chunks(self.batch_size).enumerate() {
            if idx > 0 && !self.policy.pacing.is_zero() {
                thread::sleep(self.policy.pacing);
            }

            let offset = idx * self.batch_size;
            let docs: Vec<Document> = chunk.iter().map(record_to_document).collect();
            let written = self.insert_with_retry(&docs, offset, &mut outcome)?;

            outcome.inserted += written;
            outcome.batches += 1;
            progress.batch_committed(outcome.inserted, total);
        }

        tracing::info!(
            collection = %name,
            inserted = outcome.inserted,
            batches = outcome.batches,
            retries = outcome.retries,
            "ingestion complete"
        );
        Ok(outcome)
    }

    fn insert_with_retry(
        &self,
        docs: &[Document],
        offset: usize,
        outcome: &mut IngestOutcome,
    ) -> Result<usize, IngestError> {
        match self.collection.insert_many(docs) {
            Ok(n) => Ok(n),
            Err(first) => {
                tracing::warn!(
                    offset,
                    size = docs.len(),
                    error = %first,
                    "batch insert failed, retrying in {:?}",
                    self.policy.backoff
                );
                outcome.retries += 1;
                thread::sleep(self.policy.backoff);

                self.collection
                    .insert_many(docs)
                    .map_err(|source| IngestError::BatchInsert {
                        offset,
                        size: docs.len(),
                        source,
                    })
            }
        }
    }
}
