//! Ingestion progress reporting.

/// Receives `(inserted_so_far, total)` after every committed batch.
pub trait ProgressSink {
    fn batch_committed(&mut self, inserted: usize, total: usize);
}

/// Logs each committed batch with its completion percentage.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn batch_committed(&mut self, inserted: usize, total: usize) {
        let pct = if total == 0 {
            100.0
        } else {
            inserted as f64 / total as f64 * 100.0
        };
        tracing::info!(inserted, total, "inserted {inserted}/{total} records ({pct:.1}%)");
    }
}

impl<F: FnMut(usize, usize)> ProgressSink for F {
    fn batch_committed(&mut self, inserted: usize, total: usize) {
        self(inserted, total)
    }
}
