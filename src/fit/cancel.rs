//! Cooperative cancellation for model fitting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared "abort the current fit" flag.
///
/// The model checks it between fitting stages with [`CancelToken::reset`], so
/// the fit that observes the flag also clears it and the next entity starts
/// clean.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag, returning whether it was set.
    pub fn reset(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}
