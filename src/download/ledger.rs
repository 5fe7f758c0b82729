//! In-memory record of URLs whose most recent attempt failed.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

/// URLs currently believed to be in a failed state.
///
/// A URL is present at most once. Failed attempts add it, a successful
/// attempt removes it. Interior locking makes the ledger safe to share
/// between concurrent download tasks through an `Arc`.
#[derive(Debug, Default)]
pub struct FailureLedger {
    entries: Mutex<Vec<String>>,
}

impl FailureLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` as failed. Returns `false` if it was already present.
    pub fn add(&self, url: &str) -> bool {
        let mut entries = self.lock();
        if entries.iter().any(|entry| entry == url) {
            return false;
        }
        entries.push(url.to_string());
        trace!(url, failed = entries.len(), "recorded failure");
        true
    }

    /// Removes the first entry equal to `url`. Returns `false` if it was absent.
    pub fn remove(&self, url: &str) -> bool {
        let mut entries = self.lock();
        let Some(index) = entries.iter().position(|entry| entry == url) else {
            return false;
        };
        entries.remove(index);
        trace!(url, failed = entries.len(), "cleared failure");
        true
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.lock().iter().any(|entry| entry == url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the current entries in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
