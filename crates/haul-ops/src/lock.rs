//! Per-destination mutual exclusion.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async locks keyed by destination directory.
///
/// Requests on the same directory queue in arrival order; requests on
/// different directories run in parallel.
#[derive(Debug, Default)]
pub struct DirectoryLocks {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl DirectoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `dir`.
    pub async fn acquire(&self, dir: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            self.prune();
            Arc::clone(self.locks.entry(dir.to_path_buf()).or_default().value())
        };
        lock.lock_owned().await
    }

    /// Whether some request currently holds or waits for `dir`.
    pub fn is_busy(&self, dir: &Path) -> bool {
        self.locks
            .get(dir)
            .is_some_and(|lock| Arc::strong_count(lock.value()) > 1)
    }

    /// Drop locks nobody holds or waits for.
    fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}
