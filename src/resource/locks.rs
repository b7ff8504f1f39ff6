//! Per-path lock registry.
//!
//! One registry is created at startup and cloned into every dispatcher, so
//! all connections touching the same file contend on the same lock. Entries
//! are reference counted: an entry lives while at least one operation holds
//! or waits for it, and is removed by the last one out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::resource::canonical_key;

struct Entry {
    lock: Arc<AsyncMutex<()>>,
    holders: usize,
}

/// Shared map from canonical path to its exclusive lock.
///
/// Cloning is cheap and every clone refers to the same table.
#[derive(Clone, Default)]
pub struct LockRegistry {
    entries: Arc<Mutex<HashMap<PathBuf, Entry>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `path`.
    ///
    /// Waiters on the same path are served in arrival order. The lock is
    /// released when the returned guard is dropped.
    pub async fn acquire(&self, path: &Path) -> ResourceGuard {
        let key = canonical_key(path);
        let (lease, lock) = self.register(key);

        // If this future is dropped while queued, the lease still gives the
        // holder count back.
        let guard = lock.lock_owned().await;

        tracing::trace!(path = %lease.key.display(), "Resource lock acquired");

        ResourceGuard {
            _guard: guard,
            lease,
        }
    }

    /// Number of paths that currently have an entry.
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Number of operations holding or waiting for `path`.
    pub fn holders(&self, path: &Path) -> usize {
        self.table()
            .get(&canonical_key(path))
            .map(|entry| entry.holders)
            .unwrap_or(0)
    }

    fn register(&self, key: PathBuf) -> (Lease, Arc<AsyncMutex<()>>) {
        let mut table = self.table();
        let entry = table.entry(key.clone()).or_insert_with(|| Entry {
            lock: Arc::new(AsyncMutex::new(())),
            holders: 0,
        });
        entry.holders += 1;
        let lock = Arc::clone(&entry.lock);
        drop(table);

        let lease = Lease {
            registry: self.clone(),
            key,
        };
        (lease, lock)
    }

    fn release(&self, key: &Path) {
        let mut table = self.table();
        if let Some(entry) = table.get_mut(key) {
            entry.holders -= 1;
            if entry.holders == 0 {
                table.remove(key);
                tracing::trace!(path = %key.display(), "Resource lock entry removed");
            }
        }
    }

    fn table(&self) -> MutexGuard<'_, HashMap<PathBuf, Entry>> {
        // The table is consistent after every statement, so a poisoned
        // mutex is still safe to use.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One unit of the holder count. Dropping it gives the unit back.
struct Lease {
    registry: LockRegistry,
    key: PathBuf,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

/// Exclusive access to one resource path.
///
/// Fields drop in order: the path lock is released before the holder count
/// is decremented, so a queued waiter always finds the entry alive.
pub struct ResourceGuard {
    _guard: OwnedMutexGuard<()>,
    lease: Lease,
}

impl ResourceGuard {
    /// Canonical key this guard is registered under.
    pub fn path(&self) -> &Path {
        &self.lease.key
    }
}
