//! Per-entity mutual exclusion
//!
//! Read-modify-write sequences on one record run one at a time within the
//! process. Writers on other instances are caught by the stores'
//! `lock_version` check instead.

use std::sync::Arc;

use dashmap::DashMap;
use sd_core::traits::Id;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: DashMap<Id, Arc<Mutex<()>>>,
}

/// Exclusive access to one id.
///
/// Dropping it releases the lock and forgets the entry once no other task
/// holds or waits on it.
#[derive(Debug)]
pub struct EntityGuard<'a> {
    locks: &'a EntityLocks,
    id: Id,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EntityGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold their own clone. The shard lock keeps a concurrent
        // `lock` from cloning between the count and the removal.
        self.locks
            .locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`
    pub async fn lock(&self, id: Id) -> EntityGuard<'_> {
        let mutex = self
            .locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        EntityGuard {
            locks: self,
            id,
            guard: Some(guard),
        }
    }

    /// Ids currently held or waited on
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
