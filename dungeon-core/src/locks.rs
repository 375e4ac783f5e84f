//! Per-avatar mutual exclusion.
//!
//! Every read-modify-write of an avatar record holds that avatar's guard for
//! its whole duration, which closes the lost-update window between two
//! concurrent attackers (or an attack racing a move). Guards for different
//! avatars never contend.
//!
//! Slots are created on demand and dropped again once no task holds or waits
//! for them, so the map stays proportional to in-flight commands rather than
//! to every avatar ever seen.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use crate::types::AvatarId;

/// Registry of per-avatar async mutexes. Share it via `Arc` between every
/// component that mutates avatars.
#[derive(Debug, Default)]
pub struct AvatarLocks {
    slots: DashMap<AvatarId, Arc<Mutex<()>>>,
}

impl AvatarLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn lock(&self, id: &AvatarId) -> AvatarGuard<'_> {
        let slot = Arc::clone(self.slots.entry(id.clone()).or_default().value());
        let guard = slot.lock_owned().await;
        trace!(avatar = %id, "Avatar lock acquired");
        AvatarGuard {
            locks: self,
            id: id.clone(),
            guard: Some(guard),
        }
    }

    /// Number of avatars with a live slot (held or awaited).
    #[must_use]
    pub fn active(&self) -> usize {
        self.slots.len()
    }
}

/// Exclusive access to one avatar; released on drop.
#[derive(Debug)]
pub struct AvatarGuard<'a> {
    locks: &'a AvatarLocks,
    id: AvatarId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl AvatarGuard<'_> {
    /// The avatar this guard protects.
    #[must_use]
    pub fn avatar(&self) -> &AvatarId {
        &self.id
    }
}

impl Drop for AvatarGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own reference left: nobody holds or waits on it.
        self.locks
            .slots
            .remove_if(&self.id, |_, slot| Arc::strong_count(slot) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn slot_is_pruned_after_release() {
        let locks = AvatarLocks::new();
        {
            let guard = locks.lock(&AvatarId::new("a")).await;
            assert_eq!(guard.avatar(), &AvatarId::new("a"));
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn different_avatars_do_not_block() {
        let locks = AvatarLocks::new();
        let _a = locks.lock(&AvatarId::new("a")).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock(&AvatarId::new("b"))).await;
        assert!(b.is_ok(), "lock on another avatar should be immediate");
    }

    #[tokio::test]
    async fn same_avatar_waits_for_release() {
        let locks = Arc::new(AvatarLocks::new());
        let id = AvatarId::new("a");

        let held = locks.lock(&id).await;
        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.lock(&id)).await;
        assert!(blocked.is_err(), "second lock must wait");

        drop(held);
        let acquired = tokio::time::timeout(Duration::from_millis(50), locks.lock(&id)).await;
        assert!(acquired.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn serializes_increments() {
        let locks = Arc::new(AvatarLocks::new());
        let counter = Arc::new(parking_lot::Mutex::new(0_u32));
        let id = AvatarId::new("shared");

        let mut handles = Vec::new();
        for _ in 0..32 {
            let locks = Arc::clone(&locks);
            let counter = Arc::clone(&counter);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(&id).await;
                let read = *counter.lock();
                tokio::task::yield_now().await;
                *counter.lock() = read + 1;
            }));
        }
        for h in handles {
            h.await.expect("task");
        }

        assert_eq!(*counter.lock(), 32);
        assert_eq!(locks.active(), 0);
    }
}
