//! Durable avatar records.
//!
//! [`AvatarStore`] is the only path to avatar state. Implementations must make
//! each single-record write atomic; serializing a whole read-modify-write is
//! the caller's job (see [`crate::locks::AvatarLocks`]).

mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::types::{Avatar, AvatarId};

pub use sqlite::SqliteAvatarStore;

/// Storage result alias.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read/write access to avatar records keyed by identity.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    /// Fetch an avatar, `None` if it has never been stored.
    async fn get(&self, id: &AvatarId) -> StoreResult<Option<Avatar>>;

    /// Insert or replace an avatar record.
    async fn upsert(&self, avatar: &Avatar) -> StoreResult<()>;

    /// Reset an existing avatar to the initial alive state and persist it.
    ///
    /// Returns `None` without writing anything if the avatar does not exist.
    async fn respawn(&self, id: &AvatarId) -> StoreResult<Option<Avatar>>;
}

/// Process-local store, used by tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryAvatarStore {
    avatars: RwLock<HashMap<AvatarId, Avatar>>,
}

impl InMemoryAvatarStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored avatars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.avatars.read().len()
    }

    /// Whether no avatar has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.avatars.read().is_empty()
    }
}

#[async_trait]
impl AvatarStore for InMemoryAvatarStore {
    async fn get(&self, id: &AvatarId) -> StoreResult<Option<Avatar>> {
        Ok(self.avatars.read().get(id).cloned())
    }

    async fn upsert(&self, avatar: &Avatar) -> StoreResult<()> {
        self.avatars
            .write()
            .insert(avatar.id.clone(), avatar.clone());
        Ok(())
    }

    async fn respawn(&self, id: &AvatarId) -> StoreResult<Option<Avatar>> {
        let mut avatars = self.avatars.write();
        let Some(avatar) = avatars.get_mut(id) else {
            return Ok(None);
        };
        avatar.revive();
        Ok(Some(avatar.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AvatarStatus, CombatStats};

    fn avatar(id: &str) -> Avatar {
        Avatar::new(AvatarId::new(id), id.to_uppercase(), CombatStats::default())
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = InMemoryAvatarStore::new();
        assert!(store.get(&AvatarId::new("nobody")).await.expect("get").is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn upsert_then_get() {
        let store = InMemoryAvatarStore::new();
        let mut a = avatar("a");
        store.upsert(&a).await.expect("insert");

        a.hp = 42;
        store.upsert(&a).await.expect("replace");

        let loaded = store.get(&a.id).await.expect("get").expect("Some");
        assert_eq!(loaded.hp, 42);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn respawn_missing_is_noop() {
        let store = InMemoryAvatarStore::new();
        assert!(store.respawn(&AvatarId::new("ghost")).await.expect("respawn").is_none());
        assert!(store.is_empty(), "respawn must not create records");
    }

    #[tokio::test]
    async fn respawn_restores_dead_avatar() {
        let store = InMemoryAvatarStore::new();
        let mut a = avatar("a");
        a.status = AvatarStatus::Dead;
        a.lives = 0;
        a.hp = 0;
        a.death_timestamp = Some(chrono::Utc::now());
        store.upsert(&a).await.expect("insert");

        let revived = store.respawn(&a.id).await.expect("respawn").expect("Some");
        assert_eq!(revived.status, AvatarStatus::Alive);
        assert_eq!(revived.lives, 3);
        assert_eq!(revived.hp, 100);
        assert!(revived.death_timestamp.is_none());

        let stored = store.get(&a.id).await.expect("get").expect("Some");
        assert_eq!(stored, revived);
    }
}
