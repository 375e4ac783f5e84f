//! SQLite-backed [`AvatarStore`].
//!
//! Each avatar is serialised to JSON and stored in a single table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS avatars (
//!     avatar_id  TEXT PRIMARY KEY,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL
//! );
//! ```
//!
//! One connection is opened for the lifetime of the store and shared behind a
//! mutex; queries run on tokio's blocking pool so they never stall the async
//! workers. JSON inside a BLOB keeps the schema stable when avatar fields are
//! added.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info};

use super::{AvatarStore, StoreResult};
use crate::config::PersistenceConfig;
use crate::error::StoreError;
use crate::types::{Avatar, AvatarId};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS avatars (
    avatar_id  TEXT PRIMARY KEY,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL
);";

/// Handle to an open SQLite database of avatars.
///
/// # Usage
///
/// ```no_run
/// # use dungeon_core::store::{AvatarStore, SqliteAvatarStore};
/// # use dungeon_core::config::PersistenceConfig;
/// # use dungeon_core::types::{Avatar, AvatarId, CombatStats};
/// # async fn demo() -> Result<(), dungeon_core::error::StoreError> {
/// let store = SqliteAvatarStore::open("dungeon.db", &PersistenceConfig::default())?;
/// let avatar = Avatar::new(AvatarId::new("1234"), "Nyx", CombatStats::default());
/// store.upsert(&avatar).await?;
/// let loaded = store.get(&avatar.id).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqliteAvatarStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteAvatarStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAvatarStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteAvatarStore {
    /// Open (or create) an SQLite database at `path`.
    ///
    /// The schema is created if it does not exist. WAL mode is enabled when
    /// `config.wal_mode` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> StoreResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "Avatar store opened"
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failures.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Total number of stored avatars.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on SQLite failures.
    pub async fn avatar_count(&self) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM avatars", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
        .await
    }

    /// Run SQLite's integrity check; `Ok(false)` means corruption was found.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the check itself fails.
    pub async fn integrity_check(&self) -> StoreResult<bool> {
        self.with_conn(|conn| {
            let result: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
            Ok(result == "ok")
        })
        .await
    }

    /// Copy the live database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the destination cannot be opened
    /// or the copy fails.
    pub async fn backup<P: AsRef<Path>>(&self, dest_path: P) -> StoreResult<()> {
        let dest_path = dest_path.as_ref().to_path_buf();
        self.with_conn(move |conn| {
            let start = Instant::now();
            let mut dest = Connection::open(&dest_path)?;
            let backup = rusqlite::backup::Backup::new(conn, &mut dest)?;
            backup.run_to_completion(256, Duration::from_millis(50), None)?;

            info!(
                dest = %dest_path.display(),
                elapsed_ms = start.elapsed().as_millis(),
                "Avatar store backup completed"
            );
            Ok(())
        })
        .await
    }

    /// Run `f` against the shared connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut *guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn read_avatar(conn: &Connection, id: &AvatarId) -> StoreResult<Option<Avatar>> {
    let mut stmt = conn.prepare_cached("SELECT data FROM avatars WHERE avatar_id = ?1")?;
    let data: Option<Vec<u8>> = stmt
        .query_row(params![id.0], |row| row.get(0))
        .optional()?;

    data.map(|bytes| {
        serde_json::from_slice::<Avatar>(&bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    })
    .transpose()
}

fn write_avatar(conn: &Connection, avatar: &Avatar) -> StoreResult<()> {
    let json = serde_json::to_vec(avatar).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO avatars (avatar_id, data, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(avatar_id) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at",
        params![avatar.id.0, json, now],
    )?;
    Ok(())
}

#[async_trait]
impl AvatarStore for SqliteAvatarStore {
    async fn get(&self, id: &AvatarId) -> StoreResult<Option<Avatar>> {
        let id = id.clone();
        self.with_conn(move |conn| read_avatar(conn, &id)).await
    }

    async fn upsert(&self, avatar: &Avatar) -> StoreResult<()> {
        let avatar = avatar.clone();
        self.with_conn(move |conn| {
            let start = Instant::now();
            write_avatar(conn, &avatar)?;
            debug!(
                avatar = %avatar.id,
                hp = avatar.hp,
                lives = avatar.lives,
                elapsed_us = start.elapsed().as_micros(),
                "Saved avatar"
            );
            Ok(())
        })
        .await
    }

    async fn respawn(&self, id: &AvatarId) -> StoreResult<Option<Avatar>> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let Some(mut avatar) = read_avatar(&tx, &id)? else {
                return Ok(None);
            };
            avatar.revive();
            write_avatar(&tx, &avatar)?;
            tx.commit()?;

            debug!(avatar = %id, "Respawned avatar saved");
            Ok(Some(avatar))
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
