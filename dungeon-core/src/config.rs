//! Configuration for the dungeon engine.
//!
//! Maps directly to `dungeon.toml`. Every section and field has a default, so
//! an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::types::CombatStats;

/// Top-level engine configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DungeonConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Combat tuning.
    #[serde(default)]
    pub combat: CombatConfig,
    /// Movement and notification settings.
    #[serde(default)]
    pub movement: MovementConfig,
    /// Persistence / storage settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Event bus settings.
    #[serde(default)]
    pub events: EventConfig,
}

impl DungeonConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `DungeonError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::DungeonError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when `RUST_LOG` is not set: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Combat tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Attack rating given to avatars created on first reference.
    #[serde(default = "default_attack")]
    pub default_attack: u32,
    /// Defense rating given to avatars created on first reference.
    #[serde(default = "default_defense")]
    pub default_defense: u32,
}

impl CombatConfig {
    /// Stats for a freshly created avatar.
    #[must_use]
    pub fn default_stats(&self) -> CombatStats {
        CombatStats {
            attack: self.default_attack,
            defense: self.default_defense,
        }
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            default_attack: default_attack(),
            default_defense: default_defense(),
        }
    }
}

/// Movement and notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Name given to an avatar first seen through a move.
    #[serde(default = "default_placeholder_name")]
    pub placeholder_name: String,
    /// Upper bound on each departure / arrival notification, in milliseconds.
    /// The departure notice is sent with the avatar locked.
    #[serde(default = "default_notification_timeout_ms")]
    pub notification_timeout_ms: u64,
}

impl MovementConfig {
    /// Notification timeout as a [`Duration`](std::time::Duration).
    #[must_use]
    pub fn notification_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.notification_timeout_ms)
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            placeholder_name: default_placeholder_name(),
            notification_timeout_ms: default_notification_timeout_ms(),
        }
    }
}

/// Persistence / storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the SQLite database.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// How long SQLite waits on a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            wal_mode: true,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Event bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Events buffered per subscriber before the slowest one starts lagging.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde requires functions, not constants)
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_attack() -> u32 {
    10
}
fn default_defense() -> u32 {
    5
}
fn default_placeholder_name() -> String {
    "mysterious traveler".to_string()
}
fn default_notification_timeout_ms() -> u64 {
    2_000
}
fn default_db_path() -> String {
    "dungeon.db".to_string()
}
fn default_busy_timeout_ms() -> u64 {
    5_000
}
fn default_event_capacity() -> usize {
    256
}
