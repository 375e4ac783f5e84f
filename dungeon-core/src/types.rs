//! Core type definitions for the dungeon avatar engine.
//!
//! Identities are opaque strings handed to us by the chat platform; the
//! engine never parses them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum (and initial) hit points of an alive avatar.
pub const MAX_HP: u32 = 100;

/// Number of knockouts an avatar can absorb before permanent death.
pub const MAX_LIVES: u8 = 3;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Stable identity of the participant controlling an avatar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AvatarId(pub String);

impl AvatarId {
    /// Wrap a platform user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a location, owned by the [`LocationResolver`](crate::collaborators::LocationResolver).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(pub String);

impl LocationId {
    /// Wrap a location identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a chat channel that notifications can be delivered into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRef(pub String);

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The community (guild/server) a destination is resolved within.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuildScope(pub String);

impl fmt::Display for GuildScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// A named place avatars can occupy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Stable identifier.
    pub id: LocationId,
    /// Human-readable name.
    pub name: String,
    /// Channel backing this location, if it has one.
    pub channel: Option<ChannelRef>,
    /// Image shown when the location speaks.
    pub image_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Avatars
// ---------------------------------------------------------------------------

/// Life status of an avatar. `Dead` is terminal until a respawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AvatarStatus {
    /// Can fight and be attacked.
    #[default]
    Alive,
    /// Lives exhausted.
    Dead,
}

/// Offensive and defensive ratings used by the damage formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStats {
    /// Attack rating.
    pub attack: u32,
    /// Defense rating.
    pub defense: u32,
}

impl Default for CombatStats {
    fn default() -> Self {
        Self {
            attack: 10,
            defense: 5,
        }
    }
}

/// A persistent character controlled by a chat participant.
///
/// Invariant: `status == Dead` iff `lives == 0`, and `death_timestamp` is
/// present iff the avatar is dead. While alive `hp` is in `1..=MAX_HP`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    /// Identity of the controlling participant.
    pub id: AvatarId,
    /// Display name.
    pub name: String,
    /// Display image.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Alive or dead.
    #[serde(default)]
    pub status: AvatarStatus,
    /// Remaining lives, `0..=MAX_LIVES`.
    pub lives: u8,
    /// Current hit points, `0..=MAX_HP`.
    pub hp: u32,
    /// When the avatar died, if it is dead.
    #[serde(default)]
    pub death_timestamp: Option<DateTime<Utc>>,
    /// Attack / defense ratings.
    #[serde(default)]
    pub combat_stats: CombatStats,
    /// Where the avatar currently is.
    #[serde(default)]
    pub location_id: Option<LocationId>,
}

impl Avatar {
    /// Create a fresh, alive avatar with full health and the given stats.
    #[must_use]
    pub fn new(id: AvatarId, name: impl Into<String>, combat_stats: CombatStats) -> Self {
        Self {
            id,
            name: name.into(),
            image_url: None,
            status: AvatarStatus::Alive,
            lives: MAX_LIVES,
            hp: MAX_HP,
            death_timestamp: None,
            combat_stats,
            location_id: None,
        }
    }

    /// Whether the avatar has reached permanent death.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.status == AvatarStatus::Dead
    }

    /// Restore the initial alive state: full lives, full hp, no death stamp.
    ///
    /// Presentation data, stats and location are kept.
    pub fn revive(&mut self) {
        self.status = AvatarStatus::Alive;
        self.lives = MAX_LIVES;
        self.hp = MAX_HP;
        self.death_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_avatar_is_alive_with_full_health() {
        let avatar = Avatar::new(AvatarId::new("u1"), "Nyx", CombatStats::default());
        assert_eq!(avatar.status, AvatarStatus::Alive);
        assert_eq!(avatar.lives, MAX_LIVES);
        assert_eq!(avatar.hp, MAX_HP);
        assert!(avatar.death_timestamp.is_none());
        assert!(avatar.location_id.is_none());
    }

    #[test]
    fn revive_clears_death() {
        let mut avatar = Avatar::new(AvatarId::new("u1"), "Nyx", CombatStats::default());
        avatar.status = AvatarStatus::Dead;
        avatar.lives = 0;
        avatar.hp = 0;
        avatar.death_timestamp = Some(Utc::now());
        avatar.location_id = Some(LocationId::new("crypt"));

        avatar.revive();

        assert!(!avatar.is_dead());
        assert_eq!(avatar.lives, 3);
        assert_eq!(avatar.hp, 100);
        assert!(avatar.death_timestamp.is_none());
        assert_eq!(avatar.location_id, Some(LocationId::new("crypt")));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&AvatarStatus::Dead).expect("serialize");
        assert_eq!(json, "\"dead\"");
    }

    #[test]
    fn legacy_record_without_optional_fields_deserializes() {
        let json = r#"{"id":"u9","name":"Old","lives":2,"hp":40}"#;
        let avatar: Avatar = serde_json::from_str(json).expect("deserialize");
        assert_eq!(avatar.status, AvatarStatus::Alive);
        assert_eq!(avatar.combat_stats, CombatStats::default());
        assert!(avatar.location_id.is_none());
    }
}
