//! Attack resolution.
//!
//! One attacker strikes one target once per command:
//!
//! ```text
//! damage = max(1, attack − defense)
//! hp − damage > 0  → Hit
//! hp − damage ≤ 0  → lose a life; hp back to 100   (LifeLost)
//!                    last life gone → dead, stamped (PermanentDeath)
//! ```
//!
//! The floor of one point guarantees every exchange makes progress, even when
//! defense dominates attack. Death is terminal: a dead target rejects further
//! attacks without any state change.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::collaborators::AreaDirectory;
use crate::config::CombatConfig;
use crate::error::CombatError;
use crate::locks::AvatarLocks;
use crate::store::AvatarStore;
use crate::types::{Avatar, AvatarId, AvatarStatus, CombatStats, LocationId, MAX_HP};

/// What a single attack did to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttackOutcome {
    /// The target survived with hp to spare.
    Hit {
        /// Damage dealt.
        damage: u32,
        /// Target hp after the hit.
        remaining_hp: u32,
    },
    /// The target was knocked out, lost a life and was restored to full hp.
    LifeLost {
        /// Damage dealt.
        damage: u32,
        /// Lives the target has left (at least one).
        lives_remaining: u8,
    },
    /// The target lost its last life.
    PermanentDeath {
        /// Damage dealt.
        damage: u32,
    },
}

impl AttackOutcome {
    /// Damage dealt, whatever the result.
    #[must_use]
    pub fn damage(&self) -> u32 {
        match self {
            Self::Hit { damage, .. }
            | Self::LifeLost { damage, .. }
            | Self::PermanentDeath { damage } => *damage,
        }
    }
}

/// A resolved attack together with who it landed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackReport {
    /// The avatar that was hit.
    pub target: AvatarId,
    /// Its display name at the time of the hit.
    pub target_name: String,
    /// What happened.
    pub outcome: AttackOutcome,
}

/// Damage dealt by `attacker` to `defender`; never less than one.
#[must_use]
pub fn damage(attacker: &CombatStats, defender: &CombatStats) -> u32 {
    attacker.attack.saturating_sub(defender.defense).max(1)
}

/// Apply one attack to `target` in place.
///
/// On death `hp` is left at its pre-attack value; only `status`, `lives` and
/// `death_timestamp` change.
///
/// # Errors
/// Returns [`CombatError::TargetAlreadyDead`] without touching `target` if it
/// is already dead.
pub fn apply_attack(
    attacker: &CombatStats,
    target: &mut Avatar,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<AttackOutcome, CombatError> {
    if target.is_dead() {
        return Err(CombatError::TargetAlreadyDead {
            target: target.id.clone(),
            name: target.name.clone(),
        });
    }

    let damage = damage(attacker, &target.combat_stats);

    if damage < target.hp {
        target.hp -= damage;
        return Ok(AttackOutcome::Hit {
            damage,
            remaining_hp: target.hp,
        });
    }

    // Knockout.
    target.lives = target.lives.saturating_sub(1);
    if target.lives == 0 {
        target.status = AvatarStatus::Dead;
        target.death_timestamp = Some(now);
        return Ok(AttackOutcome::PermanentDeath { damage });
    }

    target.hp = MAX_HP;
    Ok(AttackOutcome::LifeLost {
        damage,
        lives_remaining: target.lives,
    })
}

/// Resolves `attack` commands against the avatar store.
pub struct CombatResolver {
    store: Arc<dyn AvatarStore>,
    directory: Arc<dyn AreaDirectory>,
    locks: Arc<AvatarLocks>,
    clock: Arc<dyn Clock>,
    config: CombatConfig,
}

impl std::fmt::Debug for CombatResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CombatResolver {
    /// Build a resolver. `locks` must be the registry shared with every other
    /// component that writes avatars.
    #[must_use]
    pub fn new(
        store: Arc<dyn AvatarStore>,
        directory: Arc<dyn AreaDirectory>,
        locks: Arc<AvatarLocks>,
        clock: Arc<dyn Clock>,
        config: CombatConfig,
    ) -> Self {
        Self {
            store,
            directory,
            locks,
            clock,
            config,
        }
    }

    /// Resolve `attacker_id` attacking whoever `target_query` names in `area`.
    ///
    /// The target is locked for the whole read-modify-write, so concurrent
    /// attacks on one target all land. An attacker missing from the store
    /// fights with default stats and is not written.
    ///
    /// # Errors
    /// - [`CombatError::TargetNotFound`] if zero or several avatars match.
    /// - [`CombatError::TargetAlreadyDead`] if the target is dead (no write).
    /// - [`CombatError::AreaLookup`] / [`CombatError::Store`] on collaborator failure.
    pub async fn resolve_attack(
        &self,
        attacker_id: &AvatarId,
        target_query: &str,
        area: Option<&LocationId>,
    ) -> Result<AttackReport, CombatError> {
        let mut matches = self.directory.find_avatars(area, target_query).await?;
        if matches.len() != 1 {
            debug!(
                query = target_query,
                matches = matches.len(),
                "Attack target not uniquely resolved"
            );
            return Err(CombatError::TargetNotFound {
                query: target_query.to_string(),
            });
        }
        let target_id = matches.remove(0);

        let _guard = self.locks.lock(&target_id).await;

        let mut target = self.load_or_default(&target_id, target_query).await?;
        if target.is_dead() {
            return Err(CombatError::TargetAlreadyDead {
                target: target.id,
                name: target.name,
            });
        }

        let attacker_stats = if *attacker_id == target_id {
            target.combat_stats
        } else {
            self.store
                .get(attacker_id)
                .await?
                .map_or_else(|| self.config.default_stats(), |a| a.combat_stats)
        };

        let outcome = apply_attack(&attacker_stats, &mut target, self.clock.now())?;
        self.store.upsert(&target).await?;

        match outcome {
            AttackOutcome::PermanentDeath { damage } => info!(
                attacker = %attacker_id,
                target = %target_id,
                damage,
                "Avatar has fallen permanently"
            ),
            AttackOutcome::LifeLost {
                damage,
                lives_remaining,
            } => info!(
                attacker = %attacker_id,
                target = %target_id,
                damage,
                lives_remaining,
                "Avatar lost a life"
            ),
            AttackOutcome::Hit {
                damage,
                remaining_hp,
            } => debug!(
                attacker = %attacker_id,
                target = %target_id,
                damage,
                remaining_hp,
                "Attack landed"
            ),
        }

        Ok(AttackReport {
            target: target_id,
            target_name: target.name,
            outcome,
        })
    }

    async fn load_or_default(&self, id: &AvatarId, name: &str) -> Result<Avatar, CombatError> {
        Ok(self
            .store
            .get(id)
            .await?
            .unwrap_or_else(|| Avatar::new(id.clone(), name, self.config.default_stats())))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
