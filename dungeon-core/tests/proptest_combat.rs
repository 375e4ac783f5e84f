//! Property-Based Tests for Dungeon Core
//!
//! Uses `proptest` to check the combat and movement invariants under random
//! stats and random command sequences:
//!   - damage is never below one
//!   - hp and lives stay in their domains, and death is terminal
//!   - a pending return exists exactly when the last move was a pull

use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;

use dungeon_core::clock::SystemClock;
use dungeon_core::combat::{self, AttackOutcome};
use dungeon_core::config::MovementConfig;
use dungeon_core::events::EventBus;
use dungeon_core::local::{LocationCatalog, RecordingSink};
use dungeon_core::locks::AvatarLocks;
use dungeon_core::movement::{MoveOutcome, MovementCoordinator, ReturnOutcome};
use dungeon_core::store::{AvatarStore, InMemoryAvatarStore};
use dungeon_core::types::{
    Avatar, AvatarId, AvatarStatus, CombatStats, GuildScope, LocationId, MAX_HP, MAX_LIVES,
};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_stats() -> impl Strategy<Value = CombatStats> {
    (0..200u32, 0..200u32).prop_map(|(attack, defense)| CombatStats { attack, defense })
}

fn arb_target() -> impl Strategy<Value = Avatar> {
    (arb_stats(), 1..=MAX_HP, 1..=MAX_LIVES).prop_map(|(stats, hp, lives)| {
        let mut avatar = Avatar::new(AvatarId::new("target"), "Target", stats);
        avatar.hp = hp;
        avatar.lives = lives;
        avatar
    })
}

/// A move command: destination index and whether it was a pull.
fn arb_moves() -> impl Strategy<Value = Vec<(usize, bool)>> {
    prop::collection::vec((0..4usize, any::<bool>()), 1..12)
}

const PLACES: [&str; 4] = ["Tavern", "Crypt", "Tower", "Market"];

// ---------------------------------------------------------------------------
// Property: damage floor
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn damage_is_at_least_one(attacker in arb_stats(), defender in arb_stats()) {
        let dealt = combat::damage(&attacker, &defender);
        prop_assert!(dealt >= 1);
        prop_assert!(dealt >= attacker.attack.saturating_sub(defender.defense));
    }
}

// ---------------------------------------------------------------------------
// Property: state stays in its domain across any attack sequence
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn attack_sequences_respect_domains(
        mut target in arb_target(),
        attackers in prop::collection::vec(arb_stats(), 1..40),
    ) {
        for attacker in &attackers {
            let before = target.clone();
            match combat::apply_attack(attacker, &mut target, Utc::now()) {
                Ok(AttackOutcome::Hit { damage, remaining_hp }) => {
                    prop_assert_eq!(remaining_hp, before.hp - damage);
                    prop_assert_eq!(target.lives, before.lives);
                }
                Ok(AttackOutcome::LifeLost { lives_remaining, .. }) => {
                    prop_assert_eq!(target.hp, MAX_HP);
                    prop_assert_eq!(lives_remaining, before.lives - 1);
                }
                Ok(AttackOutcome::PermanentDeath { .. }) => {
                    prop_assert_eq!(before.lives, 1);
                    prop_assert!(target.death_timestamp.is_some());
                }
                Err(_) => {
                    prop_assert!(before.is_dead());
                    prop_assert_eq!(&target, &before);
                }
            }

            prop_assert!(target.lives <= MAX_LIVES);
            prop_assert_eq!(target.status == AvatarStatus::Dead, target.lives == 0);
            if !target.is_dead() {
                prop_assert!(target.hp >= 1 && target.hp <= MAX_HP);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Property: a pending return exists iff the last move was a pull
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn return_tracks_only_the_last_pull(moves in arb_moves()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        runtime.block_on(async {
            let store = Arc::new(InMemoryAvatarStore::new());
            let coordinator = MovementCoordinator::new(
                store.clone(),
                Arc::new(AvatarLocks::new()),
                Arc::new(LocationCatalog::auto_creating()),
                Arc::new(RecordingSink::new()),
                EventBus::default(),
                Arc::new(SystemClock),
                MovementConfig::default(),
            );
            let scope = GuildScope("g".into());
            let avatar = AvatarId::new("walker");

            let mut previous: Option<LocationId> = None;
            let mut origin_before_last: Option<LocationId> = None;
            for (place, pulled) in &moves {
                let outcome = coordinator
                    .resolve_move(&avatar, PLACES[*place], &scope, *pulled)
                    .await
                    .expect("move");
                let MoveOutcome::Moved { new_location_id, .. } = outcome;
                origin_before_last = previous.replace(new_location_id);
            }

            let (_, last_pulled) = moves[moves.len() - 1];
            let outcome = coordinator.return_to_origin(&avatar).await.expect("return");
            let stored = store.get(&avatar).await.expect("get").expect("exists");

            match (last_pulled, origin_before_last) {
                (true, Some(origin)) => {
                    prop_assert!(matches!(
                        &outcome,
                        ReturnOutcome::Returned(MoveOutcome::Moved { new_location_id, .. })
                            if *new_location_id == origin
                    ), "expected return to origin, got {:?}", outcome);
                    prop_assert_eq!(stored.location_id, Some(origin));
                }
                _ => {
                    prop_assert_eq!(outcome, ReturnOutcome::NoOp);
                    prop_assert_eq!(stored.location_id, previous);
                }
            }
            prop_assert_eq!(coordinator.return_to_origin(&avatar).await.expect("again"), ReturnOutcome::NoOp);
            Ok(())
        })?;
    }
}
