//! Movement between locations.
//!
//! A move has exactly one authoritative step: persisting the avatar's new
//! `location_id`. Everything around it is best-effort:
//!
//! ```text
//! lock avatar ─► read current location ─► resolve destination ─► load/create avatar
//!   ─► temporary-move bookkeeping ─► departure notice ─► WRITE POSITION ─► unlock
//!   ─► publish AvatarMoved ─► arrival notice
//! ```
//!
//! A departure notice may go out for a move whose write then fails; it is
//! informational and is not retracted.
//!
//! The departure notice is sent while the avatar is still locked, so a slow
//! sink delays attacks on that avatar by up to
//! `movement.notification_timeout_ms`. Keep that bound short.
//!
//! ## Temporary moves
//!
//! When a third party pulls an avatar somewhere (a mention-triggered move),
//! the coordinator remembers where the avatar was so
//! [`MovementCoordinator::return_to_origin`] can send it back. Any deliberate
//! move forgets that origin. The record lives only in this coordinator and
//! never expires on its own. It is only read or changed under the avatar's
//! lock, and a move whose position write fails leaves it as it was.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::collaborators::{LocationResolver, Narrator, NotificationSink, PlainNarrator};
use crate::config::MovementConfig;
use crate::error::{MoveError, NotifyError};
use crate::events::{AvatarMoved, DungeonEvent, EventBus};
use crate::locks::{AvatarGuard, AvatarLocks};
use crate::store::AvatarStore;
use crate::types::{Avatar, AvatarId, CombatStats, GuildScope, Location, LocationId};

/// Result of a completed move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// The avatar's position was persisted at the new location.
    Moved {
        /// Where the avatar is now.
        new_location_id: LocationId,
        /// Display name of that location.
        location_name: String,
    },
}

/// Result of [`MovementCoordinator::return_to_origin`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnOutcome {
    /// There was nothing to return from.
    NoOp,
    /// The avatar was moved back to where it was pulled from.
    Returned(MoveOutcome),
}

/// Where a pulled avatar came from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TemporaryMove {
    origin: Option<LocationId>,
    scope: GuildScope,
    captured_at: DateTime<Utc>,
}

enum Destination<'a> {
    Query(&'a str),
    Known(&'a LocationId),
}

impl Destination<'_> {
    fn describe(&self) -> String {
        match self {
            Self::Query(q) => (*q).to_string(),
            Self::Known(id) => id.to_string(),
        }
    }
}

/// Applies relocation rules and owns the temporary-move records.
pub struct MovementCoordinator {
    store: Arc<dyn AvatarStore>,
    locks: Arc<AvatarLocks>,
    resolver: Arc<dyn LocationResolver>,
    sink: Arc<dyn NotificationSink>,
    narrator: Arc<dyn Narrator>,
    bus: EventBus,
    clock: Arc<dyn Clock>,
    config: MovementConfig,
    default_stats: CombatStats,
    temporary: Mutex<HashMap<AvatarId, TemporaryMove>>,
}

impl std::fmt::Debug for MovementCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovementCoordinator")
            .field("config", &self.config)
            .field("pending_returns", &self.temporary.lock().len())
            .finish_non_exhaustive()
    }
}

impl MovementCoordinator {
    /// Build a coordinator with the [`PlainNarrator`] and default stats for
    /// avatars it has to create.
    #[must_use]
    pub fn new(
        store: Arc<dyn AvatarStore>,
        locks: Arc<AvatarLocks>,
        resolver: Arc<dyn LocationResolver>,
        sink: Arc<dyn NotificationSink>,
        bus: EventBus,
        clock: Arc<dyn Clock>,
        config: MovementConfig,
    ) -> Self {
        Self {
            store,
            locks,
            resolver,
            sink,
            narrator: Arc::new(PlainNarrator),
            bus,
            clock,
            config,
            default_stats: CombatStats::default(),
            temporary: Mutex::new(HashMap::new()),
        }
    }

    /// Use `narrator` for departure and arrival text.
    #[must_use]
    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }

    /// Stats given to avatars first seen through a move.
    #[must_use]
    pub fn with_default_stats(mut self, stats: CombatStats) -> Self {
        self.default_stats = stats;
        self
    }

    /// Move `avatar_id` to whatever `destination_query` resolves to in `scope`.
    ///
    /// `triggered_by_mention` marks the move as a pull by a third party: the
    /// avatar's previous location is remembered for
    /// [`return_to_origin`](Self::return_to_origin). A deliberate move clears
    /// any remembered origin.
    ///
    /// Returns once the new position is persisted; notification and event
    /// failures never surface here.
    ///
    /// # Errors
    /// - [`MoveError::DestinationResolutionFailed`]: nothing changed.
    /// - [`MoveError::Store`]: the avatar could not be read; nothing changed.
    /// - [`MoveError::PositionUpdateFailed`]: the position write failed.
    pub async fn resolve_move(
        &self,
        avatar_id: &AvatarId,
        destination_query: &str,
        scope: &GuildScope,
        triggered_by_mention: bool,
    ) -> Result<MoveOutcome, MoveError> {
        let guard = self.locks.lock(avatar_id).await;
        self.relocate(
            guard,
            Destination::Query(destination_query),
            scope,
            triggered_by_mention,
            None,
        )
        .await
    }

    /// Like [`resolve_move`](Self::resolve_move), but an avatar created by
    /// this move is named `display_name` instead of the configured
    /// placeholder.
    ///
    /// # Errors
    /// See [`resolve_move`](Self::resolve_move).
    pub async fn resolve_move_as(
        &self,
        avatar_id: &AvatarId,
        display_name: &str,
        destination_query: &str,
        scope: &GuildScope,
        triggered_by_mention: bool,
    ) -> Result<MoveOutcome, MoveError> {
        let guard = self.locks.lock(avatar_id).await;
        self.relocate(
            guard,
            Destination::Query(destination_query),
            scope,
            triggered_by_mention,
            Some(display_name),
        )
        .await
    }

    /// Send a pulled avatar back where it came from.
    ///
    /// Without a pending temporary move this is a no-op. Otherwise the avatar
    /// makes a deliberate move to its origin and the record is discarded even
    /// if that move fails, so a broken origin is not retried forever.
    ///
    /// Holds the avatar's lock from reading the record to persisting the move
    /// back, so a deliberate move that lands first leaves nothing to return.
    ///
    /// # Errors
    /// Propagates the error of the move back, after discarding the record.
    pub async fn return_to_origin(&self, avatar_id: &AvatarId) -> Result<ReturnOutcome, MoveError> {
        let guard = self.locks.lock(avatar_id).await;

        let Some(entry) = self.temporary.lock().remove(avatar_id) else {
            return Ok(ReturnOutcome::NoOp);
        };
        let Some(origin) = entry.origin else {
            // Pulled before it had ever been anywhere.
            return Ok(ReturnOutcome::NoOp);
        };

        let result = self
            .relocate(guard, Destination::Known(&origin), &entry.scope, false, None)
            .await;

        match &result {
            Ok(_) => info!(
                avatar = %avatar_id,
                origin = %origin,
                pulled_at = %entry.captured_at,
                "Avatar returned to origin"
            ),
            Err(e) => warn!(avatar = %avatar_id, origin = %origin, error = %e, "Return to origin failed"),
        }
        result.map(ReturnOutcome::Returned)
    }

    #[cfg(test)]
    fn has_pending_return(&self, avatar_id: &AvatarId) -> bool {
        self.temporary.lock().contains_key(avatar_id)
    }

    /// Put back the record a failed move replaced or removed.
    fn restore_temporary(&self, avatar_id: &AvatarId, displaced: Option<TemporaryMove>) {
        let mut temporary = self.temporary.lock();
        match displaced {
            Some(entry) => {
                temporary.insert(avatar_id.clone(), entry);
            }
            None => {
                temporary.remove(avatar_id);
            }
        }
    }

    /// The move itself; `guard` must be the moving avatar's lock and is
    /// released once the position is persisted.
    async fn relocate(
        &self,
        guard: AvatarGuard<'_>,
        destination: Destination<'_>,
        scope: &GuildScope,
        triggered_by_mention: bool,
        display_name: Option<&str>,
    ) -> Result<MoveOutcome, MoveError> {
        let avatar_id = guard.avatar().clone();

        let stored = self.store.get(&avatar_id).await?;
        let origin = stored.as_ref().and_then(|a| a.location_id.clone());
        let current = match &origin {
            Some(id) => self.resolver.location(id).await.unwrap_or_else(|e| {
                warn!(avatar = %avatar_id, location = %id, error = %e, "Could not resolve current location");
                None
            }),
            None => None,
        };

        let target = self.resolve_destination(&destination, scope).await?;

        let mut avatar = stored.unwrap_or_else(|| {
            debug!(avatar = %avatar_id, "Creating avatar on first move");
            let name = display_name
                .filter(|n| !n.trim().is_empty())
                .map_or_else(|| self.config.placeholder_name.clone(), str::to_string);
            Avatar::new(avatar_id.clone(), name, self.default_stats)
        });

        let displaced = {
            let mut temporary = self.temporary.lock();
            if triggered_by_mention {
                temporary.insert(
                    avatar_id.clone(),
                    TemporaryMove {
                        origin: origin.clone(),
                        scope: scope.clone(),
                        captured_at: self.clock.now(),
                    },
                )
            } else {
                temporary.remove(&avatar_id)
            }
        };

        if let Some(from) = &current {
            self.best_effort("departure", &avatar_id, self.send_departure(&avatar, from, &target))
                .await;
        }

        avatar.location_id = Some(target.id.clone());
        if let Err(source) = self.store.upsert(&avatar).await {
            self.restore_temporary(&avatar_id, displaced);
            return Err(MoveError::PositionUpdateFailed {
                avatar: avatar_id,
                location: target.id,
                source,
            });
        }
        drop(guard);

        info!(
            avatar = %avatar_id,
            from = ?origin,
            to = %target.id,
            temporary = triggered_by_mention,
            "Avatar moved"
        );

        self.bus.publish(DungeonEvent::AvatarMoved(AvatarMoved {
            avatar_id: avatar_id.clone(),
            new_location_id: target.id.clone(),
            temporary: triggered_by_mention,
        }));

        self.best_effort("arrival", &avatar_id, self.send_arrival(&avatar, &target))
            .await;

        Ok(MoveOutcome::Moved {
            new_location_id: target.id,
            location_name: target.name,
        })
    }

    async fn resolve_destination(
        &self,
        destination: &Destination<'_>,
        scope: &GuildScope,
    ) -> Result<Location, MoveError> {
        let resolved = match destination {
            Destination::Query(query) => self.resolver.find_or_create(scope, query).await,
            Destination::Known(id) => self.resolver.location(id).await,
        };
        match resolved {
            Ok(Some(location)) => Ok(location),
            Ok(None) => Err(MoveError::DestinationResolutionFailed {
                query: destination.describe(),
                source: None,
            }),
            Err(e) => Err(MoveError::DestinationResolutionFailed {
                query: destination.describe(),
                source: Some(e),
            }),
        }
    }

    async fn send_departure(
        &self,
        avatar: &Avatar,
        from: &Location,
        to: &Location,
    ) -> Result<(), NotifyError> {
        let Some(channel) = &from.channel else {
            return Ok(());
        };
        let text = self.narrator.departure(avatar, from, to).await?;
        let persona = if from.name.is_empty() {
            "Unknown Location"
        } else {
            from.name.as_str()
        };
        self.sink
            .send(channel, &text, persona, from.image_url.as_deref())
            .await
    }

    async fn send_arrival(&self, avatar: &Avatar, at: &Location) -> Result<(), NotifyError> {
        let Some(channel) = &at.channel else {
            return Ok(());
        };
        let text = self.narrator.arrival(avatar, at).await?;
        let message = format!("*Moved to <#{channel}>*\n\n{text}");
        self.sink
            .send(channel, &message, &avatar.name, avatar.image_url.as_deref())
            .await
    }

    /// Run a side effect under the notification timeout; failures are logged.
    async fn best_effort<F>(&self, what: &'static str, avatar_id: &AvatarId, effect: F)
    where
        F: Future<Output = Result<(), NotifyError>>,
    {
        match tokio::time::timeout(self.config.notification_timeout(), effect).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                avatar = %avatar_id,
                notice = what,
                error = %e,
                "Error sending notice"
            ),
            Err(_) => warn!(
                avatar = %avatar_id,
                notice = what,
                timeout_ms = self.config.notification_timeout_ms,
                "Notice timed out"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::local::{LocationCatalog, RecordingSink};
    use crate::store::InMemoryAvatarStore;
    use crate::types::ChannelRef;
    use chrono::TimeZone;

    struct Fixture {
        store: Arc<InMemoryAvatarStore>,
        sink: Arc<RecordingSink>,
        clock: Arc<ManualClock>,
        bus: EventBus,
        coordinator: MovementCoordinator,
    }

    fn guild() -> GuildScope {
        GuildScope("g".into())
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryAvatarStore::new());
        let sink = Arc::new(RecordingSink::new());
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid date");
        let clock = Arc::new(ManualClock::new(start));
        let bus = EventBus::with_capacity(16);
        let catalog = Arc::new(LocationCatalog::auto_creating());
        let coordinator = MovementCoordinator::new(
            store.clone(),
            Arc::new(AvatarLocks::new()),
            catalog,
            sink.clone(),
            bus.clone(),
            clock.clone(),
            MovementConfig::default(),
        );
        Fixture {
            store,
            sink,
            clock,
            bus,
            coordinator,
        }
    }

    fn id(s: &str) -> AvatarId {
        AvatarId::new(s)
    }

    #[tokio::test]
    async fn first_move_creates_placeholder_avatar() {
        let f = fixture();
        let outcome = f
            .coordinator
            .resolve_move(&id("u1"), "Old Mill", &guild(), false)
            .await
            .expect("move");

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                new_location_id: LocationId::new("g/old-mill"),
                location_name: "Old Mill".into(),
            }
        );
        let avatar = f.store.get(&id("u1")).await.expect("get").expect("created");
        assert_eq!(avatar.name, "mysterious traveler");
        assert_eq!(avatar.location_id, Some(LocationId::new("g/old-mill")));
    }

    #[tokio::test]
    async fn first_move_can_name_the_avatar() {
        let f = fixture();
        f.coordinator
            .resolve_move_as(&id("u1"), "Una", "Tavern", &guild(), false)
            .await
            .expect("move");
        f.coordinator
            .resolve_move_as(&id("u1"), "Someone Else", "Crypt", &guild(), false)
            .await
            .expect("move");

        let avatar = f.store.get(&id("u1")).await.expect("get").expect("created");
        assert_eq!(avatar.name, "Una");
    }

    #[tokio::test]
    async fn blank_name_falls_back_to_placeholder() {
        let f = fixture();
        f.coordinator
            .resolve_move_as(&id("u1"), "  ", "Tavern", &guild(), false)
            .await
            .expect("move");

        let avatar = f.store.get(&id("u1")).await.expect("get").expect("created");
        assert_eq!(avatar.name, "mysterious traveler");
    }

    #[tokio::test]
    async fn mention_records_previous_location() {
        let f = fixture();
        f.coordinator
            .resolve_move(&id("u1"), "Tavern", &guild(), false)
            .await
            .expect("move");
        f.coordinator
            .resolve_move(&id("u1"), "Crypt", &guild(), true)
            .await
            .expect("pull");

        let entry = f.coordinator.temporary.lock().get(&id("u1")).cloned().expect("entry");
        assert_eq!(entry.origin, Some(LocationId::new("g/tavern")));
        assert_eq!(entry.captured_at, f.clock.now());
    }

    #[tokio::test]
    async fn second_mention_overwrites_entry() {
        let f = fixture();
        f.coordinator
            .resolve_move(&id("u1"), "Tavern", &guild(), false)
            .await
            .expect("move");
        f.coordinator
            .resolve_move(&id("u1"), "Crypt", &guild(), true)
            .await
            .expect("pull 1");
        f.clock.advance(chrono::Duration::minutes(3));
        f.coordinator
            .resolve_move(&id("u1"), "Tower", &guild(), true)
            .await
            .expect("pull 2");

        let entry = f.coordinator.temporary.lock().get(&id("u1")).cloned().expect("entry");
        assert_eq!(entry.origin, Some(LocationId::new("g/crypt")));
        assert_eq!(entry.captured_at, f.clock.now());
    }

    #[tokio::test]
    async fn deliberate_move_clears_entry() {
        let f = fixture();
        f.coordinator
            .resolve_move(&id("u1"), "Crypt", &guild(), true)
            .await
            .expect("pull");
        assert!(f.coordinator.has_pending_return(&id("u1")));

        f.coordinator
            .resolve_move(&id("u1"), "Tower", &guild(), false)
            .await
            .expect("move");
        assert!(!f.coordinator.has_pending_return(&id("u1")));
    }

    #[tokio::test]
    async fn return_without_origin_is_noop_and_forgets() {
        let f = fixture();
        f.coordinator
            .resolve_move(&id("u1"), "Crypt", &guild(), true)
            .await
            .expect("pull");

        let outcome = f.coordinator.return_to_origin(&id("u1")).await.expect("return");
        assert_eq!(outcome, ReturnOutcome::NoOp);
        assert!(!f.coordinator.has_pending_return(&id("u1")));
        let avatar = f.store.get(&id("u1")).await.expect("get").expect("exists");
        assert_eq!(avatar.location_id, Some(LocationId::new("g/crypt")));
    }

    #[tokio::test]
    async fn notices_use_location_then_avatar_persona() {
        let f = fixture();
        f.coordinator
            .resolve_move(&id("u1"), "Tavern", &guild(), false)
            .await
            .expect("move");
        f.coordinator
            .resolve_move(&id("u1"), "Crypt", &guild(), false)
            .await
            .expect("move");

        let sent = f.sink.sent();
        // arrival, departure, arrival
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].channel, ChannelRef("g/tavern".into()));
        assert_eq!(sent[1].display_name, "Tavern");
        assert_eq!(sent[1].text, "mysterious traveler departs for Crypt.");
        assert_eq!(sent[2].channel, ChannelRef("g/crypt".into()));
        assert_eq!(sent[2].display_name, "mysterious traveler");
        assert!(sent[2].text.starts_with("*Moved to <#g/crypt>*\n\n"));
    }

    #[tokio::test]
    async fn failing_sink_does_not_fail_move() {
        let f = fixture();
        f.sink.set_failing(true);
        let mut rx = f.bus.subscribe();

        f.coordinator
            .resolve_move(&id("u1"), "Tavern", &guild(), true)
            .await
            .expect("move succeeds despite sink");

        let event = rx.recv().await.expect("event");
        assert_eq!(
            event,
            DungeonEvent::AvatarMoved(AvatarMoved {
                avatar_id: id("u1"),
                new_location_id: LocationId::new("g/tavern"),
                temporary: true,
            })
        );
    }

    #[tokio::test]
    async fn unknown_destination_changes_nothing() {
        let store = Arc::new(InMemoryAvatarStore::new());
        let coordinator = MovementCoordinator::new(
            store.clone(),
            Arc::new(AvatarLocks::new()),
            Arc::new(LocationCatalog::new()),
            Arc::new(RecordingSink::new()),
            EventBus::default(),
            Arc::new(crate::clock::SystemClock),
            MovementConfig::default(),
        );

        let err = coordinator
            .resolve_move(&id("u1"), "Nowhere", &guild(), true)
            .await
            .expect_err("should fail");
        assert!(matches!(err, MoveError::DestinationResolutionFailed { source: None, .. }));
        assert!(store.is_empty());
        assert!(!coordinator.has_pending_return(&id("u1")));
    }
}
