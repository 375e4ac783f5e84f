//! Engine assembly.
//!
//! [`DungeonEngine`] owns one of everything that must be shared: the avatar
//! store, the per-avatar lock registry, the resolvers and the event bus. The
//! built-in commands are registered against those shared instances so that
//! attacks, moves and respawns on one avatar serialize.

use std::sync::Arc;

use tokio::sync::broadcast;

use dungeon_core::DungeonConfig;
use dungeon_core::clock::{Clock, SystemClock};
use dungeon_core::collaborators::{AreaDirectory, LocationResolver, Narrator, NotificationSink};
use dungeon_core::combat::CombatResolver;
use dungeon_core::events::{DungeonEvent, EventBus};
use dungeon_core::locks::AvatarLocks;
use dungeon_core::movement::MovementCoordinator;
use dungeon_core::store::{AvatarStore, SqliteAvatarStore};

use crate::commands::{AttackCommand, MoveCommand, RespawnCommand};
use crate::context::{CommandContext, CommandOutcome};
use crate::error::CommandError;
use crate::registry::CommandRegistry;

/// Host-provided services the engine depends on.
pub struct Collaborators {
    /// Finds and creates locations.
    pub resolver: Arc<dyn LocationResolver>,
    /// Finds attack targets by name.
    pub directory: Arc<dyn AreaDirectory>,
    /// Delivers departure and arrival notices.
    pub sink: Arc<dyn NotificationSink>,
    /// Writes departure and arrival text; `None` uses fixed sentences.
    pub narrator: Option<Arc<dyn Narrator>>,
    /// Time source for death and pull timestamps.
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Collaborators with the system clock and the plain narrator.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn LocationResolver>,
        directory: Arc<dyn AreaDirectory>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            resolver,
            directory,
            sink,
            narrator: None,
            clock: Arc::new(SystemClock),
        }
    }
}

/// A fully wired dungeon: store, resolvers, event bus and command table.
pub struct DungeonEngine {
    config: DungeonConfig,
    store: Arc<dyn AvatarStore>,
    locks: Arc<AvatarLocks>,
    combat: Arc<CombatResolver>,
    movement: Arc<MovementCoordinator>,
    bus: EventBus,
    registry: CommandRegistry,
}

impl std::fmt::Debug for DungeonEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DungeonEngine")
            .field("registry", &self.registry)
            .field("active_locks", &self.locks.active())
            .finish_non_exhaustive()
    }
}

impl DungeonEngine {
    /// Wire an engine over `store` with the default commands.
    #[must_use]
    pub fn new(config: DungeonConfig, store: Arc<dyn AvatarStore>, collab: Collaborators) -> Self {
        let locks = Arc::new(AvatarLocks::new());
        let bus = EventBus::with_capacity(config.events.capacity);

        let combat = Arc::new(CombatResolver::new(
            store.clone(),
            collab.directory,
            locks.clone(),
            collab.clock.clone(),
            config.combat.clone(),
        ));

        let mut movement = MovementCoordinator::new(
            store.clone(),
            locks.clone(),
            collab.resolver,
            collab.sink,
            bus.clone(),
            collab.clock,
            config.movement.clone(),
        )
        .with_default_stats(config.combat.default_stats());
        if let Some(narrator) = collab.narrator {
            movement = movement.with_narrator(narrator);
        }
        let movement = Arc::new(movement);

        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(AttackCommand::new(store.clone(), combat.clone())));
        registry.register(Arc::new(MoveCommand::new(movement.clone())));
        registry.register(Arc::new(RespawnCommand::new(store.clone(), locks.clone())));

        Self {
            config,
            store,
            locks,
            combat,
            movement,
            bus,
            registry,
        }
    }

    /// Open the SQLite store named in `config.persistence` and wire an engine
    /// over it.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: DungeonConfig, collab: Collaborators) -> dungeon_core::error::Result<Self> {
        let store = SqliteAvatarStore::open(&config.persistence.db_path, &config.persistence)?;
        Ok(Self::new(config, Arc::new(store), collab))
    }

    /// Run the command registered as `name`.
    ///
    /// # Errors
    /// See [`CommandRegistry::dispatch`].
    pub async fn dispatch(
        &self,
        name: &str,
        ctx: &CommandContext,
        args: &[&str],
    ) -> Result<CommandOutcome, CommandError> {
        self.registry.dispatch(name, ctx, args).await
    }

    /// Parse and run a chat line; `None` if it is not a command.
    pub async fn dispatch_line(
        &self,
        ctx: &CommandContext,
        line: &str,
    ) -> Option<Result<CommandOutcome, CommandError>> {
        self.registry.dispatch_line(ctx, line).await
    }

    /// Listen for engine events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DungeonEvent> {
        self.bus.subscribe()
    }

    /// The command table, for help listings or extra commands.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Mutable command table.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    /// The avatar store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn AvatarStore> {
        &self.store
    }

    /// The per-avatar lock registry shared by every command.
    #[must_use]
    pub fn locks(&self) -> &Arc<AvatarLocks> {
        &self.locks
    }

    /// The combat resolver.
    #[must_use]
    pub fn combat(&self) -> &Arc<CombatResolver> {
        &self.combat
    }

    /// The movement coordinator, for returning pulled avatars.
    #[must_use]
    pub fn movement(&self) -> &Arc<MovementCoordinator> {
        &self.movement
    }

    /// Configuration the engine was built with.
    #[must_use]
    pub fn config(&self) -> &DungeonConfig {
        &self.config
    }
}
