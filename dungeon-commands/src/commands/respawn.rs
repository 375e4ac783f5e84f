use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use dungeon_core::locks::AvatarLocks;
use dungeon_core::store::AvatarStore;

use crate::context::{CommandContext, CommandOutcome};
use crate::error::CommandError;
use crate::registry::Command;

/// `!respawn`: restore the invoker's avatar to full hp and lives.
pub struct RespawnCommand {
    store: Arc<dyn AvatarStore>,
    locks: Arc<AvatarLocks>,
}

impl RespawnCommand {
    /// Respawn command. `locks` must be the registry shared with combat and
    /// movement.
    #[must_use]
    pub fn new(store: Arc<dyn AvatarStore>, locks: Arc<AvatarLocks>) -> Self {
        Self { store, locks }
    }
}

#[async_trait]
impl Command for RespawnCommand {
    fn name(&self) -> &'static str {
        "respawn"
    }

    fn syntax(&self) -> &'static str {
        "!respawn"
    }

    fn description(&self) -> &'static str {
        "Return from the dead with full health"
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        _args: &[&str],
    ) -> Result<CommandOutcome, CommandError> {
        let avatar = {
            let _guard = self.locks.lock(&ctx.invoker).await;
            self.store.respawn(&ctx.invoker).await?
        };
        let Some(avatar) = avatar else {
            return Err(CommandError::NotFound(format!(
                "{} has no avatar to respawn.",
                ctx.invoker_name
            )));
        };

        info!(avatar = %avatar.id, "Avatar respawned");
        Ok(CommandOutcome::Respawned(avatar))
    }
}
