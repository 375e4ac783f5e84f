use std::sync::Arc;

use async_trait::async_trait;

use dungeon_core::combat::CombatResolver;
use dungeon_core::store::AvatarStore;

use crate::context::{CommandContext, CommandOutcome};
use crate::error::CommandError;
use crate::registry::Command;

/// `!attack <target>`: strike an avatar in the invoker's current area.
pub struct AttackCommand {
    store: Arc<dyn AvatarStore>,
    combat: Arc<CombatResolver>,
}

impl AttackCommand {
    /// Attack command over `combat`; `store` supplies the invoker's location.
    #[must_use]
    pub fn new(store: Arc<dyn AvatarStore>, combat: Arc<CombatResolver>) -> Self {
        Self { store, combat }
    }
}

#[async_trait]
impl Command for AttackCommand {
    fn name(&self) -> &'static str {
        "attack"
    }

    fn syntax(&self) -> &'static str {
        "!attack <target>"
    }

    fn description(&self) -> &'static str {
        "Attack another avatar"
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        args: &[&str],
    ) -> Result<CommandOutcome, CommandError> {
        let Some(target) = args.first() else {
            return Err(CommandError::Validation(
                "Attack what? Specify a target!".into(),
            ));
        };

        // An invoker the store has never seen fights from nowhere.
        let area = self
            .store
            .get(&ctx.invoker)
            .await?
            .and_then(|a| a.location_id);

        let report = self
            .combat
            .resolve_attack(&ctx.invoker, target, area.as_ref())
            .await?;

        Ok(CommandOutcome::Attack {
            attacker: ctx.invoker_name.clone(),
            report,
        })
    }
}
