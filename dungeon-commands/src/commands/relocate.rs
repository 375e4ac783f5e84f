use std::sync::Arc;

use async_trait::async_trait;

use dungeon_core::movement::MovementCoordinator;

use crate::context::{CommandContext, CommandOutcome};
use crate::error::CommandError;
use crate::registry::Command;

/// `!move <location>`: travel to a named location in the current guild.
///
/// An invoker without an avatar gets one named after them.
///
/// If the message mentions the invoker's own avatar the move counts as a
/// pull and can later be reversed with
/// [`MovementCoordinator::return_to_origin`].
pub struct MoveCommand {
    movement: Arc<MovementCoordinator>,
}

impl MoveCommand {
    /// Move command over `movement`.
    #[must_use]
    pub fn new(movement: Arc<MovementCoordinator>) -> Self {
        Self { movement }
    }
}

#[async_trait]
impl Command for MoveCommand {
    fn name(&self) -> &'static str {
        "move"
    }

    fn syntax(&self) -> &'static str {
        "!move <location>"
    }

    fn description(&self) -> &'static str {
        "Move to a different area"
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        args: &[&str],
    ) -> Result<CommandOutcome, CommandError> {
        let Some(guild) = &ctx.guild else {
            return Err(CommandError::Validation(
                "This command can only be used in a guild!".into(),
            ));
        };
        if args.is_empty() {
            return Err(CommandError::Validation(
                "Move where? Specify a destination!".into(),
            ));
        }

        let destination = args.join(" ");
        let outcome = self
            .movement
            .resolve_move_as(
                &ctx.invoker,
                &ctx.invoker_name,
                &destination,
                guild,
                ctx.mentions_invoker(),
            )
            .await?;

        Ok(CommandOutcome::Move {
            mover: ctx.invoker_name.clone(),
            destination,
            outcome,
        })
    }
}
