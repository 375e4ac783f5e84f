//! Command capability trait and dispatch table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::context::{CommandContext, CommandOutcome};
use crate::error::CommandError;

/// Prefix that marks a chat message as a command.
pub const COMMAND_PREFIX: char = '!';

/// A named operation invokable from chat.
#[async_trait]
pub trait Command: Send + Sync {
    /// Name the command is dispatched by, lower-case.
    fn name(&self) -> &'static str;

    /// Usage line shown in help, e.g. `!attack <target>`.
    fn syntax(&self) -> &'static str;

    /// One-line description shown in help.
    fn description(&self) -> &'static str;

    /// Run the command. `args` are the whitespace-separated words after the name.
    ///
    /// # Errors
    /// Returns a [`CommandError`] whose `Display` text is fit to show the invoker.
    async fn execute(
        &self,
        ctx: &CommandContext,
        args: &[&str],
    ) -> Result<CommandOutcome, CommandError>;
}

/// Dispatch table of commands keyed by lower-cased name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

impl CommandRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `command`, returning whatever was registered under the same
    /// name before.
    pub fn register(&mut self, command: Arc<dyn Command>) -> Option<Arc<dyn Command>> {
        self.commands
            .insert(command.name().to_lowercase(), command)
    }

    /// Look up a command by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Command>> {
        self.commands.get(&name.to_lowercase())
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `(syntax, description)` for every command, sorted by name.
    #[must_use]
    pub fn help(&self) -> Vec<(&'static str, &'static str)> {
        self.names()
            .into_iter()
            .filter_map(|name| self.commands.get(name))
            .map(|c| (c.syntax(), c.description()))
            .collect()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run the command registered as `name`.
    ///
    /// # Errors
    /// [`CommandError::UnknownCommand`] if nothing is registered under `name`,
    /// otherwise whatever the command returns.
    pub async fn dispatch(
        &self,
        name: &str,
        ctx: &CommandContext,
        args: &[&str],
    ) -> Result<CommandOutcome, CommandError> {
        let command = self
            .get(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        debug!(command = command.name(), invoker = %ctx.invoker, args = args.len(), "Dispatching command");
        command.execute(ctx, args).await
    }

    /// Parse a chat line like `!move Old Mill` and dispatch it.
    ///
    /// Returns `None` if the line is not a command at all.
    pub async fn dispatch_line(
        &self,
        ctx: &CommandContext,
        line: &str,
    ) -> Option<Result<CommandOutcome, CommandError>> {
        let (name, args) = parse_line(line)?;
        Some(self.dispatch(name, ctx, &args).await)
    }
}

/// Split `!name arg arg…` into the name and its arguments.
#[must_use]
pub fn parse_line(line: &str) -> Option<(&str, Vec<&str>)> {
    let rest = line.trim_start().strip_prefix(COMMAND_PREFIX)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?;
    Some((name, words.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon_core::AvatarId;

    struct Echo;

    #[async_trait]
    impl Command for Echo {
        fn name(&self) -> &'static str {
            "Echo"
        }

        fn syntax(&self) -> &'static str {
            "!echo <words>"
        }

        fn description(&self) -> &'static str {
            "Repeat the arguments"
        }

        async fn execute(
            &self,
            _ctx: &CommandContext,
            args: &[&str],
        ) -> Result<CommandOutcome, CommandError> {
            Err(CommandError::Validation(args.join(" ")))
        }
    }

    fn ctx() -> CommandContext {
        CommandContext::new(AvatarId::new("u"), "U", None)
    }

    #[test]
    fn parse_line_splits_name_and_args() {
        assert_eq!(parse_line("!move Old  Mill"), Some(("move", vec!["Old", "Mill"])));
        assert_eq!(parse_line("  !respawn"), Some(("respawn", vec![])));
        assert_eq!(parse_line("hello there"), None);
        assert_eq!(parse_line("!"), None);
    }

    #[tokio::test]
    async fn lookup_ignores_case() {
        let mut registry = CommandRegistry::new();
        assert!(registry.register(Arc::new(Echo)).is_none());
        assert!(registry.get("ECHO").is_some());
        assert_eq!(registry.names(), vec!["echo"]);
        assert_eq!(registry.help(), vec![("!echo <words>", "Repeat the arguments")]);

        let err = registry
            .dispatch("eCHo", &ctx(), &["a", "b"])
            .await
            .expect_err("echo always errors");
        assert_eq!(err.to_string(), "a b");
    }

    #[tokio::test]
    async fn unknown_command_is_reported() {
        let registry = CommandRegistry::new();
        let err = registry
            .dispatch("dance", &ctx(), &[])
            .await
            .expect_err("unknown");
        assert!(matches!(err, CommandError::UnknownCommand(name) if name == "dance"));
        assert!(registry.dispatch_line(&ctx(), "just chatting").await.is_none());
    }
}
