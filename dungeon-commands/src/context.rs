//! Invocation context and command results.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use dungeon_core::combat::{AttackOutcome, AttackReport};
use dungeon_core::movement::MoveOutcome;
use dungeon_core::{Avatar, AvatarId, GuildScope};

/// Who issued a command and from where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// The participant (and avatar) issuing the command.
    pub invoker: AvatarId,
    /// How the invoker is shown in replies.
    pub invoker_name: String,
    /// Guild the message was posted in; `None` for direct messages.
    pub guild: Option<GuildScope>,
    /// Participants mentioned in the message.
    pub mentions: HashSet<AvatarId>,
}

impl CommandContext {
    /// Context for a message posted in `guild` with no mentions.
    #[must_use]
    pub fn new(invoker: AvatarId, invoker_name: impl Into<String>, guild: Option<GuildScope>) -> Self {
        Self {
            invoker,
            invoker_name: invoker_name.into(),
            guild,
            mentions: HashSet::new(),
        }
    }

    /// Add mentioned participants.
    #[must_use]
    pub fn with_mentions(mut self, mentions: impl IntoIterator<Item = AvatarId>) -> Self {
        self.mentions.extend(mentions);
        self
    }

    /// Whether the invoker's own avatar was mentioned, which makes a move a
    /// pull rather than a deliberate one.
    #[must_use]
    pub fn mentions_invoker(&self) -> bool {
        self.mentions.contains(&self.invoker)
    }
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// An attack landed.
    Attack {
        /// Display name of the attacker.
        attacker: String,
        /// Target and result.
        report: AttackReport,
    },
    /// The invoker moved.
    Move {
        /// Display name of the mover.
        mover: String,
        /// Destination as the invoker typed it.
        destination: String,
        /// Persisted result.
        outcome: MoveOutcome,
    },
    /// The invoker's avatar was restored to full life.
    Respawned(Avatar),
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attack { attacker, report } => {
                let target = &report.target_name;
                match report.outcome {
                    AttackOutcome::Hit { damage, .. } => {
                        write!(f, "{attacker} attacks {target} for {damage} damage!")
                    }
                    AttackOutcome::LifeLost {
                        damage,
                        lives_remaining,
                    } => write!(
                        f,
                        "{attacker} attacks {target} for {damage} damage! {target} loses a life! Remaining lives: {lives_remaining}"
                    ),
                    AttackOutcome::PermanentDeath { .. } => write!(
                        f,
                        "{attacker} has dealt the final blow! {target} has fallen permanently!"
                    ),
                }
            }
            Self::Move {
                mover,
                outcome: MoveOutcome::Moved { location_name, .. },
                ..
            } => write!(f, "{mover} moved to {location_name}!"),
            Self::Respawned(avatar) => write!(
                f,
                "{} rises again with {} lives and {} hp.",
                avatar.name, avatar.lives, avatar.hp
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon_core::LocationId;

    #[test]
    fn mention_of_invoker_is_detected() {
        let me = AvatarId::new("me");
        let ctx = CommandContext::new(me.clone(), "Me", None)
            .with_mentions([AvatarId::new("other")]);
        assert!(!ctx.mentions_invoker());

        let ctx = ctx.with_mentions([me]);
        assert!(ctx.mentions_invoker());
    }

    #[test]
    fn attack_replies_read_naturally() {
        let outcome = CommandOutcome::Attack {
            attacker: "Ada".into(),
            report: AttackReport {
                target: AvatarId::new("b"),
                target_name: "Bob".into(),
                outcome: AttackOutcome::LifeLost {
                    damage: 7,
                    lives_remaining: 2,
                },
            },
        };
        assert_eq!(
            outcome.to_string(),
            "Ada attacks Bob for 7 damage! Bob loses a life! Remaining lives: 2"
        );
    }

    #[test]
    fn move_reply_names_the_resolved_location() {
        let outcome = CommandOutcome::Move {
            mover: "Una".into(),
            destination: "old mill".into(),
            outcome: MoveOutcome::Moved {
                new_location_id: LocationId::new("g/old-mill"),
                location_name: "Old Mill".into(),
            },
        };
        assert_eq!(outcome.to_string(), "Una moved to Old Mill!");
    }
}
