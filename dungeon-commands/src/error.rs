//! Command failures.

use thiserror::Error;

use dungeon_core::ErrorKind;
use dungeon_core::error::{CombatError, MoveError, StoreError};

/// Why a command produced no outcome.
///
/// The `Display` text is suitable as a reply to the invoker.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Missing or malformed arguments; nothing was touched.
    #[error("{0}")]
    Validation(String),

    /// No command is registered under this name.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The avatar the command refers to does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The attack could not be resolved.
    #[error(transparent)]
    Combat(#[from] CombatError),

    /// The move could not be completed.
    #[error(transparent)]
    Move(#[from] MoveError),

    /// Reading or writing an avatar failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommandError {
    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::UnknownCommand(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Combat(e) => e.kind(),
            Self::Move(e) => e.kind(),
            Self::Store(e) => e.kind(),
        }
    }
}
