//! Error types for the dungeon core library.
//!
//! Each operation family has its own error enum; all of them report an
//! [`ErrorKind`] so callers can decide how to present a failure without
//! matching every variant.

use thiserror::Error;

use crate::types::{AvatarId, LocationId};

/// Coarse classification shared by every error in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument was missing or malformed. No state touched.
    Validation,
    /// A target or destination could not be resolved. No state touched.
    NotFound,
    /// The operation is invalid for the current state. No state touched.
    IllegalState,
    /// A collaborator or the store failed on the authoritative path.
    ExternalFailure,
    /// A best-effort notification failed. Never fails a command.
    NotificationFailure,
}

/// Top-level error for configuration and I/O.
#[derive(Error, Debug)]
pub enum DungeonError {
    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of an [`AvatarStore`](crate::store::AvatarStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(String),

    /// The backend is unavailable (used by test doubles and remote stores).
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ExternalFailure
    }
}

/// Failure reported by a [`LocationResolver`](crate::collaborators::LocationResolver).
#[derive(Error, Debug)]
#[error("Location resolution failed: {0}")]
pub struct ResolveError(pub String);

/// Failure reported by a [`NotificationSink`](crate::collaborators::NotificationSink)
/// or a [`Narrator`](crate::collaborators::Narrator).
#[derive(Error, Debug)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

impl NotifyError {
    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::NotificationFailure
    }
}

/// Reasons an attack could not be resolved.
#[derive(Error, Debug)]
pub enum CombatError {
    /// Zero or several avatars matched the target name in the area.
    #[error("Target [{query}] not found in this area")]
    TargetNotFound {
        /// The name that was searched for.
        query: String,
    },

    /// The target has already suffered permanent death.
    #[error("{name} is already dead")]
    TargetAlreadyDead {
        /// The dead avatar.
        target: AvatarId,
        /// Its display name.
        name: String,
    },

    /// The area lookup itself failed.
    #[error("Area lookup failed: {0}")]
    AreaLookup(#[from] ResolveError),

    /// Reading or writing the target failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CombatError {
    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TargetNotFound { .. } => ErrorKind::NotFound,
            Self::TargetAlreadyDead { .. } => ErrorKind::IllegalState,
            Self::AreaLookup(_) => ErrorKind::ExternalFailure,
            Self::Store(e) => e.kind(),
        }
    }
}

/// Reasons a move could not be completed.
#[derive(Error, Debug)]
pub enum MoveError {
    /// The destination could not be found or created.
    #[error("Failed to find or create location [{query}]")]
    DestinationResolutionFailed {
        /// The destination that was asked for.
        query: String,
        /// Resolver failure, when the resolver errored rather than finding nothing.
        #[source]
        source: Option<ResolveError>,
    },

    /// The authoritative position write failed.
    #[error("Failed to persist position of {avatar} at {location}")]
    PositionUpdateFailed {
        /// The avatar being moved.
        avatar: AvatarId,
        /// Where it was going.
        location: LocationId,
        /// Underlying storage failure.
        #[source]
        source: StoreError,
    },

    /// Loading the avatar before the move failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MoveError {
    /// Classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DestinationResolutionFailed { source: None, .. } => ErrorKind::NotFound,
            Self::DestinationResolutionFailed { source: Some(_), .. }
            | Self::PositionUpdateFailed { .. }
            | Self::Store(_) => ErrorKind::ExternalFailure,
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, DungeonError>;
