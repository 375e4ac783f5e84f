//! # Dungeon Commands
//!
//! The chat-facing command surface of the dungeon engine.
//!
//! ```text
//!  "!move Old Mill"
//!        │
//!        ▼
//!  CommandRegistry ──► MoveCommand ──► MovementCoordinator ──► AvatarStore
//!        │                                   │
//!        │                                   └──► NotificationSink, EventBus
//!        ▼
//!  CommandOutcome / CommandError  ──►  reply text
//! ```
//!
//! ## Modules
//!
//! - `registry` — the [`Command`] capability trait and its dispatch table
//! - `commands` — `attack`, `move` and `respawn`
//! - `context` — who invoked a command, where, and what it produced
//! - `engine` — wires stores, locks, resolvers and commands together
//! - `telemetry` — `tracing` subscriber setup

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod context;
pub mod engine;
pub mod error;
pub mod registry;
pub mod telemetry;

pub use context::{CommandContext, CommandOutcome};
pub use engine::{Collaborators, DungeonEngine};
pub use error::CommandError;
pub use registry::{Command, CommandRegistry};
