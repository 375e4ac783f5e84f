//! # Dungeon Core Library
//!
//! Platform-agnostic avatar engine for chat-hosted dungeons.
//!
//! Every participant in a shared chat space controls an [`Avatar`] that can
//! fight other avatars and travel between named locations:
//!
//! - **Combat** — damage, knockout, life loss and permanent death
//!   ([`combat::CombatResolver`])
//! - **Movement** — deliberate and mention-triggered ("pulled") relocation,
//!   with reversal of pulled moves ([`movement::MovementCoordinator`])
//! - **Storage** — durable avatar records with per-record atomicity
//!   ([`store::AvatarStore`])
//!
//! ## Concurrency Contract
//!
//! Commands arrive concurrently from independent actors. Every
//! read-modify-write on an avatar runs under that avatar's lock
//! ([`locks::AvatarLocks`]); different avatars never contend. Notifications
//! and events are best-effort and never fail or roll back an authoritative
//! write.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod collaborators;
pub mod combat;
pub mod config;
pub mod error;
pub mod events;
pub mod local;
pub mod locks;
pub mod movement;
pub mod store;
pub mod types;

pub use config::DungeonConfig;
pub use error::{DungeonError, ErrorKind};
pub use types::*;
