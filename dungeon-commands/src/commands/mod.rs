//! The built-in commands.

mod attack;
mod relocate;
mod respawn;

pub use attack::AttackCommand;
pub use relocate::MoveCommand;
pub use respawn::RespawnCommand;
