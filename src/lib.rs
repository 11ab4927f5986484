//! Turnbattle - turn-based combat for rooms full of characters
//!
//! Fights are scheduled per venue: everyone able to fight takes turns in
//! initiative order, each turn has an action budget and a countdown, and
//! a fight ends when one fighter is left standing or everyone disengages.

pub mod combat;
pub mod commands;
pub mod data;
pub mod ecs;
pub mod game;
pub mod items;

// Re-export commonly used types
pub use combat::CombatError;
pub use commands::{Command, CommandError};
pub use data::CombatConfig;
pub use game::{CombatRegistry, TurnScheduler};
