//! Game module - the turn-based fight core
//!
//! [`CombatRegistry`] starts fights and tracks who is fighting where; each
//! fight is a [`TurnScheduler`] driven by a periodic [`TurnTimer`] and by
//! fighters spending actions.

mod initiative;
mod messages;
mod registry;
mod scheduler;
mod time;
mod turn;

#[cfg(test)]
pub(crate) mod fixtures;

pub use initiative::{Initiative, RandomInitiative};
pub use messages::{GameMessage, MessageCategory, MessageLog, Messenger, Recipient};
pub use registry::CombatRegistry;
pub use scheduler::{
    ActionCost, ActionLabel, CombatEnd, CombatantState, FightSnapshot, TurnScheduler,
};
pub use time::{ManualTimer, ThreadTimer, TimerGuard, TurnTimer};
pub use turn::{TurnOrder, MIN_FIGHTERS};
