//! Command rejections
//!
//! The `Display` text of each variant is what the caller gets told.

use thiserror::Error;

use crate::combat::CombatError;
use crate::items::ItemError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("You can only do that in combat. (see: help fight)")]
    NotInCombat,

    #[error("You can only do that on your turn.")]
    NotYourTurn,

    #[error("You can only use items on your turn.")]
    ItemNotYourTurn,

    #[error("You're already in a fight!")]
    AlreadyFighting,

    #[error("You can't start a fight if you've been defeated!")]
    StartWhileDefeated,

    #[error("There's nobody here to fight!")]
    NobodyToFight,

    #[error("You can't attack, you've been defeated.")]
    AttackWhileDefeated,

    #[error("You can't fight that!")]
    CannotFight,

    #[error("You can't attack yourself!")]
    AttackSelf,

    #[error("You can't rest while you're in combat.")]
    RestInCombat,

    #[error("You can't exit a room while in combat!")]
    LeaveInCombat,

    #[error("You can't move, you've been defeated!")]
    MoveWhileDefeated,

    #[error("Could not find '{0}'.")]
    NotFound(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Unknown command '{0}'. (see: help)")]
    Unknown(String),

    #[error(transparent)]
    Item(#[from] ItemError),

    #[error("{0}")]
    Combat(#[from] CombatError),
}
