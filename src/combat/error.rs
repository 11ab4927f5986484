//! Errors raised by the fight core
//!
//! Every one of these is recoverable: the operation that raised it left
//! the fight exactly as it found it.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombatError {
    #[error("a fight is already in progress here")]
    AlreadyInCombat,

    #[error("a fight needs at least two able fighters, found {found}")]
    EmptyRoster { found: usize },

    #[error("{0} is not in a fight")]
    NotInCombat(String),

    #[error("there is no fight here")]
    NoFightHere,

    #[error("it is not {0}'s turn")]
    NotYourTurn(String),

    #[error("{0} is still carrying out an action")]
    ActionInProgress(String),

    #[error("{0} has been defeated")]
    Defeated(String),

    #[error("combat has already ended")]
    CombatEnded,
}

pub type Result<T> = std::result::Result<T, CombatError>;
