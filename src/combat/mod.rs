//! Combat system

pub mod error;
pub mod resolution;

pub use error::{CombatError, Result};
pub use resolution::{
    apply_damage, at_defeat, defense_value, resolve_attack, roll_attack, roll_damage,
    AttackOutcome, AttackOverrides,
};
