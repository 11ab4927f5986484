//! Item system

pub mod effects;
pub mod item;

pub use effects::{attack, heal, spend_item_use, use_item, ItemContext, ItemError, ItemFunc};
pub use item::{Consumable, Item, ItemArgs, UseSpent};
