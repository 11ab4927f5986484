//! Item definitions
//!
//! An entity counts as an item when it carries an [`Item`] component. What
//! it does when used is named by its function key.

use hecs::Entity;
use serde::{Deserialize, Serialize};

/// What happens to an item when its last use is spent
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Consumable {
    /// Stays around, just can't be used
    #[default]
    Keep,
    /// Disappears
    Destroy,
    /// Replaced by the named template (a potion leaves its bottle)
    Residue(String),
}

/// Arguments handed to the item function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemArgs {
    pub healing_range: Option<(i32, i32)>,
    pub damage_range: Option<(i32, i32)>,
    pub accuracy: Option<i32>,
}

/// Item component
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Item {
    /// Key into the item functions, `None` if the item can't be used
    pub func: Option<String>,
    /// Uses left, `None` for unlimited
    pub uses: Option<u32>,
    pub consumable: Consumable,
    pub args: ItemArgs,
}

impl Item {
    pub fn is_usable(&self) -> bool {
        self.func.is_some()
    }

    pub fn is_spent(&self) -> bool {
        self.uses == Some(0)
    }
}

/// Outcome of spending one use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseSpent {
    /// Unlimited item, nothing changed
    Unlimited,
    Remaining(u32),
    /// Out of uses but kept
    Exhausted,
    /// Out of uses and gone
    Consumed,
    /// Out of uses, replaced by this entity
    Replaced(Entity),
}
