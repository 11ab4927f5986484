//! ECS Components
//!
//! Components that make an entity a fighter, a venue, or something that
//! can be carried.

use hecs::Entity;
use serde::{Deserialize, Serialize};

// ============================================================================
// Identity & Naming
// ============================================================================

/// Name component for entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Other words that name an entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aliases(pub Vec<String>);

/// Marks an entity as a place where a fight can happen
#[derive(Debug, Clone, Copy, Default)]
pub struct Venue;

/// The venue an entity is standing in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location(pub Entity);

/// An entity held by another (items in a character's pack)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Carried(pub Entity);

// ============================================================================
// Combat Stats
// ============================================================================

/// Hit points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Reduce health, never below zero. Returns the damage actually taken.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let actual = amount.clamp(0, self.current.max(0));
        self.current -= actual;
        actual
    }

    /// Restore health, never above max. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let actual = amount.clamp(0, (self.max - self.current).max(0));
        self.current += actual;
        actual
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    pub fn restore(&mut self) {
        self.current = self.max;
    }
}

/// Health every new character starts with
pub const DEFAULT_MAX_HP: i32 = 100;
