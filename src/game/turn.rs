//! Turn order for combat
//!
//! Handles initiative sorting, the cursor of whose turn it is, and
//! fighters joining mid-fight.

use std::collections::HashSet;

use hecs::Entity;

use crate::combat::{CombatError, Result};
use crate::ecs::ParticipantStore;
use super::initiative::Initiative;

/// Fewest able fighters a fight can start with
pub const MIN_FIGHTERS: usize = 2;

/// Ordered roster of fighters plus a cursor. Never empty.
#[derive(Debug, Clone)]
pub struct TurnOrder {
    /// Entities in turn order (sorted by initiative)
    turn_order: Vec<Entity>,
    /// Index of current entity's turn
    current_index: usize,
    /// Current round number
    round: u32,
}

impl TurnOrder {
    /// Roll initiative for every candidate with health and sort them.
    ///
    /// Duplicates are dropped. Equal rolls keep the order candidates were
    /// supplied in.
    pub fn initialize(
        candidates: &[Entity],
        store: &dyn ParticipantStore,
        initiative: &dyn Initiative,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let eligible: Vec<Entity> = candidates
            .iter()
            .copied()
            .filter(|e| seen.insert(*e))
            .filter(|&e| store.is_alive(e))
            .collect();

        if eligible.len() < MIN_FIGHTERS {
            return Err(CombatError::EmptyRoster { found: eligible.len() });
        }

        let ranked = eligible
            .into_iter()
            .map(|e| (e, initiative.roll(e)))
            .collect();
        Ok(Self::from_ranked(ranked))
    }

    /// Sort already-scored combatants (higher = earlier in turn order)
    fn from_ranked(mut combatants: Vec<(Entity, i32)>) -> Self {
        // sort_by is stable, so ties keep supply order
        combatants.sort_by(|a, b| b.1.cmp(&a.1));
        Self {
            turn_order: combatants.into_iter().map(|(e, _)| e).collect(),
            current_index: 0,
            round: 1,
        }
    }

    /// The entity whose turn it is
    pub fn current(&self) -> Entity {
        self.turn_order[self.current_index]
    }

    /// Move the cursor to the next fighter and return them
    pub fn advance(&mut self) -> Entity {
        self.current_index += 1;
        if self.current_index >= self.turn_order.len() {
            self.current_index = 0;
            self.round += 1;
        }
        self.current()
    }

    /// Queue a newcomer to act straight after the fighter whose turn it is.
    /// The cursor keeps pointing at the current fighter.
    pub fn insert_after_current(&mut self, entity: Entity) {
        self.turn_order.insert(self.current_index + 1, entity);
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.turn_order.contains(&entity)
    }

    /// Index of the current fighter
    pub fn cursor(&self) -> usize {
        self.current_index
    }

    /// Current round number
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn len(&self) -> usize {
        self.turn_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turn_order.is_empty()
    }

    /// Fighters in turn order
    pub fn combatants(&self) -> &[Entity] {
        &self.turn_order
    }
}
