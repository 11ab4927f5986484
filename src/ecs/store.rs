//! Participant store
//!
//! Read access the fight scheduler needs into the world, plus spawning
//! helpers for characters and venues.

use hecs::{Entity, World};
use parking_lot::RwLock;

use super::components::{Health, Location, Name, Venue, DEFAULT_MAX_HP};

/// What a running fight may read about its participants.
///
/// Implementations must be quick and must not call back into the fight.
pub trait ParticipantStore: Send + Sync {
    /// Current/max health, `None` if the entity has no health (or is gone)
    fn health(&self, who: Entity) -> Option<Health>;

    /// Display name used in announcements
    fn name(&self, who: Entity) -> String;

    /// Positive health
    fn is_alive(&self, who: Entity) -> bool {
        self.health(who).map(|h| !h.is_dead()).unwrap_or(false)
    }
}

impl ParticipantStore for RwLock<World> {
    fn health(&self, who: Entity) -> Option<Health> {
        self.read().get::<&Health>(who).ok().map(|h| *h)
    }

    fn name(&self, who: Entity) -> String {
        name_of(&self.read(), who)
    }
}

/// Name of an entity, falling back to its id
pub fn name_of(world: &World, who: Entity) -> String {
    world
        .get::<&Name>(who)
        .map(|n| n.0.clone())
        .unwrap_or_else(|_| format!("{:?}", who))
}

/// Spawn a fresh character at full health in a venue
pub fn spawn_character(world: &mut World, name: impl Into<String>, venue: Entity) -> Entity {
    world.spawn((Name::new(name), Health::new(DEFAULT_MAX_HP), Location(venue)))
}

/// Spawn a venue
pub fn spawn_venue(world: &mut World, name: impl Into<String>) -> Entity {
    world.spawn((Name::new(name), Venue))
}

/// Everything with health standing in a venue, in spawn order
pub fn characters_at(world: &World, venue: Entity) -> Vec<Entity> {
    let mut found: Vec<Entity> = world
        .query::<(&Location, &Health)>()
        .iter()
        .filter(|(_, (loc, _))| loc.0 == venue)
        .map(|(e, _)| e)
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_characters_at_filters_by_venue() {
        let mut world = World::new();
        let hall = spawn_venue(&mut world, "Hall");
        let yard = spawn_venue(&mut world, "Yard");
        let a = spawn_character(&mut world, "Ada", hall);
        let _b = spawn_character(&mut world, "Bo", yard);
        let c = spawn_character(&mut world, "Cy", hall);

        assert_eq!(characters_at(&world, hall), vec![a, c]);
    }

    #[test]
    fn test_store_reads_health_and_name() {
        let mut world = World::new();
        let hall = spawn_venue(&mut world, "Hall");
        let a = spawn_character(&mut world, "Ada", hall);
        let store = RwLock::new(world);

        assert_eq!(store.name(a), "Ada");
        assert_eq!(store.health(a).map(|h| h.current), Some(DEFAULT_MAX_HP));
        assert!(store.is_alive(a));
        assert!(store.health(hall).is_none());
        assert!(!store.is_alive(hall));
    }
}
