//! Initiative rolls
//!
//! Decides turn order at the start of a fight. Higher scores go first.

use hecs::Entity;
use rand::Rng;

/// Scores a fighter for turn order
pub trait Initiative: Send + Sync {
    fn roll(&self, fighter: Entity) -> i32;
}

/// Default: a uniform roll in 1..=1000 that ignores the fighter entirely
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomInitiative;

impl Initiative for RandomInitiative {
    fn roll(&self, _fighter: Entity) -> i32 {
        rand::thread_rng().gen_range(1..=1000)
    }
}

impl<F> Initiative for F
where
    F: Fn(Entity) -> i32 + Send + Sync,
{
    fn roll(&self, fighter: Entity) -> i32 {
        self(fighter)
    }
}
