//! Attack resolution
//!
//! The dice behind an attack: roll to hit against a flat defense, roll
//! damage, apply it, and announce any defeat.

use hecs::{Entity, World};
use parking_lot::RwLock;
use rand::Rng;

use crate::ecs::{name_of, Health, Location};
use crate::game::{MessageCategory, Messenger};

/// Flat defense every attack roll is compared against
const DEFENSE_VALUE: i32 = 50;

/// Values an attack should use instead of rolling
#[derive(Debug, Clone, Copy, Default)]
pub struct AttackOverrides {
    pub attack_value: Option<i32>,
    pub damage_value: Option<i32>,
}

/// What happened when an attack resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    Miss,
    Hit {
        damage: i32,
        /// The defender dropped to 0 health
        defeated: bool,
    },
}

/// Attack roll, compared against a defense value
pub fn roll_attack(rng: &mut impl Rng) -> i32 {
    rng.gen_range(1..=100)
}

/// Defense an attack roll must equal or exceed to hit
pub fn defense_value() -> i32 {
    DEFENSE_VALUE
}

/// Damage dealt by a successful hit
pub fn roll_damage(rng: &mut impl Rng) -> i32 {
    rng.gen_range(15..=25)
}

/// Reduce health by `damage`, to a minimum of 0
pub fn apply_damage(health: &mut Health, damage: i32) -> i32 {
    health.take_damage(damage)
}

/// Announce a defeated fighter to the venue
pub fn at_defeat(messenger: &dyn Messenger, venue: Entity, defeated_name: &str) {
    messenger.broadcast(
        venue,
        &format!("{} has been defeated!", defeated_name),
        MessageCategory::Combat,
    );
}

/// Resolve one attack and announce the result at the attacker's venue
pub fn resolve_attack(
    world: &RwLock<World>,
    messenger: &dyn Messenger,
    attacker: Entity,
    defender: Entity,
    overrides: AttackOverrides,
    rng: &mut impl Rng,
) -> AttackOutcome {
    let attack_value = overrides.attack_value.unwrap_or_else(|| roll_attack(rng));
    let (venue, attacker_name, defender_name) = {
        let world = world.read();
        let venue = world.get::<&Location>(attacker).ok().map(|l| l.0);
        (venue, name_of(&world, attacker), name_of(&world, defender))
    };
    let say = |text: String| {
        if let Some(venue) = venue {
            messenger.broadcast(venue, &text, MessageCategory::Combat);
        }
    };

    if attack_value < defense_value() {
        say(format!("{}'s attack misses {}!", attacker_name, defender_name));
        return AttackOutcome::Miss;
    }

    let damage = overrides.damage_value.unwrap_or_else(|| roll_damage(rng));
    say(format!("{} hits {} for {} damage!", attacker_name, defender_name, damage));

    let defeated = world
        .read()
        .get::<&mut Health>(defender)
        .map(|mut health| {
            apply_damage(&mut health, damage);
            health.is_dead()
        })
        .unwrap_or(false);

    if defeated {
        log::info!("{} defeated by {}", defender_name, attacker_name);
        if let Some(venue) = venue {
            at_defeat(messenger, venue, &defender_name);
        }
    }

    AttackOutcome::Hit { damage, defeated }
}
