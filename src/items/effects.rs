//! Item functions
//!
//! What using an item actually does, keyed by the item's function name,
//! plus the bookkeeping of spending a use.

use hecs::{Entity, World};
use parking_lot::RwLock;
use rand::Rng;
use thiserror::Error;

use crate::combat::{resolve_attack, roll_attack, AttackOverrides};
use crate::data::ItemTemplates;
use crate::ecs::{name_of, Carried, Health, Location};
use crate::game::{CombatRegistry, MessageCategory, Messenger};
use super::item::{Consumable, Item, ItemArgs, UseSpent};

const DEFAULT_HEALING: (i32, i32) = (20, 40);
const DEFAULT_DAMAGE: (i32, i32) = (20, 40);

/// Why an item couldn't be used. The text is shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("'{0}' is not a usable item.")]
    NotUsable(String),

    #[error("'{0}' has no uses remaining.")]
    NoUsesLeft(String),

    #[error("ERROR: {0} not defined in item functions")]
    UndefinedFunction(String),

    #[error("You can't use {0} on that.")]
    InvalidTarget(String),

    #[error("{0} is already at full health.")]
    AlreadyFullHealth(String),

    #[error("You can only use that in combat.")]
    CombatOnly,

    #[error("You have to specify a target to use {0}! (use <item> = <target>)")]
    NeedsTarget(String),

    #[error("You can't attack yourself!")]
    SelfTarget,
}

/// Known item functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFunc {
    Heal,
    Attack,
}

impl ItemFunc {
    /// Match a function key to a function
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "heal" => Some(ItemFunc::Heal),
            "attack" => Some(ItemFunc::Attack),
            _ => None,
        }
    }
}

/// What an item function may touch
pub struct ItemContext<'a> {
    pub world: &'a RwLock<World>,
    pub messenger: &'a dyn Messenger,
    pub registry: &'a CombatRegistry,
    pub templates: &'a ItemTemplates,
}

impl ItemContext<'_> {
    fn say(&self, user: Entity, text: &str, category: MessageCategory) {
        let venue = self.world.read().get::<&Location>(user).map(|l| l.0).ok();
        match venue {
            Some(venue) => self.messenger.broadcast(venue, text, category),
            None => self.messenger.notify(user, text, category),
        }
    }

    fn name(&self, who: Entity) -> String {
        name_of(&self.world.read(), who)
    }
}

/// Check, run, and spend a use of `item`. Nothing is spent if the item
/// function refuses.
pub fn use_item(
    ctx: &ItemContext<'_>,
    item: Entity,
    user: Entity,
    target: Option<Entity>,
    rng: &mut impl Rng,
) -> Result<UseSpent, ItemError> {
    let item_name = ctx.name(item);
    let component = ctx
        .world
        .read()
        .get::<&Item>(item)
        .map(|i| (*i).clone())
        .map_err(|_| ItemError::NotUsable(item_name.clone()))?;

    let key = component
        .func
        .as_deref()
        .ok_or_else(|| ItemError::NotUsable(item_name.clone()))?;
    if component.is_spent() {
        return Err(ItemError::NoUsesLeft(item_name));
    }
    let func = ItemFunc::from_key(key).ok_or_else(|| {
        log::warn!("Item {} names unknown function {:?}", item_name, key);
        ItemError::UndefinedFunction(key.to_string())
    })?;

    match func {
        ItemFunc::Heal => heal(ctx, &item_name, user, target, component.args, rng)?,
        ItemFunc::Attack => attack(ctx, &item_name, user, target, component.args, rng)?,
    }

    Ok(spend_item_use(ctx, item, user))
}

/// Restore a random amount of health to the target (the user by default)
pub fn heal(
    ctx: &ItemContext<'_>,
    item_name: &str,
    user: Entity,
    target: Option<Entity>,
    args: ItemArgs,
    rng: &mut impl Rng,
) -> Result<(), ItemError> {
    let target = target.unwrap_or(user);
    let health = ctx
        .world
        .read()
        .get::<&Health>(target)
        .map(|h| *h)
        .map_err(|_| ItemError::InvalidTarget(item_name.to_string()))?;
    if health.is_full() {
        return Err(ItemError::AlreadyFullHealth(ctx.name(target)));
    }

    let (lo, hi) = args.healing_range.unwrap_or(DEFAULT_HEALING);
    let roll = rng.gen_range(lo.min(hi)..=hi.max(lo));
    let healed = ctx
        .world
        .read()
        .get::<&mut Health>(target)
        .map(|mut health| health.heal(roll))
        .unwrap_or(0);

    ctx.say(
        user,
        &format!(
            "{} uses {}! {} regains {} HP!",
            ctx.name(user),
            item_name,
            ctx.name(target),
            healed
        ),
        MessageCategory::Item,
    );
    Ok(())
}

/// Throw the item at someone: an attack roll with the item's accuracy
pub fn attack(
    ctx: &ItemContext<'_>,
    item_name: &str,
    user: Entity,
    target: Option<Entity>,
    args: ItemArgs,
    rng: &mut impl Rng,
) -> Result<(), ItemError> {
    if !ctx.registry.is_in_combat(user) {
        return Err(ItemError::CombatOnly);
    }
    let target = target.ok_or_else(|| ItemError::NeedsTarget(item_name.to_string()))?;
    if target == user {
        return Err(ItemError::SelfTarget);
    }
    let alive = ctx
        .world
        .read()
        .get::<&Health>(target)
        .map(|h| !h.is_dead())
        .unwrap_or(false);
    if !alive {
        return Err(ItemError::InvalidTarget(item_name.to_string()));
    }

    let (lo, hi) = args.damage_range.unwrap_or(DEFAULT_DAMAGE);
    let overrides = AttackOverrides {
        attack_value: Some(roll_attack(rng) + args.accuracy.unwrap_or(0)),
        damage_value: Some(rng.gen_range(lo.min(hi)..=hi.max(lo))),
    };

    ctx.say(
        user,
        &format!("{} attacks {} with {}!", ctx.name(user), ctx.name(target), item_name),
        MessageCategory::Item,
    );
    resolve_attack(ctx.world, ctx.messenger, user, target, overrides, rng);
    Ok(())
}

/// Spend one use of a limited item, consuming it (or leaving residue) when
/// the last one goes
pub fn spend_item_use(ctx: &ItemContext<'_>, item: Entity, user: Entity) -> UseSpent {
    let raw_name = ctx.name(item);
    let item_name = capitalize(&raw_name);

    let (remaining, consumable, owner) = {
        let world = ctx.world.read();
        let owner = world.get::<&Carried>(item).map(|c| c.0).unwrap_or(user);
        let spent = match world.get::<&mut Item>(item) {
            Ok(mut component) => match component.uses {
                Some(uses) => {
                    let left = uses.saturating_sub(1);
                    component.uses = Some(left);
                    Some((left, component.consumable.clone()))
                }
                None => None,
            },
            Err(_) => None,
        };
        match spent {
            Some((left, consumable)) => (left, consumable, owner),
            None => return UseSpent::Unlimited,
        }
    };

    if remaining > 0 {
        ctx.messenger.notify(
            user,
            &format!("{} has {} uses remaining.", item_name, remaining),
            MessageCategory::Item,
        );
        return UseSpent::Remaining(remaining);
    }

    match consumable {
        Consumable::Keep => {
            ctx.messenger.notify(
                user,
                &format!("{} has no uses remaining.", item_name),
                MessageCategory::Item,
            );
            UseSpent::Exhausted
        }
        Consumable::Destroy => {
            let _ = ctx.world.write().despawn(item);
            ctx.messenger.notify(
                user,
                &format!("{} has been consumed.", item_name),
                MessageCategory::Item,
            );
            UseSpent::Consumed
        }
        Consumable::Residue(key) => {
            let residue = {
                let mut world = ctx.world.write();
                let _ = world.despawn(item);
                ctx.templates.spawn(&mut world, &key, owner)
            };
            match residue {
                Some(residue) => {
                    ctx.messenger.notify(
                        user,
                        &format!(
                            "After using {}, you are left with {}.",
                            raw_name,
                            ctx.name(residue)
                        ),
                        MessageCategory::Item,
                    );
                    UseSpent::Replaced(residue)
                }
                None => {
                    log::warn!("Residue template {:?} not found, {} just vanishes", key, item_name);
                    ctx.messenger.notify(
                        user,
                        &format!("{} has been consumed.", item_name),
                        MessageCategory::Item,
                    );
                    UseSpent::Consumed
                }
            }
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
