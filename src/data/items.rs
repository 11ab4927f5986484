//! Item templates
//!
//! Data-driven item definitions that can be spawned into the world.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use crate::ecs::{Aliases, Carried, Name};
use crate::items::{Consumable, Item, ItemArgs};

/// Template for spawning an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTemplate {
    /// Lookup key (also used as residue reference)
    pub key: String,
    /// Display name
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub func: Option<String>,
    #[serde(default)]
    pub uses: Option<u32>,
    #[serde(default)]
    pub consumable: Consumable,
    #[serde(default)]
    pub args: ItemArgs,
}

impl ItemTemplate {
    /// Build the item component
    pub fn to_item(&self) -> Item {
        Item {
            func: self.func.clone(),
            uses: self.uses,
            consumable: self.consumable.clone(),
            args: self.args,
        }
    }

    /// Whether `word` names this item
    pub fn matches(&self, word: &str) -> bool {
        self.name.eq_ignore_ascii_case(word)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(word))
    }
}

/// Collection of item templates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTemplates {
    pub templates: Vec<ItemTemplate>,
}

impl ItemTemplates {
    /// Find a template by key
    pub fn get(&self, key: &str) -> Option<&ItemTemplate> {
        self.templates.iter().find(|t| t.key == key)
    }

    /// Spawn an item from a template, carried by `owner`
    pub fn spawn(&self, world: &mut World, key: &str, owner: Entity) -> Option<Entity> {
        let template = self.get(key)?;
        Some(world.spawn((
            Name::new(template.name.clone()),
            Aliases(template.aliases.clone()),
            template.to_item(),
            Carried(owner),
        )))
    }
}

/// Built-in items
pub fn default_item_templates() -> ItemTemplates {
    ItemTemplates {
        templates: vec![
            ItemTemplate {
                key: "MEDKIT".to_string(),
                name: "a medical kit".to_string(),
                aliases: vec!["medkit".to_string()],
                desc: "A standard medical kit. It can be used a few times to heal wounds.".to_string(),
                func: Some("heal".to_string()),
                uses: Some(3),
                consumable: Consumable::Destroy,
                args: ItemArgs { healing_range: Some((15, 25)), ..ItemArgs::default() },
            },
            ItemTemplate {
                key: "GLASS_BOTTLE".to_string(),
                name: "a glass bottle".to_string(),
                aliases: vec!["bottle".to_string()],
                desc: "An empty glass bottle.".to_string(),
                func: None,
                uses: None,
                consumable: Consumable::Keep,
                args: ItemArgs::default(),
            },
            ItemTemplate {
                key: "HEALTH_POTION".to_string(),
                name: "a health potion".to_string(),
                aliases: vec!["potion".to_string()],
                desc: "A glass bottle full of a mystical potion that heals wounds when used.".to_string(),
                func: Some("heal".to_string()),
                uses: Some(1),
                consumable: Consumable::Residue("GLASS_BOTTLE".to_string()),
                args: ItemArgs { healing_range: Some((35, 50)), ..ItemArgs::default() },
            },
            ItemTemplate {
                key: "BOMB".to_string(),
                name: "a rotund bomb".to_string(),
                aliases: vec!["bomb".to_string()],
                desc: "A large black sphere with a fuse at the end. Can be used on enemies in combat.".to_string(),
                func: Some("attack".to_string()),
                uses: Some(1),
                consumable: Consumable::Destroy,
                args: ItemArgs {
                    damage_range: Some((25, 40)),
                    accuracy: Some(25),
                    ..ItemArgs::default()
                },
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_residue_target() {
        let templates = default_item_templates();
        let potion = templates.get("HEALTH_POTION").unwrap();
        match &potion.consumable {
            Consumable::Residue(key) => assert!(templates.get(key).is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_spawn_carried_item() {
        let mut world = World::new();
        let owner = world.spawn(());
        let templates = default_item_templates();

        let bomb = templates.spawn(&mut world, "BOMB", owner).unwrap();
        assert_eq!(world.get::<&Carried>(bomb).map(|c| c.0).ok(), Some(owner));
        assert_eq!(world.get::<&Item>(bomb).map(|i| i.uses).ok(), Some(Some(1)));
        assert!(templates.spawn(&mut world, "NOPE", owner).is_none());
    }

    #[test]
    fn test_alias_matching() {
        let templates = default_item_templates();
        assert!(templates.get("MEDKIT").unwrap().matches("Medkit"));
        assert!(!templates.get("MEDKIT").unwrap().matches("bomb"));
    }
}
