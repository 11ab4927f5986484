//! RON data loader
//!
//! Loads combat settings and item templates from a data directory, with
//! fallback to the built-in defaults.

use std::fs;
use std::path::Path;

use super::config::{CombatConfig, CONFIG_FILE};
use super::items::{default_item_templates, ItemTemplates};

/// Item template file name inside the data directory
pub const ITEMS_FILE: &str = "items.ron";

/// Everything loaded from disk
#[derive(Debug, Clone, Default)]
pub struct DataManager {
    pub combat: CombatConfig,
    pub items: ItemTemplates,
}

impl DataManager {
    /// Load from `base_path`, using defaults for anything missing or broken
    pub fn load_from(base_path: &Path) -> Self {
        Self {
            combat: CombatConfig::load_or_default(&base_path.join(CONFIG_FILE)),
            items: Self::load_items(base_path),
        }
    }

    /// Load item templates from RON file
    fn load_items(base_path: &Path) -> ItemTemplates {
        let path = base_path.join(ITEMS_FILE);
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match ron::from_str::<ItemTemplates>(&content) {
                    Ok(templates) => {
                        log::info!("Loaded {} item templates from {:?}", templates.templates.len(), path);
                        return templates;
                    }
                    Err(e) => log::warn!("Failed to parse {:?}: {}", path, e),
                },
                Err(e) => log::warn!("Failed to read {:?}: {}", path, e),
            }
        }
        default_item_templates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Consumable;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("turnbattle-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_dir_uses_defaults() {
        let data = DataManager::load_from(Path::new("no/such/data/dir"));
        assert_eq!(data.combat, CombatConfig::default());
        assert_eq!(data.items, default_item_templates());
    }

    #[test]
    fn test_loads_files() {
        let dir = scratch_dir("load");
        fs::write(dir.join(CONFIG_FILE), "(turn_timeout: 45)").unwrap();
        fs::write(
            dir.join(ITEMS_FILE),
            r#"(templates: [(key: "ROCK", name: "a rock", consumable: Destroy)])"#,
        )
        .unwrap();

        let data = DataManager::load_from(&dir);
        assert_eq!(data.combat.turn_timeout, 45);
        let rock = data.items.get("ROCK").unwrap();
        assert_eq!(rock.consumable, Consumable::Destroy);
        assert!(rock.func.is_none());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_broken_items_fall_back() {
        let dir = scratch_dir("broken");
        fs::write(dir.join(ITEMS_FILE), "this is not ron").unwrap();

        let data = DataManager::load_from(&dir);
        assert_eq!(data.items, default_item_templates());

        fs::remove_dir_all(&dir).ok();
    }
}
