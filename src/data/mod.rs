//! Data loading and configuration
//!
//! Combat settings and item templates come from external RON files,
//! falling back to hardcoded defaults.

pub mod config;
pub mod items;
pub mod loader;

pub use config::{CombatConfig, ConfigError};
pub use items::{default_item_templates, ItemTemplate, ItemTemplates};
pub use loader::DataManager;
