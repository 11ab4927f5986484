//! Entity Component System module
//!
//! The participant store: characters, venues and items live in a
//! `hecs::World`. The fight core only sees it through [`ParticipantStore`].

pub mod components;
pub mod store;

pub use components::*;
pub use store::{ParticipantStore, spawn_character, spawn_venue, name_of, characters_at};
