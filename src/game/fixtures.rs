//! Test arena: a world, a message log, a manual timer and a registry wired
//! together, with fighters that always roll equal initiative.

use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use hecs::{Entity, World};
use parking_lot::RwLock;

use crate::combat::Result;
use crate::data::CombatConfig;
use crate::ecs::{spawn_character, spawn_venue, Health};
use super::{CombatRegistry, GameMessage, ManualTimer, MessageLog, Messenger, TurnScheduler};

type Hook = Box<dyn Fn(&GameMessage) + Send + Sync>;

/// Message log that can run something on every delivery, standing in for
/// whatever else happens while a message is on its way
pub(crate) struct HookedLog {
    log: MessageLog,
    hook: OnceLock<Hook>,
}

impl HookedLog {
    pub fn new() -> Self {
        Self { log: MessageLog::new(), hook: OnceLock::new() }
    }

    /// Run `hook` after each message is recorded. Set once.
    pub fn on_deliver(&self, hook: impl Fn(&GameMessage) + Send + Sync + 'static) {
        let _ = self.hook.set(Box::new(hook));
    }
}

impl Messenger for HookedLog {
    fn deliver(&self, message: GameMessage) {
        self.log.deliver(message.clone());
        if let Some(hook) = self.hook.get() {
            hook(&message);
        }
    }
}

impl Deref for HookedLog {
    type Target = MessageLog;

    fn deref(&self) -> &MessageLog {
        &self.log
    }
}

pub(crate) struct Arena {
    pub world: Arc<RwLock<World>>,
    pub log: Arc<HookedLog>,
    pub timer: Arc<ManualTimer>,
    pub registry: CombatRegistry,
    pub hall: Entity,
    /// F0, F1, ... in turn order
    pub fighters: Vec<Entity>,
}

impl Arena {
    pub fn new(fighters: usize) -> Self {
        Self::with_config(fighters, CombatConfig::default())
    }

    pub fn with_config(fighters: usize, config: CombatConfig) -> Self {
        let mut world = World::new();
        let hall = spawn_venue(&mut world, "Hall");
        let fighters = (0..fighters)
            .map(|i| spawn_character(&mut world, format!("F{}", i), hall))
            .collect();

        let world = Arc::new(RwLock::new(world));
        let log = Arc::new(HookedLog::new());
        let timer = Arc::new(ManualTimer::new());
        let registry = CombatRegistry::new(config, world.clone(), log.clone(), timer.clone())
            .with_initiative(|_: Entity| 1);

        Self { world, log, timer, registry, hall, fighters }
    }

    pub fn start(&self) -> Result<Arc<TurnScheduler>> {
        self.registry.start_combat(self.hall, &self.fighters)
    }

    pub fn spawn_venue(&self, name: &str) -> Entity {
        spawn_venue(&mut self.world.write(), name)
    }

    pub fn spawn_at(&self, name: &str, venue: Entity) -> Entity {
        spawn_character(&mut self.world.write(), name, venue)
    }

    pub fn spawn(&self, name: &str) -> Entity {
        self.spawn_at(name, self.hall)
    }

    pub fn set_hp(&self, who: Entity, hp: i32) {
        if let Ok(mut health) = self.world.read().get::<&mut Health>(who) {
            health.current = hp;
        }
    }

    pub fn hp(&self, who: Entity) -> i32 {
        self.world
            .read()
            .get::<&Health>(who)
            .map(|h| h.current)
            .unwrap_or(0)
    }
}
