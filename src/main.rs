//! Turnbattle - headless demo
//!
//! Three fighters in one arena, driven by a simple script, on a real
//! turn timer. Every message the fight produces is printed as it arrives.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use hecs::{Entity, World};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::Rng;

use turnbattle::commands::{find_carried, run_line, CommandContext};
use turnbattle::data::config::CONFIG_FILE;
use turnbattle::data::{CombatConfig, DataManager};
use turnbattle::ecs::{characters_at, name_of, spawn_character, spawn_venue, Health, Location};
use turnbattle::game::{CombatRegistry, GameMessage, MessageLog, Recipient, ThreadTimer};

/// How often the script checks whose turn it is
const POLL: Duration = Duration::from_millis(50);
/// Give up on the demo after this long
const MAX_RUNTIME: Duration = Duration::from_secs(600);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting Turnbattle v{}", env!("CARGO_PKG_VERSION"));

    let data_dir = Path::new("data");
    let mut data = DataManager::load_from(data_dir);
    if !data_dir.join(CONFIG_FILE).exists() {
        if let Some(path) = CombatConfig::default_path() {
            data.combat = CombatConfig::load_or_default(&path);
        }
    }
    data.combat.validate().context("invalid combat settings")?;

    let mut world = World::new();
    let arena = spawn_venue(&mut world, "The Old Arena");
    let fighters = ["Ada", "Bram", "Corin"].map(|name| spawn_character(&mut world, name, arena));
    for (fighter, item) in fighters.iter().zip(["MEDKIT", "BOMB", "HEALTH_POTION"]) {
        if data.items.spawn(&mut world, item, *fighter).is_none() {
            log::warn!("No item template {}", item);
        }
    }

    let world = Arc::new(RwLock::new(world));
    let log = Arc::new(MessageLog::new());
    let timer = Arc::new(ThreadTimer::new(Duration::from_millis(data.combat.time_unit_ms)));
    let registry = CombatRegistry::new(data.combat, world.clone(), log.clone(), timer);

    let ctx = CommandContext {
        world: &world,
        registry: &registry,
        templates: &data.items,
    };
    let mut rng = rand::thread_rng();

    let _ = run_line(&ctx, fighters[0], "fight", &mut rng);
    print_messages(&world, &log);

    let started = Instant::now();
    while registry.fight_at(arena).is_some() {
        if started.elapsed() > MAX_RUNTIME {
            log::warn!("Demo ran out of time with the fight still going");
            break;
        }
        if let Some(actor) = fighters.iter().copied().find(|&f| registry.is_turn(f)) {
            let line = choose_action(&world, actor, &mut rng);
            let _ = run_line(&ctx, actor, &line, &mut rng);
        }
        print_messages(&world, &log);
        thread::sleep(POLL);
    }
    print_messages(&world, &log);

    for fighter in fighters {
        let world = world.read();
        let hp = world.get::<&Health>(fighter).map(|h| h.current).unwrap_or(0);
        println!("{}: {} HP", name_of(&world, fighter), hp);
    }
    log::info!("Turnbattle shut down cleanly");
    Ok(())
}

/// Heal when hurt, throw whatever can be thrown, otherwise swing at someone
fn choose_action(world: &RwLock<World>, actor: Entity, rng: &mut impl Rng) -> String {
    let world = world.read();
    let hp = world.get::<&Health>(actor).map(|h| h.current).unwrap_or(0);
    let carrying = |word: &str| find_carried(&world, actor, word).is_some();

    let foes: Vec<String> = world
        .get::<&Location>(actor)
        .map(|loc| characters_at(&world, loc.0))
        .unwrap_or_default()
        .into_iter()
        .filter(|&e| e != actor)
        .filter(|&e| world.get::<&Health>(e).map(|h| !h.is_dead()).unwrap_or(false))
        .map(|e| name_of(&world, e))
        .collect();
    let Some(foe) = foes.choose(rng) else {
        return "disengage".to_string();
    };

    if hp < 40 {
        for heal in ["medkit", "potion"] {
            if carrying(heal) {
                return format!("use {}", heal);
            }
        }
    }
    if carrying("bomb") && rng.gen_bool(0.5) {
        return format!("use bomb = {}", foe);
    }
    if rng.gen_bool(0.05) {
        return "disengage".to_string();
    }
    format!("attack {}", foe)
}

fn print_messages(world: &RwLock<World>, log: &MessageLog) {
    for GameMessage { recipient, text, category } in log.drain() {
        match recipient {
            Recipient::Venue(_) => println!("[{:?}] {}", category, text),
            Recipient::Participant(who) => {
                println!("  (to {}) {}", name_of(&world.read(), who), text)
            }
        }
    }
}
