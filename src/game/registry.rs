//! Combat registry
//!
//! The process-wide record of which venue hosts which fight and which
//! fighter is in which fight. At most one fight per venue.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hecs::Entity;
use parking_lot::Mutex;

use crate::combat::{CombatError, Result};
use crate::data::CombatConfig;
use crate::ecs::ParticipantStore;
use super::initiative::{Initiative, RandomInitiative};
use super::messages::Messenger;
use super::scheduler::{ActionCost, ActionLabel, TurnScheduler};
use super::time::TurnTimer;

/// Lookup relations into live fights. Fights lock their own state before
/// this, never after.
#[derive(Default)]
pub(crate) struct Directory {
    /// venue -> fight
    pub(crate) fights: HashMap<Entity, Arc<TurnScheduler>>,
    /// fighter -> venue of their fight
    pub(crate) fighters: HashMap<Entity, Entity>,
    /// venues whose fight is announcing its turn order
    pub(crate) starting: HashSet<Entity>,
}

/// Starts fights and finds them again
pub struct CombatRegistry {
    config: CombatConfig,
    store: Arc<dyn ParticipantStore>,
    messenger: Arc<dyn Messenger>,
    timer: Arc<dyn TurnTimer>,
    initiative: Arc<dyn Initiative>,
    directory: Arc<Mutex<Directory>>,
    next_id: AtomicU64,
}

impl CombatRegistry {
    pub fn new(
        config: CombatConfig,
        store: Arc<dyn ParticipantStore>,
        messenger: Arc<dyn Messenger>,
        timer: Arc<dyn TurnTimer>,
    ) -> Self {
        Self {
            config,
            store,
            messenger,
            timer,
            initiative: Arc::new(RandomInitiative),
            directory: Arc::new(Mutex::new(Directory::default())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Replace the initiative roll used for new fights
    pub fn with_initiative(mut self, initiative: impl Initiative + 'static) -> Self {
        self.initiative = Arc::new(initiative);
        self
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn messenger(&self) -> &Arc<dyn Messenger> {
        &self.messenger
    }

    /// Start a fight at `venue` among `candidates` with the registry's config
    pub fn start_combat(&self, venue: Entity, candidates: &[Entity]) -> Result<Arc<TurnScheduler>> {
        self.start_combat_with(venue, candidates, self.config)
    }

    /// Like [`start_combat`](Self::start_combat), with `opening` broadcast
    /// at the venue before the turn order. Nothing is said if the start fails.
    pub fn start_combat_announced(
        &self,
        venue: Entity,
        candidates: &[Entity],
        opening: &str,
    ) -> Result<Arc<TurnScheduler>> {
        self.start(venue, candidates, self.config, Some(opening))
    }

    /// Start a fight with its own timing and action budget.
    ///
    /// Candidates without health, or already fighting elsewhere, are left
    /// out. Fails if the venue already has a fight or fewer than two
    /// candidates remain.
    pub fn start_combat_with(
        &self,
        venue: Entity,
        candidates: &[Entity],
        config: CombatConfig,
    ) -> Result<Arc<TurnScheduler>> {
        self.start(venue, candidates, config, None)
    }

    /// The fight only becomes visible once its turn order has been
    /// announced. Until then the venue is reserved so no second fight
    /// can start there.
    fn start(
        &self,
        venue: Entity,
        candidates: &[Entity],
        config: CombatConfig,
        opening: Option<&str>,
    ) -> Result<Arc<TurnScheduler>> {
        let (fight, out) = {
            let mut directory = self.directory.lock();
            if directory.fights.contains_key(&venue) || directory.starting.contains(&venue) {
                return Err(CombatError::AlreadyInCombat);
            }

            let free: Vec<Entity> = candidates
                .iter()
                .copied()
                .filter(|c| {
                    let busy = directory.fighters.contains_key(c);
                    if busy {
                        log::warn!("{} is already fighting elsewhere", self.store.name(*c));
                    }
                    !busy
                })
                .collect();

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let (scheduler, out) = TurnScheduler::new(
                id,
                venue,
                &free,
                opening,
                config,
                Arc::clone(&self.store),
                Arc::clone(&self.messenger),
                self.initiative.as_ref(),
                Arc::downgrade(&self.directory),
            )?;

            // Not yet published, so taking its lock here can't deadlock
            for fighter in scheduler.roster() {
                directory.fighters.insert(fighter, venue);
            }
            directory.starting.insert(venue);
            (Arc::new(scheduler), out)
        };

        out.deliver(self.messenger.as_ref());
        {
            let mut directory = self.directory.lock();
            directory.starting.remove(&venue);
            directory.fights.insert(venue, Arc::clone(&fight));
        }

        log::info!(
            "Fight {} started at {} with {} fighters",
            fight.id(),
            self.store.name(venue),
            fight.roster().len()
        );

        let guard = self.timer.start(Arc::downgrade(&fight), config.tick_interval);
        fight.attach_timer(guard);
        Ok(fight)
    }

    /// Add `who` to the fight already running at `venue`
    pub fn join_fight(&self, venue: Entity, who: Entity) -> Result<Arc<TurnScheduler>> {
        let fight = self.fight_at(venue).ok_or(CombatError::NoFightHere)?;
        fight.join_fight(who)?;
        Ok(fight)
    }

    /// Spend actions for `who` in whatever fight they're in
    pub fn spend_action(&self, who: Entity, cost: ActionCost, label: Option<ActionLabel>) -> Result<()> {
        let fight = self
            .fight_of(who)
            .ok_or_else(|| CombatError::NotInCombat(self.store.name(who)))?;
        fight.spend_action(who, cost, label)
    }

    /// The fight at a venue, if any
    pub fn fight_at(&self, venue: Entity) -> Option<Arc<TurnScheduler>> {
        self.directory.lock().fights.get(&venue).cloned()
    }

    /// The fight `who` is in, if any
    pub fn fight_of(&self, who: Entity) -> Option<Arc<TurnScheduler>> {
        let directory = self.directory.lock();
        let venue = directory.fighters.get(&who)?;
        directory.fights.get(venue).cloned()
    }

    pub fn is_in_combat(&self, who: Entity) -> bool {
        self.directory.lock().fighters.contains_key(&who)
    }

    /// Whether it's `who`'s turn in their fight
    pub fn is_turn(&self, who: Entity) -> bool {
        self.fight_of(who).map(|f| f.is_turn(who)).unwrap_or(false)
    }

    /// Number of fights in progress
    pub fn active_fights(&self) -> usize {
        self.directory.lock().fights.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::fixtures::{Arena, HookedLog};
    use crate::game::Recipient;

    #[test]
    fn test_start_records_back_references() {
        let arena = Arena::new(3);
        let fight = arena.start().unwrap();

        assert_eq!(arena.registry.fight_at(arena.hall).map(|f| f.id()), Some(fight.id()));
        for &f in &arena.fighters {
            assert!(arena.registry.is_in_combat(f));
            assert_eq!(arena.registry.fight_of(f).map(|f| f.id()), Some(fight.id()));
        }
        assert_eq!(arena.timer.started(), 1);
        assert!(arena.log.contains("Turn order is: F0, F1, F2"));
        assert_eq!(
            arena.log.texts_for(Recipient::Participant(arena.fighters[0])),
            vec!["It's your turn! You have 100 HP remaining."]
        );
    }

    #[test]
    fn test_second_fight_at_venue_rejected() {
        let arena = Arena::new(2);
        let fight = arena.start().unwrap();
        let before = fight.snapshot();

        let err = arena.start().unwrap_err();
        assert_eq!(err, CombatError::AlreadyInCombat);
        assert_eq!(fight.snapshot(), before);
        assert_eq!(arena.registry.active_fights(), 1);
        assert_eq!(arena.timer.started(), 1);
    }

    #[test]
    fn test_too_few_fighters_creates_nothing() {
        let arena = Arena::new(2);
        arena.set_hp(arena.fighters[1], 0);

        let err = arena.start().unwrap_err();
        assert_eq!(err, CombatError::EmptyRoster { found: 1 });
        assert_eq!(arena.registry.active_fights(), 0);
        assert!(!arena.registry.is_in_combat(arena.fighters[0]));
        assert_eq!(arena.timer.started(), 0);
    }

    #[test]
    fn test_busy_fighters_are_left_out() {
        let arena = Arena::new(2);
        arena.start().unwrap();
        let yard = arena.spawn_venue("Yard");
        let c = arena.spawn_at("C", yard);
        let d = arena.spawn_at("D", yard);

        let candidates = [arena.fighters[0], c, d];
        let fight = arena.registry.start_combat(yard, &candidates).unwrap();
        assert_eq!(fight.roster(), vec![c, d]);
        assert_eq!(arena.registry.active_fights(), 2);
    }

    #[test]
    fn test_fights_end_independently() {
        let arena = Arena::new(2);
        let first = arena.start().unwrap();
        let yard = arena.spawn_venue("Yard");
        let c = arena.spawn_at("C", yard);
        let d = arena.spawn_at("D", yard);
        let second = arena.registry.start_combat(yard, &[c, d]).unwrap();

        let [a, b] = [arena.fighters[0], arena.fighters[1]];
        arena.registry.spend_action(a, ActionCost::All, Some(ActionLabel::Disengage)).unwrap();
        arena.registry.spend_action(b, ActionCost::All, Some(ActionLabel::Disengage)).unwrap();

        assert!(first.is_ended());
        assert!(!second.is_ended());
        assert!(arena.registry.fight_at(arena.hall).is_none());
        assert!(arena.registry.is_in_combat(c));
        assert_eq!(arena.timer.cancelled(), 1);

        // the venue is free again
        assert!(arena.start().is_ok());
    }

    #[test]
    fn test_spend_outside_combat() {
        let arena = Arena::new(2);
        let err = arena
            .registry
            .spend_action(arena.fighters[0], ActionCost::Actions(1), None)
            .unwrap_err();
        assert_eq!(err, CombatError::NotInCombat("F0".to_string()));
        assert!(!arena.registry.is_turn(arena.fighters[0]));
    }

    #[test]
    fn test_join_without_fight() {
        let arena = Arena::new(2);
        let err = arena.registry.join_fight(arena.hall, arena.fighters[0]).unwrap_err();
        assert_eq!(err, CombatError::NoFightHere);
    }

    #[test]
    fn test_is_turn_follows_rotation() {
        let arena = Arena::new(2);
        arena.start().unwrap();
        let [a, b] = [arena.fighters[0], arena.fighters[1]];

        assert!(arena.registry.is_turn(a));
        assert!(!arena.registry.is_turn(b));
        arena.registry.spend_action(a, ActionCost::Actions(1), Some(ActionLabel::Attack)).unwrap();
        assert!(arena.registry.is_turn(b));
    }

    #[test]
    fn test_fight_hidden_until_turn_order_told() {
        let arena = Arena::new(2);
        let log = Arc::new(HookedLog::new());
        let registry = Arc::new(
            CombatRegistry::new(CombatConfig::default(), arena.world.clone(), log.clone(), arena.timer.clone())
                .with_initiative(|_: Entity| 1),
        );

        let seen = Arc::new(Mutex::new(None));
        {
            let registry = Arc::downgrade(&registry);
            let seen = Arc::clone(&seen);
            let (hall, first) = (arena.hall, arena.fighters[0]);
            let fighters = arena.fighters.clone();
            log.on_deliver(move |message| {
                if !message.text.starts_with("Turn order is") {
                    return;
                }
                if let Some(registry) = registry.upgrade() {
                    *seen.lock() = Some((
                        registry.fight_at(hall).is_some(),
                        registry.spend_action(first, ActionCost::All, Some(ActionLabel::Disengage)),
                        registry.start_combat(hall, &fighters).map(|_| ()),
                    ));
                }
            });
        }

        let fight = registry.start_combat(arena.hall, &arena.fighters).unwrap();

        assert_eq!(
            seen.lock().take(),
            Some((
                false,
                Err(CombatError::NotInCombat("F0".to_string())),
                Err(CombatError::AlreadyInCombat),
            ))
        );
        assert!(fight.is_turn(arena.fighters[0]));
        assert_eq!(registry.fight_at(arena.hall).map(|f| f.id()), Some(fight.id()));
        assert_eq!(registry.active_fights(), 1);
    }

    #[test]
    fn test_announced_start_opens_with_line() {
        let arena = Arena::new(2);
        arena
            .registry
            .start_combat_announced(arena.hall, &arena.fighters, "The crowd roars.")
            .unwrap();

        let texts: Vec<String> = arena.log.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts[0], "The crowd roars.");
        assert_eq!(texts[1], "Turn order is: F0, F1");
    }
}
