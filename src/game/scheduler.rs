//! Fight scheduler
//!
//! One [`TurnScheduler`] per live fight. It owns the turn order, the turn
//! countdown, and every fighter's action budget and last action. Timer
//! ticks, action spends and joins are serialized on a single lock; messages
//! and timer cancellation happen after that lock is released.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use hecs::Entity;
use parking_lot::Mutex;

use crate::combat::{CombatError, Result};
use crate::data::CombatConfig;
use crate::ecs::ParticipantStore;
use super::initiative::Initiative;
use super::messages::{MessageCategory, Messenger, Recipient, GameMessage};
use super::registry::Directory;
use super::time::TimerGuard;
use super::turn::TurnOrder;

/// How many actions a spend uses up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCost {
    Actions(u32),
    /// Everything left this turn
    All,
}

/// The kind of action a fighter took last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionLabel {
    Attack,
    Pass,
    Disengage,
    Item,
}

impl ActionLabel {
    pub fn name(&self) -> &'static str {
        match self {
            ActionLabel::Attack => "attack",
            ActionLabel::Pass => "pass",
            ActionLabel::Disengage => "disengage",
            ActionLabel::Item => "item",
        }
    }
}

/// Per-fighter bookkeeping owned by the fight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CombatantState {
    pub actions_left: u32,
    pub last_action: Option<ActionLabel>,
}

/// Why a fight ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatEnd {
    /// Every fighter still standing chose to disengage
    AllDisengaged,
    /// Only this fighter has health left
    LastStanding(Entity),
    /// Nobody has health left
    NoSurvivors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    Ended(CombatEnd),
}

/// Point-in-time view of a fight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FightSnapshot {
    pub roster: Vec<Entity>,
    pub cursor: usize,
    pub round: u32,
    pub countdown: i64,
    pub warning_given: bool,
    pub outcome: Option<CombatEnd>,
}

struct FightState {
    phase: Phase,
    order: TurnOrder,
    combatants: HashMap<Entity, CombatantState>,
    /// Time units left in the current turn
    countdown: i64,
    warning_given: bool,
    /// Fighter whose claimed action is being carried out
    acting: Option<Entity>,
    timer: Option<Box<dyn TimerGuard>>,
}

impl FightState {
    fn ensure_active(&self) -> Result<()> {
        match self.phase {
            Phase::Active => Ok(()),
            Phase::Ended(_) => Err(CombatError::CombatEnded),
        }
    }
}

/// Side effects collected under the fight lock, released after it
#[derive(Default)]
pub(crate) struct Outbox {
    messages: Vec<GameMessage>,
    timer: Option<Box<dyn TimerGuard>>,
}

impl Outbox {
    fn broadcast(&mut self, venue: Entity, text: String, category: MessageCategory) {
        self.messages.push(GameMessage {
            recipient: Recipient::Venue(venue),
            text,
            category,
        });
    }

    fn notify(&mut self, who: Entity, text: String, category: MessageCategory) {
        self.messages.push(GameMessage {
            recipient: Recipient::Participant(who),
            text,
            category,
        });
    }

    pub(crate) fn deliver(self, messenger: &dyn Messenger) {
        for message in self.messages {
            messenger.deliver(message);
        }
        if let Some(timer) = self.timer {
            timer.cancel();
        }
    }
}

/// A fight in progress at one venue
pub struct TurnScheduler {
    id: u64,
    venue: Entity,
    config: CombatConfig,
    store: Arc<dyn ParticipantStore>,
    messenger: Arc<dyn Messenger>,
    directory: Weak<Mutex<Directory>>,
    state: Mutex<FightState>,
}

impl std::fmt::Debug for TurnScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnScheduler")
            .field("id", &self.id)
            .field("venue", &self.venue)
            .finish_non_exhaustive()
    }
}

impl TurnScheduler {
    /// Roll initiative and begin the first turn. The caller delivers the
    /// returned outbox, then publishes the fight in the directory.
    /// `opening` is announced ahead of the turn order.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u64,
        venue: Entity,
        candidates: &[Entity],
        opening: Option<&str>,
        config: CombatConfig,
        store: Arc<dyn ParticipantStore>,
        messenger: Arc<dyn Messenger>,
        initiative: &dyn Initiative,
        directory: Weak<Mutex<Directory>>,
    ) -> Result<(Self, Outbox)> {
        let order = TurnOrder::initialize(candidates, store.as_ref(), initiative)?;
        let combatants = order
            .combatants()
            .iter()
            .map(|&e| (e, CombatantState::default()))
            .collect();

        let scheduler = Self {
            id,
            venue,
            config,
            store,
            messenger,
            directory,
            state: Mutex::new(FightState {
                phase: Phase::Active,
                order,
                combatants,
                countdown: i64::from(config.turn_timeout),
                warning_given: false,
                acting: None,
                timer: None,
            }),
        };

        let mut out = Outbox::default();
        if let Some(opening) = opening {
            out.broadcast(venue, opening.to_string(), MessageCategory::Combat);
        }
        {
            let mut state = scheduler.state.lock();
            let names: Vec<String> = state
                .order
                .combatants()
                .iter()
                .map(|&e| scheduler.store.name(e))
                .collect();
            out.broadcast(
                venue,
                format!("Turn order is: {}", names.join(", ")),
                MessageCategory::Turn,
            );
            let first = state.order.current();
            scheduler.begin_turn(&mut state, first, &mut out);
        }
        Ok((scheduler, out))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The venue this fight is happening at
    pub fn venue(&self) -> Entity {
        self.venue
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Stimuli
    // ------------------------------------------------------------------------

    /// Advance the countdown by one tick interval. Forces a disengage when the
    /// turn runs out and warns once when it is nearly out.
    pub fn tick(&self) -> Result<()> {
        let mut out = Outbox::default();
        let result = {
            let mut state = self.state.lock();
            self.tick_locked(&mut state, &mut out)
        };
        out.deliver(self.messenger.as_ref());
        result
    }

    /// Spend actions for the fighter whose turn it is, labelling what they
    /// did. Ends the turn when they have nothing left.
    ///
    /// Turn ownership is checked here as well as by the command layer:
    /// anyone else gets `NotYourTurn` and nothing changes.
    pub fn spend_action(
        &self,
        who: Entity,
        cost: ActionCost,
        label: Option<ActionLabel>,
    ) -> Result<()> {
        let mut out = Outbox::default();
        let result = {
            let mut state = self.state.lock();
            self.spend_checked(&mut state, who, cost, label, &mut out)
        };
        out.deliver(self.messenger.as_ref());
        result
    }

    /// Claim the turn for `who`, run `effect` with the fight unlocked, then
    /// spend `cost` if it succeeded.
    ///
    /// While the effect runs the turn cannot time out and nobody else can
    /// spend; a timeout that came due in the meantime applies afterwards.
    /// If the claim fails the effect never runs.
    pub fn act<T, E>(
        &self,
        who: Entity,
        cost: ActionCost,
        label: Option<ActionLabel>,
        effect: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<CombatError>,
    {
        {
            let mut state = self.state.lock();
            self.check_turn(&state, who)?;
            state.acting = Some(who);
        }

        let result = effect();

        let mut out = Outbox::default();
        {
            let mut state = self.state.lock();
            state.acting = None;
            if state.phase == Phase::Active && state.order.current() == who {
                if result.is_ok() {
                    self.spend_locked(&mut state, who, cost, label, &mut out);
                }
                if state.phase == Phase::Active
                    && state.order.current() == who
                    && state.countdown <= 0
                {
                    self.time_out(&mut state, who, &mut out);
                }
            }
        }
        out.deliver(self.messenger.as_ref());
        result
    }

    /// Add a fighter to the fight. They act as soon as the current turn ends;
    /// the current turn and its countdown are untouched.
    pub fn join_fight(&self, who: Entity) -> Result<()> {
        let mut state = self.state.lock();
        state.ensure_active()?;

        if !self.store.is_alive(who) {
            return Err(CombatError::Defeated(self.store.name(who)));
        }
        if state.order.contains(who) {
            return Err(CombatError::AlreadyInCombat);
        }
        if let Some(directory) = self.directory.upgrade() {
            let mut directory = directory.lock();
            if directory.fighters.contains_key(&who) {
                return Err(CombatError::AlreadyInCombat);
            }
            directory.fighters.insert(who, self.venue);
        }

        state.order.insert_after_current(who);
        state.combatants.insert(who, CombatantState::default());
        log::info!(
            "{} joined the fight at {:?} ({} fighters)",
            self.store.name(who),
            self.venue,
            state.order.len()
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Whether it is `who`'s turn in a live fight
    pub fn is_turn(&self, who: Entity) -> bool {
        let state = self.state.lock();
        state.phase == Phase::Active && state.order.current() == who
    }

    /// The fighter whose turn it is
    pub fn current(&self) -> Result<Entity> {
        let state = self.state.lock();
        state.ensure_active()?;
        Ok(state.order.current())
    }

    /// Action budget and last action of a fighter
    pub fn combatant(&self, who: Entity) -> Result<CombatantState> {
        let state = self.state.lock();
        state.ensure_active()?;
        state
            .combatants
            .get(&who)
            .copied()
            .ok_or_else(|| CombatError::NotInCombat(self.store.name(who)))
    }

    /// Fighters in turn order
    pub fn roster(&self) -> Vec<Entity> {
        self.state.lock().order.combatants().to_vec()
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.state.lock().phase, Phase::Ended(_))
    }

    /// How the fight ended, once it has
    pub fn outcome(&self) -> Option<CombatEnd> {
        match self.state.lock().phase {
            Phase::Active => None,
            Phase::Ended(end) => Some(end),
        }
    }

    pub fn snapshot(&self) -> FightSnapshot {
        let state = self.state.lock();
        FightSnapshot {
            roster: state.order.combatants().to_vec(),
            cursor: state.order.cursor(),
            round: state.order.round(),
            countdown: state.countdown,
            warning_given: state.warning_given,
            outcome: match state.phase {
                Phase::Active => None,
                Phase::Ended(end) => Some(end),
            },
        }
    }

    /// Hold on to the running timer so the end transition can stop it
    pub(crate) fn attach_timer(&self, timer: Box<dyn TimerGuard>) {
        let mut state = self.state.lock();
        if state.phase == Phase::Active {
            state.timer = Some(timer);
        } else {
            drop(state);
            timer.cancel();
        }
    }

    // ------------------------------------------------------------------------
    // Internals (fight lock held)
    // ------------------------------------------------------------------------

    fn tick_locked(&self, state: &mut FightState, out: &mut Outbox) -> Result<()> {
        state.ensure_active()?;

        state.countdown -= i64::from(self.config.tick_interval.max(1));
        let current = state.order.current();

        if state.countdown <= 0 {
            if state.acting == Some(current) {
                log::debug!("Timeout of {:?} waits for their action to finish", current);
            } else {
                self.time_out(state, current, out);
            }
        } else if state.countdown <= i64::from(self.config.timeout_warning_threshold)
            && !state.warning_given
        {
            out.notify(current, "WARNING: About to time out!".to_string(), MessageCategory::Warning);
            state.warning_given = true;
        }
        Ok(())
    }

    /// Forced disengage of a fighter who ran out of time
    fn time_out(&self, state: &mut FightState, who: Entity, out: &mut Outbox) {
        log::debug!("Turn of {:?} timed out at {:?}", who, self.venue);
        out.broadcast(
            self.venue,
            format!("{}'s turn timed out!", self.store.name(who)),
            MessageCategory::Warning,
        );
        self.spend_locked(state, who, ActionCost::All, Some(ActionLabel::Disengage), out);
    }

    /// Whether `who` may act right now
    fn check_turn(&self, state: &FightState, who: Entity) -> Result<()> {
        state.ensure_active()?;
        if !state.combatants.contains_key(&who) {
            return Err(CombatError::NotInCombat(self.store.name(who)));
        }
        if state.order.current() != who {
            return Err(CombatError::NotYourTurn(self.store.name(who)));
        }
        if state.acting.is_some() {
            return Err(CombatError::ActionInProgress(self.store.name(who)));
        }
        Ok(())
    }

    fn spend_checked(
        &self,
        state: &mut FightState,
        who: Entity,
        cost: ActionCost,
        label: Option<ActionLabel>,
        out: &mut Outbox,
    ) -> Result<()> {
        self.check_turn(state, who)?;
        self.spend_locked(state, who, cost, label, out);
        Ok(())
    }

    fn spend_locked(
        &self,
        state: &mut FightState,
        who: Entity,
        cost: ActionCost,
        label: Option<ActionLabel>,
        out: &mut Outbox,
    ) {
        if let Some(combatant) = state.combatants.get_mut(&who) {
            if let Some(label) = label {
                combatant.last_action = Some(label);
            }
            combatant.actions_left = match cost {
                ActionCost::All => 0,
                ActionCost::Actions(n) => combatant.actions_left.saturating_sub(n),
            };
            log::debug!(
                "{:?} spent {:?} ({:?}), {} left",
                who,
                cost,
                label,
                combatant.actions_left
            );
        }
        self.advance_turn_check(state, who, out);
    }

    /// End `who`'s turn if they have no actions left
    fn advance_turn_check(&self, state: &mut FightState, who: Entity, out: &mut Outbox) {
        let left = state
            .combatants
            .get(&who)
            .map(|c| c.actions_left)
            .unwrap_or(0);
        if left == 0 {
            self.next_turn(state, out);
        }
    }

    fn next_turn(&self, state: &mut FightState, out: &mut Outbox) {
        if let Some(end) = self.check_end(state) {
            self.finish(state, end, out);
            return;
        }

        let previous = state.order.current();
        // Defeated fighters stay on the roster but never get a turn
        let mut next = state.order.advance();
        for _ in 1..state.order.len() {
            if self.store.is_alive(next) {
                break;
            }
            next = state.order.advance();
        }

        state.countdown = i64::from(self.config.turn_timeout);
        state.warning_given = false;
        if let Some(timer) = &state.timer {
            timer.restart();
        }
        log::debug!("Round {}: {:?} -> {:?}", state.order.round(), previous, next);
        out.broadcast(
            self.venue,
            format!(
                "{}'s turn ends - {}'s turn begins!",
                self.store.name(previous),
                self.store.name(next)
            ),
            MessageCategory::Turn,
        );
        self.begin_turn(state, next, out);
    }

    fn begin_turn(&self, state: &mut FightState, who: Entity, out: &mut Outbox) {
        if let Some(combatant) = state.combatants.get_mut(&who) {
            combatant.actions_left = self.config.actions_per_turn.max(1);
        }
        let hp = self.store.health(who).map(|h| h.current).unwrap_or(0);
        out.notify(
            who,
            format!("It's your turn! You have {} HP remaining.", hp),
            MessageCategory::Turn,
        );
    }

    fn check_end(&self, state: &FightState) -> Option<CombatEnd> {
        let standing: Vec<Entity> = state
            .order
            .combatants()
            .iter()
            .copied()
            .filter(|&e| self.store.is_alive(e))
            .collect();

        if standing.is_empty() {
            return Some(CombatEnd::NoSurvivors);
        }

        let all_disengaged = standing.iter().all(|e| {
            state
                .combatants
                .get(e)
                .and_then(|c| c.last_action)
                == Some(ActionLabel::Disengage)
        });
        if all_disengaged {
            return Some(CombatEnd::AllDisengaged);
        }

        if standing.len() == 1 {
            return Some(CombatEnd::LastStanding(standing[0]));
        }
        None
    }

    /// ACTIVE -> ENDED. Clears every fighter's bookkeeping, then the
    /// directory back-references, and hands the timer to the outbox.
    fn finish(&self, state: &mut FightState, end: CombatEnd, out: &mut Outbox) {
        state.phase = Phase::Ended(end);
        state.combatants.clear();

        if let Some(directory) = self.directory.upgrade() {
            let mut directory = directory.lock();
            for fighter in state.order.combatants() {
                if directory.fighters.get(fighter) == Some(&self.venue) {
                    directory.fighters.remove(fighter);
                }
            }
            if directory.fights.get(&self.venue).map(|f| f.id()) == Some(self.id) {
                directory.fights.remove(&self.venue);
            }
        }

        out.timer = state.timer.take();

        let text = match end {
            CombatEnd::AllDisengaged => "All fighters have disengaged! Combat is over!".to_string(),
            CombatEnd::LastStanding(survivor) => {
                format!("Only {} remains! Combat is over!", self.store.name(survivor))
            }
            CombatEnd::NoSurvivors => "No one is left standing! Combat is over!".to_string(),
        };
        log::info!("Fight at {:?} ended: {:?}", self.venue, end);
        out.broadcast(self.venue, text, MessageCategory::Combat);
    }
}
