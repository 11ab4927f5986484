//! Command handlers
//!
//! Every check a command makes happens before anything changes, so a
//! rejected command leaves the world and the fight as they were.

use hecs::{Entity, World};
use parking_lot::RwLock;
use rand::Rng;

use crate::combat::{resolve_attack, AttackOverrides, CombatError};
use crate::data::ItemTemplates;
use crate::ecs::{characters_at, name_of, Aliases, Carried, Health, Location, Name};
use crate::game::{ActionCost, ActionLabel, CombatRegistry, MessageCategory, Messenger};
use crate::items::{use_item, ItemContext};
use super::command::Command;
use super::error::CommandError;

const COMBAT_HELP: &str = "Available combat commands:\n\
    Attack: Attack a target, attempting to deal damage.\n\
    Pass: Pass your turn without further action.\n\
    Disengage: End your turn and attempt to end combat.\n\
    Use: Use an item you're carrying.";

const GENERAL_HELP: &str = "Commands: fight, attack, pass, disengage, rest, use, help <command>";

/// Everything a command may touch
pub struct CommandContext<'a> {
    pub world: &'a RwLock<World>,
    pub registry: &'a CombatRegistry,
    pub templates: &'a ItemTemplates,
}

impl CommandContext<'_> {
    fn messenger(&self) -> &dyn Messenger {
        self.registry.messenger().as_ref()
    }

    fn name(&self, who: Entity) -> String {
        name_of(&self.world.read(), who)
    }

    fn venue_of(&self, who: Entity) -> Option<Entity> {
        self.world.read().get::<&Location>(who).map(|l| l.0).ok()
    }

    fn is_alive(&self, who: Entity) -> bool {
        self.world
            .read()
            .get::<&Health>(who)
            .map(|h| !h.is_dead())
            .unwrap_or(false)
    }

    fn say(&self, caller: Entity, text: &str, category: MessageCategory) {
        match self.venue_of(caller) {
            Some(venue) => self.messenger().broadcast(venue, text, category),
            None => self.messenger().notify(caller, text, category),
        }
    }
}

/// Parse and run one line of input for `caller`
pub fn run_line(
    ctx: &CommandContext<'_>,
    caller: Entity,
    line: &str,
    rng: &mut impl Rng,
) -> Result<(), CommandError> {
    match Command::parse(line) {
        Ok(command) => run_command(ctx, caller, &command, rng),
        Err(e) => {
            ctx.messenger().notify(caller, &e.to_string(), MessageCategory::Warning);
            Err(e)
        }
    }
}

/// Run a command for `caller`, telling them why if it's refused
pub fn run_command(
    ctx: &CommandContext<'_>,
    caller: Entity,
    command: &Command,
    rng: &mut impl Rng,
) -> Result<(), CommandError> {
    let result = execute(ctx, caller, command, rng);
    if let Err(e) = &result {
        log::debug!("{} refused for {}: {}", command.key(), ctx.name(caller), e);
        ctx.messenger().notify(caller, &e.to_string(), MessageCategory::Warning);
    }
    result
}

fn execute(
    ctx: &CommandContext<'_>,
    caller: Entity,
    command: &Command,
    rng: &mut impl Rng,
) -> Result<(), CommandError> {
    match command {
        Command::Fight => fight(ctx, caller),
        Command::Attack { target } => attack(ctx, caller, target, rng),
        Command::Pass => end_turn(ctx, caller, ActionLabel::Pass),
        Command::Disengage => end_turn(ctx, caller, ActionLabel::Disengage),
        Command::Rest => rest(ctx, caller),
        Command::Use { item, target } => use_carried(ctx, caller, item, target.as_deref(), rng),
        Command::Help { topic } => help(ctx, caller, topic.as_deref()),
    }
}

fn fight(ctx: &CommandContext<'_>, caller: Entity) -> Result<(), CommandError> {
    if !ctx.is_alive(caller) {
        return Err(CommandError::StartWhileDefeated);
    }
    if ctx.registry.is_in_combat(caller) {
        return Err(CommandError::AlreadyFighting);
    }
    let venue = ctx.venue_of(caller).ok_or(CommandError::NobodyToFight)?;
    let present = characters_at(&ctx.world.read(), venue);
    let fighters: Vec<Entity> = present.into_iter().filter(|&e| ctx.is_alive(e)).collect();
    if fighters.len() <= 1 {
        return Err(CommandError::NobodyToFight);
    }

    let name = ctx.name(caller);
    if ctx.registry.fight_at(venue).is_some() {
        ctx.registry.join_fight(venue, caller)?;
        ctx.say(caller, &format!("{} joins the fight!", name), MessageCategory::Combat);
        return Ok(());
    }

    let opening = format!("{} starts a fight!", name);
    ctx.registry.start_combat_announced(venue, &fighters, &opening)?;
    Ok(())
}

/// Put the fight's turn refusal in the command's own words
fn turn_refusal(err: CommandError, refusal: CommandError) -> CommandError {
    match err {
        CommandError::Combat(CombatError::NotYourTurn(_)) => refusal,
        other => other,
    }
}

fn attack(
    ctx: &CommandContext<'_>,
    caller: Entity,
    target: &str,
    rng: &mut impl Rng,
) -> Result<(), CommandError> {
    let fight = ctx.registry.fight_of(caller).ok_or(CommandError::NotInCombat)?;
    if !fight.is_turn(caller) {
        return Err(CommandError::NotYourTurn);
    }
    if !ctx.is_alive(caller) {
        return Err(CommandError::AttackWhileDefeated);
    }
    let defender = find_here(&ctx.world.read(), caller, target)
        .ok_or_else(|| CommandError::NotFound(target.to_string()))?;
    if !ctx.is_alive(defender) {
        return Err(CommandError::CannotFight);
    }
    if defender == caller {
        return Err(CommandError::AttackSelf);
    }

    fight
        .act(caller, ActionCost::Actions(1), Some(ActionLabel::Attack), || {
            resolve_attack(ctx.world, ctx.messenger(), caller, defender, AttackOverrides::default(), rng);
            Ok::<_, CommandError>(())
        })
        .map_err(|e| turn_refusal(e, CommandError::NotYourTurn))
}

/// Pass or disengage: both give up whatever is left of the turn
fn end_turn(ctx: &CommandContext<'_>, caller: Entity, label: ActionLabel) -> Result<(), CommandError> {
    let fight = ctx.registry.fight_of(caller).ok_or(CommandError::NotInCombat)?;
    if !fight.is_turn(caller) {
        return Err(CommandError::NotYourTurn);
    }

    let name = ctx.name(caller);
    let text = match label {
        ActionLabel::Disengage => format!("{} disengages, ready to stop fighting.", name),
        _ => format!("{} takes no further action, passing the turn.", name),
    };
    fight
        .act(caller, ActionCost::All, Some(label), || {
            ctx.say(caller, &text, MessageCategory::Combat);
            Ok::<_, CommandError>(())
        })
        .map_err(|e| turn_refusal(e, CommandError::NotYourTurn))
}

fn rest(ctx: &CommandContext<'_>, caller: Entity) -> Result<(), CommandError> {
    if ctx.registry.is_in_combat(caller) {
        return Err(CommandError::RestInCombat);
    }
    {
        let world = ctx.world.read();
        let mut health = world
            .get::<&mut Health>(caller)
            .map_err(|_| CommandError::NotFound(name_of(&world, caller)))?;
        health.restore();
    }
    ctx.say(caller, &format!("{} rests to recover HP.", ctx.name(caller)), MessageCategory::System);
    Ok(())
}

fn use_carried(
    ctx: &CommandContext<'_>,
    caller: Entity,
    item: &str,
    target: Option<&str>,
    rng: &mut impl Rng,
) -> Result<(), CommandError> {
    let (item_entity, target_entity) = {
        let world = ctx.world.read();
        let item_entity = find_carried(&world, caller, item)
            .ok_or_else(|| CommandError::NotFound(item.to_string()))?;
        let target_entity = match target {
            Some(word) => Some(
                find_here(&world, caller, word)
                    .ok_or_else(|| CommandError::NotFound(word.to_string()))?,
            ),
            None => None,
        };
        (item_entity, target_entity)
    };

    let fight = ctx.registry.fight_of(caller);
    if let Some(fight) = &fight {
        if !fight.is_turn(caller) {
            return Err(CommandError::ItemNotYourTurn);
        }
    }

    let item_ctx = ItemContext {
        world: ctx.world,
        messenger: ctx.messenger(),
        registry: ctx.registry,
        templates: ctx.templates,
    };
    let mut apply = || {
        use_item(&item_ctx, item_entity, caller, target_entity, rng)
            .map(|_| ())
            .map_err(CommandError::from)
    };
    match fight {
        Some(fight) => fight
            .act(caller, ActionCost::Actions(1), Some(ActionLabel::Item), apply)
            .map_err(|e| turn_refusal(e, CommandError::ItemNotYourTurn)),
        None => apply(),
    }
}

fn help(ctx: &CommandContext<'_>, caller: Entity, topic: Option<&str>) -> Result<(), CommandError> {
    let text = match topic {
        None if ctx.registry.is_in_combat(caller) => COMBAT_HELP,
        None => GENERAL_HELP,
        Some(topic) => topic_help(topic).ok_or_else(|| CommandError::NotFound(topic.to_string()))?,
    };
    ctx.messenger().notify(caller, text, MessageCategory::System);
    Ok(())
}

fn topic_help(topic: &str) -> Option<&'static str> {
    let text = match topic.to_lowercase().as_str() {
        "fight" => "fight: Starts a fight with everyone in the room, or joins the one going on.",
        "attack" => "attack <target>: On your turn, try to hit someone for damage.",
        "pass" | "wait" | "hold" => "pass: End your turn early.",
        "disengage" | "spare" => "disengage: End your turn and signal you want the fight to stop.",
        "rest" => "rest: Recover to full HP. Not possible during a fight.",
        "use" => "use <item> [= <target>]: Use an item you're carrying.",
        "help" => GENERAL_HELP,
        _ => return None,
    };
    Some(text)
}

/// Refuse leaving the venue while fighting or defeated
pub fn check_can_leave(ctx: &CommandContext<'_>, caller: Entity) -> Result<(), CommandError> {
    if ctx.registry.is_in_combat(caller) {
        return Err(CommandError::LeaveInCombat);
    }
    let defeated = ctx
        .world
        .read()
        .get::<&Health>(caller)
        .map(|h| h.is_dead())
        .unwrap_or(false);
    if defeated {
        return Err(CommandError::MoveWhileDefeated);
    }
    Ok(())
}

// ============================================================================
// Lookup
// ============================================================================

fn strip_article(word: &str) -> &str {
    ["a ", "an ", "the "]
        .iter()
        .find_map(|article| word.strip_prefix(article))
        .unwrap_or(word)
}

fn names_match(name: &Name, aliases: Option<&Aliases>, word: &str) -> bool {
    let word = strip_article(word.trim());
    strip_article(&name.0).eq_ignore_ascii_case(word)
        || name.0.eq_ignore_ascii_case(word)
        || aliases.map_or(false, |a| a.0.iter().any(|alias| alias.eq_ignore_ascii_case(word)))
}

/// Something in the caller's venue named `word` ("me" and "self" are the caller)
pub fn find_here(world: &World, caller: Entity, word: &str) -> Option<Entity> {
    if word.eq_ignore_ascii_case("me") || word.eq_ignore_ascii_case("self") {
        return Some(caller);
    }
    let venue = world.get::<&Location>(caller).map(|l| l.0).ok()?;
    world
        .query::<(&Name, Option<&Aliases>, &Location)>()
        .iter()
        .filter(|(_, (name, aliases, loc))| loc.0 == venue && names_match(name, *aliases, word))
        .map(|(e, _)| e)
        .min()
}

/// Something the caller carries named `word`
pub fn find_carried(world: &World, caller: Entity, word: &str) -> Option<Entity> {
    world
        .query::<(&Name, Option<&Aliases>, &Carried)>()
        .iter()
        .filter(|(_, (name, aliases, carried))| carried.0 == caller && names_match(name, *aliases, word))
        .map(|(e, _)| e)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{default_item_templates, CombatConfig};
    use crate::game::fixtures::Arena;
    use crate::game::Recipient;
    use std::sync::atomic::{AtomicBool, Ordering};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(arena: &Arena, caller: Entity, line: &str) -> Result<(), CommandError> {
        let templates = default_item_templates();
        let ctx = CommandContext {
            world: &arena.world,
            registry: &arena.registry,
            templates: &templates,
        };
        run_line(&ctx, caller, line, &mut StdRng::seed_from_u64(11))
    }

    fn told(arena: &Arena, who: Entity, text: &str) -> bool {
        arena
            .log
            .texts_for(Recipient::Participant(who))
            .iter()
            .any(|t| t == text)
    }

    #[test]
    fn test_fight_starts_combat() {
        let arena = Arena::new(2);
        let [a, b] = [arena.fighters[0], arena.fighters[1]];

        run(&arena, a, "fight").unwrap();

        assert!(arena.registry.is_in_combat(a));
        assert!(arena.registry.is_in_combat(b));
        assert!(arena.registry.is_turn(a));
        assert!(arena.log.contains("F0 starts a fight!"));
    }

    #[test]
    fn test_start_announced_before_turn_order() {
        let arena = Arena::new(2);
        run(&arena, arena.fighters[0], "fight").unwrap();

        let venue_texts = arena.log.texts_for(Recipient::Venue(arena.hall));
        assert_eq!(venue_texts[0], "F0 starts a fight!");
        assert!(venue_texts[1].starts_with("Turn order is"));
    }

    #[test]
    fn test_failed_start_is_not_announced() {
        let arena = Arena::new(2);
        let [a, b] = [arena.fighters[0], arena.fighters[1]];
        let yard = arena.spawn_venue("Yard");
        let c = arena.spawn_at("C", yard);
        arena.registry.start_combat(yard, &[b, c]).unwrap();

        let result = run(&arena, a, "fight");

        assert!(matches!(result, Err(CommandError::Combat(CombatError::EmptyRoster { .. }))));
        assert!(!arena.log.contains("F0 starts a fight!"));
        assert!(arena.registry.fight_at(arena.hall).is_none());
    }

    #[test]
    fn test_fight_refusals() {
        let arena = Arena::new(1);
        let a = arena.fighters[0];
        assert_eq!(run(&arena, a, "fight"), Err(CommandError::NobodyToFight));
        assert!(told(&arena, a, "There's nobody here to fight!"));

        arena.set_hp(a, 0);
        assert_eq!(run(&arena, a, "fight"), Err(CommandError::StartWhileDefeated));
    }

    #[test]
    fn test_fight_joins_running_fight() {
        let arena = Arena::new(2);
        arena.start().unwrap();
        let latecomer = arena.spawn("Cy");

        run(&arena, latecomer, "fight").unwrap();

        assert!(arena.registry.is_in_combat(latecomer));
        assert!(arena.log.contains("Cy joins the fight!"));
        assert_eq!(run(&arena, latecomer, "fight"), Err(CommandError::AlreadyFighting));
    }

    #[test]
    fn test_attack_preconditions() {
        let arena = Arena::new(2);
        let [a, b] = [arena.fighters[0], arena.fighters[1]];
        assert_eq!(run(&arena, a, "attack F1"), Err(CommandError::NotInCombat));

        arena.start().unwrap();
        arena.world.write().spawn((Name::new("a statue"), Location(arena.hall)));

        assert_eq!(run(&arena, b, "attack F0"), Err(CommandError::NotYourTurn));
        assert_eq!(run(&arena, a, "attack F0"), Err(CommandError::AttackSelf));
        assert_eq!(run(&arena, a, "attack statue"), Err(CommandError::CannotFight));
        assert_eq!(
            run(&arena, a, "attack ghost"),
            Err(CommandError::NotFound("ghost".to_string()))
        );
        assert!(arena.registry.is_turn(a));
        assert_eq!(arena.hp(b), 100);
    }

    #[test]
    fn test_attack_spends_the_turn() {
        let arena = Arena::new(2);
        let [a, b] = [arena.fighters[0], arena.fighters[1]];
        arena.start().unwrap();

        run(&arena, a, "attack f1").unwrap();

        assert!(arena.registry.is_turn(b));
        assert!(arena.log.contains("F0 hits F1") || arena.log.contains("F0's attack misses F1!"));
    }

    #[test]
    fn test_timer_cannot_steal_turn_mid_attack() {
        let arena = Arena::new(2);
        let [a, b] = [arena.fighters[0], arena.fighters[1]];
        let fight = arena.start().unwrap();
        let timer = arena.timer.clone();
        let fired = AtomicBool::new(false);
        // A full turn's worth of ticks lands while the attack is announced
        arena.log.on_deliver(move |message| {
            let landed = message.text.contains(" hits ") || message.text.contains(" misses ");
            if landed && !fired.swap(true, Ordering::AcqRel) {
                for _ in 0..6 {
                    timer.fire();
                }
            }
        });

        run(&arena, a, "attack F1").unwrap();

        assert_eq!(fight.current(), Ok(b));
        assert_eq!(fight.combatant(a).unwrap().last_action, Some(ActionLabel::Attack));
        assert!(!arena.log.contains("F0's turn timed out!"));
        assert!(!told(&arena, a, "You can only do that on your turn."));
    }

    #[test]
    fn test_pass_and_disengage() {
        let arena = Arena::new(2);
        let [a, b] = [arena.fighters[0], arena.fighters[1]];
        arena.start().unwrap();

        run(&arena, a, "wait").unwrap();
        assert!(arena.log.contains("F0 takes no further action, passing the turn."));
        assert!(arena.registry.is_turn(b));

        run(&arena, b, "disengage").unwrap();
        run(&arena, a, "spare").unwrap();

        assert!(arena.log.contains("All fighters have disengaged! Combat is over!"));
        assert!(!arena.registry.is_in_combat(a));
        assert_eq!(arena.registry.active_fights(), 0);
    }

    #[test]
    fn test_rest() {
        let arena = Arena::new(2);
        let a = arena.fighters[0];
        arena.set_hp(a, 12);

        run(&arena, a, "rest").unwrap();
        assert_eq!(arena.hp(a), 100);
        assert!(arena.log.contains("F0 rests to recover HP."));

        arena.start().unwrap();
        assert_eq!(run(&arena, a, "rest"), Err(CommandError::RestInCombat));
    }

    #[test]
    fn test_use_item_in_combat_costs_an_action() {
        let config = CombatConfig { actions_per_turn: 2, ..CombatConfig::default() };
        let arena = Arena::with_config(2, config);
        let [a, b] = [arena.fighters[0], arena.fighters[1]];
        let templates = default_item_templates();
        templates.spawn(&mut arena.world.write(), "MEDKIT", b);
        arena.set_hp(b, 40);
        let fight = arena.start().unwrap();

        assert_eq!(run(&arena, b, "use medkit"), Err(CommandError::ItemNotYourTurn));
        assert!(told(&arena, b, "You can only use items on your turn."));

        run(&arena, a, "pass").unwrap();
        run(&arena, b, "use medkit").unwrap();

        assert!(arena.hp(b) > 40);
        assert_eq!(fight.combatant(b).unwrap().actions_left, 1);
        assert!(arena.registry.is_turn(b));
    }

    #[test]
    fn test_item_refusal_reaches_caller() {
        let arena = Arena::new(1);
        let a = arena.fighters[0];
        let templates = default_item_templates();
        templates.spawn(&mut arena.world.write(), "GLASS_BOTTLE", a);

        assert!(run(&arena, a, "use bottle").is_err());
        assert!(told(&arena, a, "'a glass bottle' is not a usable item."));
        assert_eq!(
            run(&arena, a, "use sword"),
            Err(CommandError::NotFound("sword".to_string()))
        );
    }

    #[test]
    fn test_help_in_combat() {
        let arena = Arena::new(2);
        let a = arena.fighters[0];
        run(&arena, a, "help").unwrap();
        assert!(told(&arena, a, GENERAL_HELP));

        arena.start().unwrap();
        run(&arena, a, "help").unwrap();
        assert!(told(&arena, a, COMBAT_HELP));
    }

    #[test]
    fn test_check_can_leave() {
        let arena = Arena::new(2);
        let a = arena.fighters[0];
        let templates = default_item_templates();
        let ctx = CommandContext {
            world: &arena.world,
            registry: &arena.registry,
            templates: &templates,
        };
        assert_eq!(check_can_leave(&ctx, a), Ok(()));

        arena.set_hp(a, 0);
        assert_eq!(check_can_leave(&ctx, a), Err(CommandError::MoveWhileDefeated));

        arena.set_hp(a, 50);
        arena.start().unwrap();
        assert_eq!(check_can_leave(&ctx, a), Err(CommandError::LeaveInCombat));
    }

    #[test]
    fn test_lookup_ignores_articles() {
        let arena = Arena::new(1);
        let a = arena.fighters[0];
        let templates = default_item_templates();
        let kit = templates.spawn(&mut arena.world.write(), "MEDKIT", a).unwrap();

        let world = arena.world.read();
        assert_eq!(find_carried(&world, a, "medical kit"), Some(kit));
        assert_eq!(find_carried(&world, a, "a medical kit"), Some(kit));
        assert_eq!(find_carried(&world, a, "MEDKIT"), Some(kit));
        assert_eq!(find_here(&world, a, "me"), Some(a));
    }
}
