//! Casualty protocol integration tests
//!
//! Hits become queue entries owned by the player who takes them. These tests
//! walk entries through validation, damage, flyer saves and burial.

use realm_war::combat::{
    CombatEngine, FiringStage, ScriptedDice, Stage, StepOutcome, Template, Victor,
};
use realm_war::core::types::{GameId, Phase, PlayerId, Terrain, TerritoryId, ThingId};
use realm_war::store::{LandLocation, ThingLocation};
use realm_war::{CombatConfig, MemoryStore, RecordStore, WarError};

struct Skirmish {
    engine: CombatEngine<MemoryStore, ScriptedDice>,
    game: GameId,
    red: PlayerId,
    blue: PlayerId,
    home: TerritoryId,
    land: TerritoryId,
}

impl Skirmish {
    fn new(phase: Phase, terrain: Terrain) -> Self {
        let mut store = MemoryStore::new();
        let game = store.add_game(phase);
        let red = store.add_player(game, "Red");
        let blue = store.add_player(game, "Blue");
        let home = store.add_territory(game, Some(red), Terrain::Plains);
        let land = store.add_territory(game, Some(blue), terrain);
        Self {
            engine: CombatEngine::new(store, ScriptedDice::new([]), CombatConfig::default()),
            game,
            red,
            blue,
            home,
            land,
        }
    }

    fn unit(&mut self, owner: PlayerId, template: Template, at: TerritoryId) -> ThingId {
        let game = self.game;
        self.engine.store_mut().add_unit(game, owner, template, at)
    }

    fn dice(&mut self, faces: &[u8]) {
        self.engine.dice_mut().push(faces.iter().copied());
    }

    fn step(&mut self) -> StepOutcome {
        self.engine.advance_step(self.game).unwrap()
    }

    fn location(&self, id: ThingId) -> ThingLocation {
        self.engine.store().thing(id).unwrap().location
    }

    /// Declare with `archers` archers and roll through initiative into RANGED
    fn archers_attack(&mut self, archers: usize) -> Vec<ThingId> {
        let (red, home) = (self.red, self.home);
        let units: Vec<ThingId> = (0..archers)
            .map(|_| self.unit(red, Template::Archers, home))
            .collect();
        self.engine
            .declare_attack(self.game, self.red, self.home, self.land, &units)
            .unwrap();
        self.dice(&[6, 1]);
        assert_eq!(self.step().state().stage(), Stage::Ranged);
        units
    }
}

#[test]
fn test_sword_master_survives_one_hit() {
    let mut s = Skirmish::new(Phase::War, Terrain::Desert);
    let master = s.unit(s.blue, Template::SwordMaster, s.land);
    s.archers_attack(1);

    s.dice(&[6]);
    let outcome = s.step();
    let pending = outcome.state().pending_casualties();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].player, s.blue);
    assert_eq!(pending[0].hits, 1);
    assert_eq!(pending[0].eligible, vec![master]);

    let outcome = s.engine.assign_casualties(s.game, s.blue, &[master]).unwrap();
    let state = outcome.state();
    assert_eq!(state.unit_damage.get(&master), Some(&1));
    assert_eq!(state.defender_units, vec![master]);
    assert_eq!(state.stage(), Stage::Melee);
    assert_eq!(s.location(master), ThingLocation::Board);
}

#[test]
fn test_slain_special_returns_to_bank_and_ends_battle_early() {
    let mut s = Skirmish::new(Phase::War, Terrain::Desert);
    let master = s.unit(s.blue, Template::SwordMaster, s.land);
    s.archers_attack(2);

    s.dice(&[6, 6]);
    let outcome = s.step();
    assert_eq!(outcome.state().pending_casualties()[0].hits, 2);

    // Both hits on the one unit kill it; nothing is left to defend
    let outcome = s.engine.assign_casualties(s.game, s.blue, &[master, master]).unwrap();
    assert_eq!(outcome.victor(), Some(Victor::Attacker));
    assert_eq!(outcome.state().last_stage.as_ref().unwrap().stage, FiringStage::Ranged);

    let record = s.engine.store().thing(master).unwrap();
    assert_eq!(record.location, ThingLocation::Bank);
    assert_eq!(record.owner, None);
    assert_eq!(s.engine.store().territory(s.land).unwrap().owner, Some(s.red));
}

#[test]
fn test_assignment_must_match_the_entry() {
    let mut s = Skirmish::new(Phase::War, Terrain::Desert);
    let master = s.unit(s.blue, Template::SwordMaster, s.land);
    let goblin = s.unit(s.blue, Template::Goblin, s.land);
    let stranger = s.unit(s.red, Template::Troll, s.home);
    s.archers_attack(2);

    s.dice(&[6, 6]);
    s.step();
    let before = s.engine.combat_state(s.game).unwrap();

    let err = s.engine.assign_casualties(s.game, s.blue, &[goblin]).unwrap_err();
    assert!(matches!(
        err,
        WarError::MustAssignAllHits { expected: 2, actual: 1 }
    ));

    // A goblin only has room for one hit
    let err = s
        .engine
        .assign_casualties(s.game, s.blue, &[goblin, goblin])
        .unwrap_err();
    assert!(matches!(err, WarError::InvalidCasualtySelection(id) if id == goblin));

    let err = s
        .engine
        .assign_casualties(s.game, s.blue, &[goblin, stranger])
        .unwrap_err();
    assert!(matches!(err, WarError::InvalidCasualtySelection(id) if id == stranger));

    let err = s
        .engine
        .assign_casualties(s.game, s.red, &[goblin, master])
        .unwrap_err();
    assert!(matches!(err, WarError::NotYourCasualties));

    assert_eq!(s.engine.combat_state(s.game).unwrap(), before);

    let outcome = s.engine.assign_casualties(s.game, s.blue, &[master, goblin]).unwrap();
    let state = outcome.state();
    assert_eq!(state.defender_units, vec![master]);
    assert_eq!(state.unit_damage.get(&master), Some(&1));
    assert_eq!(state.stage(), Stage::Melee);
    assert_eq!(s.location(goblin), ThingLocation::Discard);
}

#[test]
fn test_assign_without_pending_entry() {
    let mut s = Skirmish::new(Phase::War, Terrain::Desert);
    s.unit(s.blue, Template::Goblin, s.land);
    let units = s.archers_attack(1);

    let err = s.engine.assign_casualties(s.game, s.red, &units).unwrap_err();
    assert!(matches!(err, WarError::NoCasualtiesPending));
}

#[test]
fn test_flyer_saving_roll_dodges_single_hit() {
    let mut s = Skirmish::new(Phase::War, Terrain::Desert);
    let griffon = s.unit(s.blue, Template::Griffon, s.land);
    s.archers_attack(1);

    s.dice(&[6]);
    s.step();

    s.dice(&[4]);
    let outcome = s.engine.assign_casualties(s.game, s.blue, &[griffon]).unwrap();
    let state = outcome.state();
    assert_eq!(state.defender_units, vec![griffon]);
    assert!(state.unit_damage.is_empty());
    assert_eq!(state.stage(), Stage::Melee);
    assert_eq!(s.engine.dice_mut().remaining(), 0);
}

#[test]
fn test_flyer_dies_to_two_hits_without_a_roll() {
    let mut s = Skirmish::new(Phase::War, Terrain::Desert);
    let griffon = s.unit(s.blue, Template::Griffon, s.land);
    let goblin = s.unit(s.blue, Template::Goblin, s.land);
    s.archers_attack(2);

    s.dice(&[6, 6]);
    s.step();

    let outcome = s
        .engine
        .assign_casualties(s.game, s.blue, &[griffon, griffon])
        .unwrap();
    assert_eq!(outcome.state().defender_units, vec![goblin]);
    assert_eq!(s.engine.dice_mut().remaining(), 0);
    assert_eq!(s.location(griffon), ThingLocation::Discard);
}

#[test]
fn test_talisman_holder_keeps_war_dead() {
    let mut s = Skirmish::new(Phase::War, Terrain::Desert);
    let goblin = s.unit(s.blue, Template::Goblin, s.land);
    let troll = s.unit(s.blue, Template::Troll, s.land);
    let (game, blue) = (s.game, s.blue);
    s.engine
        .store_mut()
        .add_thing(game, Some(blue), Template::Talisman, ThingLocation::Hand, None);
    s.archers_attack(1);

    s.dice(&[6]);
    s.step();
    let outcome = s.engine.assign_casualties(s.game, s.blue, &[goblin]).unwrap();
    assert_eq!(outcome.state().defender_units, vec![troll]);

    let record = s.engine.store().thing(goblin).unwrap();
    assert_eq!(record.location, ThingLocation::WarDead);
    assert_eq!(record.owner, Some(s.blue));
}

#[test]
fn test_slain_unit_drops_its_items() {
    let mut s = Skirmish::new(Phase::War, Terrain::Desert);
    let goblin = s.unit(s.blue, Template::Goblin, s.land);
    s.unit(s.blue, Template::Troll, s.land);
    let (game, blue, land) = (s.game, s.blue, s.land);
    let sword = s.engine.store_mut().add_thing(
        game,
        Some(blue),
        Template::MagicSword,
        ThingLocation::Board,
        Some(land),
    );
    let mut record = s.engine.store().thing(sword).unwrap();
    record.attached_to = Some(goblin);
    s.engine.store_mut().put_thing(record);
    s.archers_attack(1);

    s.dice(&[6]);
    s.step();
    s.engine.assign_casualties(s.game, s.blue, &[goblin]).unwrap();

    let sword = s.engine.store().thing(sword).unwrap();
    assert_eq!(sword.location, ThingLocation::Deck);
    assert_eq!(sword.owner, None);
    assert_eq!(sword.attached_to, None);
}

#[test]
fn test_guardians_take_hits_automatically() {
    let mut s = Skirmish::new(Phase::Acquire, Terrain::Forest);
    let (game, red, home) = (s.game, s.red, s.home);
    let land = s.engine.store_mut().add_territory(game, None, Terrain::Forest);
    let archers = vec![
        s.unit(red, Template::Archers, home),
        s.unit(red, Template::Archers, home),
    ];
    let guardians: Vec<ThingId> = [Template::Bear, Template::Goblin]
        .into_iter()
        .map(|t| {
            s.engine
                .store_mut()
                .add_thing(game, None, t, ThingLocation::Deck, None)
        })
        .collect();

    let state = s
        .engine
        .start_neutral_fight(game, red, land, &guardians, &archers)
        .unwrap();
    assert_eq!(state.defender_roster, guardians);
    assert_eq!(s.location(guardians[0]), ThingLocation::NeutralFight);

    s.dice(&[6, 1]);
    s.step();

    // Archers get two dice each in the forest
    s.dice(&[6, 6, 1, 1]);
    let outcome = s.step();
    assert_eq!(outcome.victor(), Some(Victor::Attacker));
    assert!(outcome.state().defender_units.is_empty());

    let claimed = s.engine.store().territory(land).unwrap();
    assert_eq!(claimed.owner, Some(red));
    assert_eq!(claimed.location, LandLocation::Board);
    for id in &guardians {
        let guardian = s.engine.store().thing(*id).unwrap();
        assert_eq!(guardian.location, ThingLocation::Deck);
        assert_eq!(guardian.owner, None);
    }
}

#[test]
fn test_guardians_that_hold_send_land_back() {
    let mut s = Skirmish::new(Phase::Acquire, Terrain::Forest);
    let (game, red, home) = (s.game, s.red, s.home);
    let land = s.engine.store_mut().add_territory(game, None, Terrain::Forest);
    let goblin = s.unit(red, Template::Goblin, home);
    let troll = s
        .engine
        .store_mut()
        .add_thing(game, None, Template::Troll, ThingLocation::Deck, None);

    s.engine
        .start_neutral_fight(game, red, land, &[troll], &[goblin])
        .unwrap();

    s.dice(&[6, 1]);
    s.step();
    assert_eq!(s.step().state().stage(), Stage::Melee);

    s.dice(&[1, 6, 1, 1]);
    let outcome = s.step();
    let pending = outcome.state().pending_casualties();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].player, red);

    let outcome = s.engine.assign_casualties(game, red, &[goblin]).unwrap();
    assert_eq!(outcome.victor(), Some(Victor::Defender));

    let lost = s.engine.store().territory(land).unwrap();
    assert_eq!(lost.owner, None);
    assert_eq!(lost.location, LandLocation::Deck);
    assert_eq!(s.location(troll), ThingLocation::Deck);
    assert_eq!(s.location(goblin), ThingLocation::Discard);
}
