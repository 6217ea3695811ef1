//! Magic item integration tests
//!
//! Items played from hand while a combat is running: weapons change the
//! dice, scrolls change the field, charms change what was already rolled.

use realm_war::combat::{
    CombatEngine, RollSide, ScriptedDice, Stage, StepOutcome, Template, Victor,
};
use realm_war::core::types::{GameId, Phase, PlayerId, Terrain, TerritoryId, ThingId};
use realm_war::magic::{ItemEffect, ItemTarget};
use realm_war::store::{LandLocation, ThingLocation};
use realm_war::{CombatConfig, MemoryStore, RecordStore, WarError};

struct Table {
    engine: CombatEngine<MemoryStore, ScriptedDice>,
    game: GameId,
    red: PlayerId,
    blue: PlayerId,
    home: TerritoryId,
    land: TerritoryId,
}

impl Table {
    fn new() -> Self {
        let mut store = MemoryStore::new();
        let game = store.add_game(Phase::War);
        let red = store.add_player(game, "Red");
        let blue = store.add_player(game, "Blue");
        let home = store.add_territory(game, Some(red), Terrain::Plains);
        let land = store.add_territory(game, Some(blue), Terrain::Desert);
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

    fn in_hand(&mut self, owner: PlayerId, template: Template) -> ThingId {
        let game = self.game;
        self.engine
            .store_mut()
            .add_thing(game, Some(owner), template, ThingLocation::Hand, None)
    }

    fn dice(&mut self, faces: &[u8]) {
        self.engine.dice_mut().push(faces.iter().copied());
    }

    fn step(&mut self) -> StepOutcome {
        self.engine.advance_step(self.game).unwrap()
    }

    fn play(&mut self, player: PlayerId, item: ThingId, target: ItemTarget) -> ItemEffect {
        self.engine
            .use_magic_item(self.game, player, item, target)
            .unwrap()
    }

    /// Red's troll fights two guardians for an unclaimed swamp
    fn guarded_swamp(&mut self) -> (TerritoryId, Vec<ThingId>) {
        let (game, red, home) = (self.game, self.red, self.home);
        let store = self.engine.store_mut();
        let swamp = store.add_territory(game, None, Terrain::Swamp);
        let troll = store.add_unit(game, red, Template::Troll, home);
        let guardians: Vec<ThingId> = [Template::Bear, Template::Goblin]
            .into_iter()
            .map(|t| store.add_thing(game, None, t, ThingLocation::Deck, None))
            .collect();
        self.engine
            .start_neutral_fight(game, red, swamp, &guardians, &[troll])
            .unwrap();
        self.dice(&[6, 1]);
        self.step();
        (swamp, guardians)
    }

    fn assert_fight_called_off(&self, swamp: TerritoryId, guardians: &[ThingId]) {
        assert!(self.engine.combat_state(self.game).unwrap().is_none());
        let tile = self.engine.store().territory(swamp).unwrap();
        assert_eq!(tile.location, LandLocation::Deck);
        assert!(tile.owner.is_none());
        for id in guardians {
            let guardian = self.engine.store().thing(*id).unwrap();
            assert_eq!(guardian.location, ThingLocation::Deck);
            assert!(guardian.owner.is_none());
        }
    }

    /// Declare and roll initiative for the attacker
    fn open(&mut self, units: &[ThingId]) {
        self.engine
            .declare_attack(self.game, self.red, self.home, self.land, units)
            .unwrap();
        self.dice(&[6, 1]);
        self.step();
    }
}

#[test]
fn test_fire_wall_mid_combat_survives_recount() {
    let mut t = Table::new();
    let archer = t.unit(t.red, Template::Archers, t.home);
    let goblin = t.unit(t.blue, Template::Goblin, t.land);
    let scroll = t.in_hand(t.blue, Template::ScrollOfFireWall);
    let charm = t.in_hand(t.red, Template::LuckyCharm);
    t.open(&[archer]);

    t.dice(&[5]);
    assert_eq!(t.step().state().stage(), Stage::Melee);

    t.dice(&[3]);
    let effect = t.play(t.blue, scroll, ItemTarget::Territory(t.land));
    assert_eq!(
        effect,
        ItemEffect::FireWall {
            territory: t.land,
            value: 3
        }
    );
    let state = t.engine.combat_state(t.game).unwrap().unwrap();
    assert_eq!(state.fort_remaining, 3);
    assert_eq!(t.engine.store().territory(t.land).unwrap().magic_fort_value, 3);

    // The charm turns the miss into a hit; the new wall does not soak it
    let effect = t.play(
        t.red,
        charm,
        ItemTarget::Roll {
            side: RollSide::Attacker,
            index: 0,
            delta: 1,
        },
    );
    let ItemEffect::RollAdjusted(outcome) = effect else {
        panic!("expected a roll adjustment");
    };
    assert_eq!(outcome.state().fort_remaining, 3);
    assert_eq!(outcome.state().pending_casualties()[0].eligible, vec![goblin]);

    // Goblin falls but the fire keeps the land
    let outcome = t.engine.assign_casualties(t.game, t.blue, &[goblin]).unwrap();
    assert_eq!(outcome.state().stage(), Stage::Melee);
    t.dice(&[1, 1, 1]);
    let outcome = t.step();
    assert_eq!(outcome.victor(), Some(Victor::Defender));

    let land = t.engine.store().territory(t.land).unwrap();
    assert_eq!(land.owner, Some(t.blue));
    assert_eq!(land.magic_fort_value, 0);
    assert_eq!(t.engine.store().thing(scroll).unwrap().location, ThingLocation::Deck);
    assert_eq!(t.engine.store().thing(charm).unwrap().location, ThingLocation::Deck);
}

#[test]
fn test_dust_cancels_the_combat() {
    let mut t = Table::new();
    let troll = t.unit(t.red, Template::Troll, t.home);
    t.unit(t.blue, Template::Goblin, t.land);
    let dust = t.in_hand(t.blue, Template::DustOfDefense);
    t.open(&[troll]);

    let effect = t.play(t.blue, dust, ItemTarget::None);
    assert_eq!(effect, ItemEffect::CombatCancelled);
    assert!(t.engine.combat_state(t.game).unwrap().is_none());
    assert_eq!(t.engine.store().thing(troll).unwrap().territory, Some(t.home));

    let err = t.engine.advance_step(t.game).unwrap_err();
    assert!(matches!(err, WarError::NoActiveCombat));
}

#[test]
fn test_dust_during_fight_returns_guardians() {
    let mut t = Table::new();
    let (swamp, guardians) = t.guarded_swamp();
    assert_eq!(
        t.engine.store().thing(guardians[0]).unwrap().location,
        ThingLocation::NeutralFight
    );

    let dust = t.in_hand(t.red, Template::DustOfDefense);
    assert_eq!(t.play(t.red, dust, ItemTarget::None), ItemEffect::CombatCancelled);
    t.assert_fight_called_off(swamp, &guardians);
}

#[test]
fn test_mist_during_fight_returns_guardians() {
    let mut t = Table::new();
    let (swamp, guardians) = t.guarded_swamp();

    let mist = t.in_hand(t.blue, Template::ScrollOfMist);
    assert_eq!(t.play(t.blue, mist, ItemTarget::None), ItemEffect::WarSuspended);
    t.assert_fight_called_off(swamp, &guardians);
}

#[test]
fn test_fire_wall_on_another_game_refused() {
    let mut t = Table::new();
    let other = t.engine.store_mut().add_game(Phase::War);
    let far = t.engine.store_mut().add_territory(other, Some(t.red), Terrain::Plains);
    let scroll = t.in_hand(t.blue, Template::ScrollOfFireWall);
    t.dice(&[5]);

    let err = t
        .engine
        .use_magic_item(t.game, t.blue, scroll, ItemTarget::Territory(far))
        .unwrap_err();
    assert!(matches!(err, WarError::TerritoryNotFound(id) if id == far));
    assert_eq!(t.engine.store().territory(far).unwrap().magic_fort_value, 0);
    assert_eq!(t.engine.dice_mut().remaining(), 1);
}

#[test]
fn test_dust_without_combat_is_refused() {
    let mut t = Table::new();
    let dust = t.in_hand(t.blue, Template::DustOfDefense);
    let err = t
        .engine
        .use_magic_item(t.game, t.blue, dust, ItemTarget::None)
        .unwrap_err();
    assert!(matches!(err, WarError::NoActiveCombat));
    assert_eq!(t.engine.store().thing(dust).unwrap().location, ThingLocation::Hand);
}

#[test]
fn test_mist_ends_the_war_for_the_turn() {
    let mut t = Table::new();
    let troll = t.unit(t.red, Template::Troll, t.home);
    let mist = t.in_hand(t.blue, Template::ScrollOfMist);
    t.open(&[troll]);

    assert_eq!(t.play(t.blue, mist, ItemTarget::None), ItemEffect::WarSuspended);
    assert!(t.engine.combat_state(t.game).unwrap().is_none());

    let err = t
        .engine
        .declare_attack(t.game, t.red, t.home, t.land, &[troll])
        .unwrap_err();
    assert!(matches!(err, WarError::WarSuspended));
}

#[test]
fn test_sword_sharpens_melee_dice() {
    let mut t = Table::new();
    let troll = t.unit(t.red, Template::Troll, t.home);
    let goblin = t.unit(t.blue, Template::Goblin, t.land);
    let sword = t.in_hand(t.red, Template::MagicSword);
    t.play(t.red, sword, ItemTarget::Unit(troll));
    t.open(&[troll]);

    assert_eq!(t.step().state().stage(), Stage::Melee);
    t.dice(&[5, 1, 1, 1]);
    let outcome = t.step();
    let state = outcome.state();
    let rolls = &state.last_stage.as_ref().unwrap().rolls;
    assert!(rolls.attacker.iter().all(|r| r.threshold == 5));
    assert_eq!(state.pending_casualties()[0].eligible, vec![goblin]);
}

#[test]
fn test_bow_lets_a_brute_shoot() {
    let mut t = Table::new();
    let troll = t.unit(t.red, Template::Troll, t.home);
    t.unit(t.blue, Template::Goblin, t.land);
    let bow = t.in_hand(t.red, Template::MagicBow);
    t.play(t.red, bow, ItemTarget::Unit(troll));
    t.open(&[troll]);

    t.dice(&[6, 1, 1]);
    let outcome = t.step();
    assert_eq!(outcome.state().last_stage.as_ref().unwrap().rolls.attacker.len(), 3);
    assert_eq!(outcome.state().pending_casualties().len(), 1);
}

#[test]
fn test_dispel_blunts_magic_weapons() {
    let mut t = Table::new();
    let troll = t.unit(t.red, Template::Troll, t.home);
    t.unit(t.blue, Template::Goblin, t.land);
    let sword = t.in_hand(t.red, Template::MagicSword);
    let charm = t.in_hand(t.red, Template::LuckyCharm);
    let scroll = t.in_hand(t.blue, Template::ScrollOfDispel);
    t.play(t.red, sword, ItemTarget::Unit(troll));

    let effect = t.play(t.blue, scroll, ItemTarget::Player(t.red));
    assert_eq!(effect, ItemEffect::Dispelled { player: t.red });
    t.open(&[troll]);
    t.step();

    t.dice(&[5, 1, 1, 1]);
    let outcome = t.step();
    let rolls = &outcome.state().last_stage.as_ref().unwrap().rolls;
    assert!(rolls.attacker.iter().all(|r| r.threshold == 6));
    assert_eq!(outcome.victor(), Some(Victor::Defender));

    let err = t
        .engine
        .use_magic_item(
            t.game,
            t.red,
            charm,
            ItemTarget::Roll {
                side: RollSide::Attacker,
                index: 0,
                delta: 1,
            },
        )
        .unwrap_err();
    assert!(matches!(err, WarError::Dispelled));
}

#[test]
fn test_talisman_revives_war_dead() {
    let mut t = Table::new();
    let (game, blue) = (t.game, t.blue);
    let fallen = t
        .engine
        .store_mut()
        .add_thing(game, Some(blue), Template::Orc, ThingLocation::WarDead, None);
    let talisman = t.in_hand(blue, Template::Talisman);

    t.dice(&[4]);
    let effect = t.play(blue, talisman, ItemTarget::Revive(Vec::new()));
    assert_eq!(effect, ItemEffect::Revived(vec![fallen]));
    assert_eq!(t.engine.store().thing(fallen).unwrap().location, ThingLocation::Hand);

    let again = t.in_hand(blue, Template::Talisman);
    let err = t
        .engine
        .use_magic_item(game, blue, again, ItemTarget::Revive(Vec::new()))
        .unwrap_err();
    assert!(matches!(err, WarError::NoDeadToRevive));
}
