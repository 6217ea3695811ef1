//! Combat engine - the operations a transport layer calls
//!
//! Every operation runs inside one store transaction: it validates, decodes
//! the game's combat blob, moves the combat along and writes the blob back
//! (or clears it once the combat is finished). A rejected call leaves the
//! store exactly as it was.

use crate::combat::dice::{DiceRoller, RollSide, SeededDice};
use crate::combat::stage::CombatContext;
use crate::combat::state::{CombatKind, CombatState, StepOutcome};
use crate::core::config::CombatConfig;
use crate::core::error::{Result, WarError};
use crate::core::types::{ForceOwner, GameId, Phase, PlayerId, TerritoryId, ThingId};
use crate::store::records::{GameRecord, ThingLocation};
use crate::store::RecordStore;

pub struct CombatEngine<S: RecordStore, D: DiceRoller> {
    pub(crate) store: S,
    pub(crate) dice: D,
    pub(crate) config: CombatConfig,
}

impl<S: RecordStore> CombatEngine<S, SeededDice> {
    /// Engine with seeded dice, after checking the config
    pub fn from_config(store: S, config: CombatConfig) -> Result<Self> {
        config.validate()?;
        let dice = SeededDice::from_config_seed(config.dice_seed);
        Ok(Self::new(store, dice, config))
    }
}

impl<S: RecordStore, D: DiceRoller> CombatEngine<S, D> {
    pub fn new(store: S, dice: D, config: CombatConfig) -> Self {
        Self {
            store,
            dice,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn dice_mut(&mut self) -> &mut D {
        &mut self.dice
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The combat currently running in `game`, if any
    pub fn combat_state(&self, game: GameId) -> Result<Option<CombatState>> {
        let record = self.store.game(game).ok_or(WarError::GameNotFound(game))?;
        record
            .combat_state
            .as_deref()
            .map(CombatState::decode)
            .transpose()
    }

    /// Open a player-versus-player combat from `from` into `to`
    pub fn declare_attack(
        &mut self,
        game: GameId,
        attacker: PlayerId,
        from: TerritoryId,
        to: TerritoryId,
        units: &[ThingId],
    ) -> Result<CombatState> {
        let config = &self.config;
        self.store.transaction(|tx| {
            let mut record = tx.game(game).ok_or(WarError::GameNotFound(game))?;
            if record.phase != Phase::War {
                return Err(WarError::WrongPhase);
            }
            if record.war_suspended {
                return Err(WarError::WarSuspended);
            }
            if record.combat_state.is_some() {
                return Err(WarError::CombatAlreadyActive);
            }

            let source = tx
                .territory(from)
                .filter(|t| t.game == game)
                .ok_or(WarError::TerritoryNotFound(from))?;
            let target = tx
                .territory(to)
                .filter(|t| t.game == game)
                .ok_or(WarError::TerritoryNotFound(to))?;
            if source.owner != Some(attacker) {
                return Err(WarError::NotYourTerritory);
            }
            let defender = target.owner.ok_or(WarError::NoOwner)?;
            if defender == attacker {
                return Err(WarError::SelfAttack);
            }

            check_selection(units)?;
            for id in units {
                let unit = tx
                    .thing(*id)
                    .filter(|u| u.game == game)
                    .ok_or(WarError::InvalidUnitSelection)?;
                if unit.owner != Some(attacker) || !unit.template.is_combatant() {
                    return Err(WarError::InvalidUnitSelection);
                }
                if unit.location != ThingLocation::Board || unit.territory != Some(from) {
                    return Err(WarError::UnitNotOnSourceTerritory(*id));
                }
            }

            let defenders: Vec<ThingId> = tx
                .things_at(to, ThingLocation::Board)
                .into_iter()
                .filter(|t| t.owner == Some(defender) && t.template.is_combatant())
                .map(|t| t.id)
                .collect();

            let mut state = CombatState::new(
                attacker,
                ForceOwner::Player(defender),
                to,
                CombatKind::Pvp,
                units.to_vec(),
                defenders,
                target.defense_pool(),
            );
            state.record(
                format!(
                    "{} units attack {} defenders behind {} fortification",
                    state.attacker_units.len(),
                    state.defender_units.len(),
                    state.fort_remaining
                ),
                config.battle_log_limit,
            );
            tracing::info!(
                "Player {} attacks territory {} held by {}",
                attacker,
                to,
                defender
            );

            save(tx, &mut record, &state)?;
            Ok(state)
        })
    }

    /// Open a FIGHT against guardians drawn for an unclaimed tile
    ///
    /// Called by the land draw rather than by players. Guardians are moved
    /// into the neutral-fight pool for the length of the combat.
    pub fn start_neutral_fight(
        &mut self,
        game: GameId,
        attacker: PlayerId,
        territory: TerritoryId,
        guardians: &[ThingId],
        units: &[ThingId],
    ) -> Result<CombatState> {
        let config = &self.config;
        self.store.transaction(|tx| {
            let mut record = tx.game(game).ok_or(WarError::GameNotFound(game))?;
            if record.combat_state.is_some() {
                return Err(WarError::CombatAlreadyActive);
            }
            let land = tx
                .territory(territory)
                .filter(|t| t.game == game)
                .ok_or(WarError::TerritoryNotFound(territory))?;
            tx.player(attacker)
                .filter(|p| p.game == game)
                .ok_or(WarError::PlayerNotFound(attacker))?;

            check_selection(units)?;
            for id in units {
                let unit = tx
                    .thing(*id)
                    .filter(|u| u.game == game)
                    .ok_or(WarError::InvalidUnitSelection)?;
                if unit.owner != Some(attacker) || !unit.template.is_combatant() {
                    return Err(WarError::InvalidUnitSelection);
                }
            }

            let mut roster = Vec::with_capacity(guardians.len());
            for id in guardians {
                let mut guardian = tx
                    .thing(*id)
                    .filter(|g| g.game == game)
                    .ok_or(WarError::ThingNotFound(*id))?;
                if guardian.owner.is_some() || !guardian.template.is_combatant() {
                    return Err(WarError::InvalidUnitSelection);
                }
                guardian.location = ThingLocation::NeutralFight;
                guardian.territory = None;
                guardian.attached_to = None;
                tx.put_thing(guardian);
                roster.push(*id);
            }

            let mut state = CombatState::new(
                attacker,
                ForceOwner::NeutralDeck,
                territory,
                CombatKind::Fight,
                units.to_vec(),
                roster,
                land.defense_pool(),
            );
            state.record(
                format!(
                    "{} units fight {} guardians for the land",
                    state.attacker_units.len(),
                    state.defender_units.len()
                ),
                config.battle_log_limit,
            );
            tracing::info!(
                "Player {} fights {} guardians for territory {}",
                attacker,
                guardians.len(),
                territory
            );

            save(tx, &mut record, &state)?;
            Ok(state)
        })
    }

    /// Resolve the next stage; a combat waiting on casualties comes back unchanged
    pub fn advance_step(&mut self, game: GameId) -> Result<StepOutcome> {
        self.with_combat(game, |ctx, state| ctx.advance(state))
    }

    /// Hand the head casualty entry its picks
    pub fn assign_casualties(
        &mut self,
        game: GameId,
        player: PlayerId,
        units: &[ThingId],
    ) -> Result<StepOutcome> {
        self.with_combat(game, |ctx, state| ctx.assign(state, player, units))
    }

    /// Nudge one die of the last stage by +1 or -1 and recount that stage
    pub fn apply_retroactive_modifier(
        &mut self,
        game: GameId,
        side: RollSide,
        index: usize,
        delta: i8,
    ) -> Result<StepOutcome> {
        self.with_combat(game, |ctx, state| ctx.nudge_roll(state, side, index, delta))
    }

    fn with_combat(
        &mut self,
        game: GameId,
        f: impl FnOnce(&mut CombatContext<'_, S, D>, CombatState) -> Result<StepOutcome>,
    ) -> Result<StepOutcome> {
        let Self {
            store,
            dice,
            config,
        } = self;
        store.transaction(|tx| run_combat(tx, dice, config, game, f))
    }
}

/// Decode the game's combat, run `f` on it and store the result
pub(crate) fn run_combat<S: RecordStore, D: DiceRoller>(
    tx: &mut S,
    dice: &mut D,
    config: &CombatConfig,
    game: GameId,
    f: impl FnOnce(&mut CombatContext<'_, S, D>, CombatState) -> Result<StepOutcome>,
) -> Result<StepOutcome> {
    let mut record = tx.game(game).ok_or(WarError::GameNotFound(game))?;
    let blob = record
        .combat_state
        .clone()
        .ok_or(WarError::NoActiveCombat)?;
    let state = CombatState::decode(&blob)?;

    let outcome = {
        let mut ctx = CombatContext::new(&mut *tx, dice, config, record.clone());
        f(&mut ctx, state)?
    };

    match &outcome {
        StepOutcome::Ongoing(state) => save(tx, &mut record, state)?,
        StepOutcome::Finished(_) => {
            record.combat_state = None;
            tx.put_game(record);
        }
    }
    Ok(outcome)
}

fn save<S: RecordStore>(tx: &mut S, record: &mut GameRecord, state: &CombatState) -> Result<()> {
    record.combat_state = Some(state.encode()?);
    tx.put_game(record.clone());
    Ok(())
}

/// A force must be non-empty and name each unit once
fn check_selection(units: &[ThingId]) -> Result<()> {
    if units.is_empty() {
        return Err(WarError::InvalidUnitSelection);
    }
    let mut seen = ahash::AHashSet::with_capacity(units.len());
    if !units.iter().all(|id| seen.insert(*id)) {
        return Err(WarError::InvalidUnitSelection);
    }
    Ok(())
}
