//! Stage transitions
//!
//! `CombatContext` borrows the store, the dice and the config for the length
//! of one engine call and moves a `CombatState` through
//! INITIATIVE -> RANGED -> MELEE, pausing whenever a player owes casualties.

use crate::combat::casualties::{
    absorb_with_fort, auto_assign, build_batch, bury, capacities, resolve_hits, validate_assignment,
    Burial, HitOutcome,
};
use crate::combat::constants::OUTNUMBERED_INITIATIVE_BONUS;
use crate::combat::dice::{roll_fort_dice, DiceRoller, RollSheet};
use crate::combat::profile::{leader_races, roll_force, siege_auto_hits, Fighter, ProfileContext};
use crate::combat::resolution::battle_over;
use crate::combat::state::{
    CasualtyQueue, CombatSide, CombatState, FiringStage, Progress, StageRecord, StepOutcome,
};
use crate::core::config::CombatConfig;
use crate::core::error::{Result, WarError};
use crate::core::types::{ForceOwner, PlayerId, ThingId};
use crate::store::records::{GameRecord, ThingRecord};
use crate::store::RecordStore;

/// Everything one engine call needs while it works on a combat
pub struct CombatContext<'a, S: RecordStore, D: DiceRoller> {
    pub store: &'a mut S,
    pub dice: &'a mut D,
    pub config: &'a CombatConfig,
    pub game: GameRecord,
}

impl<'a, S: RecordStore, D: DiceRoller> CombatContext<'a, S, D> {
    pub fn new(store: &'a mut S, dice: &'a mut D, config: &'a CombatConfig, game: GameRecord) -> Self {
        Self {
            store,
            dice,
            config,
            game,
        }
    }

    /// Add a line to the battle log and trace it
    pub fn note(&self, state: &mut CombatState, line: String) {
        tracing::debug!("{}", line);
        state.record(line, self.config.battle_log_limit);
    }

    pub fn load_units(&self, ids: &[ThingId]) -> Result<Vec<ThingRecord>> {
        ids.iter()
            .map(|id| self.store.thing(*id).ok_or(WarError::ThingNotFound(*id)))
            .collect()
    }

    fn load_force(&self, ids: &[ThingId]) -> Result<Vec<Fighter>> {
        Ok(self
            .load_units(ids)?
            .into_iter()
            .map(|unit| Fighter {
                attachments: self.store.things_attached_to(unit.id),
                unit,
            })
            .collect())
    }

    fn is_dispelled(&self, owner: ForceOwner) -> bool {
        owner
            .player()
            .map(|p| self.game.is_dispelled(p))
            .unwrap_or(false)
    }

    /// Move the state one step forward
    pub fn advance(&mut self, state: CombatState) -> Result<StepOutcome> {
        match state.progress {
            Progress::AwaitingCasualties { .. } => Ok(StepOutcome::Ongoing(state)),
            Progress::Initiative => Ok(StepOutcome::Ongoing(self.roll_initiative(state))),
            Progress::Ranged => self.resolve_firing_stage(state, FiringStage::Ranged),
            Progress::Melee => self.resolve_firing_stage(state, FiringStage::Melee),
        }
    }

    /// Both sides roll a die, the outnumbered side adding one; ties re-roll
    pub fn roll_initiative(&mut self, mut state: CombatState) -> CombatState {
        let attackers = state.attacker_units.len();
        let defenders = state.defender_units.len();
        let attacker_bonus = if attackers < defenders { OUTNUMBERED_INITIATIVE_BONUS } else { 0 };
        let defender_bonus = if defenders < attackers { OUTNUMBERED_INITIATIVE_BONUS } else { 0 };

        let mut winner = None;
        for _ in 0..self.config.max_initiative_rolls {
            let attacker_roll = self.dice.roll_d6() + attacker_bonus;
            let defender_roll = self.dice.roll_d6() + defender_bonus;
            if attacker_roll != defender_roll {
                winner = Some(if attacker_roll > defender_roll {
                    CombatSide::Attacker
                } else {
                    CombatSide::Defender
                });
                break;
            }
        }
        let winner = winner.unwrap_or(CombatSide::Attacker);

        state.initiative = Some(winner);
        state.progress = Progress::Ranged;
        self.note(&mut state, format!("Initiative goes to the {:?}", winner));
        state
    }

    /// Roll a RANGED or MELEE stage and hand out its hits
    pub fn resolve_firing_stage(
        &mut self,
        mut state: CombatState,
        stage: FiringStage,
    ) -> Result<StepOutcome> {
        let territory = self
            .store
            .territory(state.territory)
            .ok_or(WarError::TerritoryNotFound(state.territory))?;
        let attackers = self.load_force(&state.attacker_units)?;
        let defenders = self.load_force(&state.defender_units)?;

        let mut siege_hits = 0;
        if !state.auto_fort_applied {
            let auto = siege_auto_hits(&attackers, state.fort_remaining);
            if auto > 0 {
                siege_hits = auto;
                state.fort_remaining -= auto;
                state.auto_fort_applied = true;
                self.note(
                    &mut state,
                    format!("Siege specialists knock down {} fortification", auto),
                );
            }
        }

        let attacker_leaders = leader_races(&attackers);
        let defender_leaders = leader_races(&defenders);
        let attacker_ctx = ProfileContext {
            terrain: territory.terrain,
            side: CombatSide::Attacker,
            friendly_leaders: attacker_leaders.clone(),
            enemy_leaders: defender_leaders.clone(),
            dispelled: self.is_dispelled(ForceOwner::Player(state.attacker)),
        };
        let defender_ctx = ProfileContext {
            terrain: territory.terrain,
            side: CombatSide::Defender,
            friendly_leaders: defender_leaders,
            enemy_leaders: attacker_leaders,
            dispelled: self.is_dispelled(state.defender),
        };

        let attacker_rolls = roll_force(&mut *self.dice, &attackers, &attacker_ctx, stage);
        let defender_rolls = roll_force(&mut *self.dice, &defenders, &defender_ctx, stage);
        let fort_rolls = roll_fort_dice(&mut *self.dice, state.fort_remaining);

        state.last_stage = Some(StageRecord {
            stage,
            rolls: RollSheet {
                attacker: attacker_rolls,
                defender: defender_rolls,
                fort: fort_rolls,
            },
            fort_start: state.fort_remaining,
            siege_hits,
            late_fort_bonus: 0,
            attacker_units: state.attacker_units.clone(),
            defender_units: state.defender_units.clone(),
            unit_damage: state.unit_damage.clone(),
            fallen: Vec::new(),
            batches_applied: 0,
        });

        self.apply_stage_hits(state)
    }

    /// Count the recorded rolls and turn them into casualties
    ///
    /// Works purely from `last_stage`, so a recount after a die was nudged
    /// lands here too.
    pub fn apply_stage_hits(&mut self, mut state: CombatState) -> Result<StepOutcome> {
        let record = state.last_stage.as_ref().ok_or(WarError::NoRollsToModify)?;
        let stage = record.stage;
        let attacker_hits = record.rolls.attacker_hits();
        let defender_hits = record.rolls.defender_hits();
        let fort_hits = record.rolls.fort_hits();
        let absorption = absorb_with_fort(attacker_hits, record.fort_start);
        state.fort_remaining = absorption.fort_remaining + record.late_fort_bonus;

        self.note(
            &mut state,
            format!(
                "{}: attacker scores {} hits, defender scores {} ({} from fortifications)",
                stage, attacker_hits, defender_hits, fort_hits
            ),
        );
        if absorption.absorbed > 0 {
            let remaining = state.fort_remaining;
            self.note(
                &mut state,
                format!(
                    "Fortifications absorb {} hits, {} remaining",
                    absorption.absorbed, remaining
                ),
            );
        }

        let defenders = self.load_units(&state.defender_units)?;
        let attackers = self.load_units(&state.attacker_units)?;
        let incoming = [
            (CombatSide::Defender, absorption.carried, defenders),
            (CombatSide::Attacker, defender_hits, attackers),
        ];

        let mut pending = Vec::new();
        for (side, hits, units) in incoming {
            let Some(batch) = build_batch(side, stage, hits, &units, &state.unit_damage) else {
                continue;
            };
            if batch.wasted > 0 {
                self.note(
                    &mut state,
                    format!("{} hits against the {:?} find no target", batch.wasted, side),
                );
            }
            match state.owner_of(side) {
                ForceOwner::Player(player) => pending.push(batch.into_pending(player, stage)),
                ForceOwner::NeutralDeck => {
                    let eligible: Vec<&ThingRecord> = units
                        .iter()
                        .filter(|u| batch.eligible.contains(&u.id))
                        .collect();
                    let room = capacities(&eligible, &state.unit_damage);
                    let picks = auto_assign(&mut *self.dice, &batch, &room);
                    self.apply_batch(&mut state, side, &picks)?;
                }
            }
        }

        match CasualtyQueue::from_entries(pending) {
            Some(queue) => {
                state.progress = Progress::AwaitingCasualties { stage, queue };
                Ok(StepOutcome::Ongoing(state))
            }
            None => self.after_stage_drained(state, stage),
        }
    }

    /// Apply the head entry of the queue with the player's picks
    pub fn assign(
        &mut self,
        mut state: CombatState,
        player: PlayerId,
        picks: &[ThingId],
    ) -> Result<StepOutcome> {
        let (stage, queue) = match &state.progress {
            Progress::AwaitingCasualties { stage, queue } => (*stage, queue.clone()),
            _ => return Err(WarError::NoCasualtiesPending),
        };
        let head = queue.head().clone();
        if head.player != player {
            return Err(WarError::NotYourCasualties);
        }

        let units = self.load_units(&head.eligible)?;
        let eligible: Vec<&ThingRecord> = units.iter().collect();
        let room = capacities(&eligible, &state.unit_damage);
        let grouped = validate_assignment(&head, picks, &room)?;

        self.apply_batch(&mut state, head.side, &grouped)?;

        match queue.pop() {
            Some(rest) => {
                state.progress = Progress::AwaitingCasualties { stage, queue: rest };
                Ok(StepOutcome::Ongoing(state))
            }
            None => self.after_stage_drained(state, stage),
        }
    }

    /// Apply grouped hits to units of one side
    pub fn apply_batch(
        &mut self,
        state: &mut CombatState,
        side: CombatSide,
        picks: &[(ThingId, u32)],
    ) -> Result<()> {
        for (id, hits) in picks {
            let unit = self.store.thing(*id).ok_or(WarError::ThingNotFound(*id))?;
            let template = unit.template;
            let prior = state.unit_damage.get(id).copied().unwrap_or(0);

            match resolve_hits(&mut *self.dice, template, prior, *hits) {
                HitOutcome::Killed => {
                    state.unit_damage.remove(id);
                    state.units_mut(side).retain(|u| u != id);
                    let (fallen, burial) = bury(&mut *self.store, self.game.phase, unit);
                    let fate = match burial {
                        Burial::LeftInPool | Burial::Discard => "is slain",
                        Burial::Bank => "is slain and returns to the bank",
                        Burial::WarDead => "is slain and lies among the war dead",
                    };
                    self.note(state, format!("{} {}", template, fate));
                    if let Some(record) = state.last_stage.as_mut() {
                        record.fallen.push(fallen);
                    }
                }
                HitOutcome::Wounded { damage } => {
                    state.unit_damage.insert(*id, damage);
                    self.note(state, format!("{} is wounded ({} damage)", template, damage));
                }
                HitOutcome::Saved => {
                    self.note(state, format!("{} evades the blow", template));
                }
            }
        }

        if let Some(record) = state.last_stage.as_mut() {
            record.batches_applied += 1;
        }
        Ok(())
    }

    /// The queue for `stage` is empty: move on or finish
    ///
    /// A RANGED stage that changed nothing on the field always gives way to
    /// MELEE, even when one side already stands empty.
    fn after_stage_drained(&mut self, mut state: CombatState, stage: FiringStage) -> Result<StepOutcome> {
        let struck_home = state
            .last_stage
            .as_ref()
            .map(|r| r.struck_home())
            .unwrap_or(false);

        match stage {
            FiringStage::Ranged if struck_home && battle_over(&state) => self.finalize(state),
            FiringStage::Ranged => {
                state.progress = Progress::Melee;
                Ok(StepOutcome::Ongoing(state))
            }
            FiringStage::Melee => self.finalize(state),
        }
    }
}
