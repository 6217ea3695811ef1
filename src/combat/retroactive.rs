//! Retroactive die adjustment
//!
//! A lucky charm nudges one die of the last resolved stage by one pip. The
//! stage is then rewound to how it stood before its casualties and counted
//! again from the stored rolls. No new dice are thrown for the hit count.

use crate::combat::casualties::restore_fallen;
use crate::combat::constants::DIE_FACES;
use crate::combat::dice::{DiceRoller, RollSide};
use crate::combat::stage::CombatContext;
use crate::combat::state::{CombatState, StepOutcome};
use crate::core::error::{Result, WarError};
use crate::store::RecordStore;

impl<'a, S: RecordStore, D: DiceRoller> CombatContext<'a, S, D> {
    /// Shift roll `index` of `side` by `delta` and recount the stage
    pub fn nudge_roll(
        &mut self,
        mut state: CombatState,
        side: RollSide,
        index: usize,
        delta: i8,
    ) -> Result<StepOutcome> {
        let record = state.last_stage.as_mut().ok_or(WarError::NoRollsToModify)?;
        let rolls = record.rolls.side_mut(side);
        if index >= rolls.len() {
            return Err(WarError::InvalidRollIndex(index));
        }
        if delta != 1 && delta != -1 {
            return Err(WarError::InvalidDelta(delta));
        }

        let before = rolls[index].value;
        let after = (before as i8 + delta).clamp(1, DIE_FACES as i8) as u8;
        rolls[index].value = after;

        self.note(
            &mut state,
            format!("A {:?} die is turned from {} to {}", side, before, after),
        );
        self.recount(state)
    }

    /// Rewind the last stage and apply its rolls again
    pub fn recount(&mut self, mut state: CombatState) -> Result<StepOutcome> {
        let record = state.last_stage.as_mut().ok_or(WarError::NoRollsToModify)?;

        let moved_on = restore_fallen(&mut *self.store, &record.fallen);
        record.fallen.clear();
        record.batches_applied = 0;
        for id in &moved_on {
            record.attacker_units.retain(|u| u != id);
            record.defender_units.retain(|u| u != id);
            record.unit_damage.remove(id);
        }
        state.attacker_units = record.attacker_units.clone();
        state.defender_units = record.defender_units.clone();
        state.unit_damage = record.unit_damage.clone();

        self.apply_stage_hits(state)
    }
}
