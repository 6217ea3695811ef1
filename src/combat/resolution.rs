//! Combat resolution
//!
//! Decides who won, settles the contested land and clears the field.
//! FIGHT and PVP combats share the victory test but settle differently.

use crate::combat::constants::MAX_FORTIFICATION_LEVEL;
use crate::combat::dice::DiceRoller;
use crate::combat::stage::CombatContext;
use crate::combat::state::{CombatKind, CombatState, FinishedCombat, StepOutcome, Victor};
use crate::core::error::{Result, WarError};
use crate::core::types::ThingId;
use crate::store::records::{LandLocation, ThingLocation, TerritoryRecord};
use crate::store::RecordStore;

/// Either force is spent, or the defenders and their walls are gone
pub fn battle_over(state: &CombatState) -> bool {
    state.attacker_units.is_empty()
        || (state.defender_units.is_empty() && state.fort_remaining == 0)
}

/// The attacker wins only with units standing and nothing left to hold the land
pub fn victor(state: &CombatState) -> Victor {
    if !state.attacker_units.is_empty()
        && state.defender_units.is_empty()
        && state.fort_remaining == 0
    {
        Victor::Attacker
    } else {
        Victor::Defender
    }
}

/// Break off a combat that never reached a result
///
/// A cancelled FIGHT ends as if the guardians held: they go back in the cup
/// and the land goes back to the pile. A cancelled PVP combat leaves every
/// unit where it stands.
pub fn abandon_combat<S: RecordStore>(store: &mut S, state: &CombatState) -> Result<()> {
    if state.kind != CombatKind::Fight {
        return Ok(());
    }
    return_guardians(store, &state.defender_roster);

    let mut territory = store
        .territory(state.territory)
        .ok_or(WarError::TerritoryNotFound(state.territory))?;
    release_land(&mut territory);
    store.put_territory(territory);
    tracing::info!("Fight for territory {} called off", state.territory);
    Ok(())
}

fn return_guardians<S: RecordStore>(store: &mut S, roster: &[ThingId]) {
    for id in roster {
        if let Some(mut guardian) = store.thing(*id) {
            guardian.return_to_deck();
            store.put_thing(guardian);
        }
    }
}

fn release_land(territory: &mut TerritoryRecord) {
    territory.owner = None;
    territory.location = LandLocation::Deck;
    territory.fortification_level = 0;
    territory.magic_fort_value = 0;
}

impl<'a, S: RecordStore, D: DiceRoller> CombatContext<'a, S, D> {
    /// Settle the land and report the finished combat
    pub fn finalize(&mut self, mut state: CombatState) -> Result<StepOutcome> {
        let victor = victor(&state);
        let mut territory = self
            .store
            .territory(state.territory)
            .ok_or(WarError::TerritoryNotFound(state.territory))?;

        match state.kind {
            CombatKind::Fight => self.settle_fight(&mut state, &mut territory, victor),
            CombatKind::Pvp => self.settle_capture(&mut state, &mut territory, victor),
        }
        self.store.put_territory(territory);

        tracing::info!("Combat for territory {} finished: {:?} wins", state.territory, victor);
        Ok(StepOutcome::Finished(FinishedCombat { state, victor }))
    }

    /// Guardians go back in the cup whatever happens; the land goes to the
    /// attacker or back to the land pile
    fn settle_fight(&mut self, state: &mut CombatState, territory: &mut TerritoryRecord, victor: Victor) {
        territory.magic_fort_value = 0;
        match victor {
            Victor::Attacker => {
                territory.owner = Some(state.attacker);
                territory.location = LandLocation::Board;
                self.note(state, "The guardians are defeated; the land is claimed".to_string());
            }
            Victor::Defender => {
                release_land(territory);
                self.note(state, "The guardians hold; the land returns to the pile".to_string());
            }
        }
        return_guardians(&mut *self.store, &state.defender_roster);
    }

    fn settle_capture(&mut self, state: &mut CombatState, territory: &mut TerritoryRecord, victor: Victor) {
        territory.magic_fort_value = 0;
        if victor == Victor::Defender {
            self.note(state, "The defender holds the territory".to_string());
            return;
        }

        if territory.settlement.is_some() {
            if self.dice.saving_roll() {
                self.note(state, "The settlement survives the capture".to_string());
            } else {
                territory.settlement = None;
                self.note(state, "The settlement is razed".to_string());
            }
        }

        if territory.fortification_level > 0 {
            if self.dice.saving_roll() {
                self.note(state, "The fortification survives the capture".to_string());
            } else {
                territory.fortification_level = 0;
                self.note(state, "The fortification is destroyed".to_string());
            }
        }

        // One Gran Muniment per player
        if territory.fortification_level == MAX_FORTIFICATION_LEVEL {
            let holds_another = self
                .store
                .territories_owned_by(state.attacker)
                .iter()
                .any(|t| t.id != territory.id && t.fortification_level == MAX_FORTIFICATION_LEVEL);
            if holds_another {
                territory.fortification_level = MAX_FORTIFICATION_LEVEL - 1;
                self.note(
                    state,
                    "The captured citadel is reduced; only one may be held".to_string(),
                );
            }
        }

        territory.owner = Some(state.attacker);
        for id in &state.attacker_units {
            if let Some(mut unit) = self.store.thing(*id) {
                unit.territory = Some(territory.id);
                unit.location = ThingLocation::Board;
                self.store.put_thing(unit);
            }
        }
        self.note(state, "The attacker captures the territory".to_string());
    }
}
