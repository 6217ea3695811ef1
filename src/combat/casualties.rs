//! Casualty ledger and hit application
//!
//! Hits are never applied straight to units. They first wear down the
//! fortification pool, then become a pending entry naming who must choose
//! and from which units.

use ahash::AHashMap;

use crate::combat::constants::FLYER_HIT_CAPACITY;
use crate::combat::dice::DiceRoller;
use crate::combat::state::{CombatSide, FallenUnit, FiringStage, PendingCasualty};
use crate::combat::template::{Ability, Template};
use crate::core::error::{Result, WarError};
use crate::core::types::{Phase, PlayerId, ThingId};
use crate::store::records::{ThingLocation, ThingRecord};
use crate::store::RecordStore;

/// Split of attacker hits between the fortification and the defenders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Absorption {
    pub absorbed: u32,
    pub fort_remaining: u32,
    /// Hits that reach the defending units
    pub carried: u32,
}

pub fn absorb_with_fort(hits: u32, fort_remaining: u32) -> Absorption {
    let absorbed = hits.min(fort_remaining);
    Absorption {
        absorbed,
        fort_remaining: fort_remaining - absorbed,
        carried: hits - absorbed,
    }
}

/// Hits one unit can soak up in a single batch
pub fn hit_capacity(template: Template, damage: u32) -> u32 {
    if template.has(Ability::Flying) {
        FLYER_HIT_CAPACITY
    } else {
        template.properties().hit_points.saturating_sub(damage).max(1)
    }
}

/// Units that may be chosen as casualties this stage
pub fn eligible_units(units: &[ThingRecord], stage: FiringStage) -> Vec<&ThingRecord> {
    units
        .iter()
        .filter(|u| !(stage == FiringStage::Ranged && u.template.has(Ability::RangedImmune)))
        .collect()
}

/// Per-unit capacity of a candidate set, keyed by id
pub fn capacities(
    units: &[&ThingRecord],
    damage: &std::collections::BTreeMap<ThingId, u32>,
) -> AHashMap<ThingId, u32> {
    units
        .iter()
        .map(|u| {
            let taken = damage.get(&u.id).copied().unwrap_or(0);
            (u.id, hit_capacity(u.template, taken))
        })
        .collect()
}

/// A batch of hits ready to be handed to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitBatch {
    pub side: CombatSide,
    pub hits: u32,
    pub eligible: Vec<ThingId>,
    /// Hits beyond what the eligible units can take
    pub wasted: u32,
}

/// Build the batch for `hits` landing on `units`; `None` when nothing lands
pub fn build_batch(
    side: CombatSide,
    stage: FiringStage,
    hits: u32,
    units: &[ThingRecord],
    damage: &std::collections::BTreeMap<ThingId, u32>,
) -> Option<HitBatch> {
    if hits == 0 {
        return None;
    }
    let eligible = eligible_units(units, stage);
    let total: u32 = capacities(&eligible, damage).values().sum();
    let applied = hits.min(total);
    if applied == 0 {
        tracing::warn!("{} hits on the {:?} side wasted: no eligible units", hits, side);
        return None;
    }
    Some(HitBatch {
        side,
        hits: applied,
        eligible: eligible.iter().map(|u| u.id).collect(),
        wasted: hits - applied,
    })
}

impl HitBatch {
    pub fn into_pending(self, player: PlayerId, stage: FiringStage) -> PendingCasualty {
        PendingCasualty {
            player,
            side: self.side,
            stage,
            hits: self.hits,
            eligible: self.eligible,
        }
    }
}

/// Check a player's picks against the head entry and group them per unit
///
/// Picks are a multiset: naming a unit twice puts two hits on it.
pub fn validate_assignment(
    entry: &PendingCasualty,
    picks: &[ThingId],
    capacity: &AHashMap<ThingId, u32>,
) -> Result<Vec<(ThingId, u32)>> {
    if picks.len() != entry.hits as usize {
        return Err(WarError::MustAssignAllHits {
            expected: entry.hits,
            actual: picks.len(),
        });
    }

    let mut grouped: Vec<(ThingId, u32)> = Vec::new();
    for id in picks {
        if !entry.eligible.contains(id) {
            return Err(WarError::InvalidCasualtySelection(*id));
        }
        match grouped.iter_mut().find(|(unit, _)| unit == id) {
            Some((_, count)) => *count += 1,
            None => grouped.push((*id, 1)),
        }
    }

    for (id, count) in &grouped {
        let room = capacity.get(id).copied().unwrap_or(0);
        if *count > room {
            return Err(WarError::InvalidCasualtySelection(*id));
        }
    }

    Ok(grouped)
}

/// Pick casualties for the guardian pool, uniformly among units with room left
pub fn auto_assign(
    dice: &mut impl DiceRoller,
    batch: &HitBatch,
    capacity: &AHashMap<ThingId, u32>,
) -> Vec<(ThingId, u32)> {
    let mut room: Vec<(ThingId, u32)> = batch
        .eligible
        .iter()
        .map(|id| (*id, capacity.get(id).copied().unwrap_or(0)))
        .collect();
    let mut grouped: Vec<(ThingId, u32)> = Vec::new();

    for _ in 0..batch.hits {
        let open: Vec<usize> = (0..room.len()).filter(|i| room[*i].1 > 0).collect();
        if open.is_empty() {
            break;
        }
        let slot = open[dice.choose_index(open.len())];
        room[slot].1 -= 1;
        let id = room[slot].0;
        match grouped.iter_mut().find(|(unit, _)| *unit == id) {
            Some((_, count)) => *count += 1,
            None => grouped.push((id, 1)),
        }
    }
    grouped
}

/// What a batch of hits did to one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Killed,
    Wounded { damage: u32 },
    /// Flyer dodged a single hit
    Saved,
}

pub fn resolve_hits(
    dice: &mut impl DiceRoller,
    template: Template,
    prior_damage: u32,
    hits: u32,
) -> HitOutcome {
    if template.has(Ability::Flying) {
        if hits >= FLYER_HIT_CAPACITY || !dice.saving_roll() {
            HitOutcome::Killed
        } else {
            HitOutcome::Saved
        }
    } else {
        let damage = prior_damage + hits;
        if damage >= template.properties().hit_points {
            HitOutcome::Killed
        } else {
            HitOutcome::Wounded { damage }
        }
    }
}

/// Where a slain unit ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Burial {
    /// Guardians stay in the neutral pool until the fight ends
    LeftInPool,
    Bank,
    WarDead,
    Discard,
}

/// Move a slain unit and its attachments off the field
///
/// Returns the records as they were, so a recount can put them back.
pub fn bury<S: RecordStore>(store: &mut S, phase: Phase, unit: ThingRecord) -> (FallenUnit, Burial) {
    let attachments = store.things_attached_to(unit.id);
    for item in &attachments {
        let mut item = item.clone();
        item.return_to_deck();
        store.put_thing(item);
    }

    let original = unit.clone();
    let burial = match unit.owner {
        None => Burial::LeftInPool,
        Some(_) if unit.template.is_special() => Burial::Bank,
        Some(owner) if phase == Phase::War && holds_talisman(store, owner) => Burial::WarDead,
        Some(_) => Burial::Discard,
    };

    let mut unit = unit;
    match burial {
        Burial::LeftInPool => {}
        Burial::Bank => {
            unit.location = ThingLocation::Bank;
            unit.owner = None;
            unit.territory = None;
        }
        Burial::WarDead => {
            unit.location = ThingLocation::WarDead;
            unit.territory = None;
        }
        Burial::Discard => {
            unit.location = ThingLocation::Discard;
            unit.territory = None;
        }
    }
    let resting = unit.location;
    if burial != Burial::LeftInPool {
        store.put_thing(unit);
    }

    (
        FallenUnit {
            unit: original,
            attachments,
            resting,
        },
        burial,
    )
}

fn holds_talisman<S: RecordStore>(store: &S, owner: PlayerId) -> bool {
    store
        .things_held(owner, ThingLocation::Hand)
        .iter()
        .any(|t| t.template == Template::Talisman)
}

/// Put fallen units and their items back exactly as they were
///
/// A unit that has left its resting place since it fell (a talisman brought
/// it back to hand) stays where it is; its id is returned instead.
pub fn restore_fallen<S: RecordStore>(store: &mut S, fallen: &[FallenUnit]) -> Vec<ThingId> {
    let mut moved_on = Vec::new();
    for record in fallen.iter().rev() {
        let id = record.unit.id;
        let still_resting = store
            .thing(id)
            .map(|now| now.location == record.resting)
            .unwrap_or(false);
        if !still_resting {
            tracing::debug!("{} has moved on since it fell and is not restored", record.unit.template);
            moved_on.push(id);
            continue;
        }
        store.put_thing(record.unit.clone());
        for item in &record.attachments {
            let untouched = store
                .thing(item.id)
                .map(|now| now.location == ThingLocation::Deck)
                .unwrap_or(false);
            if untouched {
                store.put_thing(item.clone());
            }
        }
    }
    moved_on
}
