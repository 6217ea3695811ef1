//! Persisted combat state
//!
//! One `CombatState` exists per game while a battle is running. It travels
//! through the record store as a JSON blob and is decoded only here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::combat::dice::RollSheet;
use crate::core::error::Result;
use crate::core::types::{ForceOwner, PlayerId, TerritoryId, ThingId};
use crate::store::records::{ThingLocation, ThingRecord};

/// Stage of a running combat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Initiative,
    Ranged,
    Melee,
}

/// A stage in which dice are thrown at the enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FiringStage {
    Ranged,
    Melee,
}

impl From<FiringStage> for Stage {
    fn from(stage: FiringStage) -> Self {
        match stage {
            FiringStage::Ranged => Stage::Ranged,
            FiringStage::Melee => Stage::Melee,
        }
    }
}

impl std::fmt::Display for FiringStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FiringStage::Ranged => write!(f, "RANGED"),
            FiringStage::Melee => write!(f, "MELEE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatKind {
    /// Player against player; the winner keeps the land after saving rolls
    Pvp,
    /// Player against land guardians drawn from the cup
    Fight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatSide {
    Attacker,
    Defender,
}

/// A batch of hits waiting for its owner to pick casualties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCasualty {
    pub player: PlayerId,
    pub side: CombatSide,
    pub stage: FiringStage,
    pub hits: u32,
    /// Units that may be chosen
    pub eligible: Vec<ThingId>,
}

/// Non-empty, strictly ordered queue of pending casualties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PendingCasualty>", into = "Vec<PendingCasualty>")]
pub struct CasualtyQueue(Vec<PendingCasualty>);

impl CasualtyQueue {
    /// `None` when there is nothing to wait for
    pub fn from_entries(entries: Vec<PendingCasualty>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self(entries))
        }
    }

    pub fn head(&self) -> &PendingCasualty {
        &self.0[0]
    }

    pub fn entries(&self) -> &[PendingCasualty] {
        &self.0
    }

    /// Drop the head entry; `None` once the queue has drained
    pub fn pop(self) -> Option<Self> {
        let mut entries = self.0;
        entries.remove(0);
        Self::from_entries(entries)
    }
}

impl TryFrom<Vec<PendingCasualty>> for CasualtyQueue {
    type Error = String;

    fn try_from(entries: Vec<PendingCasualty>) -> std::result::Result<Self, Self::Error> {
        Self::from_entries(entries).ok_or_else(|| "casualty queue cannot be empty".to_string())
    }
}

impl From<CasualtyQueue> for Vec<PendingCasualty> {
    fn from(queue: CasualtyQueue) -> Self {
        queue.0
    }
}

/// Where the state machine stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Progress {
    Initiative,
    Ranged,
    Melee,
    /// Blocked on casualty picks for `stage`
    AwaitingCasualties {
        stage: FiringStage,
        queue: CasualtyQueue,
    },
}

/// A unit removed by a stage, with the records as they were before it fell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallenUnit {
    pub unit: ThingRecord,
    pub attachments: Vec<ThingRecord>,
    /// Where the unit was laid to rest
    pub resting: ThingLocation,
}

/// Everything needed to recount the most recently resolved stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: FiringStage,
    pub rolls: RollSheet,
    /// Fortification pool the stage rolled against
    pub fort_start: u32,
    /// Fortification knocked down by siege specialists before the dice
    #[serde(default)]
    pub siege_hits: u32,
    /// Fire wall points added after the dice were thrown
    pub late_fort_bonus: u32,
    pub attacker_units: Vec<ThingId>,
    pub defender_units: Vec<ThingId>,
    pub unit_damage: BTreeMap<ThingId, u32>,
    pub fallen: Vec<FallenUnit>,
    /// Casualty batches applied so far in this stage
    pub batches_applied: u32,
}

impl StageRecord {
    /// The stage took a unit's hit point or a point of fortification
    pub fn struck_home(&self) -> bool {
        self.batches_applied > 0
            || self.siege_hits > 0
            || self.rolls.attacker_hits().min(self.fort_start) > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    pub attacker: PlayerId,
    pub defender: ForceOwner,
    pub territory: TerritoryId,
    pub kind: CombatKind,
    /// Surviving attackers, in declaration order
    pub attacker_units: Vec<ThingId>,
    /// Surviving defenders, in declaration order
    pub defender_units: Vec<ThingId>,
    /// Every defender present at declaration
    pub defender_roster: Vec<ThingId>,
    pub progress: Progress,
    pub fort_remaining: u32,
    /// Non-lethal damage on multi-hit-point units
    pub unit_damage: BTreeMap<ThingId, u32>,
    /// Siege specialists have already knocked down walls this combat
    pub auto_fort_applied: bool,
    /// Computed and logged; nothing downstream reads it
    pub initiative: Option<CombatSide>,
    pub last_stage: Option<StageRecord>,
    pub log: Vec<String>,
}

impl CombatState {
    pub fn new(
        attacker: PlayerId,
        defender: ForceOwner,
        territory: TerritoryId,
        kind: CombatKind,
        attacker_units: Vec<ThingId>,
        defender_units: Vec<ThingId>,
        fort_remaining: u32,
    ) -> Self {
        Self {
            attacker,
            defender,
            territory,
            kind,
            defender_roster: defender_units.clone(),
            attacker_units,
            defender_units,
            progress: Progress::Initiative,
            fort_remaining,
            unit_damage: BTreeMap::new(),
            auto_fort_applied: false,
            initiative: None,
            last_stage: None,
            log: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        match &self.progress {
            Progress::Initiative => Stage::Initiative,
            Progress::Ranged => Stage::Ranged,
            Progress::Melee => Stage::Melee,
            Progress::AwaitingCasualties { stage, .. } => (*stage).into(),
        }
    }

    /// Stage stuck waiting on casualty picks
    pub fn pending_stage(&self) -> Option<FiringStage> {
        match &self.progress {
            Progress::AwaitingCasualties { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn pending_casualties(&self) -> &[PendingCasualty] {
        match &self.progress {
            Progress::AwaitingCasualties { queue, .. } => queue.entries(),
            _ => &[],
        }
    }

    pub fn owner_of(&self, side: CombatSide) -> ForceOwner {
        match side {
            CombatSide::Attacker => ForceOwner::Player(self.attacker),
            CombatSide::Defender => self.defender,
        }
    }

    pub fn units(&self, side: CombatSide) -> &[ThingId] {
        match side {
            CombatSide::Attacker => &self.attacker_units,
            CombatSide::Defender => &self.defender_units,
        }
    }

    pub fn units_mut(&mut self, side: CombatSide) -> &mut Vec<ThingId> {
        match side {
            CombatSide::Attacker => &mut self.attacker_units,
            CombatSide::Defender => &mut self.defender_units,
        }
    }

    /// Append a battle log line, dropping the oldest past `limit`
    pub fn record(&mut self, line: impl Into<String>, limit: usize) {
        self.log.push(line.into());
        if self.log.len() > limit {
            let excess = self.log.len() - limit;
            self.log.drain(..excess);
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(blob: &str) -> Result<Self> {
        Ok(serde_json::from_str(blob)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Victor {
    Attacker,
    Defender,
}

/// A combat that has been resolved and removed from storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedCombat {
    pub state: CombatState,
    pub victor: Victor,
}

/// Result of any call that may move a combat forward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    Ongoing(CombatState),
    Finished(FinishedCombat),
}

impl StepOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, StepOutcome::Finished(_))
    }

    /// The state as it stands after the call
    pub fn state(&self) -> &CombatState {
        match self {
            StepOutcome::Ongoing(state) => state,
            StepOutcome::Finished(finished) => &finished.state,
        }
    }

    pub fn victor(&self) -> Option<Victor> {
        match self {
            StepOutcome::Ongoing(_) => None,
            StepOutcome::Finished(finished) => Some(finished.victor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> CombatState {
        CombatState::new(
            PlayerId::new(),
            ForceOwner::Player(PlayerId::new()),
            TerritoryId::new(),
            CombatKind::Pvp,
            vec![ThingId::new()],
            vec![ThingId::new(), ThingId::new()],
            2,
        )
    }

    fn entry(player: PlayerId) -> PendingCasualty {
        PendingCasualty {
            player,
            side: CombatSide::Defender,
            stage: FiringStage::Ranged,
            hits: 1,
            eligible: vec![ThingId::new()],
        }
    }

    #[test]
    fn test_new_state_starts_at_initiative() {
        let state = sample_state();
        assert_eq!(state.stage(), Stage::Initiative);
        assert_eq!(state.defender_roster, state.defender_units);
        assert!(state.pending_casualties().is_empty());
        assert!(state.pending_stage().is_none());
    }

    #[test]
    fn test_empty_queue_not_constructible() {
        assert!(CasualtyQueue::from_entries(vec![]).is_none());
    }

    #[test]
    fn test_queue_pops_in_order() {
        let first = PlayerId::new();
        let second = PlayerId::new();
        let queue = CasualtyQueue::from_entries(vec![entry(first), entry(second)]).unwrap();
        assert_eq!(queue.head().player, first);

        let queue = queue.pop().unwrap();
        assert_eq!(queue.head().player, second);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_awaiting_reports_pending_stage() {
        let mut state = sample_state();
        let queue = CasualtyQueue::from_entries(vec![entry(state.attacker)]).unwrap();
        state.progress = Progress::AwaitingCasualties {
            stage: FiringStage::Ranged,
            queue,
        };
        assert_eq!(state.stage(), Stage::Ranged);
        assert_eq!(state.pending_stage(), Some(FiringStage::Ranged));
        assert_eq!(state.pending_casualties().len(), 1);
    }

    #[test]
    fn test_blob_round_trip() {
        let mut state = sample_state();
        state.unit_damage.insert(state.attacker_units[0], 1);
        let blob = state.encode().unwrap();
        assert_eq!(CombatState::decode(&blob).unwrap(), state);
    }

    #[test]
    fn test_blob_with_empty_queue_rejected() {
        let mut state = sample_state();
        state.progress = Progress::AwaitingCasualties {
            stage: FiringStage::Melee,
            queue: CasualtyQueue::from_entries(vec![entry(state.attacker)]).unwrap(),
        };
        let blob = state.encode().unwrap().replace(
            &serde_json::to_string(state.pending_casualties()).unwrap(),
            "[]",
        );
        assert!(CombatState::decode(&blob).is_err());
    }

    #[test]
    fn test_log_is_capped() {
        let mut state = sample_state();
        for i in 0..5 {
            state.record(format!("line {}", i), 3);
        }
        assert_eq!(state.log, vec!["line 2", "line 3", "line 4"]);
    }
}
