//! Persisted records shared with the rest of the game server
//!
//! The combat engine reads and writes these through a `RecordStore`. Only the
//! attributes combat touches are modelled.

use serde::{Deserialize, Serialize};

use crate::combat::template::Template;
use crate::core::types::{GameId, Phase, PlayerId, Terrain, TerritoryId, ThingId};

/// Where a thing currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThingLocation {
    /// Undrawn, in the cup
    Deck,
    Hand,
    Board,
    Discard,
    /// Unowned special characters waiting to be recruited
    Bank,
    /// Drawn as land guardians for a FIGHT
    NeutralFight,
    /// Slain during war by a player holding a talisman
    WarDead,
}

/// Where a land tile currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LandLocation {
    Deck,
    Board,
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementKind {
    Village,
    Town,
    City,
    GoldMine,
    SilverMine,
    CopperMine,
}

impl SettlementKind {
    pub fn is_mine(&self) -> bool {
        matches!(
            self,
            SettlementKind::GoldMine | SettlementKind::SilverMine | SettlementKind::CopperMine
        )
    }

    /// Value printed on the counter
    pub fn printed_value(&self) -> u32 {
        match self {
            SettlementKind::Village => 1,
            SettlementKind::Town => 2,
            SettlementKind::City => 3,
            SettlementKind::CopperMine => 1,
            SettlementKind::SilverMine => 2,
            SettlementKind::GoldMine => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub kind: SettlementKind,
    pub value: u32,
}

impl Settlement {
    pub fn new(kind: SettlementKind) -> Self {
        Self {
            kind,
            value: kind.printed_value(),
        }
    }

    /// Mines produce gold but do not defend
    pub fn defense(&self) -> u32 {
        if self.kind.is_mine() {
            0
        } else {
            self.value
        }
    }
}

/// An active dispel: magic bonuses of `player` are void during `phase`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispel {
    pub player: PlayerId,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub phase: Phase,
    /// Serialized `CombatState`; decoded only by the combat engine
    pub combat_state: Option<String>,
    /// Set by the scroll of mist; no attacks for the rest of the turn
    pub war_suspended: bool,
    pub dispel: Option<Dispel>,
}

impl GameRecord {
    pub fn new(id: GameId, phase: Phase) -> Self {
        Self {
            id,
            phase,
            combat_state: None,
            war_suspended: false,
            dispel: None,
        }
    }

    /// Is `player` dispelled during the current phase?
    pub fn is_dispelled(&self, player: PlayerId) -> bool {
        self.dispel
            .map(|d| d.player == player && d.phase == self.phase)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub game: GameId,
    pub name: String,
    pub gold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryRecord {
    pub id: TerritoryId,
    pub game: GameId,
    pub owner: Option<PlayerId>,
    pub location: LandLocation,
    pub terrain: Terrain,
    /// 0 (none) to 4 (Gran Muniment)
    pub fortification_level: u8,
    pub settlement: Option<Settlement>,
    /// Temporary fire wall bonus
    pub magic_fort_value: u32,
}

impl TerritoryRecord {
    pub fn new(game: GameId, terrain: Terrain) -> Self {
        Self {
            id: TerritoryId::new(),
            game,
            owner: None,
            location: LandLocation::Board,
            terrain,
            fortification_level: 0,
            settlement: None,
            magic_fort_value: 0,
        }
    }

    /// Combined absorption pool at the start of a combat
    pub fn defense_pool(&self) -> u32 {
        self.fortification_level as u32
            + self.settlement.map(|s| s.defense()).unwrap_or(0)
            + self.magic_fort_value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThingRecord {
    pub id: ThingId,
    pub game: GameId,
    pub owner: Option<PlayerId>,
    pub location: ThingLocation,
    pub territory: Option<TerritoryId>,
    pub template: Template,
    /// Magic sword or bow carried by another unit
    pub attached_to: Option<ThingId>,
}

impl ThingRecord {
    pub fn new(game: GameId, template: Template, location: ThingLocation) -> Self {
        Self {
            id: ThingId::new(),
            game,
            owner: None,
            location,
            territory: None,
            template,
            attached_to: None,
        }
    }

    /// Back into the undrawn cup, unowned and detached
    pub fn return_to_deck(&mut self) {
        self.location = ThingLocation::Deck;
        self.owner = None;
        self.territory = None;
        self.attached_to = None;
    }
}
