use thiserror::Error;

use crate::core::types::{GameId, PlayerId, TerritoryId, ThingId};

#[derive(Error, Debug)]
pub enum WarError {
    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    #[error("Territory not found: {0}")]
    TerritoryNotFound(TerritoryId),

    #[error("Thing not found: {0}")]
    ThingNotFound(ThingId),

    #[error("Can only attack during WAR phase")]
    WrongPhase,

    #[error("War has been suspended for this turn")]
    WarSuspended,

    #[error("You don't own the source territory")]
    NotYourTerritory,

    #[error("Cannot attack unowned territory")]
    NoOwner,

    #[error("You can't attack yourself")]
    SelfAttack,

    #[error("Invalid units selected")]
    InvalidUnitSelection,

    #[error("Unit {0} is not on the source territory")]
    UnitNotOnSourceTerritory(ThingId),

    #[error("A combat is already in progress in this game")]
    CombatAlreadyActive,

    #[error("No active combat")]
    NoActiveCombat,

    #[error("No casualties are pending")]
    NoCasualtiesPending,

    #[error("These casualties belong to another player")]
    NotYourCasualties,

    #[error("Must assign exactly {expected} hits, got {actual}")]
    MustAssignAllHits { expected: u32, actual: usize },

    #[error("Invalid casualty selection: {0}")]
    InvalidCasualtySelection(ThingId),

    #[error("No rolls to modify")]
    NoRollsToModify,

    #[error("Roll index {0} is out of range")]
    InvalidRollIndex(usize),

    #[error("Delta must be +1 or -1, got {0}")]
    InvalidDelta(i8),

    #[error("Magic item not found in hand")]
    ItemNotInHand,

    #[error("You cannot cast magic while dispelled")]
    Dispelled,

    #[error("Invalid target for {0}")]
    InvalidItemTarget(&'static str),

    #[error("{0} cannot be used now")]
    ItemNotUsableNow(&'static str),

    #[error("No dead units to revive")]
    NoDeadToRevive,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WarError>;
