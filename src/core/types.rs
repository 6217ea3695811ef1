//! Core type definitions used throughout the codebase

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

record_id!(
    /// Unique identifier for a game session
    GameId
);
record_id!(
    /// Unique identifier for a player seated in a game
    PlayerId
);
record_id!(
    /// Unique identifier for a land tile
    TerritoryId
);
record_id!(
    /// Unique identifier for a thing (unit, special character or magic item)
    ThingId
);

/// Turn phases of the game
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    Income,
    Events,
    Acquire,
    War,
}

/// Terrain printed on a land tile
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Forest,
    Plains,
    Mountain,
    Swamp,
    Desert,
}

/// Who fields a force in combat.
///
/// Guardians drawn for a FIGHT belong to nobody; they are represented by the
/// neutral deck rather than a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForceOwner {
    Player(PlayerId),
    NeutralDeck,
}

impl ForceOwner {
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            ForceOwner::Player(id) => Some(*id),
            ForceOwner::NeutralDeck => None,
        }
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, ForceOwner::NeutralDeck)
    }
}

impl std::fmt::Display for ForceOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForceOwner::Player(id) => write!(f, "{}", id),
            ForceOwner::NeutralDeck => write!(f, "neutral guardians"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = ThingId::new();
        let b = ThingId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_hash() {
        use std::collections::HashMap;
        let id = TerritoryId::new();
        let mut map: HashMap<TerritoryId, &str> = HashMap::new();
        map.insert(id, "plains");
        assert_eq!(map.get(&id), Some(&"plains"));
    }

    #[test]
    fn test_id_display_matches_uuid() {
        let id = PlayerId::new();
        assert_eq!(id.to_string(), id.0.to_string());
    }

    #[test]
    fn test_force_owner_player() {
        let player = PlayerId::new();
        assert_eq!(ForceOwner::Player(player).player(), Some(player));
        assert!(ForceOwner::NeutralDeck.player().is_none());
        assert!(ForceOwner::NeutralDeck.is_neutral());
    }
}
