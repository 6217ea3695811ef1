//! Record store boundary
//!
//! The durable store belongs to the game server. The engine only needs
//! consistent get/put access plus a transactional section around each
//! operation.

pub mod memory;
pub mod records;

pub use memory::MemoryStore;
pub use records::{
    Dispel, GameRecord, LandLocation, PlayerRecord, Settlement, SettlementKind, TerritoryRecord,
    ThingLocation, ThingRecord,
};

use crate::core::types::{GameId, PlayerId, TerritoryId, ThingId};

/// Transactional key/attribute store for game, player, territory and thing records
///
/// Query results must come back in a stable order (the order records were
/// first stored) so that casualty queues and dice consumption are
/// reproducible.
pub trait RecordStore {
    fn game(&self, id: GameId) -> Option<GameRecord>;
    fn put_game(&mut self, game: GameRecord);

    fn player(&self, id: PlayerId) -> Option<PlayerRecord>;
    fn put_player(&mut self, player: PlayerRecord);

    fn territory(&self, id: TerritoryId) -> Option<TerritoryRecord>;
    fn put_territory(&mut self, territory: TerritoryRecord);
    fn territories_owned_by(&self, owner: PlayerId) -> Vec<TerritoryRecord>;

    fn thing(&self, id: ThingId) -> Option<ThingRecord>;
    fn put_thing(&mut self, thing: ThingRecord);
    /// Things at `location` on a territory
    fn things_at(&self, territory: TerritoryId, location: ThingLocation) -> Vec<ThingRecord>;
    /// Items attached to a unit
    fn things_attached_to(&self, unit: ThingId) -> Vec<ThingRecord>;
    /// Things a player owns at `location` (hand, war-dead, ...)
    fn things_held(&self, owner: PlayerId, location: ThingLocation) -> Vec<ThingRecord>;

    /// Run `f` as one atomic read-modify-write
    ///
    /// Changes made by `f` are kept when it returns `Ok` and discarded when it
    /// returns `Err`.
    fn transaction<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        Self: Sized;
}
