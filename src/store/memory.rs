//! In-memory record store
//!
//! Backs tests and the headless runner. Each game gets its own store when run
//! in parallel; nothing is shared between stores.

use ahash::AHashMap;

use crate::combat::template::Template;
use crate::core::types::{GameId, Phase, PlayerId, Terrain, TerritoryId, ThingId};
use crate::store::records::{
    GameRecord, PlayerRecord, TerritoryRecord, ThingLocation, ThingRecord,
};
use crate::store::RecordStore;

/// A keyed table that iterates in insertion order
#[derive(Debug, Clone)]
struct Table<K: std::hash::Hash + Eq, V> {
    rows: AHashMap<K, V>,
    order: Vec<K>,
}

impl<K: std::hash::Hash + Eq + Copy, V> Table<K, V> {
    fn new() -> Self {
        Self {
            rows: AHashMap::new(),
            order: Vec::new(),
        }
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.rows.get(key)
    }

    fn put(&mut self, key: K, value: V) {
        if self.rows.insert(key, value).is_none() {
            self.order.push(key);
        }
    }

    fn iter(&self) -> impl Iterator<Item = &V> + '_ {
        self.order.iter().filter_map(|k| self.rows.get(k))
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Record store held entirely in memory
#[derive(Debug, Clone)]
pub struct MemoryStore {
    games: Table<GameId, GameRecord>,
    players: Table<PlayerId, PlayerRecord>,
    territories: Table<TerritoryId, TerritoryRecord>,
    things: Table<ThingId, ThingRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            games: Table::new(),
            players: Table::new(),
            territories: Table::new(),
            things: Table::new(),
        }
    }

    pub fn add_game(&mut self, phase: Phase) -> GameId {
        let id = GameId::new();
        self.games.put(id, GameRecord::new(id, phase));
        id
    }

    pub fn add_player(&mut self, game: GameId, name: &str) -> PlayerId {
        let id = PlayerId::new();
        self.players.put(
            id,
            PlayerRecord {
                id,
                game,
                name: name.to_string(),
                gold: 0,
            },
        );
        id
    }

    /// Add a territory on the board owned by `owner`
    pub fn add_territory(
        &mut self,
        game: GameId,
        owner: Option<PlayerId>,
        terrain: Terrain,
    ) -> TerritoryId {
        let mut territory = TerritoryRecord::new(game, terrain);
        territory.owner = owner;
        let id = territory.id;
        self.territories.put(id, territory);
        id
    }

    /// Add a thing; units placed with a territory are put on the board
    pub fn add_thing(
        &mut self,
        game: GameId,
        owner: Option<PlayerId>,
        template: Template,
        location: ThingLocation,
        territory: Option<TerritoryId>,
    ) -> ThingId {
        let mut thing = ThingRecord::new(game, template, location);
        thing.owner = owner;
        thing.territory = territory;
        let id = thing.id;
        self.things.put(id, thing);
        id
    }

    /// Shorthand for a player's unit standing on a territory
    pub fn add_unit(
        &mut self,
        game: GameId,
        owner: PlayerId,
        template: Template,
        territory: TerritoryId,
    ) -> ThingId {
        self.add_thing(game, Some(owner), template, ThingLocation::Board, Some(territory))
    }

    pub fn thing_count(&self) -> usize {
        self.things.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn game(&self, id: GameId) -> Option<GameRecord> {
        self.games.get(&id).cloned()
    }

    fn put_game(&mut self, game: GameRecord) {
        self.games.put(game.id, game);
    }

    fn player(&self, id: PlayerId) -> Option<PlayerRecord> {
        self.players.get(&id).cloned()
    }

    fn put_player(&mut self, player: PlayerRecord) {
        self.players.put(player.id, player);
    }

    fn territory(&self, id: TerritoryId) -> Option<TerritoryRecord> {
        self.territories.get(&id).cloned()
    }

    fn put_territory(&mut self, territory: TerritoryRecord) {
        self.territories.put(territory.id, territory);
    }

    fn territories_owned_by(&self, owner: PlayerId) -> Vec<TerritoryRecord> {
        self.territories
            .iter()
            .filter(|t| t.owner == Some(owner))
            .cloned()
            .collect()
    }

    fn thing(&self, id: ThingId) -> Option<ThingRecord> {
        self.things.get(&id).cloned()
    }

    fn put_thing(&mut self, thing: ThingRecord) {
        self.things.put(thing.id, thing);
    }

    fn things_at(&self, territory: TerritoryId, location: ThingLocation) -> Vec<ThingRecord> {
        self.things
            .iter()
            .filter(|t| t.territory == Some(territory) && t.location == location)
            .cloned()
            .collect()
    }

    fn things_attached_to(&self, unit: ThingId) -> Vec<ThingRecord> {
        self.things
            .iter()
            .filter(|t| t.attached_to == Some(unit))
            .cloned()
            .collect()
    }

    fn things_held(&self, owner: PlayerId, location: ThingLocation) -> Vec<ThingRecord> {
        self.things
            .iter()
            .filter(|t| t.owner == Some(owner) && t.location == location)
            .cloned()
            .collect()
    }

    fn transaction<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }
}
