//! Realm War - combat resolution for a territory-control board game
//!
//! Battles are resumable: every call loads the game's combat from the record
//! store, moves it one step and writes it back. A battle may sit waiting on a
//! player's casualty picks for as long as it takes.

pub mod combat;
pub mod core;
pub mod magic;
pub mod store;

pub use crate::combat::{CombatEngine, StepOutcome};
pub use crate::core::{CombatConfig, Result, WarError};
pub use crate::store::{MemoryStore, RecordStore};
