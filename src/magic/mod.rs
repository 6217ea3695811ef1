//! Magic items that reach into the war
//!
//! Items are played from a player's hand. Weapons attach to a unit and stay
//! on the board; everything else takes effect at once and goes back into the
//! cup.

pub mod items;

pub use items::{ItemEffect, ItemTarget};
