//! Dice rolling and roll records
//!
//! Every die rolled in a stage is kept with the threshold it needed, so the
//! stage can later be recounted without touching the roller again.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::combat::constants::{DIE_FACES, FORT_HIT_THRESHOLD};
use crate::core::types::ThingId;

/// Source of randomness for the engine
pub trait DiceRoller {
    /// Roll one six-sided die (1..=6)
    fn roll_d6(&mut self) -> u8;

    /// Pick uniformly from `0..len`; `len` is never zero
    fn choose_index(&mut self, len: usize) -> usize;

    /// A 50/50 saving roll: even faces save
    fn saving_roll(&mut self) -> bool {
        self.roll_d6() % 2 == 0
    }
}

/// Dice driven by a seeded ChaCha stream
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: ChaCha8Rng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed from the OS when no seed is configured
    pub fn from_config_seed(seed: Option<u64>) -> Self {
        Self::new(seed.unwrap_or_else(|| rand::random()))
    }
}

impl DiceRoller for SeededDice {
    fn roll_d6(&mut self) -> u8 {
        self.rng.gen_range(1..=DIE_FACES)
    }

    fn choose_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed sequence of faces
///
/// Used to replay recorded sessions. When the script runs out the dice fall
/// back to a seeded stream. Index picks always come from the stream.
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    faces: VecDeque<u8>,
    fallback: SeededDice,
}

impl ScriptedDice {
    pub fn new(faces: impl IntoIterator<Item = u8>) -> Self {
        Self {
            faces: faces
                .into_iter()
                .map(|f| f.clamp(1, DIE_FACES))
                .collect(),
            fallback: SeededDice::new(0),
        }
    }

    /// Append more faces to the end of the script
    pub fn push(&mut self, faces: impl IntoIterator<Item = u8>) {
        self.faces
            .extend(faces.into_iter().map(|f| f.clamp(1, DIE_FACES)));
    }

    pub fn remaining(&self) -> usize {
        self.faces.len()
    }
}

impl DiceRoller for ScriptedDice {
    fn roll_d6(&mut self) -> u8 {
        match self.faces.pop_front() {
            Some(face) => face,
            None => self.fallback.roll_d6(),
        }
    }

    fn choose_index(&mut self, len: usize) -> usize {
        self.fallback.choose_index(len)
    }
}

/// One rolled die
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roll {
    /// Unit that rolled it; `None` for fortification dice
    pub unit: Option<ThingId>,
    pub value: u8,
    pub threshold: u8,
}

impl Roll {
    pub fn is_hit(&self) -> bool {
        self.value >= self.threshold
    }
}

/// Which list of a stage's rolls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollSide {
    Attacker,
    Defender,
    Fort,
}

/// Every die rolled in one stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollSheet {
    pub attacker: Vec<Roll>,
    pub defender: Vec<Roll>,
    pub fort: Vec<Roll>,
}

impl RollSheet {
    pub fn side(&self, side: RollSide) -> &[Roll] {
        match side {
            RollSide::Attacker => &self.attacker,
            RollSide::Defender => &self.defender,
            RollSide::Fort => &self.fort,
        }
    }

    pub fn side_mut(&mut self, side: RollSide) -> &mut Vec<Roll> {
        match side {
            RollSide::Attacker => &mut self.attacker,
            RollSide::Defender => &mut self.defender,
            RollSide::Fort => &mut self.fort,
        }
    }

    pub fn attacker_hits(&self) -> u32 {
        count_hits(&self.attacker)
    }

    /// Defending units plus fortification dice
    pub fn defender_hits(&self) -> u32 {
        count_hits(&self.defender) + count_hits(&self.fort)
    }

    pub fn fort_hits(&self) -> u32 {
        count_hits(&self.fort)
    }

    pub fn is_empty(&self) -> bool {
        self.attacker.is_empty() && self.defender.is_empty() && self.fort.is_empty()
    }
}

pub fn count_hits(rolls: &[Roll]) -> u32 {
    rolls.iter().filter(|r| r.is_hit()).count() as u32
}

/// Roll `count` dice for one unit against `threshold`
pub fn roll_pool(
    dice: &mut impl DiceRoller,
    unit: Option<ThingId>,
    count: u32,
    threshold: u8,
) -> Vec<Roll> {
    (0..count)
        .map(|_| Roll {
            unit,
            value: dice.roll_d6(),
            threshold,
        })
        .collect()
}

/// One die per remaining fortification point, hitting on a six
pub fn roll_fort_dice(dice: &mut impl DiceRoller, fort_remaining: u32) -> Vec<Roll> {
    roll_pool(dice, None, fort_remaining, FORT_HIT_THRESHOLD)
}
