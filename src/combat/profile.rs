//! Combat profile calculation
//!
//! Turns a unit's printed template, the ground it stands on, the leaders on
//! the field and its attached magic into the dice it throws this stage.

use crate::combat::constants::{
    BASE_HIT_THRESHOLD, EMPOWERED_HIT_THRESHOLD, LEADER_BONUS, MAGIC_HIT_THRESHOLD,
    NATIVE_TERRAIN_BONUS, SIEGE_PAIR_AUTO_HITS, SIEGE_SINGLE_AUTO_HITS,
};
use crate::combat::dice::{roll_pool, DiceRoller, Roll};
use crate::combat::state::{CombatSide, FiringStage};
use crate::combat::template::{Ability, Race, SiegeRole, Template};
use crate::core::types::{Terrain, ThingId};
use crate::store::records::ThingRecord;

/// A unit on the field together with the items it carries
#[derive(Debug, Clone)]
pub struct Fighter {
    pub unit: ThingRecord,
    pub attachments: Vec<ThingRecord>,
}

impl Fighter {
    pub fn carries(&self, item: Template) -> bool {
        self.attachments.iter().any(|a| a.template == item)
    }
}

/// Field conditions shared by one side's units
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub terrain: Terrain,
    pub side: CombatSide,
    /// Races led by a leader in this unit's own force
    pub friendly_leaders: Vec<Race>,
    /// Races led by a leader in the opposing force
    pub enemy_leaders: Vec<Race>,
    /// Owner is under a dispel this phase
    pub dispelled: bool,
}

/// Races commanded by the leaders in a force
pub fn leader_races(force: &[Fighter]) -> Vec<Race> {
    let mut races: Vec<Race> = force
        .iter()
        .filter_map(|f| f.unit.template.properties().leads)
        .collect();
    races.dedup();
    races
}

/// Effective combat numbers for one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatProfile {
    pub unit: ThingId,
    /// Dice before any charge roll
    pub dice: u32,
    pub threshold: u8,
    pub ranged: bool,
    pub charge: bool,
}

impl CombatProfile {
    /// Ranged units fire only in RANGED, everyone else only in MELEE
    pub fn fires_in(&self, stage: FiringStage) -> bool {
        match stage {
            FiringStage::Ranged => self.ranged,
            FiringStage::Melee => !self.ranged,
        }
    }

    /// Attackers with charge throw a d6 worth of extra dice in MELEE
    pub fn charges(&self, stage: FiringStage, side: CombatSide) -> bool {
        self.charge && stage == FiringStage::Melee && side == CombatSide::Attacker
    }
}

pub fn build_profile(fighter: &Fighter, ctx: &ProfileContext) -> CombatProfile {
    let props = fighter.unit.template.properties();

    let mut dice = props.combat;
    if props.terrain == Some(ctx.terrain) {
        dice += NATIVE_TERRAIN_BONUS;
    }
    if let Some(race) = props.race {
        if ctx.friendly_leaders.contains(&race) {
            dice += LEADER_BONUS;
        }
        if ctx.enemy_leaders.contains(&race) {
            dice = dice.saturating_sub(LEADER_BONUS);
        }
    }

    let mut ranged = fighter.unit.template.has(Ability::Ranged);
    let mut magic = fighter.unit.template.has(Ability::Magic);
    let mut threshold = if magic {
        MAGIC_HIT_THRESHOLD
    } else {
        BASE_HIT_THRESHOLD
    };

    if fighter.carries(Template::MagicBow) {
        if ranged {
            magic = true;
            threshold = threshold.min(MAGIC_HIT_THRESHOLD);
        } else {
            ranged = true;
        }
    }
    if fighter.carries(Template::MagicSword) {
        threshold = if magic {
            EMPOWERED_HIT_THRESHOLD
        } else {
            MAGIC_HIT_THRESHOLD
        };
    }
    if ctx.dispelled {
        threshold = BASE_HIT_THRESHOLD;
    }

    CombatProfile {
        unit: fighter.unit.id,
        dice,
        threshold,
        ranged,
        charge: fighter.unit.template.has(Ability::Charge),
    }
}

/// Roll every eligible unit of one force, in force order
///
/// A charging unit's extra-dice d6 is thrown right before its own dice.
pub fn roll_force(
    dice: &mut impl DiceRoller,
    force: &[Fighter],
    ctx: &ProfileContext,
    stage: FiringStage,
) -> Vec<Roll> {
    let mut rolls = Vec::new();
    for fighter in force {
        let profile = build_profile(fighter, ctx);
        if !profile.fires_in(stage) {
            continue;
        }
        let mut count = profile.dice;
        if profile.charges(stage, ctx.side) {
            count += dice.roll_d6() as u32;
        }
        rolls.extend(roll_pool(dice, Some(profile.unit), count, profile.threshold));
    }
    rolls
}

/// Fortification points siege specialists knock down before the dice fly
pub fn siege_auto_hits(attackers: &[Fighter], fort_remaining: u32) -> u32 {
    let has = |role: SiegeRole| {
        attackers
            .iter()
            .any(|f| f.unit.template.properties().siege == Some(role))
    };
    let auto = match (has(SiegeRole::Engineer), has(SiegeRole::Sapper)) {
        (true, true) if fort_remaining >= SIEGE_PAIR_AUTO_HITS => SIEGE_PAIR_AUTO_HITS,
        (false, false) => 0,
        _ => SIEGE_SINGLE_AUTO_HITS,
    };
    auto.min(fort_remaining)
}
