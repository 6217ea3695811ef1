use ahash::AHashSet;

use crate::combat::dice::{DiceRoller, RollSide};
use crate::combat::engine::{run_combat, CombatEngine};
use crate::combat::resolution::abandon_combat;
use crate::combat::state::{CombatState, StepOutcome};
use crate::combat::template::Template;
use crate::core::error::{Result, WarError};
use crate::core::types::{GameId, Phase, PlayerId, TerritoryId, ThingId};
use crate::store::records::{Dispel, ThingLocation};
use crate::store::RecordStore;

/// What an item is pointed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemTarget {
    None,
    /// Sword or bow bearer
    Unit(ThingId),
    /// Lucky charm: one die of the last stage
    Roll {
        side: RollSide,
        index: usize,
        delta: i8,
    },
    /// Dispel victim
    Player(PlayerId),
    /// Fire wall location
    Territory(TerritoryId),
    /// Talisman picks from the war dead; empty revives in pool order
    Revive(Vec<ThingId>),
}

/// What happened when an item was used
#[derive(Debug, Clone, PartialEq)]
pub enum ItemEffect {
    Attached { unit: ThingId },
    RollAdjusted(StepOutcome),
    CombatCancelled,
    WarSuspended,
    Dispelled { player: PlayerId },
    FireWall { territory: TerritoryId, value: u32 },
    Revived(Vec<ThingId>),
}

impl<S: RecordStore, D: DiceRoller> CombatEngine<S, D> {
    /// Play a magic item from `player`'s hand
    pub fn use_magic_item(
        &mut self,
        game: GameId,
        player: PlayerId,
        item: ThingId,
        target: ItemTarget,
    ) -> Result<ItemEffect> {
        let Self {
            store,
            dice,
            config,
        } = self;

        store.transaction(|tx| {
            let mut record = tx.game(game).ok_or(WarError::GameNotFound(game))?;
            let mut thing = tx
                .thing(item)
                .filter(|t| t.game == game)
                .ok_or(WarError::ItemNotInHand)?;
            if thing.owner != Some(player)
                || thing.location != ThingLocation::Hand
                || thing.template.is_combatant()
            {
                return Err(WarError::ItemNotInHand);
            }
            if record.is_dispelled(player) {
                return Err(WarError::Dispelled);
            }
            let name = thing.template.name();

            let effect = match (thing.template, target) {
                (Template::MagicSword | Template::MagicBow, ItemTarget::Unit(bearer)) => {
                    let unit = tx
                        .thing(bearer)
                        .filter(|u| u.game == game)
                        .ok_or(WarError::InvalidItemTarget(name))?;
                    let on_board = unit.owner == Some(player)
                        && unit.location == ThingLocation::Board
                        && unit.template.is_combatant();
                    let already_armed = tx
                        .things_attached_to(bearer)
                        .iter()
                        .any(|a| a.template == thing.template);
                    if !on_board || already_armed {
                        return Err(WarError::InvalidItemTarget(name));
                    }
                    thing.location = ThingLocation::Board;
                    thing.territory = unit.territory;
                    thing.attached_to = Some(bearer);
                    tx.put_thing(thing);
                    tracing::debug!("{} attached to {}", name, unit.template);
                    return Ok(ItemEffect::Attached { unit: bearer });
                }

                (Template::LuckyCharm, ItemTarget::Roll { side, index, delta }) => {
                    let outcome = run_combat(tx, dice, config, game, |ctx, state| {
                        ctx.nudge_roll(state, side, index, delta)
                    })?;
                    ItemEffect::RollAdjusted(outcome)
                }

                (Template::DustOfDefense, ItemTarget::None) => {
                    let blob = record.combat_state.take().ok_or(WarError::NoActiveCombat)?;
                    abandon_combat(&mut *tx, &CombatState::decode(&blob)?)?;
                    tx.put_game(record);
                    tracing::info!("Player {} cancels the combat with dust of defense", player);
                    ItemEffect::CombatCancelled
                }

                (Template::ScrollOfMist, ItemTarget::None) => {
                    record.war_suspended = true;
                    if let Some(blob) = record.combat_state.take() {
                        abandon_combat(&mut *tx, &CombatState::decode(&blob)?)?;
                    }
                    tx.put_game(record);
                    tracing::info!("Player {} suspends the war for this turn", player);
                    ItemEffect::WarSuspended
                }

                (Template::ScrollOfDispel, ItemTarget::Player(victim)) => {
                    tx.player(victim)
                        .filter(|p| p.game == game)
                        .ok_or(WarError::PlayerNotFound(victim))?;
                    record.dispel = Some(Dispel {
                        player: victim,
                        phase: record.phase,
                    });
                    tx.put_game(record);
                    ItemEffect::Dispelled { player: victim }
                }

                (Template::ScrollOfFireWall, ItemTarget::Territory(at)) => {
                    if record.phase != Phase::War {
                        return Err(WarError::ItemNotUsableNow(name));
                    }
                    let mut territory = tx
                        .territory(at)
                        .filter(|t| t.game == game)
                        .ok_or(WarError::TerritoryNotFound(at))?;
                    let value = dice.roll_d6() as u32;
                    territory.magic_fort_value = value;
                    tx.put_territory(territory);

                    if let Some(blob) = record.combat_state.as_deref() {
                        let mut state = CombatState::decode(blob)?;
                        if state.territory == at {
                            state.fort_remaining += value;
                            if let Some(last) = state.last_stage.as_mut() {
                                last.late_fort_bonus += value;
                            }
                            state.record(
                                format!("A wall of fire adds {} to the fortifications", value),
                                config.battle_log_limit,
                            );
                            record.combat_state = Some(state.encode()?);
                            tx.put_game(record);
                        }
                    }
                    ItemEffect::FireWall {
                        territory: at,
                        value,
                    }
                }

                (Template::Talisman, ItemTarget::Revive(picks)) => {
                    if record.phase != Phase::War {
                        return Err(WarError::ItemNotUsableNow(name));
                    }
                    let dead = tx.things_held(player, ThingLocation::WarDead);
                    if dead.is_empty() {
                        return Err(WarError::NoDeadToRevive);
                    }
                    if picks.iter().any(|id| !dead.iter().any(|d| d.id == *id)) {
                        return Err(WarError::InvalidItemTarget(name));
                    }

                    let count = (dice.roll_d6() as usize).min(dead.len());
                    let chosen: Vec<ThingId> = if picks.is_empty() {
                        dead.iter().take(count).map(|d| d.id).collect()
                    } else {
                        let mut seen = AHashSet::with_capacity(picks.len());
                        picks
                            .into_iter()
                            .filter(|id| seen.insert(*id))
                            .take(count)
                            .collect()
                    };
                    for unit in dead.into_iter().filter(|d| chosen.contains(&d.id)) {
                        let mut unit = unit;
                        unit.location = ThingLocation::Hand;
                        unit.territory = None;
                        tx.put_thing(unit);
                    }
                    tracing::debug!("Talisman revives {} units", chosen.len());
                    ItemEffect::Revived(chosen)
                }

                _ => return Err(WarError::InvalidItemTarget(name)),
            };

            thing.return_to_deck();
            tx.put_thing(thing);
            Ok(effect)
        })
    }
}
