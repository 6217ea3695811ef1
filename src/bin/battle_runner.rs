//! Headless Battle Runner
//!
//! Plays many seeded battles of a preset match-up in parallel and prints win
//! statistics. Every battle gets its own store; casualties are taken from the
//! front of each eligible list.

use clap::{Parser, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use realm_war::combat::casualties::hit_capacity;
use realm_war::combat::{CombatEngine, FinishedCombat, SeededDice, StepOutcome, Template, Victor};
use realm_war::core::types::{GameId, Phase, PlayerId, Terrain, ThingId};
use realm_war::store::{MemoryStore, RecordStore, Settlement, SettlementKind, ThingLocation};
use realm_war::{CombatConfig, Result};

/// Steps after which a battle is abandoned; a real battle needs a handful
const MAX_STEPS: usize = 64;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Matchup {
    /// Knights and archers storm a fortified village on the plains
    Raid,
    /// Siege specialists and trolls against a dwarven mountain hold
    Siege,
    /// Elves claim a forest guarded by beasts
    Fight,
}

/// Headless Battle Runner - seeded battles for balance checks
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run seeded battles of a preset match-up and report win rates")]
struct Args {
    #[arg(long, value_enum, default_value = "raid")]
    matchup: Matchup,

    /// Number of battles to play
    #[arg(long, default_value_t = 1000)]
    battles: u64,

    /// Base seed; battle i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Optional TOML combat config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print the battle log of the first battle to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Debug)]
struct BattleReport {
    victor: Victor,
    attacker_survivors: usize,
    defender_survivors: usize,
    steps: usize,
    log: Vec<String>,
}

impl BattleReport {
    fn new(done: FinishedCombat, steps: usize) -> Self {
        Self {
            victor: done.victor,
            attacker_survivors: done.state.attacker_units.len(),
            defender_survivors: done.state.defender_units.len(),
            steps,
            log: done.state.log,
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    matchup: String,
    battles: u64,
    attacker_wins: u64,
    defender_wins: u64,
    attacker_win_rate: f64,
    mean_attacker_survivors: f64,
    mean_steps: f64,
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => CombatConfig::load(path)?,
        None => CombatConfig::default(),
    };
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .init();

    let seed = args.seed.unwrap_or_else(|| rand::random());
    tracing::info!(
        "Running {} {:?} battles from seed {}",
        args.battles,
        args.matchup,
        seed
    );

    let reports = (0..args.battles)
        .into_par_iter()
        .map(|i| play(args.matchup, &config, seed.wrapping_add(i)))
        .collect::<Result<Vec<_>>>()?;

    if args.verbose {
        if let Some(first) = reports.first() {
            eprintln!("=== Battle 0 ===");
            for line in &first.log {
                eprintln!("  {}", line);
            }
            eprintln!();
        }
    }

    let summary = summarize(&args, seed, &reports);
    match args.format.as_str() {
        "text" => {
            println!("Battle Summary ({})", summary.matchup);
            println!("==============");
            println!("Battles: {}", summary.battles);
            println!("Attacker wins: {} ({:.1}%)", summary.attacker_wins, summary.attacker_win_rate * 100.0);
            println!("Defender wins: {}", summary.defender_wins);
            println!("Mean attacker survivors: {:.2}", summary.mean_attacker_survivors);
            println!("Mean steps: {:.2}", summary.mean_steps);
            println!("Seed: {}", summary.seed);
        }
        other => {
            if other != "json" {
                eprintln!("Unknown format '{}', defaulting to json", other);
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

fn summarize(args: &Args, seed: u64, reports: &[BattleReport]) -> Summary {
    let battles = reports.len().max(1) as f64;
    let attacker_wins = reports
        .iter()
        .filter(|r| r.victor == Victor::Attacker)
        .count() as u64;
    Summary {
        matchup: format!("{:?}", args.matchup),
        battles: reports.len() as u64,
        attacker_wins,
        defender_wins: reports.len() as u64 - attacker_wins,
        attacker_win_rate: attacker_wins as f64 / battles,
        mean_attacker_survivors: reports.iter().map(|r| r.attacker_survivors).sum::<usize>() as f64
            / battles,
        mean_steps: reports.iter().map(|r| r.steps).sum::<usize>() as f64 / battles,
        seed,
    }
}

fn play(matchup: Matchup, config: &CombatConfig, seed: u64) -> Result<BattleReport> {
    let mut store = MemoryStore::new();
    let game = store.add_game(Phase::War);
    let red = store.add_player(game, "Red");
    let blue = store.add_player(game, "Blue");

    let mut engine = CombatEngine::new(store, SeededDice::new(seed), config.clone());
    setup(&mut engine, matchup, game, red, blue)?;

    for step in 1..=MAX_STEPS {
        match engine.advance_step(game)? {
            StepOutcome::Finished(done) => return Ok(BattleReport::new(done, step)),
            StepOutcome::Ongoing(mut state) => {
                while let Some(entry) = state.pending_casualties().first().cloned() {
                    let picks =
                        front_picks(engine.store(), &entry.eligible, entry.hits, &state.unit_damage);
                    match engine.assign_casualties(game, entry.player, &picks)? {
                        StepOutcome::Ongoing(next) => state = next,
                        StepOutcome::Finished(done) => return Ok(BattleReport::new(done, step)),
                    }
                }
            }
        }
    }

    tracing::warn!("Battle with seed {} did not finish in {} steps", seed, MAX_STEPS);
    Ok(BattleReport {
        victor: Victor::Defender,
        attacker_survivors: 0,
        defender_survivors: 0,
        steps: MAX_STEPS,
        log: Vec::new(),
    })
}

/// Load hits onto eligible units from the front, each up to its capacity
fn front_picks(
    store: &MemoryStore,
    eligible: &[ThingId],
    hits: u32,
    damage: &BTreeMap<ThingId, u32>,
) -> Vec<ThingId> {
    let mut picks = Vec::with_capacity(hits as usize);
    for id in eligible {
        let Some(unit) = store.thing(*id) else { continue };
        let taken = damage.get(id).copied().unwrap_or(0);
        let room = hit_capacity(unit.template, taken);
        for _ in 0..room {
            if picks.len() == hits as usize {
                return picks;
            }
            picks.push(*id);
        }
    }
    picks
}

fn setup(
    engine: &mut CombatEngine<MemoryStore, SeededDice>,
    matchup: Matchup,
    game: GameId,
    red: PlayerId,
    blue: PlayerId,
) -> Result<()> {
    let store = engine.store_mut();
    match matchup {
        Matchup::Raid => {
            let home = store.add_territory(game, Some(red), Terrain::Plains);
            let land = store.add_territory(game, Some(blue), Terrain::Plains);
            if let Some(mut record) = store.territory(land) {
                record.fortification_level = 1;
                record.settlement = Some(Settlement::new(SettlementKind::Village));
                store.put_territory(record);
            }
            let attackers: Vec<ThingId> = [Template::Knights, Template::Knights, Template::Archers]
                .into_iter()
                .map(|t| store.add_unit(game, red, t, home))
                .collect();
            for t in [Template::Swordsmen, Template::Archers, Template::MenAtArms] {
                store.add_unit(game, blue, t, land);
            }
            engine.declare_attack(game, red, home, land, &attackers)?;
        }
        Matchup::Siege => {
            let home = store.add_territory(game, Some(red), Terrain::Mountain);
            let land = store.add_territory(game, Some(blue), Terrain::Mountain);
            if let Some(mut record) = store.territory(land) {
                record.fortification_level = 3;
                store.put_territory(record);
            }
            let attackers: Vec<ThingId> = [
                Template::SiegeEngineer,
                Template::MasterSapper,
                Template::Troll,
                Template::Troll,
            ]
            .into_iter()
            .map(|t| store.add_unit(game, red, t, home))
            .collect();
            for t in [Template::Dwarf, Template::Dwarf, Template::DwarfKing] {
                store.add_unit(game, blue, t, land);
            }
            engine.declare_attack(game, red, home, land, &attackers)?;
        }
        Matchup::Fight => {
            let land = store.add_territory(game, None, Terrain::Forest);
            let attackers: Vec<ThingId> = [Template::Elf, Template::Elf, Template::ElfLord]
                .into_iter()
                .map(|t| store.add_thing(game, Some(red), t, ThingLocation::Board, None))
                .collect();
            let guardians: Vec<ThingId> = [Template::Bear, Template::WolfPack]
                .into_iter()
                .map(|t| store.add_thing(game, None, t, ThingLocation::Deck, None))
                .collect();
            engine.start_neutral_fight(game, red, land, &guardians, &attackers)?;
        }
    }
    Ok(())
}
