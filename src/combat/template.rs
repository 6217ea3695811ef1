//! Thing templates and their printed properties
//!
//! Every counter in the cup is one of these templates. Properties are a closed
//! match so a new template cannot silently fall through the combat rules.

use serde::{Deserialize, Serialize};

use crate::combat::constants::DEFAULT_HIT_POINTS;
use crate::core::types::Terrain;

/// Printed ability tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    Ranged,
    Charge,
    Magic,
    Flying,
    /// Arrows pass through it; never a ranged casualty
    RangedImmune,
}

/// Races that a leader can command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    Elf,
    Dwarf,
    Orc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThingKind {
    /// Drawn from the cup, fights, goes to discard when slain
    Character,
    /// Elite roster; slain specials return to the bank unowned
    Special,
    MagicItem,
}

/// Which siege specialist a template is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiegeRole {
    Engineer,
    Sapper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    // Characters
    MenAtArms,
    Axemen,
    Swordsmen,
    Archers,
    Knights,
    Elf,
    ElfLord,
    Dwarf,
    DwarfKing,
    Orc,
    OrcWarlord,
    Goblin,
    OldDragon,
    GiantSnake,
    Troll,
    Catapult,
    Bear,
    WolfPack,
    Griffon,
    Ghost,

    // Specials
    SwordMaster,
    SiegeEngineer,
    MasterSapper,
    MasterThief,
    AssassinPrimus,

    // Magic items
    MagicSword,
    MagicBow,
    LuckyCharm,
    Talisman,
    DustOfDefense,
    ScrollOfMist,
    ScrollOfDispel,
    ScrollOfFireWall,
}

/// Printed properties of a template
#[derive(Debug, Clone, Copy)]
pub struct TemplateProperties {
    pub name: &'static str,
    pub kind: ThingKind,
    /// Base combat dice
    pub combat: u32,
    pub abilities: &'static [Ability],
    /// Native terrain grants an extra die
    pub terrain: Option<Terrain>,
    pub race: Option<Race>,
    /// Race this template leads, if it is a leader
    pub leads: Option<Race>,
    pub hit_points: u32,
    pub siege: Option<SiegeRole>,
}

const fn character(
    name: &'static str,
    combat: u32,
    abilities: &'static [Ability],
    terrain: Option<Terrain>,
) -> TemplateProperties {
    TemplateProperties {
        name,
        kind: ThingKind::Character,
        combat,
        abilities,
        terrain,
        race: None,
        leads: None,
        hit_points: DEFAULT_HIT_POINTS,
        siege: None,
    }
}

const fn special(name: &'static str, combat: u32, terrain: Option<Terrain>) -> TemplateProperties {
    TemplateProperties {
        kind: ThingKind::Special,
        ..character(name, combat, &[], terrain)
    }
}

const fn item(name: &'static str) -> TemplateProperties {
    TemplateProperties {
        kind: ThingKind::MagicItem,
        ..character(name, 0, &[], None)
    }
}

impl Template {
    /// Get printed properties for this template
    pub fn properties(&self) -> TemplateProperties {
        use Ability::*;
        use Terrain::*;

        match self {
            Template::MenAtArms => character("Men-at-Arms", 1, &[], Some(Plains)),
            Template::Axemen => character("Axemen", 2, &[], Some(Mountain)),
            Template::Swordsmen => character("Swordsmen", 2, &[], Some(Plains)),
            Template::Archers => character("Archers", 1, &[Ranged], Some(Forest)),
            Template::Knights => character("Knights", 2, &[Charge], Some(Plains)),
            Template::Elf => TemplateProperties {
                race: Some(Race::Elf),
                ..character("Elf", 2, &[], Some(Forest))
            },
            Template::ElfLord => TemplateProperties {
                leads: Some(Race::Elf),
                ..character("Elf Lord", 3, &[Ranged], Some(Forest))
            },
            Template::Dwarf => TemplateProperties {
                race: Some(Race::Dwarf),
                ..character("Dwarf", 2, &[], Some(Mountain))
            },
            Template::DwarfKing => TemplateProperties {
                leads: Some(Race::Dwarf),
                ..character("Dwarf King", 3, &[], Some(Mountain))
            },
            Template::Orc => TemplateProperties {
                race: Some(Race::Orc),
                ..character("Orc", 2, &[], Some(Swamp))
            },
            Template::OrcWarlord => TemplateProperties {
                leads: Some(Race::Orc),
                ..character("Orc Warlord", 3, &[Charge], Some(Swamp))
            },
            Template::Goblin => character("Goblin", 1, &[], Some(Swamp)),
            Template::OldDragon => character("Old Dragon", 4, &[Flying, Magic], Some(Desert)),
            Template::GiantSnake => character("Giant Snake", 3, &[], Some(Swamp)),
            Template::Troll => character("Troll", 3, &[], None),
            Template::Catapult => character("Catapult", 4, &[Ranged], Some(Plains)),
            Template::Bear => character("Bear", 2, &[], Some(Forest)),
            Template::WolfPack => character("Wolf Pack", 3, &[Charge], Some(Forest)),
            Template::Griffon => character("Griffon", 2, &[Flying], Some(Mountain)),
            Template::Ghost => character("Ghost", 1, &[RangedImmune], Some(Swamp)),

            Template::SwordMaster => TemplateProperties {
                hit_points: 2,
                ..special("Sword Master", 4, Some(Plains))
            },
            Template::SiegeEngineer => TemplateProperties {
                siege: Some(SiegeRole::Engineer),
                ..special("Siege Engineer", 1, None)
            },
            Template::MasterSapper => TemplateProperties {
                siege: Some(SiegeRole::Sapper),
                ..special("Master Sapper", 1, Some(Mountain))
            },
            Template::MasterThief => special("Master Thief", 1, None),
            Template::AssassinPrimus => special("Assassin Primus", 2, None),

            Template::MagicSword => item("Magic Sword"),
            Template::MagicBow => item("Magic Bow"),
            Template::LuckyCharm => item("Lucky Charm"),
            Template::Talisman => item("Talisman"),
            Template::DustOfDefense => item("Dust of Defense"),
            Template::ScrollOfMist => item("Scroll of Mist"),
            Template::ScrollOfDispel => item("Scroll of Dispel"),
            Template::ScrollOfFireWall => item("Scroll of Fire Wall"),
        }
    }

    pub fn has(&self, ability: Ability) -> bool {
        self.properties().abilities.contains(&ability)
    }

    /// Can this thing stand in a battle line?
    pub fn is_combatant(&self) -> bool {
        !matches!(self.properties().kind, ThingKind::MagicItem)
    }

    pub fn is_special(&self) -> bool {
        matches!(self.properties().kind, ThingKind::Special)
    }

    pub fn name(&self) -> &'static str {
        self.properties().name
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
