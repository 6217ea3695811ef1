pub mod casualties;
pub mod constants;
pub mod dice;
pub mod engine;
pub mod profile;
pub mod resolution;
pub mod retroactive;
pub mod stage;
pub mod state;
pub mod template;

pub use dice::{DiceRoller, Roll, RollSheet, RollSide, ScriptedDice, SeededDice};
pub use engine::CombatEngine;
pub use state::{
    CombatKind, CombatSide, CombatState, FinishedCombat, FiringStage, PendingCasualty, Progress,
    Stage, StepOutcome, Victor,
};
pub use template::{Ability, Race, Template};
