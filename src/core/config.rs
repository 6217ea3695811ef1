//! Combat engine configuration
//!
//! Rule numbers (thresholds, hit points, fortification caps) are fixed by the
//! board game and live in `combat::constants`. This struct only holds the
//! knobs an operator may reasonably turn.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::error::{Result, WarError};

/// Configuration for the combat engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Seed for the dice when the engine builds its own roller
    ///
    /// `None` draws a fresh seed from the OS. Set it to replay a session
    /// die for die.
    pub dice_seed: Option<u64>,

    /// Upper bound on initiative roll-offs before the attacker is handed
    /// the initiative
    ///
    /// Ties are re-rolled. The cap only matters for scripted dice that
    /// keep producing ties.
    pub max_initiative_rolls: u32,

    /// Maximum number of lines kept in a combat's battle log
    ///
    /// Oldest lines are dropped first. The log is carried inside the
    /// persisted combat state, so this bounds the blob size.
    pub battle_log_limit: usize,

    /// `tracing_subscriber` env-filter used by the binaries
    pub log_filter: String,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            dice_seed: None,
            max_initiative_rolls: 64,
            battle_log_limit: 200,
            log_filter: "realm_war=info".to_string(),
        }
    }
}

impl CombatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text, filling omitted fields with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_initiative_rolls == 0 {
            return Err(WarError::InvalidConfig(
                "max_initiative_rolls must be at least 1".into(),
            ));
        }

        if self.battle_log_limit == 0 {
            return Err(WarError::InvalidConfig(
                "battle_log_limit must be at least 1".into(),
            ));
        }

        Ok(())
    }
}
