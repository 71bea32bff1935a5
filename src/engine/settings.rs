//! Balance settings: the tunable constants of the game, loadable from TOML
//! at runtime for the CLI and tests.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::generator::GenerationWeights;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSettings {
    #[serde(default)]
    pub generation: GenerationWeights,

    /// Dice faces; a roll is uniform in [1, dice_faces].
    #[serde(default = "default_dice_faces")]
    pub dice_faces: u8,

    /// Full turn cycles before the session closes automatically.
    #[serde(default = "default_rounds")]
    pub rounds: u32,

    /// Ask-for-help uses per player per game.
    #[serde(default = "default_help_limit")]
    pub help_limit: u32,

    /// Flat bonus when the energy signal crossed its threshold mid-task.
    #[serde(default = "default_high_energy_bonus")]
    pub high_energy_bonus: u32,

    /// Pause between autonomous actions, so mixed tables can follow along.
    #[serde(default = "default_bot_delay_ms")]
    pub bot_delay_ms: u64,
}

fn default_dice_faces() -> u8 {
    8
}
fn default_rounds() -> u32 {
    5
}
fn default_help_limit() -> u32 {
    3
}
fn default_high_energy_bonus() -> u32 {
    5
}
fn default_bot_delay_ms() -> u64 {
    400
}

impl Default for BalanceSettings {
    fn default() -> Self {
        Self {
            generation: GenerationWeights::default(),
            dice_faces: default_dice_faces(),
            rounds: default_rounds(),
            help_limit: default_help_limit(),
            high_energy_bonus: default_high_energy_bonus(),
            bot_delay_ms: default_bot_delay_ms(),
        }
    }
}

/// Load settings from a TOML file at the given path.
pub fn load_settings(path: &Path) -> Result<BalanceSettings, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

/// Try well-known paths, falling back to built-in defaults.
pub fn load_default_settings() -> BalanceSettings {
    let candidates = [
        "party_settings.toml",
        "../party_settings.toml",
        "/etc/persona-party/settings.toml",
    ];
    for path in &candidates {
        let p = Path::new(path);
        if p.exists() {
            match load_settings(p) {
                Ok(settings) => {
                    tracing::info!(path = %p.display(), "loaded balance settings");
                    return settings;
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "failed to load balance settings");
                }
            }
        }
    }
    tracing::info!("no party_settings.toml found, using built-in defaults");
    BalanceSettings::default()
}
