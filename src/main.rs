//! Headless party session runner: seats a table of bots (plus optional
//! human-reserved seats for driving via another frontend), plays the session
//! out, and prints the final summary as JSON.
//!
//! Usage:
//!   cargo run -- --mode jung8 --players 4 --rounds 3 --seed 42

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use persona_party_engine::board::tiles::GameMode;
use persona_party_engine::engine::bot::{BotDriver, PartyBotPolicy};
use persona_party_engine::engine::settings::{load_default_settings, load_settings};
use persona_party_engine::engine::state::GamePhase;
use persona_party_engine::engine::turn::TurnEngine;
use persona_party_engine::persona::ALL_TYPES;
use persona_party_engine::tasks::FallbackPool;

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Jung8,
    Mbti16,
}

impl From<ModeArg> for GameMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Jung8 => GameMode::Jung8,
            ModeArg::Mbti16 => GameMode::Mbti16,
        }
    }
}

#[derive(Parser)]
#[command(name = "persona-party-engine", about = "Personality party game session runner")]
struct Cli {
    /// Board mode
    #[arg(long, value_enum, default_value = "jung8", env = "PARTY_MODE")]
    mode: ModeArg,

    /// Number of bot players to seat
    #[arg(long, default_value = "4")]
    players: usize,

    /// Rounds before the session closes (overrides settings file)
    #[arg(long)]
    rounds: Option<u32>,

    /// Random seed for a replayable session
    #[arg(long)]
    seed: Option<u64>,

    /// Path to party_settings.toml (default: auto-discover)
    #[arg(long, env = "PARTY_SETTINGS")]
    settings: Option<PathBuf>,

    /// Pause between bot actions, in milliseconds
    #[arg(long)]
    bot_delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => load_settings(path).map_err(|e| format!("Failed to load settings: {e}"))?,
        None => load_default_settings(),
    };
    if let Some(rounds) = cli.rounds {
        settings.rounds = rounds;
    }
    if let Some(delay) = cli.bot_delay_ms {
        settings.bot_delay_ms = delay;
    }

    let delay = Duration::from_millis(settings.bot_delay_ms);
    let mut engine = TurnEngine::new(
        cli.mode.into(),
        settings,
        std::sync::Arc::new(FallbackPool),
        cli.seed,
    );

    for i in 0..cli.players.max(1) {
        let mbti = ALL_TYPES[i % ALL_TYPES.len()];
        engine.add_player(&format!("Bot {} ({})", i + 1, mbti), mbti, true);
    }
    engine.begin_onboarding();
    if !engine.start_game() {
        return Err("failed to start session".into());
    }
    tracing::info!(players = cli.players, "session started");

    let mut driver = BotDriver::new(delay, cli.seed);
    driver.run_until_human(&mut engine, &PartyBotPolicy).await;

    if engine.state().phase != GamePhase::Analysis {
        tracing::warn!("session stopped waiting on a non-bot actor");
    }
    match engine.summary() {
        Some(summary) => println!("{}", serde_json::to_string_pretty(summary)?),
        None => println!("{}", serde_json::to_string_pretty(&engine.state().log)?),
    }

    Ok(())
}
