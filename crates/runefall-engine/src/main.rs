//! # Runefall Engine
//!
//! Headless runner for the Runefall combat core.
//!
//! Loads the runner config (`runefall.toml`, or the path given as the first
//! argument), installs logging, loads combat tuning and plays the demo
//! arena with a scripted player, logging every gameplay event.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use runefall_gameplay::{CombatTuning, GameEvent};

use runefall_engine::arena::Arena;
use runefall_engine::config::EngineConfig;
use runefall_engine::timing::{FixedStepClock, FramePacer};

/// Main entry point.
fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };

    init_logging(&config)?;

    info!("Runefall starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let tuning = match &config.tuning_path {
        Some(path) => CombatTuning::load(path)
            .with_context(|| format!("loading tuning from {}", path.display()))?,
        None => CombatTuning::default(),
    };

    let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
    info!("Seed: {seed}");

    run(&config, tuning, seed);

    info!("Runefall shutdown complete");
    Ok(())
}

fn init_logging(config: &EngineConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.log_filter.parse()?);
    if config.json_events {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

fn run(config: &EngineConfig, tuning: CombatTuning, seed: u64) {
    let clock = FixedStepClock::new(config.fixed_dt, config.max_frame_dt);
    let mut arena = Arena::demo(tuning, seed, clock);
    let mut pacer = FramePacer::new(config.target_fps);
    let frame_dt = config.frame_dt();

    loop {
        let dt = if config.realtime {
            pacer.delta_time()
        } else {
            frame_dt
        };

        for event in arena.advance(dt) {
            log_event(&event);
        }

        if arena.is_over() {
            info!("fight decided after {:.2}s", arena.elapsed());
            break;
        }
        if config.duration_secs > 0.0 && arena.elapsed() >= config.duration_secs {
            info!("time limit of {:.1}s reached", config.duration_secs);
            break;
        }
        if config.realtime {
            pacer.sleep_remainder();
        }
    }

    match serde_json::to_string(arena.stats()) {
        Ok(summary) => info!("Summary: {summary}"),
        Err(e) => warn!("Failed to serialize summary: {e}"),
    }
}

fn log_event(event: &GameEvent) {
    match serde_json::to_string(event) {
        Ok(json) => info!(target: "runefall::events", event = event.name(), "{json}"),
        Err(e) => warn!("Failed to serialize {}: {e}", event.name()),
    }
}
