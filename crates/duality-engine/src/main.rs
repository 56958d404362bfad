//! Console host binary for the Duality playback engine.
//!
//! Wires together the demo scripts, the playback state machine, the
//! console renderer, and the transcript player. Loads configuration,
//! replays the configured demos back to back, then replays the scripted
//! terminal sessions.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `duality-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Replay each configured demo through a console renderer
//! 4. Replay the scripted terminal sessions
//! 5. Log the result

mod error;
mod render;
mod transcript;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use duality_core::config::DualityConfig;
use duality_core::listener::ChangeListener;
use duality_core::playback::Playback;
use duality_demos::scripts;
use duality_demos::terminal;
use duality_demos::Demo;

use crate::error::EngineError;
use crate::render::ConsoleRenderer;
use crate::transcript::ConsoleSink;

/// Application entry point for the console host.
///
/// # Errors
///
/// Returns an error if configuration loading or any demo playback fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging. RUST_LOG overrides the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!(
        intra_update_delay_ms = config.playback.intra_update_delay_ms,
        changelog_capacity = config.playback.changelog_capacity,
        demo_count = config.demos.run.len(),
        include_terminal = config.demos.include_terminal,
        "duality-engine starting"
    );

    // 3. Replay each configured demo.
    for name in &config.demos.run {
        match scripts::by_name(name).map_err(EngineError::from)? {
            Some(demo) => run_demo(&demo, &config).await?,
            None => warn!(demo = %name, "unknown demo name, skipping"),
        }
    }

    // 4. Replay the scripted terminal sessions.
    if config.demos.include_terminal {
        let sink = ConsoleSink;
        for session in terminal::all() {
            println!();
            println!("== {} ==", session.title);
            transcript::play(&session, &sink).await;
        }
    }

    info!("duality-engine shutdown complete");
    Ok(())
}

/// Replay one demo to completion through the console renderer, then
/// print the final projection.
async fn run_demo(demo: &Demo, config: &DualityConfig) -> Result<(), EngineError> {
    println!();
    println!("== {} ==", demo.title);
    for line in demo.query.lines() {
        println!("  {line}");
    }
    println!();

    let listener: Arc<dyn ChangeListener> = Arc::new(ConsoleRenderer::new());
    let playback = Playback::new(demo.script.clone(), listener, &config.playback)?;

    info!(demo = demo.name, events = demo.script.len(), "demo starting");
    playback.start();
    playback.wait_until_complete().await;

    println!();
    println!("  {:<10} | {:>8} | {:>3}", "user_id", "total", "cnt");
    for (key, aggregate) in &playback.projection() {
        println!("  {}", render::format_row(key, aggregate));
    }

    info!(
        demo = demo.name,
        records = playback.status().records_emitted,
        "demo complete"
    );
    Ok(())
}

/// Load the engine configuration from `duality-config.yaml`.
///
/// Falls back to defaults when the file does not exist.
fn load_config() -> Result<DualityConfig, EngineError> {
    let config_path = Path::new("duality-config.yaml");
    if config_path.exists() {
        Ok(DualityConfig::from_file(config_path)?)
    } else {
        Ok(DualityConfig::default())
    }
}
