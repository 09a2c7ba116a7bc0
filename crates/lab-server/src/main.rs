mod config;
mod wiring;

use std::error::Error;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use api::AppState;
use config::{Config, RunMode};
use market_sim::Controls;
use runtime::{replay::ReplayCsvWriter, run_ticks, shared, SimEngine, SimSession};
use tokio::{net::TcpListener, sync::watch};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    runtime::init_tracing(&config.log_filter);

    let mut engine = SimEngine::new(SimSession::new(Controls {
        granularity: config.granularity,
        ..Controls::default()
    }));
    if let Some(preset) = &config.preset {
        engine.apply_preset(preset);
    }
    initialize_replay_output(&config.replay_output_path, &mut engine)?;

    let engine = shared(engine);
    let state = AppState::new(engine.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ticker = match config.mode {
        RunMode::Run => Some(tokio::spawn(run_ticks(engine, state.clone(), shutdown_rx))),
        RunMode::Paused => None,
    };

    let listener = TcpListener::bind(config.listen_addr).await?;
    tracing::info!(
        addr = %config.listen_addr,
        mode = config.mode.as_str(),
        interval = config.granularity.as_str(),
        preset = config.preset.as_ref().map(|preset| preset.id),
        "lab server listening"
    );

    axum::serve(listener, wiring::build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Receiver may already be gone if the tick loop exited on its own.
    let _ = shutdown_tx.send(true);
    if let Some(ticker) = ticker {
        ticker.await?;
    }
    tracing::info!("lab server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable; serving until killed");
        std::future::pending::<()>().await;
    }
}

fn initialize_replay_output(path: &str, engine: &mut SimEngine) -> io::Result<()> {
    let replay_path = Path::new(path);

    if let Some(parent) = replay_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)?;
    }

    let replay_file: Box<dyn Write + Send> = Box::new(File::create(replay_path)?);
    engine.attach_replay(ReplayCsvWriter::new(replay_file))
}
