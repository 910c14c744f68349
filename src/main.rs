//! Race Replay CLI
//!
//! Drives a race card headless at a fixed frame rate, logs finishes as they
//! happen and prints the finish order as JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use race_replay::{HostState, RaceCard, ReplayServer, SimResult, SimulationConfig, StrategyKind};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "race-replay")]
#[command(about = "Replay a recorded race or simulate an upcoming one", long_about = None)]
struct Cli {
    /// Race card JSON file
    card: PathBuf,

    /// Simulation config JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Playback speed multiplier
    #[arg(long)]
    speed: Option<f64>,

    /// Frames per real second the host ticks at
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Seed for the random draws made at race load
    #[arg(long)]
    seed: Option<u64>,

    /// Give up after this much race time (s)
    #[arg(long, default_value_t = 600.0)]
    max_time: f64,

    /// Log the standings every N seconds of race time
    #[arg(long)]
    snapshot_every: Option<f64>,
}

#[derive(Serialize)]
struct ReplayReport {
    race_id: String,
    strategy: Option<StrategyKind>,
    elapsed_time: f64,
    results: Vec<SimResult>,
    unfinished: Vec<u32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        bail!("--fps must be positive, got {}", cli.fps);
    }

    let config = match &cli.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    let card = RaceCard::from_file(&cli.card)
        .with_context(|| format!("loading race card {}", cli.card.display()))?;

    // One host frame expressed in engine frames
    let frame_delta = config.fps / cli.fps;

    let mut server = ReplayServer::new(config);
    if let Some(seed) = cli.seed {
        server = server.with_seed(seed);
    }
    server.load_race(&card);
    if let Some(speed) = cli.speed {
        server.set_speed(speed);
    }
    if server.engine().map_or(true, |e| e.speed_multiplier() <= 0.0) {
        bail!("playback speed must be positive");
    }
    server.play();

    let mut next_report = cli.snapshot_every.filter(|s| *s > 0.0);
    let mut elapsed = 0.0;
    while server.get_state() == HostState::Racing && elapsed < cli.max_time {
        let Some(snapshot) = server.tick(frame_delta) else {
            break;
        };
        elapsed = snapshot.elapsed_time;

        if let (Some(at), Some(every)) = (next_report, cli.snapshot_every) {
            if elapsed >= at {
                log::info!("{:>7.2}s standings {:?}", elapsed, snapshot.standings);
                next_report = Some(at + every);
            }
        }
    }

    if server.get_state() == HostState::Racing {
        log::warn!("Stopped at {:.2}s before every runner finished", elapsed);
    }

    let snapshot = server.snapshot();
    let report = ReplayReport {
        race_id: card.race_id.clone(),
        strategy: server.engine().map(|e| e.strategy_kind()),
        elapsed_time: elapsed,
        results: server.results().to_vec(),
        unfinished: snapshot
            .map(|s| s.runners.iter().filter(|r| !r.finished).map(|r| r.number).collect())
            .unwrap_or_default(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    log::info!("{:?}", server.get_stats());
    Ok(())
}
