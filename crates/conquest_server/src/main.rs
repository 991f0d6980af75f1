//! Conquest - Dedicated Server
//!
//! Starts an authoritative session and runs a bots-only skirmish on it until
//! a winner emerges, the tick limit is hit, or Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! # Four medium bots on the default rules
//! cargo run -p conquest_server
//!
//! # Custom rules, fixed seed, stop after ten minutes of game time
//! RUST_LOG=info cargo run -p conquest_server -- --rules rules/default.ron --seed 42 --bots 6 --difficulty hard --max-ticks 600
//! ```

use std::path::PathBuf;

use clap::Parser;
use conquest_core::bot::BotDifficulty;
use conquest_core::rules::GameRules;
use conquest_server::network::ServerEvent;
use conquest_server::{session, ServerConfig};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "conquest_server")]
#[command(about = "Headless authoritative server for the territory-conquest game")]
#[command(version)]
struct Cli {
    /// Rules file (RON). Built-in defaults when omitted
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Master seed for the map and the bots
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Number of bots in the skirmish
    #[arg(short, long, default_value = "4")]
    bots: usize,

    /// Bot difficulty: easy, medium, hard or peaceful
    #[arg(short, long, default_value = "medium")]
    difficulty: BotDifficulty,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Conquest Dedicated Server");

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!(%err, "Server failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> conquest_server::Result<()> {
    let rules = match &cli.rules {
        Some(path) => ServerConfig::load_rules(path)?,
        None => GameRules::default(),
    };
    let config = ServerConfig {
        rules,
        seed: cli.seed,
        ..ServerConfig::default()
    };

    let (handle, task) = session::spawn(config)?;
    let mut events = handle.subscribe();
    let bots = handle
        .start_bot_match(vec![cli.difficulty; cli.bots])
        .await?;
    tracing::info!(bots = bots.len(), difficulty = %cli.difficulty, seed = cli.seed, "Skirmish started");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
            received = events.recv() => match received {
                Ok(envelope) => match envelope.event {
                    ServerEvent::GameWon { player_id } => {
                        tracing::info!(winner = %player_id, "Skirmish decided");
                        break;
                    }
                    ServerEvent::PlayerEliminated { player_id } => {
                        tracing::info!(player = %player_id, "Player eliminated");
                    }
                    ServerEvent::GameState(snapshot)
                        if cli.max_ticks.is_some_and(|max| snapshot.tick >= max) =>
                    {
                        tracing::info!(tick = snapshot.tick, "Tick limit reached");
                        break;
                    }
                    _ => {}
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    let last = handle.snapshot().await?;
    for player in &last.players {
        tracing::info!(
            player = %player.id,
            name = %player.name,
            tiles = player.territories.len(),
            gold = player.gold,
            troops = player.troops,
            eliminated = player.eliminated,
            "Final standing"
        );
    }

    handle.shutdown();
    if let Err(err) = task.await {
        tracing::error!(%err, "Session task failed");
    }
    Ok(())
}
