use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dog_patrol_server::config::{ServerConfig, TickMode};
use dog_patrol_server::game::loader::load_game;
use dog_patrol_server::lobby::manager::{Game, GameSettings};
use dog_patrol_server::metrics::Metrics;
use dog_patrol_server::net::game_loop::start_game_loop;
use dog_patrol_server::net::handler::ApiHandler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Dog Patrol Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: maps from {}, tick {:?}, random spawn {}",
        config.config_file.display(),
        config.tick_mode,
        config.randomize_spawn_points
    );

    let loaded = load_game(&config.config_file)?;
    let settings = GameSettings {
        randomize_spawn: config.randomize_spawn_points,
        spawn_seed: config.spawn_seed,
        ..GameSettings::default()
    };
    let game = Arc::new(RwLock::new(Game::from_loaded(loaded, settings)?));
    let metrics = Arc::new(Metrics::new());

    let handler = ApiHandler::new(game.clone(), config.tick_mode, metrics.clone());

    let game_loop = match config.tick_mode {
        TickMode::Periodic(period) => Some(start_game_loop(game.clone(), period, metrics.clone())),
        TickMode::External => {
            info!("No tick period set, time advances on tick requests only");
            None
        }
    };

    info!(
        "Server ready: {} map(s), {} tick mode",
        handler.game().read().await.maps().len(),
        if handler.tick_mode().is_periodic() { "periodic" } else { "external" }
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    if let Some(game_loop) = game_loop {
        game_loop.stop().await;
    }

    info!("{}", metrics.to_json());
    info!("Server stopped");

    Ok(())
}
