use std::path::PathBuf;
use std::time::Duration;

/// How the simulation clock is driven. Fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    /// Internal clock firing at this period
    Periodic(Duration),
    /// Clients advance time through explicit tick requests
    External,
}

impl TickMode {
    pub fn is_periodic(&self) -> bool {
        matches!(self, TickMode::Periodic(_))
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the JSON map file
    pub config_file: PathBuf,
    pub tick_mode: TickMode,
    /// Spawn dogs at random road points instead of the first road's start
    pub randomize_spawn_points: bool,
    /// Seed for spawn placement
    pub spawn_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("data/config.json"),
            tick_mode: TickMode::External,
            randomize_spawn_points: false,
            spawn_seed: None,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("CONFIG_FILE") {
            if !path.is_empty() {
                config.config_file = PathBuf::from(path);
            }
        }

        if let Some(period) = lookup("TICK_PERIOD_MS") {
            match period.parse::<u64>() {
                Ok(ms) if ms > 0 => {
                    config.tick_mode = TickMode::Periodic(Duration::from_millis(ms));
                }
                _ => {
                    tracing::warn!(
                        "Invalid TICK_PERIOD_MS '{}', ticks must be requested explicitly",
                        period
                    );
                }
            }
        }

        if let Some(flag) = lookup("RANDOMIZE_SPAWN_POINTS") {
            config.randomize_spawn_points =
                matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Some(seed) = lookup("SPAWN_SEED") {
            if let Ok(parsed) = seed.parse::<u64>() {
                config.spawn_seed = Some(parsed);
            } else {
                tracing::warn!("Invalid SPAWN_SEED '{}', spawning from entropy", seed);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.config_file.as_os_str().is_empty() {
            return Err("config_file cannot be empty".to_string());
        }
        if self.tick_mode == TickMode::Periodic(Duration::ZERO) {
            return Err("Tick period cannot be 0".to_string());
        }
        Ok(())
    }
}
