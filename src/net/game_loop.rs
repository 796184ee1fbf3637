//! Periodic game clock
//!
//! Advances the shared game at a fixed period. Late ticks are skipped and
//! the next tick advances by the real elapsed time, so a slow tick never
//! queues up a backlog.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::metrics::Metrics;
use crate::net::handler::SharedGame;

const STATS_INTERVAL: Duration = Duration::from_secs(30);

/// Running clock task
pub struct GameLoopHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl GameLoopHandle {
    /// Stop the clock and wait for it to exit. A tick already in progress
    /// finishes first.
    pub async fn stop(self) {
        if self.shutdown.send(true).is_err() {
            warn!("Game loop exited before stop was requested");
        }
        if let Err(e) = self.task.await {
            error!("Game loop task failed: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Start the game loop background task
pub fn start_game_loop(
    game: SharedGame,
    period: Duration,
    metrics: Arc<Metrics>,
) -> GameLoopHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Game loop started, period {} ms", period.as_millis());
        let start = Instant::now();
        let mut last_tick = start;
        let mut last_stats = start;
        let mut tick_count: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let now = Instant::now();
            let dt = now - last_tick;
            last_tick = now;
            tick_count += 1;

            let report = game.write().await.advance(dt);
            metrics.record_advance(now.elapsed(), report);

            if report.failures > 0 {
                warn!("Tick {}: {} dog(s) failed to move", tick_count, report.failures);
            }

            if last_stats.elapsed() >= STATS_INTERVAL {
                last_stats = Instant::now();
                let game = game.read().await;
                info!(
                    "Game: {}s, tick {}, {} sessions, {} players | tick p95 {} us",
                    start.elapsed().as_secs(),
                    tick_count,
                    game.session_count(),
                    game.player_count(),
                    metrics.tick_time_p95_us.load(Ordering::Relaxed)
                );
            }
        }

        info!("Game loop stopped after {} ticks", tick_count);
    });

    GameLoopHandle { shutdown, task }
}
