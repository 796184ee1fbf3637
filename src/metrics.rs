//! Server metrics
//!
//! Counters and gauges updated by the request handler and the game clock,
//! rendered as Prometheus text or JSON for whatever transport serves them.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::lobby::manager::AdvanceReport;

const TICK_HISTORY_LEN: usize = 1000;

/// Metrics registry for the game server
#[derive(Debug)]
pub struct Metrics {
    // Game population
    pub sessions: AtomicU64,
    pub players: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,
    pub tick_count: AtomicU64,

    /// Dogs that failed to move, summed over all ticks
    pub dog_failures: AtomicU64,

    // Requests
    pub joins: AtomicU64,
    pub requests: AtomicU64,
    pub request_errors: AtomicU64,
    pub internal_faults: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sessions: AtomicU64::new(0),
            players: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            dog_failures: AtomicU64::new(0),
            joins: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            request_errors: AtomicU64::new(0),
            internal_faults: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY_LEN)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us
                .store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us
                .store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us
                .store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Record a finished simulation step
    pub fn record_advance(&self, duration: Duration, report: AdvanceReport) {
        self.record_tick_time(duration);
        self.players.store(report.players as u64, Ordering::Relaxed);
        self.dog_failures
            .fetch_add(report.failures as u64, Ordering::Relaxed);
    }

    pub fn set_population(&self, sessions: usize, players: usize) {
        self.sessions.store(sessions as u64, Ordering::Relaxed);
        self.players.store(players as u64, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_error(&self, internal: bool) {
        self.request_errors.fetch_add(1, Ordering::Relaxed);
        if internal {
            self.internal_faults.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("dog_patrol_sessions", "Number of active sessions", "gauge",
            self.sessions.load(Ordering::Relaxed));
        metric!("dog_patrol_players", "Number of joined players", "gauge",
            self.players.load(Ordering::Relaxed));

        metric!("dog_patrol_tick_time_microseconds", "Last tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("dog_patrol_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("dog_patrol_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("dog_patrol_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("dog_patrol_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));
        metric!("dog_patrol_dog_failures_total", "Dogs that failed to move", "counter",
            self.dog_failures.load(Ordering::Relaxed));

        metric!("dog_patrol_joins_total", "Total successful joins", "counter",
            self.joins.load(Ordering::Relaxed));
        metric!("dog_patrol_requests_total", "Total requests handled", "counter",
            self.requests.load(Ordering::Relaxed));
        metric!("dog_patrol_request_errors_total", "Requests that returned an error", "counter",
            self.request_errors.load(Ordering::Relaxed));
        metric!("dog_patrol_internal_faults_total", "Errors caused by broken game invariants", "counter",
            self.internal_faults.load(Ordering::Relaxed));

        metric!("dog_patrol_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "game": {
                "sessions": self.sessions.load(Ordering::Relaxed),
                "players": self.players.load(Ordering::Relaxed),
            },
            "performance": {
                "tick_time_us": self.tick_time_us.load(Ordering::Relaxed),
                "tick_time_p95_us": self.tick_time_p95_us.load(Ordering::Relaxed),
                "tick_time_p99_us": self.tick_time_p99_us.load(Ordering::Relaxed),
                "tick_time_max_us": self.tick_time_max_us.load(Ordering::Relaxed),
                "tick_count": self.tick_count.load(Ordering::Relaxed),
                "dog_failures": self.dog_failures.load(Ordering::Relaxed),
            },
            "requests": {
                "total": self.requests.load(Ordering::Relaxed),
                "errors": self.request_errors.load(Ordering::Relaxed),
                "internal_faults": self.internal_faults.load(Ordering::Relaxed),
                "joins": self.joins.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        })
        .to_string()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.players.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_tick_time() {
        let metrics = Metrics::new();

        for i in 0..100 {
            metrics.record_tick_time(Duration::from_micros(100 + i * 10));
        }

        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 100);
        assert!(metrics.tick_time_p95_us.load(Ordering::Relaxed) > 0);
        assert!(metrics.tick_time_p99_us.load(Ordering::Relaxed) > 0);
        assert_eq!(metrics.tick_time_max_us.load(Ordering::Relaxed), 1090);
    }

    #[test]
    fn test_record_advance() {
        let metrics = Metrics::new();
        let report = AdvanceReport {
            players: 4,
            failures: 1,
        };
        metrics.record_advance(Duration::from_micros(50), report);
        metrics.record_advance(Duration::from_micros(50), report);

        assert_eq!(metrics.players.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.dog_failures.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_request_errors() {
        let metrics = Metrics::new();
        metrics.record_request_error(false);
        metrics.record_request_error(true);

        assert_eq!(metrics.request_errors.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.internal_faults.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.set_population(2, 7);

        let output = metrics.to_prometheus();

        assert!(output.contains("dog_patrol_sessions 2"));
        assert!(output.contains("dog_patrol_players 7"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_json_format() {
        let metrics = Metrics::new();
        metrics.set_population(1, 100);
        metrics.record_join();

        let value: serde_json::Value = serde_json::from_str(&metrics.to_json()).unwrap();

        assert_eq!(value["game"]["players"], 100);
        assert_eq!(value["requests"]["joins"], 1);
        assert!(value["performance"].is_object());
    }
}
