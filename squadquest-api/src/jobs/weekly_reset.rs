//! Weekly reset background task.
//!
//! Checks hourly whether the weekly reset marker has fallen behind the
//! current week and runs the full reset cycle when it has. The check is a
//! cheap read, so the hourly cadence costs nothing between week boundaries.
//! The lazy per-user reset on the read path remains the correctness
//! fallback; this job is the bulk optimization.

use squadquest_engine::RewardEngine;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Default check interval: one hour.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 3600;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the weekly reset task.
#[derive(Debug, Clone)]
pub struct WeeklyResetConfig {
    /// How often to check whether the reset is due.
    pub check_interval: Duration,
}

impl Default for WeeklyResetConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
        }
    }
}

impl WeeklyResetConfig {
    /// Create configuration from environment variables.
    ///
    /// - `SQUADQUEST_WEEKLY_CHECK_INTERVAL_SECS`: check cadence (default 3600)
    pub fn from_env() -> Self {
        let check_interval = Duration::from_secs(
            std::env::var("SQUADQUEST_WEEKLY_CHECK_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS),
        );
        Self { check_interval }
    }

    /// Short intervals for development and tests.
    pub fn development() -> Self {
        Self {
            check_interval: Duration::from_secs(10),
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for weekly reset activity.
#[derive(Debug, Default)]
pub struct WeeklyResetMetrics {
    /// Check cycles completed.
    pub cycles: AtomicU64,
    /// Full resets actually run.
    pub resets_run: AtomicU64,
    /// Users whose weekly counter was zeroed, cumulative.
    pub users_reset: AtomicU64,
    /// Errors encountered.
    pub errors: AtomicU64,
}

impl WeeklyResetMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Run the weekly reset loop until the shutdown signal fires.
pub async fn weekly_reset_task(
    engine: Arc<RewardEngine>,
    config: WeeklyResetConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<WeeklyResetMetrics> {
    let metrics = Arc::new(WeeklyResetMetrics::new());

    let mut tick = interval(config.check_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        check_interval_secs = config.check_interval.as_secs(),
        "weekly reset task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("weekly reset task shutting down");
                    break;
                }
            }
            _ = tick.tick() => {
                run_check(&engine, &metrics).await;
            }
        }
    }

    metrics
}

/// Perform one check cycle.
async fn run_check(engine: &RewardEngine, metrics: &WeeklyResetMetrics) {
    metrics.cycles.fetch_add(1, Ordering::Relaxed);
    match engine.run_weekly_reset(chrono::Utc::now()).await {
        Ok(outcome) if !outcome.already_current => {
            metrics.resets_run.fetch_add(1, Ordering::Relaxed);
            metrics
                .users_reset
                .fetch_add(outcome.users_reset as u64, Ordering::Relaxed);
            tracing::info!(
                winners = outcome.winners.len(),
                users_reset = outcome.users_reset,
                "weekly reset ran"
            );
        }
        Ok(_) => {
            tracing::trace!("weekly reset already current");
        }
        Err(err) => {
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            tracing::error!(error = %err, "weekly reset failed");
        }
    }
}
