//! Daily bounty reminder background task.
//!
//! Sweeps hourly for users whose bounty cooldown lapsed within the last
//! hour and sends each of them a best-effort push reminder. The one-hour
//! eligibility window lives in the engine, so each user is reminded once
//! per cycle rather than nagged every tick.

use squadquest_engine::RewardEngine;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Default sweep interval: one hour.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the reminder task.
#[derive(Debug, Clone)]
pub struct DailyReminderConfig {
    /// How often to sweep for claimable bounties.
    pub sweep_interval: Duration,
}

impl Default for DailyReminderConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl DailyReminderConfig {
    /// Create configuration from environment variables.
    ///
    /// - `SQUADQUEST_REMINDER_SWEEP_INTERVAL_SECS`: sweep cadence (default 3600)
    pub fn from_env() -> Self {
        let sweep_interval = Duration::from_secs(
            std::env::var("SQUADQUEST_REMINDER_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        );
        Self { sweep_interval }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for reminder activity.
#[derive(Debug, Default)]
pub struct DailyReminderMetrics {
    /// Sweep cycles completed.
    pub cycles: AtomicU64,
    /// Reminders dispatched, cumulative.
    pub reminders_sent: AtomicU64,
    /// Errors encountered.
    pub errors: AtomicU64,
}

impl DailyReminderMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Run the reminder loop until the shutdown signal fires.
pub async fn daily_reminder_task(
    engine: Arc<RewardEngine>,
    config: DailyReminderConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<DailyReminderMetrics> {
    let metrics = Arc::new(DailyReminderMetrics::new());

    let mut tick = interval(config.sweep_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "daily reminder task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("daily reminder task shutting down");
                    break;
                }
            }
            _ = tick.tick() => {
                metrics.cycles.fetch_add(1, Ordering::Relaxed);
                match engine.send_bounty_reminders(chrono::Utc::now()).await {
                    Ok(count) => {
                        if count > 0 {
                            metrics.reminders_sent.fetch_add(count as u64, Ordering::Relaxed);
                            tracing::info!(count, "bounty reminders dispatched");
                        }
                    }
                    Err(err) => {
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        tracing::error!(error = %err, "bounty reminder sweep failed");
                    }
                }
            }
        }
    }

    metrics
}
