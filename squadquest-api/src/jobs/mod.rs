//! Background jobs.
//!
//! In-process schedulers replacing external cron infrastructure:
//! - the weekly reset job (hourly check, runs when the week marker is stale)
//! - the daily bounty reminder job (hourly sweep)
//!
//! Both loop on a tokio interval and stop on a shared `watch` shutdown
//! signal.

pub mod daily_reminder;
pub mod weekly_reset;

pub use daily_reminder::{daily_reminder_task, DailyReminderConfig, DailyReminderMetrics};
pub use weekly_reset::{weekly_reset_task, WeeklyResetConfig, WeeklyResetMetrics};
