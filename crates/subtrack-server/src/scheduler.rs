//! Built-in daily alert run
//!
//! When `[alerts] daily_run_hour_utc` is set, the server runs the same batch
//! as `/api/alerts/cron` once a day at that UTC hour and records spend
//! snapshots. An external cron hitting the endpoint remains the primary
//! trigger; the same-day dedup makes running both harmless.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, Utc};
use tracing::{error, info, warn};

use subtrack_core::portfolio::record_snapshots;

use crate::AppState;

/// Time from `now` until the next `hour`:00 UTC (a full day if exactly on it)
pub fn until_next_run(now: DateTime<Utc>, hour: u32) -> Duration {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today_run = now.date_naive().and_time(at).and_utc();
    let next = if today_run > now {
        today_run
    } else {
        today_run
            .checked_add_days(Days::new(1))
            .unwrap_or(today_run)
    };
    (next - now).to_std().unwrap_or(Duration::from_secs(3600))
}

/// Start the daily alert scheduler as a background task
pub fn start_alert_scheduler(state: Arc<AppState>, hour: u32) {
    info!(hour_utc = hour, "Starting daily alert scheduler");

    tokio::spawn(async move {
        loop {
            let wait = until_next_run(state.clock.now(), hour);
            info!(seconds = wait.as_secs(), "Next scheduled alert run");
            tokio::time::sleep(wait).await;

            run_scheduled(&state).await;
        }
    });
}

async fn run_scheduled(state: &AppState) {
    info!("Running scheduled alert batch...");

    let summary = match state.alert_scheduler().run_due().await {
        Ok(report) => format!(
            "evaluated={}, sent={}, failed={}, errors={}, skipped={}",
            report.evaluated, report.sent, report.failed, report.errors, report.skipped
        ),
        Err(e) => {
            error!("Scheduled alert run failed: {}", e);
            return;
        }
    };

    if let Err(e) = record_snapshots(&state.db, &state.rates, state.clock.today()) {
        warn!("Failed to record spend snapshots: {}", e);
    }

    // Log to audit (as "scheduler" user)
    if let Err(e) = state
        .db
        .log_audit("scheduler", "alerts_run", Some("alert"), None, Some(&summary))
    {
        warn!("Failed to log scheduled alert run to audit: {}", e);
    }
}
