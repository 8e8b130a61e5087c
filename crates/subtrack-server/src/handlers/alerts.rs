//! Alert handlers
//!
//! `/alerts/cron` is the primary trigger for the daily batch and is called by
//! an external scheduler holding the cron secret. `/alerts/send/:id` sends a
//! reminder on demand for one of the caller's subscriptions.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{info, warn};

use crate::{bearer_token, current_user, get_actor, validate_api_key, AppError, AppState};
use subtrack_core::alerts::{AlertItemResult, AlertItemStatus, AlertRunReport};
use subtrack_core::portfolio::record_snapshots;

fn authorize_cron(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    match &state.config.cron_secret {
        Some(secret) => {
            let valid = bearer_token(headers)
                .map(|token| validate_api_key(token, std::slice::from_ref(secret)))
                .unwrap_or(false);
            if valid {
                Ok(())
            } else {
                warn!("Cron trigger with invalid secret");
                Err(AppError::unauthorized("Invalid cron secret"))
            }
        }
        None if !state.config.require_auth => Ok(()),
        None => Err(AppError::unauthorized("Cron trigger not configured")),
    }
}

/// GET /api/alerts/cron - Run the daily alert batch
///
/// Also refreshes this month's spend snapshots so trends stay current.
pub async fn run_cron_alerts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AlertRunReport>, AppError> {
    authorize_cron(&state, &headers)?;

    let report = state.alert_scheduler().run_due().await?;

    if let Err(e) = record_snapshots(&state.db, &state.rates, report.today) {
        warn!(error = %e, "Failed to record spend snapshots");
    }

    // Sends already happened; the caller still gets the report
    if let Err(e) = state.db.log_audit(
        "cron",
        "alerts_run",
        Some("alert"),
        None,
        Some(&format!(
            "evaluated={}, sent={}, failed={}, errors={}, skipped={}",
            report.evaluated, report.sent, report.failed, report.errors, report.skipped
        )),
    ) {
        warn!(error = %e, "Failed to log cron alert run to audit");
    }

    Ok(Json(report))
}

/// POST /api/alerts/send/:id - Send a reminder now
///
/// Answers 502 with the item result when the transport did not deliver.
pub async fn send_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<AlertItemResult>), AppError> {
    let user = current_user(&state, &headers)?;
    state
        .db
        .get_subscription(id)?
        .filter(|s| s.user_id == user.id)
        .ok_or_else(|| AppError::not_found(&format!("Subscription {} not found", id)))?;

    let result = state
        .alert_scheduler()
        .send_one(id)
        .await
        .map_err(|e| match e {
            subtrack_core::Error::RateLimited(msg) => {
                AppError::too_many_requests(&msg, Some(state.settings.alerts.manual_window))
            }
            other => other.into(),
        })?;

    if let Err(e) = state.db.log_audit(
        &get_actor(&headers),
        "send_alert",
        Some("subscription"),
        Some(id),
        Some(&format!("status={:?}", result.status)),
    ) {
        warn!(subscription_id = id, error = %e, "Failed to log manual alert to audit");
    }

    let status = match result.status {
        AlertItemStatus::Sent => {
            info!(subscription_id = id, user_id = user.id, "Manual alert sent");
            StatusCode::OK
        }
        AlertItemStatus::Failed | AlertItemStatus::Error => StatusCode::BAD_GATEWAY,
    };
    Ok((status, Json(result)))
}
