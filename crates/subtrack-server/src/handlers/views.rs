//! Calendar, upcoming payments and analytics

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::{current_user, get_actor, AppError, AppState, MAX_UPCOMING_DAYS};
use subtrack_core::{AnalyticsReport, MonthCalendar, Portfolio, UpcomingPayment};

/// Query parameters for the calendar; both default to the current month
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// GET /api/calendar - Billing days for one month
pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CalendarQuery>,
    headers: HeaderMap,
) -> Result<Json<MonthCalendar>, AppError> {
    let user = current_user(&state, &headers)?;
    let today = state.clock.today();
    let year = params.year.unwrap_or(today.year());
    let month = params.month.unwrap_or(today.month());

    let calendar = Portfolio::load(&state.db, user.id, &state.rates)?.calendar(year, month)?;

    state.db.log_audit(
        &get_actor(&headers),
        "view",
        Some("calendar"),
        None,
        Some(&format!("month={}-{:02}", year, month)),
    )?;

    Ok(Json(calendar))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
}

#[derive(Serialize)]
pub struct UpcomingResponse {
    pub today: chrono::NaiveDate,
    pub days: i64,
    pub currency: String,
    pub payments: Vec<UpcomingPayment>,
}

/// GET /api/upcoming - Payments due in the next `days` days
pub async fn get_upcoming(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpcomingQuery>,
    headers: HeaderMap,
) -> Result<Json<UpcomingResponse>, AppError> {
    let user = current_user(&state, &headers)?;
    let days = params.days.unwrap_or(state.settings.alerts.upcoming_days);
    if !(0..=MAX_UPCOMING_DAYS).contains(&days) {
        return Err(AppError::bad_request(&format!(
            "days must be between 0 and {}",
            MAX_UPCOMING_DAYS
        )));
    }

    let today = state.clock.today();
    let portfolio = Portfolio::load(&state.db, user.id, &state.rates)?;
    let payments = portfolio.upcoming(today, days);

    state.db.log_audit(
        &get_actor(&headers),
        "view",
        Some("upcoming"),
        None,
        Some(&format!("days={}, count={}", days, payments.len())),
    )?;

    Ok(Json(UpcomingResponse {
        today,
        days,
        currency: portfolio.user.display_currency,
        payments,
    }))
}

/// GET /api/analytics - Spend report in the user's display currency
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AnalyticsReport>, AppError> {
    let user = current_user(&state, &headers)?;
    let portfolio = Portfolio::load(&state.db, user.id, &state.rates)?;
    let report = portfolio.analytics(
        &state.db,
        &state.rates,
        &state.aggregator(),
        state.clock.today(),
    )?;

    state.db.log_audit(
        &get_actor(&headers),
        "view",
        Some("analytics"),
        None,
        Some(&format!("monthly_total={:.2}", report.totals.monthly_total)),
    )?;

    Ok(Json(report))
}
