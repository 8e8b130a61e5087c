//! Subscription management handlers
//!
//! Every route acts for the user named in `X-User-Id`. Subscriptions owned
//! by someone else are reported as not found.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{current_user, get_actor, AppError, AppState, SuccessResponse};
use subtrack_core::currency::CurrencyNormalizer;
use subtrack_core::models::{NewSubscription, Subscription, SubscriptionUpdate, User};
use subtrack_core::Portfolio;

/// Fetch a subscription the user owns, with its display amount filled in
fn owned_subscription(state: &AppState, user: &User, id: i64) -> Result<Subscription, AppError> {
    let sub = state
        .db
        .get_subscription(id)?
        .filter(|s| s.user_id == user.id)
        .ok_or_else(|| AppError::not_found(&format!("Subscription {} not found", id)))?;
    Ok(normalized(state, user, sub))
}

fn normalized(state: &AppState, user: &User, sub: Subscription) -> Subscription {
    let mut subs = [sub];
    state.rates.normalize(&mut subs, &user.display_currency);
    let [sub] = subs;
    sub
}

/// GET /api/subscriptions - List the user's subscriptions
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Subscription>>, AppError> {
    let user = current_user(&state, &headers)?;
    let portfolio = Portfolio::load(&state.db, user.id, &state.rates)?;

    // Audit log - read access
    state.db.log_audit(
        &get_actor(&headers),
        "list",
        Some("subscription"),
        None,
        Some(&format!("count={}", portfolio.subscriptions.len())),
    )?;

    Ok(Json(portfolio.subscriptions))
}

/// POST /api/subscriptions - Create a subscription
pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(new_sub): Json<NewSubscription>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let user = current_user(&state, &headers)?;

    let id = state.db.create_subscription(user.id, &new_sub)?;
    let created = owned_subscription(&state, &user, id)?;

    state.db.log_audit(
        &get_actor(&headers),
        "create",
        Some("subscription"),
        Some(id),
        Some(&format!(
            "name={}, cycle={}",
            created.name,
            created.billing_cycle.as_str()
        )),
    )?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/subscriptions/:id - Get one subscription
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Subscription>, AppError> {
    let user = current_user(&state, &headers)?;
    let sub = owned_subscription(&state, &user, id)?;

    state.db.log_audit(
        &get_actor(&headers),
        "view",
        Some("subscription"),
        Some(id),
        None,
    )?;

    Ok(Json(sub))
}

/// PUT /api/subscriptions/:id - Partially update a subscription
pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(update): Json<SubscriptionUpdate>,
) -> Result<Json<Subscription>, AppError> {
    let user = current_user(&state, &headers)?;
    owned_subscription(&state, &user, id)?;

    let updated = state.db.update_subscription(id, &update)?;

    state.db.log_audit(
        &get_actor(&headers),
        "update",
        Some("subscription"),
        Some(id),
        update.status.map(|s| format!("status={}", s)).as_deref(),
    )?;

    Ok(Json(normalized(&state, &user, updated)))
}

/// DELETE /api/subscriptions/:id - Delete a subscription
pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current_user(&state, &headers)?;
    let sub = owned_subscription(&state, &user, id)?;

    state.db.delete_subscription(id)?;

    state.db.log_audit(
        &get_actor(&headers),
        "delete",
        Some("subscription"),
        Some(id),
        Some(&format!("name={}", sub.name)),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}
