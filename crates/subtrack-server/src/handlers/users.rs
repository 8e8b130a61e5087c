//! Current-user handlers

use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};

use crate::{current_user, get_actor, AppError, AppState};
use subtrack_core::models::{User, UserPreferences};

/// GET /api/me - The selected user and their preferences
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<User>, AppError> {
    let user = current_user(&state, &headers)?;

    state
        .db
        .log_audit(&get_actor(&headers), "view", Some("user"), Some(user.id), None)?;

    Ok(Json(user))
}

/// PUT /api/me - Update notification and currency preferences
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(prefs): Json<UserPreferences>,
) -> Result<Json<User>, AppError> {
    let user = current_user(&state, &headers)?;

    if let Some(code) = &prefs.display_currency {
        if !state.rates.supports(code) {
            return Err(AppError::bad_request(&format!(
                "No exchange rate configured for {}",
                code.to_uppercase()
            )));
        }
    }

    let updated = state.db.update_user_preferences(user.id, &prefs)?;

    state.db.log_audit(
        &get_actor(&headers),
        "update",
        Some("user"),
        Some(user.id),
        Some(&format!(
            "email_alerts={}, display_currency={}",
            updated.email_alerts, updated.display_currency
        )),
    )?;

    Ok(Json(updated))
}
