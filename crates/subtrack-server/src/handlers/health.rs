//! Health check

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppError, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Active alert transport ("http", "smtp", "log")
    pub transport: &'static str,
    pub today: chrono::NaiveDate,
}

/// GET /api/health - Liveness plus a database round trip
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    state.db.conn()?;
    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        transport: state.transport.name(),
        today: state.clock.today(),
    }))
}
