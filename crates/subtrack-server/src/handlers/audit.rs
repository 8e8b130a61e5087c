//! Audit log handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_actor, AppError, AppState, MAX_PAGE_LIMIT};
use subtrack_core::AuditEntry;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_audit_limit")]
    pub limit: i64,
    /// e.g. "subscription", "user", "alert"
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
}

fn default_audit_limit() -> i64 {
    100
}

/// GET /api/audit - Recent actions, newest first
///
/// `?entity_type=subscription&entity_id=7` narrows to one subscription's history.
pub async fn list_audit_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    if params.entity_id.is_some() && params.entity_type.is_none() {
        return Err(AppError::bad_request("entity_id requires entity_type"));
    }
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);

    let entries =
        state
            .db
            .list_audit_log_for(params.entity_type.as_deref(), params.entity_id, limit)?;

    state.db.log_audit(
        &get_actor(&headers),
        "list",
        Some("audit_log"),
        None,
        Some(&format!(
            "limit={}, entity_type={}",
            limit,
            params.entity_type.as_deref().unwrap_or("*")
        )),
    )?;

    Ok(Json(entries))
}
