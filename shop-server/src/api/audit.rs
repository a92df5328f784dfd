//! Audit log endpoint

use axum::Json;
use axum::extract::{Query, State};
use shared::error::AppError;

use super::ApiResult;
use crate::audit::{AuditEntry, AuditQuery};
use crate::auth::Actor;
use crate::db::repository::audit as repo;
use crate::state::AppState;

/// GET /api/audit
pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Vec<AuditEntry>> {
    actor.require_back_office()?;
    let entries = repo::list(&state.pool, &query).await.map_err(|e| {
        tracing::error!(error = %e, "Audit log query error");
        AppError::database(e.to_string())
    })?;
    Ok(Json(entries))
}
