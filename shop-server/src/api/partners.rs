//! Partner and commission endpoints
//!
//! Partner tokens only ever see their own commissions.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::error::AppError;
use shared::models::{CommissionPayout, CommissionStatus, PartnerCommission, PartnerConfig, PartnerCreate};

use super::ApiResult;
use crate::auth::Actor;
use crate::commission;
use crate::db::repository::partner as partner_repo;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CommissionQuery {
    pub partner_id: Option<i64>,
    pub status: Option<CommissionStatus>,
}

/// GET /api/partners
pub async fn list(State(state): State<AppState>, actor: Actor) -> ApiResult<Vec<PartnerConfig>> {
    actor.require_back_office()?;
    let partners = partner_repo::list(&state.pool)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(partners))
}

/// POST /api/partners
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<PartnerCreate>,
) -> ApiResult<PartnerConfig> {
    Ok(Json(commission::create_partner(&state, payload, &actor).await?))
}

/// POST /api/partners/{id}/deactivate
pub async fn deactivate(State(state): State<AppState>, actor: Actor, Path(id): Path<i64>) -> ApiResult<bool> {
    commission::deactivate_partner(&state, id, &actor).await?;
    Ok(Json(true))
}

/// GET /api/commissions
pub async fn list_commissions(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<CommissionQuery>,
) -> ApiResult<Vec<PartnerCommission>> {
    Ok(Json(
        commission::list_commissions(&state, &actor, query.partner_id, query.status).await?,
    ))
}

/// POST /api/commissions/{id}/pay
pub async fn mark_paid(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<CommissionPayout>,
) -> ApiResult<PartnerCommission> {
    Ok(Json(
        commission::mark_commission_paid(&state, id, &payload.transfer_id, &actor).await?,
    ))
}
