//! Producer registry endpoints

use axum::Json;
use axum::extract::State;
use shared::models::{Producer, ProducerCreate};

use super::ApiResult;
use crate::auth::Actor;
use crate::producers;
use crate::state::AppState;

/// GET /api/producers
pub async fn list(State(state): State<AppState>, actor: Actor) -> ApiResult<Vec<Producer>> {
    Ok(Json(producers::list_producers(&state, &actor).await?))
}

/// POST /api/producers
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<ProducerCreate>,
) -> ApiResult<Producer> {
    Ok(Json(producers::create_producer(&state, payload, &actor).await?))
}
