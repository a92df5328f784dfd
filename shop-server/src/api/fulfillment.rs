//! Fulfillment operator endpoints

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{FulfillmentEvent, FulfillmentOrder, FulfillmentStatus, FulfillmentStatusUpdate};

use super::ApiResult;
use crate::auth::Actor;
use crate::db::repository::fulfillment as repo;
use crate::fulfillment::{DispatchOutcome, dispatcher};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<FulfillmentStatus>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct FulfillmentDetail {
    #[serde(flatten)]
    pub fulfillment: FulfillmentOrder,
    pub events: Vec<FulfillmentEvent>,
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub fulfillment: FulfillmentOrder,
    pub outcome: DispatchOutcome,
}

/// GET /api/fulfillment
pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<FulfillmentOrder>> {
    actor.require_back_office()?;
    let list = repo::list(&state.pool, query.status, query.limit.clamp(1, 500))
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(list))
}

/// GET /api/fulfillment/{id}
pub async fn get_by_id(State(state): State<AppState>, actor: Actor, Path(id): Path<i64>) -> ApiResult<FulfillmentDetail> {
    actor.require_back_office()?;
    let fulfillment = repo::find_by_id(&state.pool, id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::FulfillmentNotFound).with_detail("fulfillment_order_id", id))?;
    let events = repo::events_for(&state.pool, id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(FulfillmentDetail { fulfillment, events }))
}

/// POST /api/fulfillment/{id}/retry
pub async fn retry(State(state): State<AppState>, actor: Actor, Path(id): Path<i64>) -> ApiResult<RetryResponse> {
    let (fulfillment, outcome) = dispatcher::retry(&state, id, &actor).await?;
    Ok(Json(RetryResponse { fulfillment, outcome }))
}

/// PUT /api/fulfillment/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(payload): Json<FulfillmentStatusUpdate>,
) -> ApiResult<FulfillmentOrder> {
    Ok(Json(dispatcher::update_status(&state, id, &payload, &actor).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::create_router;
    use crate::api::test_helpers::{bearer, body_json, json_request};
    use crate::fulfillment::dispatcher::{create_for_order, dispatch_one};
    use crate::test_support::{self, TestEnv};
    use http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn viewer_reads_admin_mutates() {
        let env = TestEnv::new().await;
        let p = test_support::producer(&env.state, "P").await;
        let order = test_support::order(&env.state, "SO-1", &[(p.id, "SKU", 1, 1000)]).await;
        let fo = create_for_order(&env.state, &order).await.unwrap().remove(0);
        let viewer = bearer(&env.state, &test_support::viewer());
        let admin = bearer(&env.state, &test_support::admin());
        let uri = format!("/api/fulfillment/{}/status", fo.id);
        let body = serde_json::json!({ "status": "confirmed" });

        let resp = create_router(env.state.clone())
            .oneshot(json_request("GET", &format!("/api/fulfillment/{}", fo.id), Some(&viewer), serde_json::Value::Null))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let detail = body_json(resp).await;
        assert_eq!(detail["status"], "pending");
        assert_eq!(detail["events"].as_array().unwrap().len(), 1);

        let resp = create_router(env.state.clone())
            .oneshot(json_request("PUT", &uri, Some(&viewer), body.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let err = body_json(resp).await;
        assert_eq!(err["code"], 2003);

        let resp = create_router(env.state.clone())
            .oneshot(json_request("PUT", &uri, Some(&admin), body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "confirmed");
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let env = TestEnv::new().await;
        let resp = create_router(env.state.clone())
            .oneshot(json_request("GET", "/api/fulfillment", None, serde_json::Value::Null))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn retry_after_successful_dispatch_is_conflict() {
        let env = TestEnv::new().await;
        let p = test_support::producer(&env.state, "P").await;
        let order = test_support::order(&env.state, "SO-1", &[(p.id, "SKU", 1, 1000)]).await;
        let fo = create_for_order(&env.state, &order).await.unwrap().remove(0);
        dispatch_one(&env.state, fo.id).await.unwrap();
        let admin = bearer(&env.state, &test_support::admin());

        let resp = create_router(env.state.clone())
            .oneshot(json_request(
                "POST",
                &format!("/api/fulfillment/{}/retry", fo.id),
                Some(&admin),
                serde_json::Value::Null,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
