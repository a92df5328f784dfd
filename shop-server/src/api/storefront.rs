//! Storefront intake (cron token)

use axum::Json;
use axum::extract::{Path, State};
use shared::models::{Order, OrderCreate};

use super::ApiResult;
use crate::auth::CronAuth;
use crate::orders;
use crate::state::AppState;

/// POST /api/storefront/orders
pub async fn create_order(
    State(state): State<AppState>,
    _auth: CronAuth,
    Json(payload): Json<OrderCreate>,
) -> ApiResult<Order> {
    Ok(Json(orders::create_order(&state, &payload).await?))
}

/// GET /api/storefront/orders/{order_number}
pub async fn get_order(
    State(state): State<AppState>,
    _auth: CronAuth,
    Path(order_number): Path<String>,
) -> ApiResult<Order> {
    Ok(Json(orders::find_order(&state, &order_number).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::create_router;
    use crate::api::test_helpers::{body_json, json_request};
    use crate::auth::CRON_TOKEN_HEADER;
    use crate::test_support::{self, TestEnv};
    use http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn intake_requires_cron_token() {
        let env = TestEnv::new().await;
        let p = test_support::producer(&env.state, "P").await;
        let body = serde_json::json!({
            "order_number": "SO-1",
            "customer_email": null,
            "utm_source": null,
            "utm_campaign": null,
            "items": [{ "producer_id": p.id, "sku": "A", "name": "A", "quantity": 2,
                        "unit_price_cents": 500, "unit_cost_cents": 200 }]
        });

        let resp = create_router(env.state.clone())
            .oneshot(json_request("POST", "/api/storefront/orders", None, body.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let mut req = json_request("POST", "/api/storefront/orders", None, body);
        req.headers_mut()
            .insert(CRON_TOKEN_HEADER, env.state.config.cron_token.parse().unwrap());
        let resp = create_router(env.state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let order = body_json(resp).await;
        assert_eq!(order["total_cents"], 1000);
        assert_eq!(order["status"], "awaiting_payment");
    }
}
