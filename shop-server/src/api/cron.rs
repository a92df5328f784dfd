//! Cron-triggered jobs (cron token)

use axum::Json;
use axum::extract::State;

use super::ApiResult;
use crate::auth::CronAuth;
use crate::fulfillment::{self, DispatchSummary, SentinelReport};
use crate::state::AppState;

/// POST /api/cron/dispatch-due
pub async fn dispatch_due(State(state): State<AppState>, _auth: CronAuth) -> ApiResult<DispatchSummary> {
    Ok(Json(fulfillment::dispatcher::dispatch_due(&state).await?))
}

/// POST /api/cron/sentinel
pub async fn sentinel(State(state): State<AppState>, _auth: CronAuth) -> ApiResult<SentinelReport> {
    Ok(Json(fulfillment::sentinel::run(&state).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::create_router;
    use crate::api::test_helpers::body_json;
    use crate::auth::CRON_TOKEN_HEADER;
    use crate::test_support::TestEnv;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use tower::ServiceExt;

    fn cron_request(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CRON_TOKEN_HEADER, token)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn sentinel_on_clean_state_is_ok() {
        let env = TestEnv::new().await;
        let resp = create_router(env.state.clone())
            .oneshot(cron_request("/api/cron/sentinel", &env.state.config.cron_token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["count"], 0);
        assert!(env.alerts.messages().is_empty());
    }

    #[tokio::test]
    async fn wrong_token_rejected() {
        let env = TestEnv::new().await;
        let real = env.state.config.cron_token.clone();
        let prefix = &real[..real.len() - 1];
        let extended = format!("{real}x");
        let mut flipped = real.clone().into_bytes();
        flipped[0] ^= 0x01;
        let flipped = String::from_utf8(flipped).unwrap();

        for token in ["nope", "", prefix, extended.as_str(), flipped.as_str()] {
            let resp = create_router(env.state.clone())
                .oneshot(cron_request("/api/cron/dispatch-due", token))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "token {token:?}");
        }
    }

    #[tokio::test]
    async fn dispatch_due_reports_summary() {
        let env = TestEnv::new().await;
        let resp = create_router(env.state.clone())
            .oneshot(cron_request("/api/cron/dispatch-due", &env.state.config.cron_token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["attempted"], 0);
    }
}
