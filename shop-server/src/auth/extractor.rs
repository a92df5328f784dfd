//! Request extractors
//!
//! `Actor` from a bearer token, `CronAuth` from the shared cron token.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::{AppError, ErrorCode};
use subtle::ConstantTimeEq;

use super::{Actor, JwtError, JwtService};
use crate::security_log;
use crate::state::AppState;

pub const CRON_TOKEN_HEADER: &str = "x-cron-token";

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(actor.clone());
        }

        let header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
            None => {
                security_log!(WARN, "auth_missing", uri = %parts.uri);
                return Err(AppError::not_authenticated());
            }
        };

        match state.jwt.validate_token(token) {
            Ok(claims) => {
                let actor = Actor::try_from(claims)
                    .map_err(|e| AppError::invalid_token(format!("Malformed claims: {e}")))?;
                parts.extensions.insert(actor.clone());
                Ok(actor)
            }
            Err(e) => {
                security_log!(WARN, "auth_failed", error = %e, uri = %parts.uri);
                match e {
                    JwtError::ExpiredToken => Err(AppError::token_expired()),
                    _ => Err(AppError::invalid_token("Invalid token")),
                }
            }
        }
    }
}

/// Proof that the request carried the cron token
#[derive(Debug, Clone, Copy)]
pub struct CronAuth;

impl FromRequestParts<AppState> for CronAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(CRON_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();

        if !provided.is_empty() && bool::from(provided.as_bytes().ct_eq(state.config.cron_token.as_bytes())) {
            Ok(CronAuth)
        } else {
            security_log!(WARN, "cron_token_rejected", uri = %parts.uri);
            Err(AppError::new(ErrorCode::CronTokenInvalid))
        }
    }
}
