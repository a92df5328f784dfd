//! Application state

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::channels::Channels;
use crate::config::Config;
use crate::side_effects::SideEffectQueue;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    /// Outbound collaborators (producer notify, tracking, alerts, payment gateway)
    pub channels: Channels,
    /// Post-commit tracking sync and alerts
    pub side_effects: SideEffectQueue,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        config: Config,
        channels: Channels,
        side_effects: SideEffectQueue,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt_secret);
        Self {
            pool,
            config: Arc::new(config),
            channels,
            side_effects,
            jwt,
        }
    }
}
