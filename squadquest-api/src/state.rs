//! Shared application state for Axum routers.

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use squadquest_engine::RewardEngine;
use std::sync::Arc;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// The reward transaction engine; all gameplay mutations go through it.
    pub engine: Arc<RewardEngine>,
    pub auth: Arc<AuthConfig>,
    pub config: ApiConfig,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(engine: Arc<RewardEngine>, auth: Arc<AuthConfig>, config: ApiConfig) -> Self {
        Self {
            engine,
            auth,
            config,
            start_time: std::time::Instant::now(),
        }
    }
}
