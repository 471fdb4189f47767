//! Squad Quest API - REST layer
//!
//! Axum HTTP surface over the reward transaction engine: bearer-token
//! authenticated gameplay routes, a secret-gated admin surface, background
//! schedulers for the weekly reset and daily reminders, and health/OpenAPI
//! endpoints.

pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod types;

pub use auth::{authenticate, issue_token, AuthConfig, AuthContext, Claims};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_api_router;
pub use state::AppState;
