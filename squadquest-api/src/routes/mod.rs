//! REST API routes.
//!
//! - Gameplay routes under `/api/v1/*`, protected by bearer auth
//! - Admin routes under `/api/v1/admin/*`, gated by the admin secret header
//! - Health check at `/health` and the OpenAPI document at `/openapi.json`,
//!   both public
//! - CORS and request tracing applied to everything

pub mod admin;
pub mod bounty;
pub mod health;
pub mod leaderboard;
pub mod profile;
pub mod quest;
pub mod shop;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Handler for the /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Build the CORS layer from ApiConfig.
///
/// Empty origins (development) allows everything; configured origins are
/// enforced in production.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]);

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: development mode, allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Create the complete API router.
///
/// Middleware order (outer to inner): CORS -> trace -> auth (gameplay routes
/// only). Admin routes check their own secret; health and the OpenAPI
/// document stay public.
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let auth_state = AuthMiddlewareState::new(state.auth.clone());

    let gameplay = Router::new()
        .nest("/bounty", bounty::create_router(state.clone()))
        .nest("/profile", profile::create_router(state.clone()))
        .nest("/quests", quest::create_router(state.clone()))
        .nest("/leaderboard", leaderboard::create_router(state.clone()))
        .nest("/activity", leaderboard::create_activity_router(state.clone()))
        .nest("/shop", shop::create_router(state.clone()))
        .layer(from_fn_with_state(auth_state, auth_middleware));

    let api_v1 = Router::new()
        .merge(gameplay)
        .nest("/admin", admin::create_router(state.clone()));

    Router::new()
        .nest("/api/v1", api_v1)
        .nest("/health", health::create_router(state))
        .route("/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(api_config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{issue_token, AuthConfig, Claims};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use squadquest_core::RewardRules;
    use squadquest_engine::{RewardEngine, TracingDispatcher};
    use squadquest_store::DocumentStore;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_app() -> (Router, String) {
        let auth = Arc::new(AuthConfig {
            jwt_secret: SecretString::from("test-secret".to_string()),
            admin_secret: Some(SecretString::from("admin-secret".to_string())),
        });
        let engine = Arc::new(RewardEngine::new(
            Arc::new(DocumentStore::new()),
            RewardRules::default(),
            Arc::new(TracingDispatcher),
        ));
        let config = ApiConfig::default();
        let state = AppState::new(engine, auth.clone(), config.clone());

        let claims = Claims {
            sub: Uuid::now_v7(),
            name: Some("Ada".to_string()),
            city: Some("Berlin".to_string()),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let token = issue_token(&auth, &claims).unwrap();
        (create_api_router(state, &config), token)
    }

    fn post(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bounty_claim_then_cooldown_shape() {
        let (app, token) = test_app();

        let response = app
            .clone()
            .oneshot(post("/api/v1/bounty/claim", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], serde_json::json!(true));
        assert_eq!(body["earned_xp"], serde_json::json!(50));
        assert_eq!(body["streak"], serde_json::json!(1));

        // Immediate replay: 403 with the cooldown marker.
        let response = app
            .oneshot(post("/api/v1/bounty/claim", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["cooldown"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_gameplay_routes_require_auth() {
        let (app, _) = test_app();
        let response = app
            .oneshot(post("/api/v1/bounty/claim", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_gate() {
        let (app, _) = test_app();

        let mut request = post("/api/v1/admin/reset-weekly-xp", None);
        request
            .headers_mut()
            .insert("x-admin-secret", "admin-secret".parse().unwrap());
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let mut request = post("/api/v1/admin/reset-weekly-xp", None);
        request
            .headers_mut()
            .insert("x-admin-secret", "wrong".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (app, _) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], serde_json::json!("ok"));
    }
}
