//! Authentication for the Squad Quest API.
//!
//! Identity is established by the external auth provider; this layer only
//! validates the bearer tokens it mints (HS256) and extracts the subject.
//! Privileged admin endpoints are gated by a separate shared secret supplied
//! in the `x-admin-secret` header.

use crate::error::{ApiError, ApiResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration, loaded from the environment.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 secret for bearer tokens.
    pub jwt_secret: SecretString,

    /// Shared secret for the admin surface. Admin endpoints are disabled
    /// when unset.
    pub admin_secret: Option<SecretString>,
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// - `SQUADQUEST_JWT_SECRET`: bearer token signing secret
    /// - `SQUADQUEST_ADMIN_SECRET`: admin surface secret (optional)
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("SQUADQUEST_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("SQUADQUEST_JWT_SECRET not set, using development secret");
            "squadquest-dev-secret".to_string()
        });
        let admin_secret = std::env::var("SQUADQUEST_ADMIN_SECRET").ok();

        Self {
            jwt_secret: SecretString::from(jwt_secret),
            admin_secret: admin_secret.map(SecretString::from),
        }
    }

    /// Refuse to start in production with development credentials.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        if self.jwt_secret.expose_secret() == "squadquest-dev-secret" {
            return Err(ApiError::internal_error(
                "SQUADQUEST_JWT_SECRET must be set in production",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets are intentionally not printed.
        f.debug_struct("AuthConfig")
            .field("admin_secret_configured", &self.admin_secret.is_some())
            .finish()
    }
}

// ============================================================================
// CLAIMS AND CONTEXT
// ============================================================================

/// JWT claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    /// Display name, when the provider supplies one.
    pub name: Option<String>,
    /// Home city, when the provider supplies one.
    pub city: Option<String>,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Authenticated request context, injected into request extensions by the
/// auth middleware.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub name: String,
    pub city: String,
}

// ============================================================================
// TOKEN VALIDATION
// ============================================================================

/// Validate a bearer `Authorization` header into an [`AuthContext`].
pub fn authenticate(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let header = auth_header.ok_or_else(|| {
        ApiError::unauthorized("Authentication required: provide an Authorization header")
    })?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::invalid_token("Authorization header must use Bearer scheme"))?;

    let key = DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes());
    let data = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256)).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::token_expired(),
            _ => ApiError::invalid_token(format!("Token validation failed: {}", e)),
        }
    })?;

    Ok(AuthContext {
        user_id: data.claims.sub,
        name: data.claims.name.unwrap_or_else(|| "Adventurer".to_string()),
        city: data.claims.city.unwrap_or_else(|| "Unknown".to_string()),
    })
}

/// Sign a token for the given claims. Used by tests and local tooling; the
/// production issuer is the external auth provider.
pub fn issue_token(config: &AuthConfig, claims: &Claims) -> ApiResult<String> {
    let key = EncodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes());
    encode(&Header::default(), claims, &key)
        .map_err(|e| ApiError::internal_error(format!("Failed to sign token: {}", e)))
}

/// Check the `x-admin-secret` header against the configured admin secret.
pub fn verify_admin_secret(config: &AuthConfig, header: Option<&str>) -> ApiResult<()> {
    let expected = config
        .admin_secret
        .as_ref()
        .ok_or_else(|| ApiError::forbidden("Admin surface is not configured"))?;
    match header {
        Some(provided) if provided == expected.expose_secret() => Ok(()),
        Some(_) => Err(ApiError::forbidden("Invalid admin secret")),
        None => Err(ApiError::missing_field("x-admin-secret")),
    }
}
