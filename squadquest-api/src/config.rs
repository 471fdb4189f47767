//! API configuration.
//!
//! Process-wide settings (CORS, leaderboard size) loaded from environment
//! variables with development defaults. Reward rules live in
//! [`squadquest_core::RewardRules`]; this covers the HTTP layer only.

/// API configuration for CORS and response sizing.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in the env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Maximum rows returned by the weekly leaderboard.
    pub leaderboard_limit: usize,

    /// Maximum entries returned by the activity feed.
    pub activity_feed_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            leaderboard_limit: 50,
            activity_feed_limit: 100,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `SQUADQUEST_CORS_ORIGINS`: comma-separated origins (empty = allow all)
    /// - `SQUADQUEST_LEADERBOARD_LIMIT`: rows per leaderboard page (default 50)
    /// - `SQUADQUEST_ACTIVITY_LIMIT`: rows per activity page (default 100)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("SQUADQUEST_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let leaderboard_limit = std::env::var("SQUADQUEST_LEADERBOARD_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);

        let activity_feed_limit = std::env::var("SQUADQUEST_ACTIVITY_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);

        Self {
            cors_origins,
            leaderboard_limit,
            activity_feed_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.leaderboard_limit, 50);
        assert_eq!(config.activity_feed_limit, 100);
    }
}
