//! API configuration.

use std::time::Duration;

use nw_ledger::DEFAULT_FREE_TIER_QUOTA;

/// Default lifetime of the session cookie (7 days).
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// Which usage store backs the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageStoreKind {
    /// DynamoDB table (production)
    DynamoDb,
    /// Process-local map (development, tests)
    Memory,
}

impl UsageStoreKind {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => UsageStoreKind::Memory,
            _ => UsageStoreKind::DynamoDb,
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second (per client IP)
    pub rate_limit_rps: u32,
    /// Request timeout
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Free attempts per anonymous session
    pub free_tier_quota: u32,
    /// Session cookie Max-Age
    pub session_max_age: Duration,
    /// Usage store backend
    pub usage_store: UsageStoreKind,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            request_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // JSON bodies only; videos go straight to S3
            environment: "development".to_string(),
            free_tier_quota: DEFAULT_FREE_TIER_QUOTA,
            session_max_age: Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS),
            usage_store: UsageStoreKind::DynamoDb,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            request_timeout: env_parse("REQUEST_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            free_tier_quota: env_parse("FREE_TIER_QUOTA").unwrap_or(defaults.free_tier_quota),
            session_max_age: env_parse("SESSION_COOKIE_MAX_AGE")
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_max_age),
            usage_store: std::env::var("USAGE_STORE")
                .map(|s| UsageStoreKind::parse(&s))
                .unwrap_or(defaults.usage_store),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.free_tier_quota, 2);
        assert_eq!(config.session_max_age, Duration::from_secs(604_800));
        assert!(!config.is_production());
    }

    #[test]
    fn test_usage_store_kind_parse() {
        assert_eq!(UsageStoreKind::parse("memory"), UsageStoreKind::Memory);
        assert_eq!(UsageStoreKind::parse(" In-Memory "), UsageStoreKind::Memory);
        assert_eq!(UsageStoreKind::parse("dynamodb"), UsageStoreKind::DynamoDb);
        assert_eq!(UsageStoreKind::parse("anything"), UsageStoreKind::DynamoDb);
    }
}
