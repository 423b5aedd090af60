//! Configuration seams.
//!
//! The library never reads the environment itself — sessions ask a
//! [`ConfigProvider`] for the catalog URL at start time, so the value can
//! be swapped between session starts by whatever store the caller uses.
//! `DaemonConfig` is the env-backed loader for the `matcherd` binary.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dotenvy::dotenv;
use std::env;
use url::Url;

/// Provider of the process-wide catalog URL.
///
/// Queried once per session start. `None` is a fatal start-time condition
/// for that session; it is never retried internally.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    async fn catalog_url(&self) -> Option<Url>;
}

/// Fixed-value provider.
#[derive(Debug, Clone)]
pub struct StaticConfig {
    url: Option<Url>,
}

impl StaticConfig {
    pub fn new(url: Option<Url>) -> Self {
        Self { url }
    }

    pub fn missing() -> Self {
        Self { url: None }
    }
}

#[async_trait]
impl ConfigProvider for StaticConfig {
    async fn catalog_url(&self) -> Option<Url> {
        self.url.clone()
    }
}

/// Daemon configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Explore endpoint, `CATALOG_URL`. Optional here; its absence surfaces
    /// per-session as a start failure.
    pub catalog_url: Option<Url>,
    /// Access tokens, `MEEFF_TOKENS`, comma-separated.
    pub tokens: Vec<String>,
    /// Observer identity the sessions are grouped under, `OWNER_ID`.
    pub owner_id: i64,
}

impl DaemonConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let catalog_url = match env::var("CATALOG_URL") {
            Ok(raw) => Some(Url::parse(&raw).context("CATALOG_URL must be a valid URL")?),
            Err(_) => None,
        };

        let tokens: Vec<String> = env::var("MEEFF_TOKENS")
            .context("MEEFF_TOKENS must be set (comma-separated access tokens)")?
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        let owner_id = env::var("OWNER_ID")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .context("OWNER_ID must be a valid integer")?;

        Ok(Self {
            catalog_url,
            tokens,
            owner_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_config_returns_value() {
        let url = Url::parse("https://api.example.com/explore").unwrap();
        let config = StaticConfig::new(Some(url.clone()));
        assert_eq!(config.catalog_url().await, Some(url));
    }

    #[tokio::test]
    async fn missing_config_returns_none() {
        assert!(StaticConfig::missing().catalog_url().await.is_none());
    }
}
