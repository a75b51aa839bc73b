use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Default configuration constants
const DEFAULT_SITE_BASE_URL: &str = "https://abp.io";
const DEFAULT_GITHUB_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_GITHUB_REPO: &str = "abpframework/abp";
const DEFAULT_TTL_SCRAPE_MINUTES: u64 = 10;
const DEFAULT_TTL_API_MINUTES: u64 = 60;
const DEFAULT_CACHE_MAX_ENTRIES: u64 = 1024;
const DEFAULT_RESULT_LIMIT: u64 = 5;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_DELAY_MS: u64 = 500;
const DEFAULT_MAX_DELAY_MS: u64 = 10000;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub connection: ConnectionConfig,
}

/// Base locations of the external knowledge sources. Overridable so tests
/// can point tools at a local mock server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    pub site_base_url: String,
    pub github_api_base_url: String,
    pub github_repo: String,
    pub result_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    pub ttl_scrape_minutes: u64,
    pub ttl_api_minutes: u64,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    pub timeout_seconds: u64,
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut settings = config::Config::builder();

        // Default values
        settings = settings
            .set_default("sources.site_base_url", DEFAULT_SITE_BASE_URL)?
            .set_default("sources.github_api_base_url", DEFAULT_GITHUB_API_BASE_URL)?
            .set_default("sources.github_repo", DEFAULT_GITHUB_REPO)?
            .set_default("sources.result_limit", DEFAULT_RESULT_LIMIT)?
            .set_default("cache.ttl_scrape_minutes", DEFAULT_TTL_SCRAPE_MINUTES)?
            .set_default("cache.ttl_api_minutes", DEFAULT_TTL_API_MINUTES)?
            .set_default("cache.max_entries", DEFAULT_CACHE_MAX_ENTRIES)?
            .set_default("retry.max_attempts", DEFAULT_MAX_ATTEMPTS)?
            .set_default("retry.initial_delay_ms", DEFAULT_INITIAL_DELAY_MS)?
            .set_default("retry.max_delay_ms", DEFAULT_MAX_DELAY_MS)?
            .set_default("connection.timeout_seconds", DEFAULT_TIMEOUT_SECONDS)?;

        // Load from config file if provided
        if let Some(path) = config_path
            && Path::new(path).exists()
        {
            settings = settings.add_source(config::File::with_name(path));
        }

        // Override with environment variables (ABP_MCP_SOURCES__SITE_BASE_URL etc.)
        settings = settings.add_source(
            config::Environment::with_prefix("ABP_MCP")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = settings.build()?;
        Ok(config.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourcesConfig {
                site_base_url: DEFAULT_SITE_BASE_URL.to_string(),
                github_api_base_url: DEFAULT_GITHUB_API_BASE_URL.to_string(),
                github_repo: DEFAULT_GITHUB_REPO.to_string(),
                result_limit: DEFAULT_RESULT_LIMIT as usize,
            },
            cache: CacheConfig {
                ttl_scrape_minutes: DEFAULT_TTL_SCRAPE_MINUTES,
                ttl_api_minutes: DEFAULT_TTL_API_MINUTES,
                max_entries: DEFAULT_CACHE_MAX_ENTRIES as usize,
            },
            retry: RetryConfig {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
                max_delay_ms: DEFAULT_MAX_DELAY_MS,
            },
            connection: ConnectionConfig {
                timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_uses_defaults_without_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.sources.site_base_url, "https://abp.io");
        assert_eq!(config.sources.github_repo, "abpframework/abp");
        assert_eq!(config.cache.ttl_scrape_minutes, 10);
        assert_eq!(config.cache.ttl_api_minutes, 60);
        assert_eq!(config.sources.result_limit, 5);
    }

    #[test]
    fn missing_file_is_ignored() {
        let config = Config::load(Some("/nonexistent/abp-mcp.toml")).unwrap();
        assert_eq!(config.retry.max_attempts, 3);
    }
}
