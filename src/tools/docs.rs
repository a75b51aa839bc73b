use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::abp::AbpClient;
use crate::cache::{MemoryCache, cache_key};
use crate::config::Config;
use crate::error::McpResult;
use crate::mcp::types::ToolInputSchema;
use crate::utils::parse_params;

use super::Tool;
use super::scrape::{LinkQuery, collect_matching_links};

/// Searches the ABP documentation by scanning the navigation links of the
/// docs page for the requested version. The docs have no public search API,
/// so matching is a title lookup over the nav tree.
pub struct DocsSearchTool {
    cache: Arc<MemoryCache>,
    client: Arc<AbpClient>,
    site_base_url: String,
    result_limit: usize,
    ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct DocsSearchParams {
    query: String,
    #[serde(default = "default_version")]
    version: String,
}

fn default_version() -> String {
    "latest".to_string()
}

impl DocsSearchTool {
    pub fn new(config: &Config, cache: Arc<MemoryCache>, client: Arc<AbpClient>) -> Self {
        Self {
            cache,
            client,
            site_base_url: config.sources.site_base_url.clone(),
            result_limit: config.sources.result_limit,
            ttl: Duration::from_secs(config.cache.ttl_scrape_minutes * 60),
        }
    }
}

#[async_trait]
impl Tool for DocsSearchTool {
    fn name(&self) -> &str {
        "abp.docs.search"
    }

    fn description(&self) -> &str {
        "Search ABP Framework documentation."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::object()
            .string_prop("query", "Search query")
            .string_prop_with_default(
                "version",
                "Documentation version (e.g., 'latest', '9.1')",
                "latest",
            )
            .require("query")
    }

    async fn execute(&self, params: Value) -> McpResult<Value> {
        let params: DocsSearchParams = parse_params(params)?;
        let key = cache_key("docs", &[&params.version, &params.query]);

        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        // At most one outstanding fetch per key; a concurrent miss waits
        // here and then serves the freshly populated entry
        let _guard = self.cache.key_lock(&key).await;
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let url = format!("{}/docs/{}", self.site_base_url, params.version);
        let html = self.client.get_text(&url).await?;

        let items = collect_matching_links(
            &html,
            &LinkQuery {
                query: &params.query,
                base: &self.site_base_url,
                href_contains: None,
                snippet: "Found in documentation navigation.",
                limit: self.result_limit,
            },
        );

        let result = json!({ "items": items });
        self.cache.set(&key, result.clone(), self.ttl).await;

        Ok(result)
    }
}
