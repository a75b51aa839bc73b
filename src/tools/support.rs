use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::abp::AbpClient;
use crate::cache::{MemoryCache, cache_key};
use crate::config::Config;
use crate::error::McpResult;
use crate::mcp::types::ToolInputSchema;
use crate::utils::parse_params;

use super::Tool;
use super::scrape::{LinkQuery, collect_matching_links};

/// Searches the ABP commercial support questions list. The site has no
/// query endpoint, so this scrapes the questions page and keeps only links
/// routed under /QA/.
pub struct SupportQuestionsSearchTool {
    cache: Arc<MemoryCache>,
    client: Arc<AbpClient>,
    site_base_url: String,
    result_limit: usize,
    ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct SupportQuestionsSearchParams {
    query: String,
}

impl SupportQuestionsSearchTool {
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
impl Tool for SupportQuestionsSearchTool {
    fn name(&self) -> &str {
        "abp.support.questions.search"
    }

    fn description(&self) -> &str {
        "Search ABP Framework support questions."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::object()
            .string_prop("query", "Search query")
            .require("query")
    }

    async fn execute(&self, params: Value) -> McpResult<Value> {
        let params: SupportQuestionsSearchParams = parse_params(params)?;
        let key = cache_key("support", &[&params.query]);

        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let _guard = self.cache.key_lock(&key).await;
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        info!("Searching ABP support questions for '{}'", params.query);

        let url = format!("{}/support/questions", self.site_base_url);
        let html = self.client.get_text(&url).await?;

        let items = collect_matching_links(
            &html,
            &LinkQuery {
                query: &params.query,
                base: &self.site_base_url,
                href_contains: Some("/QA/"),
                snippet: "Found in support questions.",
                limit: self.result_limit,
            },
        );

        let result = json!({ "items": items });
        self.cache.set(&key, result.clone(), self.ttl).await;

        Ok(result)
    }
}
