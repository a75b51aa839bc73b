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

use super::{SearchResultItem, Tool};

const SNIPPET_MAX_CHARS: usize = 200;

/// Searches ABP Framework GitHub issues through the issue search API.
/// API results are paginated and change slowly, so they get the longer TTL.
pub struct GithubIssuesSearchTool {
    cache: Arc<MemoryCache>,
    client: Arc<AbpClient>,
    api_base_url: String,
    repo: String,
    result_limit: usize,
    ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct GithubIssuesSearchParams {
    query: String,
    #[serde(default = "default_state")]
    state: String,
}

fn default_state() -> String {
    "open".to_string()
}

#[derive(Debug, Deserialize)]
struct IssueSearchResponse {
    #[serde(default)]
    items: Vec<IssueRecord>,
}

#[derive(Debug, Deserialize)]
struct IssueRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    body: Option<String>,
}

impl GithubIssuesSearchTool {
    pub fn new(config: &Config, cache: Arc<MemoryCache>, client: Arc<AbpClient>) -> Self {
        Self {
            cache,
            client,
            api_base_url: config.sources.github_api_base_url.clone(),
            repo: config.sources.github_repo.clone(),
            result_limit: config.sources.result_limit,
            ttl: Duration::from_secs(config.cache.ttl_api_minutes * 60),
        }
    }
}

fn snippet_from_body(body: Option<&str>) -> String {
    let mut snippet: String = body
        .unwrap_or_default()
        .chars()
        .take(SNIPPET_MAX_CHARS)
        .collect();
    snippet.push_str("...");
    snippet
}

#[async_trait]
impl Tool for GithubIssuesSearchTool {
    fn name(&self) -> &str {
        "abp.github.issues.search"
    }

    fn description(&self) -> &str {
        "Search ABP Framework GitHub issues."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::object()
            .string_prop("query", "Search query")
            .string_prop_with_default("state", "Issue state (open/closed)", "open")
            .require("query")
    }

    async fn execute(&self, params: Value) -> McpResult<Value> {
        let params: GithubIssuesSearchParams = parse_params(params)?;
        let key = cache_key("gh_issues", &[&params.state, &params.query]);

        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let _guard = self.cache.key_lock(&key).await;
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        info!("Searching GitHub issues for '{}'", params.query);

        let q = format!("repo:{} {} state:{}", self.repo, params.query, params.state);
        let per_page = self.result_limit.to_string();
        let url = format!("{}/search/issues", self.api_base_url);

        let response: IssueSearchResponse = self
            .client
            .get_json(&url, &[("q", &q), ("per_page", &per_page)])
            .await?;

        let items: Vec<SearchResultItem> = response
            .items
            .into_iter()
            .take(self.result_limit)
            .map(|issue| SearchResultItem {
                title: issue.title,
                url: issue.html_url,
                snippet: snippet_from_body(issue.body.as_deref()),
            })
            .collect();

        info!(
            "GitHub issue search for '{}' returned {} results",
            params.query,
            items.len()
        );

        let result = json!({ "items": items });
        self.cache.set(&key, result.clone(), self.ttl).await;

        Ok(result)
    }
}
