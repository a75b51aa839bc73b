pub mod community;
pub mod docs;
pub mod github;
pub mod scrape;
pub mod support;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::abp::AbpClient;
use crate::cache::MemoryCache;
use crate::config::Config;
use crate::error::McpResult;
use crate::mcp::types::ToolInputSchema;

/// A named capability invoked through `tools/call`.
///
/// `execute` receives the raw argument payload and is responsible for its
/// own validation; required-argument absence is an invocation fault, not a
/// protocol fault. Execution must be idempotent with respect to caching:
/// same tool, same normalized arguments, same cached result within the TTL.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> ToolInputSchema;
    async fn execute(&self, params: Value) -> McpResult<Value>;
}

/// A single search hit returned by every tool, as `{title, url, snippet}`.
/// URLs are always absolute; relative links from scraped pages are resolved
/// against the source's base URL before they reach a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// The fixed tool catalog, in registration order.
pub fn default_tools(
    config: &Config,
    cache: Arc<MemoryCache>,
    client: Arc<AbpClient>,
) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(docs::DocsSearchTool::new(config, cache.clone(), client.clone())),
        Arc::new(github::GithubIssuesSearchTool::new(
            config,
            cache.clone(),
            client.clone(),
        )),
        Arc::new(support::SupportQuestionsSearchTool::new(
            config,
            cache.clone(),
            client.clone(),
        )),
        Arc::new(community::CommunityArticlesSearchTool::new(config, cache, client)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_the_fixed_tools_in_order() {
        let config = Config::default();
        let cache = Arc::new(MemoryCache::new(16));
        let client = Arc::new(AbpClient::new(&config).unwrap());

        let names: Vec<String> = default_tools(&config, cache, client)
            .iter()
            .map(|tool| tool.name().to_string())
            .collect();

        assert_eq!(
            names,
            vec![
                "abp.docs.search",
                "abp.github.issues.search",
                "abp.support.questions.search",
                "abp.community.articles.search",
            ]
        );
    }
}
