use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

use super::SearchResultItem;

/// Criteria for collecting links from a scraped page.
pub struct LinkQuery<'a> {
    /// Case-insensitive substring the link text must contain.
    pub query: &'a str,
    /// Base URL relative hrefs are resolved against.
    pub base: &'a str,
    /// When set, the raw href must contain this fragment to qualify.
    pub href_contains: Option<&'a str>,
    /// Fixed snippet attached to every hit from this source.
    pub snippet: &'a str,
    /// Maximum number of items returned.
    pub limit: usize,
}

/// Collects `<a>` elements matching the query from an HTML document and
/// maps them to search results with absolute URLs.
pub fn collect_matching_links(html: &str, link_query: &LinkQuery<'_>) -> Vec<SearchResultItem> {
    let document = Html::parse_document(html);

    let Ok(anchors) = Selector::parse("a") else {
        return Vec::new();
    };

    let base = match Url::parse(link_query.base) {
        Ok(base) => base,
        Err(e) => {
            warn!("Invalid base URL '{}': {}", link_query.base, e);
            return Vec::new();
        }
    };

    let needle = link_query.query.to_lowercase();
    let mut results = Vec::new();

    for anchor in document.select(&anchors) {
        let title = anchor.text().collect::<String>().trim().to_string();
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        if title.is_empty() || href.is_empty() {
            continue;
        }
        if !title.to_lowercase().contains(&needle) {
            continue;
        }
        if let Some(fragment) = link_query.href_contains
            && !href.contains(fragment)
        {
            continue;
        }

        // Resolve relative hrefs; skip anything that is not a usable URL
        let Ok(url) = base.join(href) else {
            continue;
        };

        results.push(SearchResultItem {
            title,
            url: url.to_string(),
            snippet: link_query.snippet.to_string(),
        });

        if results.len() >= link_query.limit {
            break;
        }
    }

    results
}
