use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::RunContext;
use crate::pipeline::collect::RawCandidate;
use crate::pipeline::normalize::Category;

const QUERY: &str = "Cyber Security Breach Hacking News";

/// Security press the overseas search is pinned to.
const INCLUDE_DOMAINS: [&str; 6] = [
    "thehackernews.com",
    "bleepingcomputer.com",
    "darkreading.com",
    "securityweek.com",
    "wired.com",
    "techcrunch.com",
];

/// Tavily search client configuration.
#[derive(Debug, Clone)]
pub struct TavilyConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    /// Search window passed to the service, in days.
    pub window_days: u32,
    pub max_results: u32,
    /// Cap applied to the pool after the recency filter.
    pub pool_cap: usize,
}

/// Overseas news source.
#[derive(Debug, Clone)]
pub struct TavilyClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    window_days: u32,
    max_results: u32,
    pool_cap: usize,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    topic: &'a str,
    days: u32,
    include_domains: &'a [&'a str],
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    published_date: Option<String>,
}

impl TavilyClient {
    pub fn new(config: TavilyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build Tavily HTTP client")?;
        let endpoint = Url::parse(&config.base_url)
            .context("invalid Tavily base URL")?
            .join("search")
            .context("failed to build Tavily search URL")?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            window_days: config.window_days,
            max_results: config.max_results,
            pool_cap: config.pool_cap,
        })
    }

    pub async fn search(&self, ctx: &RunContext) -> Result<Vec<RawCandidate>> {
        let request = SearchRequest {
            query: QUERY,
            topic: "news",
            days: self.window_days,
            include_domains: &INCLUDE_DOMAINS,
            max_results: self.max_results,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("tavily search request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("tavily search returned error status {status}");
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("failed to deserialize tavily search response")?;

        let current_year = ctx.today().format("%Y").to_string();
        let mut collected = Vec::new();
        for result in body.results {
            if !keeps_recency(result.published_date.as_deref(), &current_year) {
                continue;
            }
            collected.push(RawCandidate {
                category: Category::Overseas,
                title: result.title,
                link: (!result.url.is_empty()).then_some(result.url),
                original_link: None,
                description: result.content,
                published_hint: result.published_date,
            });
        }
        collected.truncate(self.pool_cap);

        debug!(count = collected.len(), "tavily results filtered");
        Ok(collected)
    }
}

/// Keep undated results and anything dated this year or with a relative
/// "ago" timestamp; stale absolute dates are dropped at the source.
fn keeps_recency(published: Option<&str>, current_year: &str) -> bool {
    match published {
        None => true,
        Some(raw) if raw.trim().is_empty() => true,
        Some(raw) => raw.contains(current_year) || raw.contains("ago"),
    }
}
