use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::pipeline::collect::RawCandidate;
use crate::pipeline::normalize::Category;

/// Naver news search client configuration.
#[derive(Debug, Clone)]
pub struct NaverConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Search keywords, queried one request each.
    pub queries: Vec<String>,
    pub page_size: u32,
    pub timeout: Duration,
}

/// Domestic news source. One request per configured query keyword; a
/// failing keyword is skipped so the others still contribute.
#[derive(Debug, Clone)]
pub struct NaverClient {
    client: Client,
    base_url: Url,
    client_id: String,
    client_secret: String,
    queries: Vec<String>,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: Option<String>,
    #[serde(rename = "originallink", default)]
    original_link: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(rename = "pubDate", default)]
    pub_date: Option<String>,
}

impl NaverClient {
    pub fn new(config: NaverConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build Naver HTTP client")?;
        let base_url = Url::parse(&config.base_url).context("invalid Naver base URL")?;

        Ok(Self {
            client,
            base_url,
            client_id: config.client_id,
            client_secret: config.client_secret,
            queries: config.queries,
            page_size: config.page_size,
        })
    }

    /// Runs every configured query and concatenates the raw results. Link
    /// duplication across queries is resolved downstream.
    pub async fn search_all(&self) -> Result<Vec<RawCandidate>> {
        let mut collected = Vec::new();
        for query in &self.queries {
            match self.search(query).await {
                Ok(items) => {
                    debug!(query = %query, count = items.len(), "naver query completed");
                    collected.extend(items);
                }
                Err(error) => {
                    warn!(query = %query, error = %error, "naver query failed; skipping keyword");
                }
            }
        }
        Ok(collected)
    }

    async fn search(&self, query: &str) -> Result<Vec<RawCandidate>> {
        let mut url = self
            .base_url
            .join("v1/search/news.json")
            .context("failed to build Naver search URL")?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("display", &self.page_size.to_string())
            .append_pair("sort", "date");

        let response = self
            .client
            .get(url)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .send()
            .await
            .context("naver search request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("naver search returned error status {status}");
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("failed to deserialize naver search response")?;

        Ok(body
            .items
            .into_iter()
            .map(|item| RawCandidate {
                category: Category::Domestic,
                title: item.title,
                link: item.link,
                original_link: item.original_link,
                description: item.description,
                published_hint: item.pub_date,
            })
            .collect())
    }
}
