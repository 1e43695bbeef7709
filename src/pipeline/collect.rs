use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::clients::naver::NaverClient;
use crate::clients::tavily::TavilyClient;

use super::RunContext;
use super::normalize::Category;

/// Raw per-source record, before normalization. Field presence varies by
/// source; the normalizer resolves the preferred link and the date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub category: Category,
    pub title: String,
    pub link: Option<String>,
    pub original_link: Option<String>,
    pub description: String,
    pub published_hint: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectedPools {
    pub domestic: Vec<RawCandidate>,
    pub overseas: Vec<RawCandidate>,
}

#[async_trait]
pub trait CollectStage: Send + Sync {
    async fn collect(&self, ctx: &RunContext) -> anyhow::Result<CollectedPools>;
}

/// Fetches both sources concurrently and joins before anything downstream
/// runs. A missing or failing source degrades to an empty pool; the run
/// continues with whatever the other source returned.
pub struct SourceCollectStage {
    naver: Option<Arc<NaverClient>>,
    tavily: Option<Arc<TavilyClient>>,
}

impl SourceCollectStage {
    #[must_use]
    pub fn new(naver: Option<Arc<NaverClient>>, tavily: Option<Arc<TavilyClient>>) -> Self {
        Self { naver, tavily }
    }

    async fn collect_domestic(&self) -> Vec<RawCandidate> {
        let Some(client) = &self.naver else {
            warn!("domestic source credentials missing; skipping collection");
            return Vec::new();
        };

        match client.search_all().await {
            Ok(items) => items,
            Err(error) => {
                warn!(error = %error, "domestic source unavailable");
                Vec::new()
            }
        }
    }

    async fn collect_overseas(&self, ctx: &RunContext) -> Vec<RawCandidate> {
        let Some(client) = &self.tavily else {
            warn!("overseas source credentials missing; skipping collection");
            return Vec::new();
        };

        match client.search(ctx).await {
            Ok(items) => items,
            Err(error) => {
                warn!(error = %error, "overseas source unavailable");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl CollectStage for SourceCollectStage {
    async fn collect(&self, ctx: &RunContext) -> anyhow::Result<CollectedPools> {
        let (domestic, overseas) = tokio::join!(self.collect_domestic(), self.collect_overseas(ctx));

        info!(
            domestic = domestic.len(),
            overseas = overseas.len(),
            "source pools collected"
        );

        Ok(CollectedPools { domestic, overseas })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[tokio::test]
    async fn collect_without_clients_yields_empty_pools() {
        let stage = SourceCollectStage::new(None, None);
        let ctx = RunContext::for_date(NaiveDate::from_ymd_opt(2026, 8, 5).expect("valid date"));

        let pools = stage.collect(&ctx).await.expect("collect should succeed");

        assert!(pools.domestic.is_empty());
        assert!(pools.overseas.is_empty());
    }
}
