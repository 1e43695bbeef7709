use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clients::analyst::{AnalystClient, AnalystConfig};
use crate::clients::naver::{NaverClient, NaverConfig};
use crate::clients::selector::{SelectorClient, SelectorConfig};
use crate::clients::tavily::{TavilyClient, TavilyConfig};
use crate::clients::telegram::{TelegramClient, TelegramConfig};
use crate::config::Config;
use crate::pipeline::collect::SourceCollectStage;
use crate::pipeline::dedup::DuplicateMerger;
use crate::pipeline::normalize::TextNormalizeStage;
use crate::pipeline::rule_filter::KeywordRuleFilter;
use crate::pipeline::score::PriorityScorer;
use crate::pipeline::select::{RemoteSelectStage, Selection};
use crate::pipeline::{PipelineOrchestrator, RunContext};
use crate::store::dao::BriefingDao;
use crate::util::retry::RetryPolicy;

/// Component graph for one batch invocation. Collaborators whose
/// credentials are absent are simply not built; the run proceeds without
/// them.
pub struct App {
    pipeline: PipelineOrchestrator,
    telegram: Option<TelegramClient>,
    analyst: Option<AnalystClient>,
    dao: Option<BriefingDao>,
}

impl App {
    pub fn build(config: &Config) -> Result<Self> {
        let naver = match (config.naver_client_id(), config.naver_client_secret()) {
            (Some(client_id), Some(client_secret)) => Some(Arc::new(
                NaverClient::new(NaverConfig {
                    base_url: config.naver_base_url().to_string(),
                    client_id: client_id.to_string(),
                    client_secret: client_secret.to_string(),
                    queries: config.naver_queries().to_vec(),
                    page_size: config.naver_page_size(),
                    timeout: config.naver_timeout(),
                })
                .context("failed to build Naver client")?,
            )),
            _ => {
                warn!("Naver credentials missing; domestic collection disabled");
                None
            }
        };

        let tavily = match config.tavily_api_key() {
            Some(api_key) => Some(Arc::new(
                TavilyClient::new(TavilyConfig {
                    base_url: config.tavily_base_url().to_string(),
                    api_key: api_key.to_string(),
                    timeout: config.tavily_timeout(),
                    window_days: config.tavily_window_days(),
                    max_results: config.tavily_max_results(),
                    pool_cap: config.overseas_pool_cap(),
                })
                .context("failed to build Tavily client")?,
            )),
            None => {
                warn!("Tavily key missing; overseas collection disabled");
                None
            }
        };

        let selector = match config.selector_api_key() {
            Some(api_key) => Some(Arc::new(
                SelectorClient::new(SelectorConfig {
                    base_url: config.selector_base_url().to_string(),
                    api_key: api_key.to_string(),
                    model: config.selector_model().to_string(),
                    timeout: config.selector_timeout(),
                    domestic_target: config.shortlist_domestic_cap(),
                    overseas_target: config.shortlist_overseas_cap(),
                })
                .context("failed to build selector client")?,
            )),
            None => {
                warn!("selector key missing; selection will be skipped");
                None
            }
        };

        let selector_policy = RetryPolicy::new(
            config.selector_max_attempts(),
            config.selector_backoff_base(),
            config.selector_retry_delay(),
        );

        let pipeline = PipelineOrchestrator::builder()
            .with_collect_stage(Arc::new(SourceCollectStage::new(naver, tavily)))
            .with_normalize_stage(Arc::new(TextNormalizeStage::new()))
            .with_score_stage(Arc::new(PriorityScorer::new(config.domestic_pool_cap())))
            .with_filter_stage(Arc::new(KeywordRuleFilter::new()))
            .with_dedup_stage(Arc::new(DuplicateMerger::new()))
            .with_select_stage(Arc::new(RemoteSelectStage::new(
                selector,
                selector_policy,
                config.shortlist_domestic_cap(),
                config.shortlist_overseas_cap(),
            )))
            .build();

        let telegram = match (config.telegram_bot_token(), config.telegram_chat_id()) {
            (Some(bot_token), Some(chat_id)) => TelegramClient::new(TelegramConfig {
                base_url: config.telegram_base_url().to_string(),
                bot_token: bot_token.to_string(),
                chat_id: chat_id.to_string(),
                timeout: config.telegram_timeout(),
            })
            .map_err(|error| warn!(error = %error, "telegram delivery disabled"))
            .ok(),
            _ => {
                warn!("telegram settings missing; delivery disabled");
                None
            }
        };

        let analyst = match config.analyst_api_key() {
            Some(api_key) => AnalystClient::new(AnalystConfig {
                base_url: config.analyst_base_url().to_string(),
                api_key: api_key.to_string(),
                model: config.analyst_model().to_string(),
                timeout: config.analyst_timeout(),
                retry: RetryPolicy::new(
                    config.analyst_max_attempts(),
                    config.analyst_backoff_base(),
                    config.analyst_retry_delay(),
                ),
            })
            .map_err(|error| warn!(error = %error, "analysis generation disabled"))
            .ok(),
            None => {
                warn!("analyst key missing; analysis generation disabled");
                None
            }
        };

        let dao = BriefingDao::connect_lazy(config.db_path())
            .map_err(|error| warn!(error = %error, "briefing persistence disabled"))
            .ok();

        Ok(Self {
            pipeline,
            telegram,
            analyst,
            dao,
        })
    }

    /// Runs one collection-and-briefing cycle. An empty shortlist is a
    /// normal terminal state; only infrastructure failures bubble up.
    pub async fn run(&self) -> Result<()> {
        let ctx = RunContext::now_kst();
        info!(run_id = %ctx.run_id, date = %ctx.today_str(), "security briefing run started");

        let outcome = self.pipeline.execute(&ctx).await?;
        if outcome.selections.is_empty() {
            warn!(
                attempts = outcome.attempts,
                "no shortlist produced this run"
            );
            return Ok(());
        }

        self.dispatch(&ctx, &outcome.selections).await;

        info!(run_id = %ctx.run_id, "security briefing run finished");
        Ok(())
    }

    /// Hands the shortlist to the downstream consumers. Each consumer is
    /// failure-isolated: delivery, analysis and persistence never fail the
    /// run, and none blocks the others.
    async fn dispatch(&self, ctx: &RunContext, selections: &[Selection]) {
        if let Some(telegram) = &self.telegram {
            if let Err(error) = telegram.send_briefing(&ctx.today_str(), selections).await {
                warn!(error = %error, "briefing delivery failed");
            }
        }

        let analysis = match &self.analyst {
            Some(analyst) => match analyst.generate_analysis(selections).await {
                Ok(report) => report,
                Err(error) => {
                    warn!(error = %error, "analysis generation failed");
                    String::new()
                }
            },
            None => String::new(),
        };

        if let Some(dao) = &self.dao {
            if let Err(error) = dao
                .replace_briefing(&ctx.today_str(), selections, &analysis)
                .await
            {
                warn!(error = %error, "briefing persistence failed");
            }
        }
    }
}
