use std::sync::Arc;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use tracing::{info, warn};
use uuid::Uuid;

use crate::util::time::kst_today;

pub mod collect;
pub mod dedup;
pub mod normalize;
pub mod rule_filter;
pub mod score;
pub mod select;

use collect::CollectStage;
use dedup::DedupStage;
use normalize::NormalizeStage;
use rule_filter::FilterStage;
use score::ScoreStage;
use select::{SelectStage, SelectionOutcome};

/// Per-run clock and identity. Built fresh for every invocation so a warm
/// process can never serve a stale "today".
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    reference_date: NaiveDate,
}

impl RunContext {
    #[must_use]
    pub fn now_kst() -> Self {
        Self::for_date(kst_today())
    }

    #[must_use]
    pub fn for_date(reference_date: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            reference_date,
        }
    }

    #[must_use]
    pub const fn today(&self) -> NaiveDate {
        self.reference_date
    }

    /// Oldest publish date still admitted into a run.
    #[must_use]
    pub fn yesterday(&self) -> NaiveDate {
        self.reference_date - Days::new(1)
    }

    #[must_use]
    pub fn today_str(&self) -> String {
        self.reference_date.format("%Y-%m-%d").to_string()
    }
}

pub struct PipelineOrchestrator {
    stages: PipelineStages,
}

struct PipelineStages {
    collect: Arc<dyn CollectStage>,
    normalize: Arc<dyn NormalizeStage>,
    score: Arc<dyn ScoreStage>,
    filter: Arc<dyn FilterStage>,
    dedup: Arc<dyn DedupStage>,
    select: Arc<dyn SelectStage>,
}

#[derive(Default)]
pub struct PipelineBuilder {
    collect: Option<Arc<dyn CollectStage>>,
    normalize: Option<Arc<dyn NormalizeStage>>,
    score: Option<Arc<dyn ScoreStage>>,
    filter: Option<Arc<dyn FilterStage>>,
    dedup: Option<Arc<dyn DedupStage>>,
    select: Option<Arc<dyn SelectStage>>,
}

impl PipelineOrchestrator {
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Runs one consolidation pass: collect both source pools, prepare each
    /// pool (the domestic one is priority-ranked and capped first), then
    /// hand the concatenated pool to the remote selection step.
    pub async fn execute(&self, ctx: &RunContext) -> Result<SelectionOutcome> {
        info!(run_id = %ctx.run_id, reference_date = %ctx.today_str(), "briefing pipeline started");

        let pools = self.stages.collect.collect(ctx).await?;

        let domestic = self.stages.normalize.normalize(ctx, pools.domestic).await?;
        let domestic = self.stages.score.rank(ctx, domestic).await?;
        let domestic = self.stages.filter.filter(ctx, domestic).await?;
        let domestic = self.stages.dedup.merge(ctx, domestic).await?;

        let overseas = self.stages.normalize.normalize(ctx, pools.overseas).await?;
        let overseas = self.stages.filter.filter(ctx, overseas).await?;
        let overseas = self.stages.dedup.merge(ctx, overseas).await?;

        info!(
            domestic = domestic.len(),
            overseas = overseas.len(),
            "candidate pools ready for selection"
        );

        let mut pool = domestic;
        pool.extend(overseas);

        if pool.is_empty() {
            warn!(run_id = %ctx.run_id, "no candidates survived filtering; skipping selection");
            return Ok(SelectionOutcome::default());
        }

        let outcome = self.stages.select.select(ctx, pool).await?;
        info!(
            run_id = %ctx.run_id,
            selected = outcome.selections.len(),
            attempts = outcome.attempts,
            overseas_shortfall = outcome.overseas_shortfall,
            "briefing pipeline completed"
        );
        Ok(outcome)
    }
}

impl PipelineBuilder {
    #[must_use]
    pub fn with_collect_stage(mut self, stage: Arc<dyn CollectStage>) -> Self {
        self.collect = Some(stage);
        self
    }

    #[must_use]
    pub fn with_normalize_stage(mut self, stage: Arc<dyn NormalizeStage>) -> Self {
        self.normalize = Some(stage);
        self
    }

    #[must_use]
    pub fn with_score_stage(mut self, stage: Arc<dyn ScoreStage>) -> Self {
        self.score = Some(stage);
        self
    }

    #[must_use]
    pub fn with_filter_stage(mut self, stage: Arc<dyn FilterStage>) -> Self {
        self.filter = Some(stage);
        self
    }

    #[must_use]
    pub fn with_dedup_stage(mut self, stage: Arc<dyn DedupStage>) -> Self {
        self.dedup = Some(stage);
        self
    }

    #[must_use]
    pub fn with_select_stage(mut self, stage: Arc<dyn SelectStage>) -> Self {
        self.select = Some(stage);
        self
    }

    #[must_use]
    pub fn build(self) -> PipelineOrchestrator {
        let stages = PipelineStages {
            collect: self
                .collect
                .unwrap_or_else(|| panic!("collect stage must be configured before build")),
            normalize: self
                .normalize
                .unwrap_or_else(|| panic!("normalize stage must be configured before build")),
            score: self
                .score
                .unwrap_or_else(|| panic!("score stage must be configured before build")),
            filter: self
                .filter
                .unwrap_or_else(|| panic!("filter stage must be configured before build")),
            dedup: self
                .dedup
                .unwrap_or_else(|| panic!("dedup stage must be configured before build")),
            select: self
                .select
                .unwrap_or_else(|| panic!("select stage must be configured before build")),
        };

        PipelineOrchestrator { stages }
    }
}
