use async_trait::async_trait;
use tracing::debug;

use super::RunContext;
use super::normalize::Candidate;

/// Promotional and HR noise that never reaches the selector.
const EXCLUDE_KEYWORDS: [&str; 6] = ["채용", "인사발령", "이벤트", "프로모션", "광고", "모집"];

#[async_trait]
pub trait FilterStage: Send + Sync {
    async fn filter(
        &self,
        ctx: &RunContext,
        candidates: Vec<Candidate>,
    ) -> anyhow::Result<Vec<Candidate>>;
}

/// Drops candidates whose title or description contains any exclusion
/// keyword. A single hit excludes the item outright.
#[derive(Debug, Default, Clone)]
pub struct KeywordRuleFilter;

impl KeywordRuleFilter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn is_excluded(candidate: &Candidate) -> bool {
        let title = candidate.title.to_lowercase();
        let description = candidate.description.to_lowercase();
        EXCLUDE_KEYWORDS
            .iter()
            .any(|keyword| title.contains(keyword) || description.contains(keyword))
    }
}

#[async_trait]
impl FilterStage for KeywordRuleFilter {
    async fn filter(
        &self,
        _ctx: &RunContext,
        candidates: Vec<Candidate>,
    ) -> anyhow::Result<Vec<Candidate>> {
        let before = candidates.len();
        let kept: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| !Self::is_excluded(candidate))
            .collect();

        debug!(before, after = kept.len(), "rule filter applied");
        Ok(kept)
    }
}
