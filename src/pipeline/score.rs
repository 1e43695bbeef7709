use async_trait::async_trait;
use tracing::info;

use super::RunContext;
use super::normalize::Candidate;

/// Tier-1 vocabulary: breach/incident-class terms.
const TIER_ONE: [&str; 7] = [
    "ai보안",
    "해킹",
    "유출",
    "랜섬웨어",
    "사이버공격",
    "보안사고",
    "침해",
];

/// Tier-2 vocabulary: regulatory and technical terms.
const TIER_TWO: [&str; 6] = [
    "금융보안원",
    "금감원",
    "규제",
    "보안기술",
    "제로데이",
    "취약점",
];

const BRAND_TERM: &str = "신한";

const TIER_ONE_WEIGHT: i32 = 10;
const TIER_TWO_WEIGHT: i32 = 5;
const BRAND_BONUS: i32 = 3;
const SAME_DAY_BONUS: i32 = 2;

#[async_trait]
pub trait ScoreStage: Send + Sync {
    async fn rank(
        &self,
        ctx: &RunContext,
        candidates: Vec<Candidate>,
    ) -> anyhow::Result<Vec<Candidate>>;
}

/// Ranks the domestic pool by weighted keyword hits plus recency and keeps
/// only the top slice. This is a pre-filter heuristic to bound downstream
/// work; the remote selector remains the final ranking authority.
#[derive(Debug, Clone)]
pub struct PriorityScorer {
    pool_cap: usize,
}

impl PriorityScorer {
    #[must_use]
    pub fn new(pool_cap: usize) -> Self {
        Self { pool_cap }
    }

    /// Each distinct keyword counts once, whether it appears in the title,
    /// the description, or both.
    #[must_use]
    pub fn score(ctx: &RunContext, candidate: &Candidate) -> i32 {
        let title = candidate.title.to_lowercase();
        let description = candidate.description.to_lowercase();
        let hit = |keyword: &str| title.contains(keyword) || description.contains(keyword);

        let mut score = 0;
        for keyword in TIER_ONE {
            if hit(keyword) {
                score += TIER_ONE_WEIGHT;
            }
        }
        for keyword in TIER_TWO {
            if hit(keyword) {
                score += TIER_TWO_WEIGHT;
            }
        }
        if hit(BRAND_TERM) {
            score += BRAND_BONUS;
        }
        if candidate.published_date == ctx.today() {
            score += SAME_DAY_BONUS;
        }
        score
    }
}

#[async_trait]
impl ScoreStage for PriorityScorer {
    async fn rank(
        &self,
        ctx: &RunContext,
        mut candidates: Vec<Candidate>,
    ) -> anyhow::Result<Vec<Candidate>> {
        for candidate in &mut candidates {
            candidate.priority_score = Some(Self::score(ctx, candidate));
        }

        // Stable sort: equal scores keep their collection order.
        candidates.sort_by_key(|candidate| std::cmp::Reverse(candidate.priority_score));

        if candidates.len() > self.pool_cap {
            candidates.truncate(self.pool_cap);
            info!(
                cap = self.pool_cap,
                "domestic pool truncated to top-priority candidates"
            );
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::super::normalize::Category;
    use super::*;

    fn context() -> RunContext {
        RunContext::for_date(NaiveDate::from_ymd_opt(2026, 8, 5).expect("valid date"))
    }

    fn candidate(title: &str, description: &str, published: NaiveDate) -> Candidate {
        Candidate {
            category: Category::Domestic,
            title: title.to_string(),
            url: format!("https://a.example/{title}"),
            published_date: published,
            description: description.to_string(),
            priority_score: None,
        }
    }

    #[test]
    fn score_sums_distinct_tier_hits() {
        let ctx = context();
        let yesterday = ctx.yesterday();

        // Two tier-1 terms plus one tier-2 term.
        let item = candidate("해킹으로 고객정보 유출", "제로데이 취약점 악용", yesterday);
        // 유출/해킹 10점씩 + 제로데이/취약점 5점씩
        assert_eq!(PriorityScorer::score(&ctx, &item), 30);
    }

    #[test]
    fn score_counts_a_keyword_once_across_fields() {
        let ctx = context();
        let item = candidate("랜섬웨어 확산", "랜섬웨어 주의보", ctx.yesterday());
        assert_eq!(PriorityScorer::score(&ctx, &item), TIER_ONE_WEIGHT);
    }

    #[test]
    fn score_adds_brand_and_same_day_bonuses() {
        let ctx = context();
        let item = candidate("신한 보안 점검", "", ctx.today());
        assert_eq!(PriorityScorer::score(&ctx, &item), BRAND_BONUS + SAME_DAY_BONUS);
    }

    #[test]
    fn score_matches_case_insensitively() {
        let ctx = context();
        let item = candidate("AI보안 컨퍼런스", "", ctx.yesterday());
        assert_eq!(PriorityScorer::score(&ctx, &item), TIER_ONE_WEIGHT);
    }

    #[tokio::test]
    async fn rank_orders_by_score_and_truncates() {
        let ctx = context();
        let scorer = PriorityScorer::new(2);
        let candidates = vec![
            candidate("일반 소식", "", ctx.yesterday()),
            candidate("랜섬웨어 침해 사고", "", ctx.yesterday()),
            candidate("취약점 공지", "", ctx.yesterday()),
        ];

        let ranked = scorer.rank(&ctx, candidates).await.expect("rank");

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].title, "랜섬웨어 침해 사고");
        assert_eq!(ranked[1].title, "취약점 공지");
        assert_eq!(ranked[0].priority_score, Some(2 * TIER_ONE_WEIGHT));
    }

    #[tokio::test]
    async fn rank_keeps_collection_order_on_ties() {
        let ctx = context();
        let scorer = PriorityScorer::new(10);
        let candidates = vec![
            candidate("첫 번째 무점수", "", ctx.yesterday()),
            candidate("두 번째 무점수", "", ctx.yesterday()),
        ];

        let ranked = scorer.rank(&ctx, candidates).await.expect("rank");

        assert_eq!(ranked[0].title, "첫 번째 무점수");
        assert_eq!(ranked[1].title, "두 번째 무점수");
    }
}
