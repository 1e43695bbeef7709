use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::util::text::{strip_markup, truncate_chars};
use crate::util::time::parse_publish_date;

use super::RunContext;
use super::collect::RawCandidate;

/// Descriptions are short teasers; anything longer gets cut.
const DESCRIPTION_MAX_CHARS: usize = 200;

/// Source category. Serialized with the wire tags the selector prompt and
/// the downstream consumers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Domestic,
    Overseas,
}

impl Category {
    #[must_use]
    pub const fn wire_tag(self) -> &'static str {
        match self {
            Self::Domestic => "[국내]",
            Self::Overseas => "[해외]",
        }
    }

    /// Lenient tag recognition for selector replies, which are not always
    /// byte-exact about brackets.
    #[must_use]
    pub fn from_wire_tag(raw: &str) -> Option<Self> {
        if raw.contains("국내") {
            Some(Self::Domestic)
        } else if raw.contains("해외") {
            Some(Self::Overseas)
        } else {
            None
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_tag())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_tag())
    }
}

/// One candidate news item under consideration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub category: Category,
    pub title: String,
    pub url: String,
    pub published_date: NaiveDate,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<i32>,
}

#[async_trait]
pub trait NormalizeStage: Send + Sync {
    async fn normalize(
        &self,
        ctx: &RunContext,
        raw: Vec<RawCandidate>,
    ) -> anyhow::Result<Vec<Candidate>>;
}

/// Cleans raw records into comparable candidates: markup stripped, the
/// preferred link resolved, publish dates parsed into the run's window,
/// and repeated links collapsed to their first occurrence.
#[derive(Debug, Default, Clone)]
pub struct TextNormalizeStage;

impl TextNormalizeStage {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NormalizeStage for TextNormalizeStage {
    async fn normalize(
        &self,
        ctx: &RunContext,
        raw: Vec<RawCandidate>,
    ) -> anyhow::Result<Vec<Candidate>> {
        let input_count = raw.len();
        let mut seen_links: HashSet<String> = HashSet::new();
        let mut candidates = Vec::with_capacity(input_count);

        for item in raw {
            let Some(candidate) = normalize_item(ctx, item) else {
                continue;
            };
            if seen_links.insert(candidate.url.clone()) {
                candidates.push(candidate);
            }
        }

        debug!(
            input = input_count,
            kept = candidates.len(),
            "candidate pool normalized"
        );
        Ok(candidates)
    }
}

/// Returns `None` when the item has no usable link or falls outside the
/// run's date window.
fn normalize_item(ctx: &RunContext, item: RawCandidate) -> Option<Candidate> {
    let url = preferred_link(item.original_link, item.link)?;

    let published_date = match item.published_hint.as_deref().map(str::trim) {
        None | Some("") => ctx.today(),
        Some(raw_date) => parse_publish_date(raw_date).unwrap_or_else(|| {
            warn!(raw = raw_date, "publish date unparsable; assuming run date");
            ctx.today()
        }),
    };
    if published_date < ctx.yesterday() {
        return None;
    }

    Some(Candidate {
        category: item.category,
        title: strip_markup(&item.title),
        url,
        published_date,
        description: truncate_chars(&strip_markup(&item.description), DESCRIPTION_MAX_CHARS),
        priority_score: None,
    })
}

/// The original-article link identifies the event better than the
/// aggregator's own permalink, so it wins when present.
fn preferred_link(original: Option<String>, fallback: Option<String>) -> Option<String> {
    for link in [original, fallback].into_iter().flatten() {
        let trimmed = link.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}
