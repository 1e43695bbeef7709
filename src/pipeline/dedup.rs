use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::util::text::{extract_keywords, similarity_ratio};

use super::RunContext;
use super::normalize::Candidate;

/// Title similarity above this marks two candidates as the same event.
const SIMILARITY_THRESHOLD: f64 = 0.60;
/// Shared-keyword ratio above this marks two candidates as the same event.
const OVERLAP_THRESHOLD: f64 = 0.50;

#[async_trait]
pub trait DedupStage: Send + Sync {
    async fn merge(
        &self,
        ctx: &RunContext,
        candidates: Vec<Candidate>,
    ) -> anyhow::Result<Vec<Candidate>>;
}

/// Collapses near-duplicate coverage of one event within a pool into a
/// single representative.
///
/// Each incoming candidate is compared against the accumulated unique list
/// in insertion order and stops at the first entry it matches; a match is
/// resolved by keeping whichever title is longer. The scan order means a
/// candidate loosely matching an early entry is never compared against
/// later ones — a known limitation of the first-match policy, kept for its
/// predictability on the small capped pools this stage sees.
#[derive(Debug, Default, Clone)]
pub struct DuplicateMerger;

/// A surviving representative with its cached comparison keywords. Keeping
/// the pair in one entry keeps the cache aligned through replacements.
struct UniqueEntry {
    candidate: Candidate,
    keywords: HashSet<String>,
}

impl DuplicateMerger {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DedupStage for DuplicateMerger {
    async fn merge(
        &self,
        _ctx: &RunContext,
        candidates: Vec<Candidate>,
    ) -> anyhow::Result<Vec<Candidate>> {
        let before = candidates.len();
        let mut unique: Vec<UniqueEntry> = Vec::with_capacity(before);

        for candidate in candidates {
            let keywords = extract_keywords(&candidate.title);

            let matched = unique
                .iter()
                .position(|entry| is_duplicate(&candidate, &keywords, entry));

            match matched {
                Some(index) => {
                    let entry = &mut unique[index];
                    // Longer titles carry more specifics; ties keep the incumbent.
                    if char_count(&candidate.title) > char_count(&entry.candidate.title) {
                        debug!(
                            dropped = %entry.candidate.title,
                            kept = %candidate.title,
                            "duplicate replaced by longer title"
                        );
                        *entry = UniqueEntry {
                            candidate,
                            keywords,
                        };
                    }
                }
                None => unique.push(UniqueEntry {
                    candidate,
                    keywords,
                }),
            }
        }

        let merged: Vec<Candidate> = unique.into_iter().map(|entry| entry.candidate).collect();
        if merged.len() < before {
            info!(
                before,
                after = merged.len(),
                "near-duplicate candidates merged"
            );
        } else {
            debug!(count = merged.len(), "no duplicates detected");
        }
        Ok(merged)
    }
}

fn is_duplicate(candidate: &Candidate, keywords: &HashSet<String>, entry: &UniqueEntry) -> bool {
    let similarity = similarity_ratio(
        &candidate.title.to_lowercase(),
        &entry.candidate.title.to_lowercase(),
    );
    if similarity > SIMILARITY_THRESHOLD {
        return true;
    }
    keyword_overlap(keywords, &entry.keywords) > OVERLAP_THRESHOLD
}

/// Shared-keyword ratio relative to the smaller set; zero when either set
/// is empty.
#[allow(clippy::cast_precision_loss)]
fn keyword_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let common = a.intersection(b).count();
    common as f64 / a.len().min(b.len()) as f64
}

fn char_count(text: &str) -> usize {
    text.chars().count()
}
