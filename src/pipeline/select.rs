use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::clients::selector::SelectorClient;
use crate::util::retry::RetryPolicy;

use super::RunContext;
use super::normalize::{Candidate, Category};

/// Curated output record handed to the downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub category: Category,
    pub title: String,
    /// Original-language title, present for translated overseas items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_original: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_date: Option<String>,
    pub summary: String,
}

/// Result of one selection pass. An empty selection list with a non-zero
/// attempt count means the remote call was exhausted or rejected; callers
/// treat that as "no shortlist this run", not as an error.
#[derive(Debug, Clone, Default)]
pub struct SelectionOutcome {
    pub selections: Vec<Selection>,
    pub attempts: u32,
    /// Set when fewer overseas items than targeted survived. Informational;
    /// the shortfall is never compensated with extra domestic items.
    pub overseas_shortfall: bool,
}

#[async_trait]
pub trait SelectStage: Send + Sync {
    async fn select(
        &self,
        ctx: &RunContext,
        pool: Vec<Candidate>,
    ) -> anyhow::Result<SelectionOutcome>;
}

/// Obtains the bounded shortlist from the remote selector, with retries per
/// failure class, item-level validation and category regrouping. Exhaustion
/// degrades to an empty outcome rather than an error.
pub struct RemoteSelectStage {
    client: Option<Arc<SelectorClient>>,
    policy: RetryPolicy,
    domestic_cap: usize,
    overseas_cap: usize,
}

impl RemoteSelectStage {
    #[must_use]
    pub fn new(
        client: Option<Arc<SelectorClient>>,
        policy: RetryPolicy,
        domestic_cap: usize,
        overseas_cap: usize,
    ) -> Self {
        Self {
            client,
            policy,
            domestic_cap,
            overseas_cap,
        }
    }

    fn finish(&self, selections: Vec<Selection>, attempts: u32) -> SelectionOutcome {
        let (mut domestic, mut overseas): (Vec<Selection>, Vec<Selection>) = selections
            .into_iter()
            .partition(|selection| selection.category == Category::Domestic);
        domestic.truncate(self.domestic_cap);
        overseas.truncate(self.overseas_cap);

        let overseas_count = overseas.len();
        if overseas_count == 0 {
            warn!("no overseas items were selected");
        } else if overseas_count < self.overseas_cap {
            warn!(
                selected = overseas_count,
                target = self.overseas_cap,
                "overseas selection below target"
            );
        }

        info!(
            domestic = domestic.len(),
            overseas = overseas_count,
            attempts,
            "selection completed"
        );

        let overseas_shortfall = overseas_count < self.overseas_cap;
        let mut selections = domestic;
        selections.extend(overseas);
        SelectionOutcome {
            selections,
            attempts,
            overseas_shortfall,
        }
    }
}

#[async_trait]
impl SelectStage for RemoteSelectStage {
    async fn select(
        &self,
        _ctx: &RunContext,
        pool: Vec<Candidate>,
    ) -> anyhow::Result<SelectionOutcome> {
        let Some(client) = &self.client else {
            warn!("selector credentials missing; no shortlist will be produced");
            return Ok(SelectionOutcome::default());
        };
        if pool.is_empty() {
            return Ok(SelectionOutcome::default());
        }

        let mut attempts = 0u32;
        while self.policy.can_retry(attempts) {
            attempts += 1;
            match client.request_selection(&pool).await {
                Ok(items) => {
                    let selections = validate_items(items);
                    if selections.is_empty() {
                        warn!(attempt = attempts, "selector returned no usable items");
                        continue;
                    }
                    return Ok(self.finish(selections, attempts));
                }
                Err(error) => {
                    let Some(delay) = error.retry_delay(&self.policy, attempts) else {
                        warn!(attempt = attempts, error = %error, "selection failed without retry");
                        return Ok(SelectionOutcome {
                            selections: Vec::new(),
                            attempts,
                            overseas_shortfall: false,
                        });
                    };

                    warn!(
                        attempt = attempts,
                        max_attempts = self.policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "selection attempt failed"
                    );

                    if self.policy.can_retry(attempts) && !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }

        warn!(attempts, "selection exhausted; continuing without a shortlist");
        Ok(SelectionOutcome {
            selections: Vec::new(),
            attempts,
            overseas_shortfall: false,
        })
    }
}

/// Keeps only items carrying a non-empty title, url and a recognizable
/// category tag; everything else is dropped without failing the call.
fn validate_items(items: Vec<Value>) -> Vec<Selection> {
    let total = items.len();
    let selections: Vec<Selection> = items.into_iter().filter_map(validate_item).collect();
    if selections.len() < total {
        warn!(
            received = total,
            valid = selections.len(),
            "dropped selector items failing validation"
        );
    }
    selections
}

fn validate_item(item: Value) -> Option<Selection> {
    let fields = item.as_object()?;
    let title = required_text(fields, "title")?;
    let url = required_text(fields, "url")?;
    let category = Category::from_wire_tag(fields.get("category")?.as_str()?)?;

    Some(Selection {
        category,
        title,
        title_original: optional_text(fields, "title_original"),
        url,
        detected_date: optional_text(fields, "detected_date"),
        summary: optional_text(fields, "summary").unwrap_or_default(),
    })
}

fn required_text(fields: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    let value = fields.get(key)?.as_str()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn optional_text(fields: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
