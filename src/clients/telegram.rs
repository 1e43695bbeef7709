use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use tokio::time::sleep;
use tracing::info;

use crate::pipeline::normalize::Category;
use crate::pipeline::select::Selection;
use crate::util::text::truncate_chars;

/// Hard message-size limit of the delivery channel.
const MESSAGE_LIMIT_CHARS: usize = 4096;
/// Headroom left for the continuation marker when splitting.
const SPLIT_MARGIN_CHARS: usize = 50;

/// Telegram delivery configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub base_url: String,
    pub bot_token: String,
    pub chat_id: String,
    pub timeout: Duration,
}

/// Delivers the daily briefing to the configured chat, splitting long
/// briefings into multiple HTML messages.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    endpoint: Url,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let chat_id = config.chat_id.trim().to_string();
        // Chat ids are numeric; catching a misconfigured value here beats a
        // cryptic delivery failure later.
        chat_id
            .parse::<i64>()
            .context("telegram chat id must be numeric")?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build Telegram HTTP client")?;
        let endpoint = Url::parse(&config.base_url)
            .context("invalid Telegram base URL")?
            .join(&format!("bot{}/sendMessage", config.bot_token))
            .context("failed to build Telegram endpoint URL")?;

        Ok(Self {
            client,
            endpoint,
            chat_id,
        })
    }

    pub async fn send_briefing(&self, date_label: &str, selections: &[Selection]) -> Result<()> {
        let messages = build_messages(date_label, selections);
        let total = messages.len();

        for (index, text) in messages.iter().enumerate() {
            self.send_message(text)
                .await
                .with_context(|| format!("failed to send briefing chunk {}/{total}", index + 1))?;
            // Pace multi-chunk sends to stay under the API rate limit.
            if total > 1 && index + 1 < total {
                sleep(Duration::from_secs(1)).await;
            }
        }

        info!(chunks = total, "briefing delivered");
        Ok(())
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": false,
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .context("telegram send request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "telegram sendMessage returned {status}: {}",
                truncate_chars(&body, 200)
            );
        }
        Ok(())
    }
}

/// Renders the briefing into HTML-mode messages, splitting before the
/// channel limit. Pure so the layout is testable without a network.
#[must_use]
pub fn build_messages(date_label: &str, selections: &[Selection]) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = format!("🛡️ <b>{date_label} 보안 브리핑</b>\n\n");

    for (index, item) in selections.iter().enumerate() {
        let mut line = format!(
            "{}. {} <b>{}</b>\n",
            index + 1,
            escape_html(item.category.wire_tag()),
            escape_html(&item.title)
        );
        if item.category == Category::Overseas {
            if let Some(original) = &item.title_original {
                line.push_str(&format!("   🌐 <i>{}</i>\n", escape_html(original)));
            }
        }
        line.push_str(&format!(
            "   🔗 <a href=\"{}\">{}</a>\n\n",
            escape_url(&item.url),
            escape_html(&item.url)
        ));

        if char_count(&current) + char_count(&line) > MESSAGE_LIMIT_CHARS - SPLIT_MARGIN_CHARS {
            current.push_str("<i>계속...</i>");
            messages.push(current);
            current = format!("🛡️ <b>{date_label} 보안 브리핑 (계속)</b>\n\n");
        }
        current.push_str(&line);
    }

    current.push_str("<i>끝.</i>");
    messages.push(current);
    messages
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_url(url: &str) -> String {
    escape_html(url).replace('"', "&quot;")
}

fn char_count(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn selection(category: Category, title: &str, url: &str) -> Selection {
        Selection {
            category,
            title: title.to_string(),
            title_original: (category == Category::Overseas)
                .then(|| format!("original of {title}")),
            url: url.to_string(),
            detected_date: None,
            summary: String::new(),
        }
    }

    #[test]
    fn build_messages_renders_header_items_and_footer() {
        let selections = vec![
            selection(Category::Domestic, "국내 <주의> 기사", "https://a.example/1?a=1&b=2"),
            selection(Category::Overseas, "해외 기사", "https://press.example/2"),
        ];

        let messages = build_messages("2026-08-05", &selections);

        assert_eq!(messages.len(), 1);
        let body = &messages[0];
        assert!(body.starts_with("🛡️ <b>2026-08-05 보안 브리핑</b>"));
        assert!(body.contains("1. [국내] <b>국내 &lt;주의&gt; 기사</b>"));
        assert!(body.contains("https://a.example/1?a=1&amp;b=2"));
        assert!(body.contains("🌐 <i>original of 해외 기사</i>"));
        assert!(body.ends_with("<i>끝.</i>"));
    }

    #[test]
    fn build_messages_splits_long_briefings_with_continuation() {
        let long_title = "긴 제목 ".repeat(120);
        let selections: Vec<Selection> = (0..8)
            .map(|index| {
                selection(
                    Category::Domestic,
                    &format!("{long_title}{index}"),
                    &format!("https://a.example/{index}"),
                )
            })
            .collect();

        let messages = build_messages("2026-08-05", &selections);

        assert!(messages.len() > 1);
        assert!(messages[0].ends_with("<i>계속...</i>"));
        assert!(messages[1].contains("(계속)"));
        assert!(messages.last().expect("at least one").ends_with("<i>끝.</i>"));
        for message in &messages {
            assert!(message.chars().count() <= MESSAGE_LIMIT_CHARS);
        }
    }

    #[test]
    fn build_messages_skips_original_title_for_domestic_items() {
        let selections = vec![selection(Category::Domestic, "국내 기사", "https://a.example/1")];

        let messages = build_messages("2026-08-05", &selections);

        assert!(!messages[0].contains("🌐"));
    }

    #[test]
    fn new_rejects_non_numeric_chat_ids() {
        let error = TelegramClient::new(TelegramConfig {
            base_url: "https://api.telegram.org/".to_string(),
            bot_token: "token".to_string(),
            chat_id: "@channel".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect_err("should reject");

        assert!(error.to_string().contains("numeric"));
    }

    #[tokio::test]
    async fn send_briefing_posts_html_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bottoken/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "12345",
                "parse_mode": "HTML",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = TelegramClient::new(TelegramConfig {
            base_url: server.uri(),
            bot_token: "token".to_string(),
            chat_id: " 12345 ".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client should build");

        client
            .send_briefing(
                "2026-08-05",
                &[selection(Category::Domestic, "기사", "https://a.example/1")],
            )
            .await
            .expect("send should succeed");
    }

    #[tokio::test]
    async fn send_briefing_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("chat not found"))
            .mount(&server)
            .await;

        let client = TelegramClient::new(TelegramConfig {
            base_url: server.uri(),
            bot_token: "token".to_string(),
            chat_id: "12345".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client should build");

        let error = client
            .send_briefing(
                "2026-08-05",
                &[selection(Category::Domestic, "기사", "https://a.example/1")],
            )
            .await
            .expect_err("send should fail");

        assert!(error.to_string().contains("failed to send briefing chunk"));
    }
}
