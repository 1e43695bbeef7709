use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{Result, anyhow};
use reqwest::{Client, Url};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::pipeline::select::Selection;
use crate::util::retry::RetryPolicy;

use super::{ChatMessage, ChatRequest, ChatResponse, ServiceError};

const SYSTEM_PROMPT: &str = "너는 금융권 CISO 자문역이다.\n\
매일 선별된 보안 뉴스를 종합 분석하여, 금융사 정보보호팀장이 경영진에게 보고할 수 있는 수준의 전략적 브리핑을 작성한다.\n\n\
작성 원칙:\n\
- 단순 사실 나열이 아닌 맥락과 의미 해석\n\
- 금융권 특수성(규제, 고객데이터, 신뢰)을 반영\n\
- 기사 번호를 [N] 형식으로 참조\n\
- 한글 기준 1,500~3,000자";

/// Analysis generator configuration.
#[derive(Debug, Clone)]
pub struct AnalystConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

/// Generates the strategic briefing report from the selected articles.
/// Failure here never blocks the rest of the run; callers degrade to an
/// empty report.
#[derive(Debug, Clone)]
pub struct AnalystClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl AnalystClient {
    pub fn new(config: AnalystConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| anyhow!("failed to build analyst HTTP client: {err}"))?;
        let endpoint = Url::parse(&config.base_url)
            .map_err(|err| anyhow!("invalid analyst base URL: {err}"))?
            .join("v1/chat/completions")
            .map_err(|err| anyhow!("failed to build analyst endpoint URL: {err}"))?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            model: config.model,
            retry: config.retry,
        })
    }

    /// Produces the markdown analysis report for the day's shortlist.
    pub async fn generate_analysis(&self, selections: &[Selection]) -> Result<String> {
        if selections.is_empty() {
            return Ok(String::new());
        }

        let user_prompt = build_user_prompt(selections);
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.request_once(&user_prompt).await {
                Ok(report) => {
                    info!(chars = report.chars().count(), "analysis report generated");
                    return Ok(report);
                }
                Err(error) => {
                    let retryable = error
                        .retry_delay(&self.retry, attempts)
                        .filter(|_| self.retry.can_retry(attempts));
                    let Some(delay) = retryable else {
                        return Err(anyhow!("analysis generation failed: {error}"));
                    };
                    warn!(
                        attempt = attempts,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "analysis attempt failed"
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn request_once(&self, user_prompt: &str) -> Result<String, ServiceError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: 0.4,
            max_tokens: 4000,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(ServiceError::Network)?;

        if let Some(error) = ServiceError::from_status(response.status()) {
            return Err(error);
        }

        let body: ChatResponse =
            response
                .json()
                .await
                .map_err(|err| ServiceError::Malformed {
                    reason: format!("chat response undecodable: {err}"),
                })?;

        body.into_content().ok_or_else(|| ServiceError::Malformed {
            reason: "chat response carried no choices".to_string(),
        })
    }
}

fn build_user_prompt(selections: &[Selection]) -> String {
    let mut article_list = String::new();
    for (index, selection) in selections.iter().enumerate() {
        let number = index + 1;
        let _ = writeln!(
            article_list,
            "[{number}] {} {}\n    요약: {}",
            selection.category.wire_tag(),
            selection.title,
            selection.summary
        );
    }

    format!(
        "아래 기사들을 분석하여 3파트 전략적 리포트를 작성하라.\n\n\
[기사 목록]\n\
{article_list}\n\
[출력 형식 - 마크다운]\n\n\
## 1. 요약: (핵심 테마를 포괄하는 소제목)\n\n\
당일 기사를 2~3개 핵심 테마로 묶어 분석.\n\
각 테마에 소제목을 부여하고, 관련 기사를 [번호]로 참조.\n\n\
### A. (테마 소제목)\n\
분석 내용... [N][M]\n\n\
### B. (테마 소제목)\n\
분석 내용... [N]\n\n\
## 2. 금융사 정보보호팀을 위한 전략적 제언\n\n\
즉시 실행 가능한 3개 내외 액션 아이템. 각각 Logic과 Action 포함.\n\n\
### ① (제언 제목)\n\
- Logic: ...\n\
- Action: ...\n\n\
### ② (제언 제목)\n\
- Logic: ...\n\
- Action: ...\n\n\
## 3. 생각해볼 질문\n\n\
정보보호팀 내 토론용 도발적 질문 2~3개. 당일 기사와 연결하되 자사 적용 관점.\n\n\
### Q1\n\
질문 내용\n\n\
### Q2\n\
질문 내용"
    )
}
