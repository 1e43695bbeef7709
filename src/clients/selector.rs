use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::pipeline::normalize::Candidate;

use super::{ChatMessage, ChatRequest, ChatResponse, ServiceError};

const SYSTEM_PROMPT: &str = "너는 금융권 보안 뉴스 전문 큐레이터다.\n\
뉴스를 우선순위에 따라 선별한다.\n\n\
우선순위:\n\
1. AI보안 (AI 보안 관련 뉴스) - 최우선\n\
2. 침해사고 (해킹/유출/랜섬웨어/사이버공격) - 최우선\n\
3. 규제/정책 (금융당국·보안원 발표, 법규 개정)\n\
4. 기술/취약점 (제로데이, 새 공격기법)\n\
5. 신한 관련 (+가점)\n\n\
제외: 홍보성, 단순 인사, 중복 내용";

/// Remote selector client configuration.
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    /// Requested number of domestic picks.
    pub domestic_target: usize,
    /// Requested number of overseas picks.
    pub overseas_target: usize,
}

/// Chat-completion transport to the remote selection service. One call
/// carries the whole candidate pool; the reply is a JSON selection list,
/// sometimes wrapped in an object.
#[derive(Debug, Clone)]
pub struct SelectorClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    domestic_target: usize,
    overseas_target: usize,
}

impl SelectorClient {
    pub fn new(config: SelectorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build selector HTTP client")?;

        let endpoint = Url::parse(&config.base_url)
            .context("invalid selector base URL")?
            .join("openai/v1/chat/completions")
            .context("failed to build selector endpoint URL")?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            model: config.model,
            domestic_target: config.domestic_target,
            overseas_target: config.overseas_target,
        })
    }

    /// Sends the candidate pool for curation and returns the raw selection
    /// items. Item-level validation is the caller's concern; this method
    /// only guarantees that a list was found.
    pub async fn request_selection(&self, pool: &[Candidate]) -> Result<Vec<Value>, ServiceError> {
        let payload = serde_json::to_string_pretty(pool).map_err(|err| ServiceError::Malformed {
            reason: format!("failed to encode candidate pool: {err}"),
        })?;
        let user_prompt = self.build_user_prompt(&payload);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: 0.1,
            max_tokens: 4096,
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

        let Some(content) = body.into_content() else {
            return Err(ServiceError::Malformed {
                reason: "chat response carried no choices".to_string(),
            });
        };

        let cleaned = strip_code_fences(&content);
        let reply: SelectorReply =
            serde_json::from_str(cleaned).map_err(|err| ServiceError::Malformed {
                reason: format!("selection payload is not valid JSON: {err}"),
            })?;

        reply.into_items().ok_or_else(|| ServiceError::Malformed {
            reason: "no selection list found in reply".to_string(),
        })
    }

    fn build_user_prompt(&self, payload: &str) -> String {
        let domestic = self.domestic_target;
        let overseas = self.overseas_target;
        let total = domestic + overseas;
        format!(
            "아래 기사 중에서:\n\
- [국내] 태그 기사 중 상위 {domestic}개\n\
- [해외] 태그 기사 중 상위 {overseas}개\n\
총 {total}개를 선별해라.\n\n\
⚠️ **중복 제거 규칙 (매우 중요)**:\n\
1. 같은 사건/사고를 다룬 기사는 **반드시 1개만** 선택\n\
2. 제목이 비슷한 기사들 중 **가장 상세한 1개**만 선택\n\
3. 다양한 사건을 다룬 기사를 선택 (한 사건에 5개 X)\n\n\
⚠️ **해외 기사 필수**:\n\
- [해외] 태그 기사를 **반드시 찾아서** {overseas}개 선택\n\
- [해외] 기사가 {overseas}개 미만이면 있는 만큼만 포함\n\
- [해외] 기사가 없으면 국내 기사로만 구성\n\n\
[입력 데이터]\n\
{payload}\n\n\
[출력 포맷]\n\
JSON 배열로만 출력:\n\
[\n\
  {{\n\
    \"category\": \"[국내 or 해외]\",\n\
    \"title\": \"제목 (해외 기사는 한글로 번역)\",\n\
    \"title_original\": \"원문 제목 (해외 기사만, 국내는 생략)\",\n\
    \"url\": \"링크\",\n\
    \"detected_date\": \"YYYY-MM-DD\",\n\
    \"summary\": \"150자 이내 3줄 요약 (1줄: 사건요약, 2줄: 중요한 이유, 3줄: 시사점/전망)\"\n\
  }}\n\
]\n\n\
⚠️ **summary 규칙**:\n\
- summary: 기사 핵심을 150자 이내, 3줄로 요약. 각 줄은 핵심 사실 하나씩 담을 것\n\
- 1줄: 무엇이 일어났는가 (사건/발표 요약)\n\
- 2줄: 왜 중요한가 (영향/배경)\n\
- 3줄: 어떤 의미가 있는가 (시사점/전망)\n\n\
⚠️ **해외 기사 번역 규칙**:\n\
- [해외] 기사의 title은 **반드시 한글로 번역**\n\
- title_original에 영어 원문 보관\n\
- 번역은 자연스럽고 이해하기 쉽게 (직역X, 의역O)\n\
- 국내 기사는 title_original 필드 생략"
        )
    }
}

/// The selector answers either with a bare JSON array or with an object
/// wrapping the array under some key. All shape tolerance lives here.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SelectorReply {
    List(Vec<Value>),
    Wrapped(serde_json::Map<String, Value>),
}

impl SelectorReply {
    /// A bare list is taken as-is; a wrapped object yields its first
    /// non-empty list-valued field. `None` when nothing list-shaped exists.
    #[must_use]
    pub fn into_items(self) -> Option<Vec<Value>> {
        match self {
            Self::List(items) => Some(items),
            Self::Wrapped(fields) => {
                for (key, value) in fields {
                    if let Value::Array(items) = value {
                        if !items.is_empty() {
                            debug!(
                                field = %key,
                                count = items.len(),
                                "selection list found under wrapped field"
                            );
                            return Some(items);
                        }
                    }
                }
                None
            }
        }
    }
}

/// Replies often arrive wrapped in a markdown code fence.
fn strip_code_fences(content: &str) -> &str {
    content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}
