use std::{env, time::Duration};

use thiserror::Error;

#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Runtime configuration, read from the environment once per invocation.
///
/// Credentials are optional on purpose: a source or downstream service with
/// no key degrades to a skipped step instead of failing startup, matching
/// the run-must-complete posture of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    naver_client_id: Option<String>,
    naver_client_secret: Option<String>,
    naver_base_url: String,
    naver_queries: Vec<String>,
    naver_page_size: u32,
    naver_timeout: Duration,
    tavily_api_key: Option<String>,
    tavily_base_url: String,
    tavily_timeout: Duration,
    tavily_window_days: u32,
    tavily_max_results: u32,
    selector_api_key: Option<String>,
    selector_base_url: String,
    selector_model: String,
    selector_timeout: Duration,
    selector_max_attempts: u32,
    selector_backoff_base: Duration,
    selector_retry_delay: Duration,
    analyst_api_key: Option<String>,
    analyst_base_url: String,
    analyst_model: String,
    analyst_timeout: Duration,
    analyst_max_attempts: u32,
    analyst_backoff_base: Duration,
    analyst_retry_delay: Duration,
    telegram_bot_token: Option<String>,
    telegram_chat_id: Option<String>,
    telegram_base_url: String,
    telegram_timeout: Duration,
    db_path: String,
    domestic_pool_cap: usize,
    overseas_pool_cap: usize,
    shortlist_domestic_cap: usize,
    shortlist_overseas_cap: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// Reads and validates the configuration from environment variables.
    /// Only malformed values fail; missing credentials merely disable the
    /// corresponding step.
    pub fn from_env() -> Result<Self, ConfigError> {
        let naver_client_id = env_opt("NAVER_CLIENT_ID");
        let naver_client_secret = env_opt("NAVER_CLIENT_SECRET");
        let naver_base_url = env_or("BRIEFING_NAVER_BASE_URL", "https://openapi.naver.com/");
        let naver_queries = parse_csv(
            "BRIEFING_DOMESTIC_QUERIES",
            "AI보안,정보보호,해킹,개인정보유출,금융보안,랜섬웨어",
        );
        let naver_page_size = parse_u32("BRIEFING_NAVER_PAGE_SIZE", 15)?;
        let naver_timeout = parse_duration_ms("BRIEFING_NAVER_TIMEOUT_MS", 10_000)?;

        let tavily_api_key = env_opt("TAVILY_API_KEY");
        let tavily_base_url = env_or("BRIEFING_TAVILY_BASE_URL", "https://api.tavily.com/");
        let tavily_timeout = parse_duration_ms("BRIEFING_TAVILY_TIMEOUT_MS", 30_000)?;
        let tavily_window_days = parse_u32("BRIEFING_TAVILY_WINDOW_DAYS", 2)?;
        let tavily_max_results = parse_u32("BRIEFING_TAVILY_MAX_RESULTS", 40)?;

        let selector_api_key = env_opt("GROQ_API_KEY");
        let selector_base_url = env_or("BRIEFING_SELECTOR_BASE_URL", "https://api.groq.com/");
        let selector_model = env_or("BRIEFING_SELECTOR_MODEL", "llama-3.3-70b-versatile");
        let selector_timeout = parse_duration_ms("BRIEFING_SELECTOR_TIMEOUT_MS", 60_000)?;
        let selector_max_attempts = parse_u32("BRIEFING_SELECTOR_MAX_ATTEMPTS", 3)?;
        let selector_backoff_base = parse_duration_ms("BRIEFING_SELECTOR_BACKOFF_BASE_MS", 10_000)?;
        let selector_retry_delay = parse_duration_ms("BRIEFING_SELECTOR_RETRY_DELAY_MS", 10_000)?;

        let analyst_api_key = env_opt("OPENAI_API_KEY");
        let analyst_base_url = env_or("BRIEFING_ANALYST_BASE_URL", "https://api.openai.com/");
        let analyst_model = env_or("BRIEFING_ANALYST_MODEL", "gpt-4o");
        let analyst_timeout = parse_duration_ms("BRIEFING_ANALYST_TIMEOUT_MS", 90_000)?;
        let analyst_max_attempts = parse_u32("BRIEFING_ANALYST_MAX_ATTEMPTS", 3)?;
        let analyst_backoff_base = parse_duration_ms("BRIEFING_ANALYST_BACKOFF_BASE_MS", 15_000)?;
        let analyst_retry_delay = parse_duration_ms("BRIEFING_ANALYST_RETRY_DELAY_MS", 10_000)?;

        let telegram_bot_token = env_opt("TELEGRAM_BOT_TOKEN");
        let telegram_chat_id = env_opt("TELEGRAM_CHAT_ID");
        let telegram_base_url = env_or("BRIEFING_TELEGRAM_BASE_URL", "https://api.telegram.org/");
        let telegram_timeout = parse_duration_ms("BRIEFING_TELEGRAM_TIMEOUT_MS", 10_000)?;

        let db_path = env_or("BRIEFING_DB_PATH", "web/data/news.db");
        let domestic_pool_cap = parse_usize("BRIEFING_DOMESTIC_POOL_CAP", 20)?;
        let overseas_pool_cap = parse_usize("BRIEFING_OVERSEAS_POOL_CAP", 20)?;
        let shortlist_domestic_cap = parse_usize("BRIEFING_SHORTLIST_DOMESTIC", 7)?;
        let shortlist_overseas_cap = parse_usize("BRIEFING_SHORTLIST_OVERSEAS", 3)?;

        Ok(Self {
            naver_client_id,
            naver_client_secret,
            naver_base_url,
            naver_queries,
            naver_page_size,
            naver_timeout,
            tavily_api_key,
            tavily_base_url,
            tavily_timeout,
            tavily_window_days,
            tavily_max_results,
            selector_api_key,
            selector_base_url,
            selector_model,
            selector_timeout,
            selector_max_attempts,
            selector_backoff_base,
            selector_retry_delay,
            analyst_api_key,
            analyst_base_url,
            analyst_model,
            analyst_timeout,
            analyst_max_attempts,
            analyst_backoff_base,
            analyst_retry_delay,
            telegram_bot_token,
            telegram_chat_id,
            telegram_base_url,
            telegram_timeout,
            db_path,
            domestic_pool_cap,
            overseas_pool_cap,
            shortlist_domestic_cap,
            shortlist_overseas_cap,
        })
    }

    #[must_use]
    pub fn naver_client_id(&self) -> Option<&str> {
        self.naver_client_id.as_deref()
    }

    #[must_use]
    pub fn naver_client_secret(&self) -> Option<&str> {
        self.naver_client_secret.as_deref()
    }

    #[must_use]
    pub fn naver_base_url(&self) -> &str {
        &self.naver_base_url
    }

    #[must_use]
    pub fn naver_queries(&self) -> &[String] {
        &self.naver_queries
    }

    #[must_use]
    pub fn naver_page_size(&self) -> u32 {
        self.naver_page_size
    }

    #[must_use]
    pub fn naver_timeout(&self) -> Duration {
        self.naver_timeout
    }

    #[must_use]
    pub fn tavily_api_key(&self) -> Option<&str> {
        self.tavily_api_key.as_deref()
    }

    #[must_use]
    pub fn tavily_base_url(&self) -> &str {
        &self.tavily_base_url
    }

    #[must_use]
    pub fn tavily_timeout(&self) -> Duration {
        self.tavily_timeout
    }

    #[must_use]
    pub fn tavily_window_days(&self) -> u32 {
        self.tavily_window_days
    }

    #[must_use]
    pub fn tavily_max_results(&self) -> u32 {
        self.tavily_max_results
    }

    #[must_use]
    pub fn selector_api_key(&self) -> Option<&str> {
        self.selector_api_key.as_deref()
    }

    #[must_use]
    pub fn selector_base_url(&self) -> &str {
        &self.selector_base_url
    }

    #[must_use]
    pub fn selector_model(&self) -> &str {
        &self.selector_model
    }

    #[must_use]
    pub fn selector_timeout(&self) -> Duration {
        self.selector_timeout
    }

    #[must_use]
    pub fn selector_max_attempts(&self) -> u32 {
        self.selector_max_attempts
    }

    #[must_use]
    pub fn selector_backoff_base(&self) -> Duration {
        self.selector_backoff_base
    }

    #[must_use]
    pub fn selector_retry_delay(&self) -> Duration {
        self.selector_retry_delay
    }

    #[must_use]
    pub fn analyst_api_key(&self) -> Option<&str> {
        self.analyst_api_key.as_deref()
    }

    #[must_use]
    pub fn analyst_base_url(&self) -> &str {
        &self.analyst_base_url
    }

    #[must_use]
    pub fn analyst_model(&self) -> &str {
        &self.analyst_model
    }

    #[must_use]
    pub fn analyst_timeout(&self) -> Duration {
        self.analyst_timeout
    }

    #[must_use]
    pub fn analyst_max_attempts(&self) -> u32 {
        self.analyst_max_attempts
    }

    #[must_use]
    pub fn analyst_backoff_base(&self) -> Duration {
        self.analyst_backoff_base
    }

    #[must_use]
    pub fn analyst_retry_delay(&self) -> Duration {
        self.analyst_retry_delay
    }

    #[must_use]
    pub fn telegram_bot_token(&self) -> Option<&str> {
        self.telegram_bot_token.as_deref()
    }

    #[must_use]
    pub fn telegram_chat_id(&self) -> Option<&str> {
        self.telegram_chat_id.as_deref()
    }

    #[must_use]
    pub fn telegram_base_url(&self) -> &str {
        &self.telegram_base_url
    }

    #[must_use]
    pub fn telegram_timeout(&self) -> Duration {
        self.telegram_timeout
    }

    #[must_use]
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    #[must_use]
    pub fn domestic_pool_cap(&self) -> usize {
        self.domestic_pool_cap
    }

    #[must_use]
    pub fn overseas_pool_cap(&self) -> usize {
        self.overseas_pool_cap
    }

    #[must_use]
    pub fn shortlist_domestic_cap(&self) -> usize {
        self.shortlist_domestic_cap
    }

    #[must_use]
    pub fn shortlist_overseas_cap(&self) -> usize {
        self.shortlist_overseas_cap
    }
}

fn env_opt(name: &'static str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(name: &'static str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default_ms.to_string());
    let ms = raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    Ok(Duration::from_millis(ms))
}

fn parse_csv(name: &'static str, default: &str) -> Vec<String> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.split(',')
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}
