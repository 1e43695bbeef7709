//! Selection orchestration against a mocked remote selector: retry
//! treatment per failure class, reply-shape tolerance, validation drops
//! and category balance.
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use briefing_worker::clients::selector::{SelectorClient, SelectorConfig};
use briefing_worker::pipeline::RunContext;
use briefing_worker::pipeline::normalize::{Candidate, Category};
use briefing_worker::pipeline::select::{RemoteSelectStage, SelectStage};
use briefing_worker::util::retry::RetryPolicy;

const CHAT_PATH: &str = "/openai/v1/chat/completions";

fn context() -> RunContext {
    RunContext::for_date(NaiveDate::from_ymd_opt(2026, 8, 5).expect("valid date"))
}

fn pool() -> Vec<Candidate> {
    vec![
        Candidate {
            category: Category::Domestic,
            title: "국내 해킹 사고".to_string(),
            url: "https://a.example/1".to_string(),
            published_date: NaiveDate::from_ymd_opt(2026, 8, 5).expect("valid date"),
            description: "설명".to_string(),
            priority_score: Some(20),
        },
        Candidate {
            category: Category::Overseas,
            title: "Major breach".to_string(),
            url: "https://press.example/1".to_string(),
            published_date: NaiveDate::from_ymd_opt(2026, 8, 5).expect("valid date"),
            description: "details".to_string(),
            priority_score: None,
        },
    ]
}

fn stage_for(server: &MockServer) -> RemoteSelectStage {
    let client = SelectorClient::new(SelectorConfig {
        base_url: server.uri(),
        api_key: "test-key".to_string(),
        model: "test-model".to_string(),
        timeout: Duration::from_secs(5),
        domestic_target: 7,
        overseas_target: 3,
    })
    .expect("client should build");

    // Millisecond delays keep the retry paths observable without real
    // waiting; the schedule shape is what matters.
    let policy = RetryPolicy::new(3, Duration::from_millis(20), Duration::from_millis(20));
    RemoteSelectStage::new(Some(Arc::new(client)), policy, 7, 3)
}

fn chat_reply(content: &str) -> serde_json::Value {
    serde_json::json!({"choices": [{"message": {"content": content}}]})
}

fn selection_content(items: &[(&str, &str, &str)]) -> String {
    let items: Vec<serde_json::Value> = items
        .iter()
        .map(|(category, title, url)| {
            serde_json::json!({
                "category": category,
                "title": title,
                "url": url,
                "detected_date": "2026-08-05",
                "summary": "사건 요약\n중요한 이유\n시사점"
            })
        })
        .collect();
    serde_json::to_string(&items).expect("serialize items")
}

#[tokio::test]
async fn rate_limited_attempts_succeed_on_the_third_try() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(&selection_content(
            &[("[국내]", "선별 기사", "https://a.example/1")],
        ))))
        .mount(&server)
        .await;

    let outcome = stage_for(&server)
        .select(&context(), pool())
        .await
        .expect("select should succeed");

    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.selections.len(), 1);
    assert_eq!(outcome.selections[0].title, "선별 기사");
}

#[tokio::test]
async fn malformed_replies_retry_immediately_within_the_ceiling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("여기 결과입니다")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(&selection_content(
            &[("[국내]", "선별 기사", "https://a.example/1")],
        ))))
        .mount(&server)
        .await;

    let outcome = stage_for(&server)
        .select(&context(), pool())
        .await
        .expect("select should succeed");

    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.selections.len(), 1);
}

#[tokio::test]
async fn exhausted_retries_degrade_to_an_empty_shortlist() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let outcome = stage_for(&server)
        .select(&context(), pool())
        .await
        .expect("select should not error");

    assert!(outcome.selections.is_empty());
    assert_eq!(outcome.attempts, 3);
}

#[tokio::test]
async fn client_rejections_fail_fast_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = stage_for(&server)
        .select(&context(), pool())
        .await
        .expect("select should not error");

    assert!(outcome.selections.is_empty());
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn wrapped_object_replies_are_unwrapped() {
    let server = MockServer::start().await;
    let wrapped = format!(
        "{{\"articles\": {}}}",
        selection_content(&[("[국내]", "감싸진 기사", "https://a.example/1")])
    );
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(&wrapped)))
        .mount(&server)
        .await;

    let outcome = stage_for(&server)
        .select(&context(), pool())
        .await
        .expect("select should succeed");

    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.selections[0].title, "감싸진 기사");
}

#[tokio::test]
async fn category_blocks_are_regrouped_and_capped_without_substitution() {
    let server = MockServer::start().await;
    let mut items: Vec<(String, String, String)> = Vec::new();
    items.push((
        "[해외]".to_string(),
        "해외 선두".to_string(),
        "https://press.example/0".to_string(),
    ));
    for index in 0..9 {
        items.push((
            "[국내]".to_string(),
            format!("국내 {index}"),
            format!("https://a.example/{index}"),
        ));
    }
    let borrowed: Vec<(&str, &str, &str)> = items
        .iter()
        .map(|(category, title, url)| (category.as_str(), title.as_str(), url.as_str()))
        .collect();
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply(&selection_content(&borrowed))),
        )
        .mount(&server)
        .await;

    let outcome = stage_for(&server)
        .select(&context(), pool())
        .await
        .expect("select should succeed");

    // One overseas candidate only: the shortlist holds at most one
    // overseas item and domestic stays capped at seven.
    let domestic: Vec<_> = outcome
        .selections
        .iter()
        .filter(|selection| selection.category == Category::Domestic)
        .collect();
    let overseas: Vec<_> = outcome
        .selections
        .iter()
        .filter(|selection| selection.category == Category::Overseas)
        .collect();
    assert_eq!(domestic.len(), 7);
    assert_eq!(overseas.len(), 1);
    assert!(outcome.overseas_shortfall);

    // Domestic block first, overseas appended.
    assert_eq!(outcome.selections[0].category, Category::Domestic);
    assert_eq!(
        outcome.selections.last().expect("non-empty").category,
        Category::Overseas
    );
}

#[tokio::test]
async fn invalid_items_are_dropped_without_failing_the_call() {
    let server = MockServer::start().await;
    let content = r#"[
        {"category": "[국내]", "title": "정상", "url": "https://a.example/1", "summary": "ok"},
        {"category": "[국내]", "title": "", "url": "https://a.example/2"},
        {"category": "[국내]", "url": "https://a.example/3"},
        {"title": "카테고리 없음", "url": "https://a.example/4"}
    ]"#;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(content)))
        .mount(&server)
        .await;

    let outcome = stage_for(&server)
        .select(&context(), pool())
        .await
        .expect("select should succeed");

    assert_eq!(outcome.selections.len(), 1);
    assert_eq!(outcome.selections[0].title, "정상");
}
