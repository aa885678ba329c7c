//! Wire-level checks for the extraction and Notion backends

use serde_json::json;
use tasklight::config::{ExtractorConfig, NotionConfig};
use tasklight::error::{ExtractionError, SubmissionError};
use tasklight::extract::openai::OpenAiExtractor;
use tasklight::extract::TaskExtractor;
use tasklight::submit::notion::NotionSubmitter;
use tasklight::submit::{SubmissionResult, TaskSubmitter};
use tasklight::StructuredTask;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn extractor_config(endpoint: &str) -> ExtractorConfig {
    ExtractorConfig {
        endpoint: endpoint.to_string(),
        model: "gpt-4o-mini".to_string(),
        api_key: Some("sk-test-key".to_string()),
        timeout_secs: 5,
    }
}

fn notion_config(endpoint: &str) -> NotionConfig {
    NotionConfig {
        endpoint: endpoint.to_string(),
        version: "2022-06-28".to_string(),
        database_id: Some("db-123".to_string()),
        secret: Some("secret_test".to_string()),
        timeout_secs: 5,
    }
}

/// Chat completion whose first choice carries `content`
fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    }))
}

/// An address nothing is listening on
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn extract(
    config: ExtractorConfig,
    input: &'static str,
) -> Result<StructuredTask, ExtractionError> {
    tokio::task::spawn_blocking(move || OpenAiExtractor::new(&config).extract(input))
        .await
        .unwrap()
}

async fn submit(
    config: NotionConfig,
    task: StructuredTask,
) -> Result<SubmissionResult, SubmissionError> {
    tokio::task::spawn_blocking(move || NotionSubmitter::new(&config).submit(task))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extractor_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test-key"))
        .respond_with(completion(r#"{"title":"Buy milk","date":"2024-06-02"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let task = extract(extractor_config(&server.uri()), "Buy milk tomorrow")
        .await
        .unwrap();
    assert_eq!(task, StructuredTask::new("Buy milk", Some("2024-06-02".into())));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["messages"][0]["role"], "user");

    let prompt = body["messages"][0]["content"].as_str().unwrap();
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    assert!(prompt.contains("\"Buy milk tomorrow\""));
    assert!(prompt.contains(&format!("Today's date is {}", today)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extractor_accepts_fenced_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("```json\n{\"title\":\"Call mom\",\"date\":null}\n```"))
        .mount(&server)
        .await;

    let task = extract(extractor_config(&server.uri()), "Call mom")
        .await
        .unwrap();
    assert_eq!(task.title, "Call mom");
    assert_eq!(task.date, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extractor_non_json_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(completion("I could not find a task."))
        .mount(&server)
        .await;

    let err = extract(extractor_config(&server.uri()), "hmm")
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Parse(_)), "got {:?}", err);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extractor_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({ "error": { "message": "Rate limit reached" } })),
        )
        .mount(&server)
        .await;

    match extract(extractor_config(&server.uri()), "Buy milk")
        .await
        .unwrap_err()
    {
        ExtractionError::Remote { status, body } => {
            assert_eq!(status, 429);
            assert!(body.contains("Rate limit"));
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extractor_unreachable() {
    let err = extract(extractor_config(&closed_port_url()), "Buy milk")
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Network(_)), "got {:?}", err);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_submitter_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .and(header("Authorization", "Bearer secret_test"))
        .and(header("Notion-Version", "2022-06-28"))
        .and(header("Content-Type", "application/json; charset=utf-8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"object":"page"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let result = submit(
        notion_config(&server.uri()),
        StructuredTask::new("Buy milk", Some("2024-06-02".into())),
    )
    .await
    .unwrap();
    assert!(result.is_success());
    assert_eq!(result.status, "200 OK");
    assert_eq!(result.body, r#"{"object":"page"}"#);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(
        body,
        json!({
            "parent": { "type": "database_id", "database_id": "db-123" },
            "properties": {
                "Name": {
                    "type": "title",
                    "title": [{ "type": "text", "text": { "content": "Buy milk" } }]
                },
                "Due Date": { "date": { "start": "2024-06-02" } }
            }
        })
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_submitter_reports_rejection_as_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "object": "error", "code": "unauthorized" })),
        )
        .mount(&server)
        .await;

    let result = submit(
        notion_config(&server.uri()),
        StructuredTask::new("Buy milk", None),
    )
    .await
    .unwrap();
    assert!(!result.is_success());
    assert_eq!(result.status_code, 401);
    assert_eq!(result.status, "401 Unauthorized");
    assert!(result.body.contains("unauthorized"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_submitter_sends_empty_secret_when_unset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/pages"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{}"))
        .mount(&server)
        .await;

    let mut config = notion_config(&server.uri());
    config.secret = None;
    let result = submit(config, StructuredTask::new("Buy milk", None))
        .await
        .unwrap();
    assert_eq!(result.status, "401 Unauthorized");

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0]
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert_eq!(auth.trim(), "Bearer");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_submitter_unreachable() {
    let err = submit(
        notion_config(&closed_port_url()),
        StructuredTask::new("Buy milk", None),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SubmissionError::Transport(_)), "got {:?}", err);
}
