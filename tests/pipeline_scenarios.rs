//! End-to-end pipeline scenarios against mock model and Notion APIs
//!
//! The real extractor and submitter talk HTTP to one mock server that
//! answers both APIs, so these cover the full path from typed sentence to
//! page request.

use serde_json::json;
use std::sync::{Arc, Mutex};
use tasklight::config::Config;
use tasklight::presenter::{Presenter, UiEvent, WindowCommand};
use tasklight::visibility::{Visibility, VisibilityController};
use tasklight::{Pipeline, PipelineOutcome};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const COMPLETIONS: &str = "/v1/chat/completions";
const PAGES: &str = "/v1/pages";

#[derive(Default)]
struct RecordingPresenter {
    events: Mutex<Vec<UiEvent>>,
    commands: Mutex<Vec<WindowCommand>>,
}

impl Presenter for RecordingPresenter {
    fn emit(&self, event: UiEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn command(&self, command: WindowCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

/// Both APIs on one server: the model answers `content`, Notion answers `status`
async fn serve(content: &str, status: u16) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(PAGES))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(json!({ "object": "page", "id": "p-1" })),
        )
        .mount(&server)
        .await;

    server
}

async fn requests_to(server: &MockServer, route: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == route)
        .collect()
}

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.extractor.endpoint = server.uri();
    config.extractor.api_key = Some("sk-test-key".to_string());
    config.extractor.timeout_secs = 5;
    config.notion.endpoint = server.uri();
    config.notion.database_id = Some("db-123".to_string());
    config.notion.secret = Some("secret_test".to_string());
    config.notion.timeout_secs = 5;
    config
}

struct Harness {
    pipeline: Arc<Pipeline>,
    presenter: Arc<RecordingPresenter>,
    visibility: Arc<VisibilityController>,
}

impl Harness {
    fn new(server: &MockServer) -> Self {
        let presenter = Arc::new(RecordingPresenter::default());
        let visibility = Arc::new(VisibilityController::new(presenter.clone()));
        let pipeline = Arc::new(Pipeline::from_config(
            &config_for(server),
            visibility.clone(),
            presenter.clone(),
        ));
        Self {
            pipeline,
            presenter,
            visibility,
        }
    }

    /// Run one sentence through the blocking pipeline off the runtime threads
    async fn process(&self, text: &'static str) -> PipelineOutcome {
        let pipeline = self.pipeline.clone();
        tokio::task::spawn_blocking(move || pipeline.process_message(text))
            .await
            .unwrap()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scenario_created_task_hides_input() {
    let server = serve(r#"{"title":"Buy milk","date":"2024-06-02"}"#, 200).await;
    let h = Harness::new(&server);

    let outcome = h.process("Buy milk tomorrow").await;

    assert_eq!(
        outcome,
        PipelineOutcome::Created {
            title: "Buy milk".into()
        }
    );
    assert_eq!(h.visibility.current(), Visibility::Hidden);
    assert!(h.presenter.events.lock().unwrap().is_empty());
    assert_eq!(*h.presenter.commands.lock().unwrap(), vec![WindowCommand::Hide]);

    let pages = requests_to(&server, PAGES).await;
    assert_eq!(pages.len(), 1);
    let body: serde_json::Value = pages[0].body_json().unwrap();
    assert_eq!(body["parent"]["database_id"], "db-123");
    assert_eq!(
        body["properties"]["Name"]["title"][0]["text"]["content"],
        "Buy milk"
    );
    assert_eq!(body["properties"]["Due Date"]["date"]["start"], "2024-06-02");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scenario_no_date_omits_due_date() {
    let server = serve(r#"{"title":"Call mom","date":null}"#, 200).await;
    let h = Harness::new(&server);

    let outcome = h.process("Call mom").await;
    assert!(outcome.is_created());

    let pages = requests_to(&server, PAGES).await;
    assert_eq!(pages.len(), 1);
    let body: serde_json::Value = pages[0].body_json().unwrap();
    let properties = body["properties"].as_object().unwrap();
    assert!(properties.contains_key("Name"));
    assert!(!properties.contains_key("Due Date"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scenario_unauthorized_reports_status() {
    let server = serve(r#"{"title":"Buy milk","date":null}"#, 401).await;
    let h = Harness::new(&server);

    let outcome = h.process("Buy milk").await;

    assert_eq!(
        outcome,
        PipelineOutcome::Rejected {
            status: "401 Unauthorized".into()
        }
    );
    assert_eq!(
        *h.presenter.events.lock().unwrap(),
        vec![UiEvent::Error("401 Unauthorized".into())]
    );
    assert_eq!(h.visibility.current(), Visibility::Visible);
    assert!(h.presenter.commands.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scenario_non_json_extraction_never_submits() {
    let server = serve("Sure! Your task is to buy milk.", 200).await;
    let h = Harness::new(&server);

    let outcome = h.process("Buy milk").await;

    assert!(matches!(outcome, PipelineOutcome::Failed { .. }));
    assert_eq!(requests_to(&server, COMPLETIONS).await.len(), 1);
    assert!(requests_to(&server, PAGES).await.is_empty());
    assert_eq!(h.visibility.current(), Visibility::Visible);

    let events = h.presenter.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "Backend:ErrorEvent");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_created_status_other_than_200_is_an_error() {
    let server = serve(r#"{"title":"Buy milk","date":null}"#, 201).await;
    let h = Harness::new(&server);

    let outcome = h.process("Buy milk").await;

    assert!(!outcome.is_created());
    assert_eq!(h.visibility.current(), Visibility::Visible);
    assert_eq!(
        *h.presenter.events.lock().unwrap(),
        vec![UiEvent::Error("201 Created".into())]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hotkey_and_pipeline_share_one_flag() {
    let server = serve(r#"{"title":"Buy milk","date":null}"#, 200).await;
    let h = Harness::new(&server);

    // Hotkey hides, hotkey shows again, then a successful submission hides
    h.visibility.toggle();
    h.visibility.toggle();
    assert!(h.process("Buy milk").await.is_created());
    assert_eq!(h.visibility.current(), Visibility::Hidden);

    // A later hotkey press brings it back
    h.visibility.toggle();
    assert!(h.visibility.is_visible());
}
