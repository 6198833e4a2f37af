use std::sync::Arc;

use base64::Engine;
use docqa_rag::testing::{
    BagOfWordsEmbedder, FailingEmbedder, GroundedInference, RecordingInference,
};
use docqa_rag::{EmbeddingProvider, QaPipeline, RagConfig};
use docqa_server::{
    app_router,
    protocol::{AskResponse, ErrorBody, IndexResponse, UploadResponse},
    server::AppState,
};
use docqa_telemetry::CapturedEvents;
use serde_json::{Value, json};

const CAPITALS: &str = "Paris is the capital of France.\nBerlin is the capital of Germany.";

fn pipeline(embedder: Arc<dyn EmbeddingProvider>) -> Arc<QaPipeline> {
    Arc::new(
        QaPipeline::builder()
            .config(RagConfig::builder().chunk_size(40).chunk_overlap(0).top_k(1).build().unwrap())
            .embedding_provider(embedder)
            .answer_inference(Arc::new(GroundedInference::new()))
            .summary_inference(Arc::new(RecordingInference::replying("Two European capitals.")))
            .build()
            .unwrap(),
    )
}

async fn spawn_server_with(pipeline: Arc<QaPipeline>) -> (String, tokio::task::JoinHandle<()>) {
    let app = app_router(AppState::new(pipeline));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

async fn spawn_server() -> (String, tokio::task::JoinHandle<()>) {
    spawn_server_with(pipeline(Arc::new(BagOfWordsEmbedder::new(128)))).await
}

async fn upload(client: &reqwest::Client, base: &str, body: Value) -> UploadResponse {
    let response = client
        .post(format!("{}/api/documents", base))
        .json(&body)
        .send()
        .await
        .expect("upload response");
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    response.json().await.expect("upload json")
}

#[tokio::test]
async fn health_reports_ok() {
    let (base, handle) = spawn_server().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .expect("health response")
        .json()
        .await
        .expect("health json");
    assert_eq!(body["status"], "ok");
    handle.abort();
}

#[tokio::test]
async fn upload_index_and_ask() {
    let events = CapturedEvents::new();
    let _ = docqa_telemetry::init_with_capture("docqa-server", events.clone());
    let (base, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let uploaded = upload(&client, &base, json!({ "text": CAPITALS, "name": "capitals.txt" })).await;
    assert_eq!(uploaded.stats.word_count, 12);

    let index: IndexResponse = client
        .post(format!("{}/api/documents/{}/index", base, uploaded.session_id))
        .send()
        .await
        .expect("index response")
        .json()
        .await
        .expect("index json");
    assert_eq!(index.segments, 2);
    assert_eq!(index.dimensions, 128);

    let response = client
        .post(format!("{}/api/documents/{}/ask", base, uploaded.session_id))
        .json(&json!({ "question": "What is the capital of France?" }))
        .send()
        .await
        .expect("ask response");
    assert!(response.status().is_success());
    let answer: AskResponse = response.json().await.expect("ask json");
    assert!(answer.answer.contains("Paris"), "answer: {}", answer.answer);
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].offset, 0);

    let status: Value = client
        .get(format!("{}/api/documents/{}", base, uploaded.session_id))
        .send()
        .await
        .expect("status response")
        .json()
        .await
        .expect("status json");
    assert_eq!(status["index"]["status"], "ready");
    assert_eq!(status["name"], "capitals.txt");

    let logged = events.for_session(&uploaded.session_id);
    assert!(logged.iter().any(|event| event.message == "answered question"));

    handle.abort();
}

#[tokio::test]
async fn base64_text_upload_is_extracted() {
    let (base, handle) = spawn_server().await;
    let client = reqwest::Client::new();
    let encoded = base64::engine::general_purpose::STANDARD.encode(CAPITALS);

    let uploaded = upload(
        &client,
        &base,
        json!({ "content_base64": encoded, "mime_type": "text/plain; charset=utf-8" }),
    )
    .await;
    assert_eq!(uploaded.chars, CAPITALS.chars().count());

    handle.abort();
}

#[tokio::test]
async fn unsupported_mime_type_is_a_bad_request() {
    let (base, handle) = spawn_server().await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/documents", base))
        .json(&json!({ "content_base64": "aGVsbG8=", "mime_type": "image/png" }))
        .send()
        .await
        .expect("upload response");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("error json");
    assert_eq!(body["error"]["kind"], "extraction");
    assert_eq!(body["error"]["stage"], "extract");

    handle.abort();
}

#[tokio::test]
async fn summary_and_analysis_do_not_need_an_index() {
    let (base, handle) = spawn_server().await;
    let client = reqwest::Client::new();
    let uploaded = upload(&client, &base, json!({ "text": "A wonderful, excellent city." })).await;

    let summary: Value = client
        .post(format!("{}/api/documents/{}/summary", base, uploaded.session_id))
        .send()
        .await
        .expect("summary response")
        .json()
        .await
        .expect("summary json");
    assert_eq!(summary["summary"], "Two European capitals.");

    let analysis: Value = client
        .get(format!("{}/api/documents/{}/analysis", base, uploaded.session_id))
        .send()
        .await
        .expect("analysis response")
        .json()
        .await
        .expect("analysis json");
    assert_eq!(analysis["stats"]["word_count"], 4);
    assert_eq!(analysis["sentiment"]["label"], "positive");

    let status: Value = client
        .get(format!("{}/api/documents/{}", base, uploaded.session_id))
        .send()
        .await
        .expect("status response")
        .json()
        .await
        .expect("status json");
    assert_eq!(status["index"]["status"], "unbuilt");

    handle.abort();
}

#[tokio::test]
async fn unknown_and_deleted_sessions_are_not_found() {
    let (base, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let missing = client
        .post(format!("{}/api/documents/nope/ask", base))
        .json(&json!({ "question": "anything?" }))
        .send()
        .await
        .expect("ask response");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    let body: ErrorBody = missing.json().await.expect("error json");
    assert!(!body.error.retryable);

    let uploaded = upload(&client, &base, json!({ "text": CAPITALS })).await;
    let deleted = client
        .delete(format!("{}/api/documents/{}", base, uploaded.session_id))
        .send()
        .await
        .expect("delete response");
    assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);

    let gone = client
        .get(format!("{}/api/documents/{}", base, uploaded.session_id))
        .send()
        .await
        .expect("status response");
    assert_eq!(gone.status(), reqwest::StatusCode::NOT_FOUND);

    handle.abort();
}

#[tokio::test]
async fn empty_question_is_a_validation_error() {
    let (base, handle) = spawn_server().await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/ask", base))
        .json(&json!({ "text": CAPITALS, "question": "   " }))
        .send()
        .await
        .expect("ask response");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json().await.expect("error json");
    assert_eq!(body.error.stage.as_deref(), Some("validate"));

    handle.abort();
}

#[tokio::test]
async fn embedding_outage_is_a_bad_gateway() {
    let (base, handle) = spawn_server_with(pipeline(Arc::new(FailingEmbedder::unreachable()))).await;
    let response = reqwest::Client::new()
        .post(format!("{}/api/ask", base))
        .json(&json!({ "text": CAPITALS, "question": "What is the capital of France?" }))
        .send()
        .await
        .expect("ask response");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: ErrorBody = response.json().await.expect("error json");
    assert_eq!(body.error.stage.as_deref(), Some("embed"));
    assert!(body.error.retryable);

    handle.abort();
}

#[tokio::test]
async fn one_shot_ask_on_empty_text_uses_fixed_answer() {
    let (base, handle) = spawn_server().await;
    let answer: AskResponse = reqwest::Client::new()
        .post(format!("{}/api/ask", base))
        .json(&json!({ "text": "", "question": "Is anything here?" }))
        .send()
        .await
        .expect("ask response")
        .json()
        .await
        .expect("ask json");

    assert_eq!(answer.answer, docqa_rag::NO_CONTEXT_ANSWER);
    assert!(answer.sources.is_empty());

    handle.abort();
}
