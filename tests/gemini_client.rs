//! `GeminiClassifier` against an in-process stub of the Gemini API: request
//! shape, response parsing, failure surfacing and opt-in retries.

mod common;

use common::{batch_body, output_update, sample_batch, start_stub, update_body};
use fpa_estimator::classifier::{Classifier, ClassifyError, GeminiClassifier};
use fpa_estimator::config::Config;
use fpa_estimator_core::models::{FunctionType, ProjectType, StoryRecord};
use serde_json::json;

/// Config pointing at `base`, with an API key in a test-specific variable.
fn stub_config(base: &str, key_env: &str) -> Config {
    std::env::set_var(key_env, "test-key");
    let mut config = Config::default();
    config.classifier.api_base = base.to_string();
    config.classifier.model = "gemini-test".to_string();
    config.classifier.api_key_env = key_env.to_string();
    config.classifier.timeout_secs = 5;
    config
}

fn existing_story() -> StoryRecord {
    StoryRecord {
        id: "s1".into(),
        original_text: "Emitir relatório de usuários".into(),
        short_name: "Relatório".into(),
        function_type: FunctionType::ExternalQuery,
        project_type: ProjectType::Development,
        confidence: 0.5,
        warnings: vec![],
        is_duplicate: false,
        reasoning_function_type: String::new(),
        reasoning_project_type: String::new(),
    }
}

#[tokio::test]
async fn batch_request_carries_schema_and_returns_stories() {
    let stub = start_stub(vec![(200, batch_body(&sample_batch()))]).await;
    let classifier = GeminiClassifier::new(&stub_config(&stub.base, "FPA_TEST_KEY_BATCH")).unwrap();

    let stories = classifier
        .classify_batch("[SPRINT 23] Implementar cadastro de usuários")
        .await
        .unwrap();
    assert_eq!(stories, sample_batch());

    let requests = stub.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.call, "gemini-test:generateContent");
    assert_eq!(req.api_key.as_deref(), Some("test-key"));
    assert_eq!(
        req.body["contents"][0]["parts"][0]["text"],
        "[SPRINT 23] Implementar cadastro de usuários"
    );
    assert!(req.body["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("PORTUGUESE"));
    let gen = &req.body["generationConfig"];
    assert_eq!(gen["responseMimeType"], "application/json");
    assert_eq!(gen["temperature"], 0.1);
    assert_eq!(gen["responseSchema"]["required"], json!(["stories"]));
}

#[tokio::test]
async fn reclassify_sends_bounded_context_without_identity_fields() {
    let stub = start_stub(vec![(200, update_body(&output_update()))]).await;
    let mut config = stub_config(&stub.base, "FPA_TEST_KEY_SINGLE");
    config.reanalysis.max_context_chars = 20;
    let classifier = GeminiClassifier::new(&config).unwrap();

    let context = format!("{}{}", "a".repeat(20), "b".repeat(100));
    let update = classifier
        .reclassify(&existing_story(), &context)
        .await
        .unwrap();
    assert_eq!(update, output_update());

    let body = &stub.requests()[0].body;
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("Emitir relatório de usuários"));
    assert!(prompt.contains("Current function type: CE"));
    assert!(prompt.contains(&"a".repeat(20)));
    assert!(!prompt.contains("abb"));
    assert!(body.get("systemInstruction").is_none());

    let schema = &body["generationConfig"]["responseSchema"];
    assert!(schema["properties"].get("id").is_none());
    assert!(schema["properties"].get("originalText").is_none());
    assert_eq!(body["generationConfig"]["temperature"], 0.2);
}

#[tokio::test]
async fn response_with_forged_id_cannot_change_identity() {
    let mut payload = serde_json::to_value(output_update()).unwrap();
    payload["id"] = json!("forged-id");
    payload["originalText"] = json!("forged text");
    let body = fpa_estimator::classifier::mock_generate_response(&payload);

    let stub = start_stub(vec![(200, body)]).await;
    let classifier =
        GeminiClassifier::new(&stub_config(&stub.base, "FPA_TEST_KEY_FORGED")).unwrap();

    let existing = existing_story();
    let merged = classifier
        .reclassify(&existing, "contexto")
        .await
        .unwrap()
        .merge_into(&existing);
    assert_eq!(merged.id, "s1");
    assert_eq!(merged.original_text, "Emitir relatório de usuários");
    assert_eq!(merged.function_type, FunctionType::ExternalOutput);
}

#[tokio::test]
async fn service_error_is_surfaced_without_retry() {
    let stub = start_stub(vec![
        (503, json!({ "error": { "message": "model overloaded" } })),
        (200, batch_body(&sample_batch())),
    ])
    .await;
    let classifier =
        GeminiClassifier::new(&stub_config(&stub.base, "FPA_TEST_KEY_NORETRY")).unwrap();

    let err = classifier.classify_batch("x").await.unwrap_err();
    match err {
        ClassifyError::Service { status, body } => {
            assert_eq!(status, 503);
            assert!(body.contains("model overloaded"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn retries_only_when_configured() {
    let stub = start_stub(vec![
        (503, json!({ "error": { "message": "try later" } })),
        (200, batch_body(&sample_batch())),
    ])
    .await;
    let mut config = stub_config(&stub.base, "FPA_TEST_KEY_RETRY");
    config.classifier.max_retries = 1;
    let classifier = GeminiClassifier::new(&config).unwrap();

    let stories = classifier.classify_batch("x").await.unwrap();
    assert_eq!(stories.len(), 2);
    assert_eq!(stub.requests().len(), 2);
}

#[tokio::test]
async fn client_error_is_never_retried() {
    let stub = start_stub(vec![
        (400, json!({ "error": { "message": "bad schema" } })),
        (200, batch_body(&sample_batch())),
    ])
    .await;
    let mut config = stub_config(&stub.base, "FPA_TEST_KEY_400");
    config.classifier.max_retries = 3;
    let classifier = GeminiClassifier::new(&config).unwrap();

    let err = classifier.classify_batch("x").await.unwrap_err();
    assert!(matches!(err, ClassifyError::Service { status: 400, .. }));
    assert_eq!(stub.requests().len(), 1);
}

#[tokio::test]
async fn empty_and_malformed_payloads_are_hard_failures() {
    let stub = start_stub(vec![
        (200, json!({ "candidates": [] })),
        (
            200,
            json!({ "candidates": [{ "content": { "parts": [{ "text": "{\"stories\": [{\"shortName\": \"x\"}]}" }] } }] }),
        ),
    ])
    .await;
    let mut config = stub_config(&stub.base, "FPA_TEST_KEY_EMPTY");
    config.classifier.max_retries = 2;
    let classifier = GeminiClassifier::new(&config).unwrap();

    let err = classifier.classify_batch("x").await.unwrap_err();
    assert!(matches!(err, ClassifyError::EmptyResponse));
    let err = classifier.classify_batch("x").await.unwrap_err();
    assert!(matches!(err, ClassifyError::Unparsable(_)));
    assert_eq!(stub.requests().len(), 2);
}

#[tokio::test]
async fn unreachable_service_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let classifier = GeminiClassifier::new(&stub_config(
        &format!("http://{}", addr),
        "FPA_TEST_KEY_TRANSPORT",
    ))
    .unwrap();
    let err = classifier.classify_batch("x").await.unwrap_err();
    assert!(matches!(err, ClassifyError::Transport(_)));
}
