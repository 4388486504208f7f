//! Shared fixtures: sample stories, `.docx` builder, and an in-process stub
//! of the Gemini `generateContent` endpoint.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use fpa_estimator::classifier::mock_generate_response;
use fpa_estimator_core::models::{ClassifiedStory, FunctionType, ProjectType, StoryUpdate};

pub fn classified(text: &str, name: &str, function_type: FunctionType) -> ClassifiedStory {
    ClassifiedStory {
        original_text: text.to_string(),
        short_name: name.to_string(),
        function_type,
        project_type: ProjectType::Development,
        confidence: 0.8,
        warnings: vec![],
        is_duplicate: false,
        reasoning_function_type: "classificação inicial".to_string(),
        reasoning_project_type: "sistema novo".to_string(),
    }
}

pub fn sample_batch() -> Vec<ClassifiedStory> {
    vec![
        classified(
            "[SPRINT 23] Implementar cadastro de usuários",
            "Cadastro de usuários",
            FunctionType::ExternalInput,
        ),
        classified(
            "[SPRINT 23] Criar tabela de clientes",
            "Tabela de clientes",
            FunctionType::InternalLogicalFile,
        ),
    ]
}

pub fn output_update() -> StoryUpdate {
    StoryUpdate {
        short_name: "Relatório de usuários".to_string(),
        function_type: FunctionType::ExternalOutput,
        project_type: ProjectType::ImprovementInclusion,
        confidence: 0.95,
        warnings: vec!["documento descreve relatório".to_string()],
        is_duplicate: false,
        reasoning_function_type: "o documento cita geração de PDF".to_string(),
        reasoning_project_type: "inclui nova funcionalidade".to_string(),
    }
}

/// Minimal docx (ZIP) whose `word/document.xml` holds one paragraph per entry.
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let xml = format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf
}

/// Batch payload wrapped the way the Gemini API returns it.
pub fn batch_body(stories: &[ClassifiedStory]) -> Value {
    mock_generate_response(&json!({ "stories": stories }))
}

pub fn update_body(update: &StoryUpdate) -> Value {
    mock_generate_response(&serde_json::to_value(update).unwrap())
}

/// A request received by the stub.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub call: String,
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct StubState {
    responses: Arc<Mutex<VecDeque<(u16, Value)>>>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub struct StubService {
    /// Value for `classifier.api_base`.
    pub base: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl StubService {
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle_generate(
    State(state): State<StubState>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.requests.lock().unwrap().push(CapturedRequest {
        call,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    let next = state.responses.lock().unwrap().pop_front();
    match next {
        Some((status, body)) => (StatusCode::from_u16(status).unwrap(), Json(body)),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "stub exhausted" } })),
        ),
    }
}

/// Start a stub answering `POST /models/{model}:generateContent` with
/// `responses` in order; once exhausted it answers 500.
pub async fn start_stub(responses: Vec<(u16, Value)>) -> StubService {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        responses: Arc::new(Mutex::new(responses.into())),
        requests: requests.clone(),
    };
    let app = Router::new()
        .route("/models/{call}", post(handle_generate))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubService {
        base: format!("http://{}", addr),
        requests,
    }
}
