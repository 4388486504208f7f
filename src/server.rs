//! JSON HTTP API over one in-memory analysis session.
//!
//! Meant to back a browser front end: CORS is open and all state lives in a
//! single [`Session`] for the lifetime of the process.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/analysis` | Current analysis, in-flight story ids, last error |
//! | `POST` | `/analysis` | Classify `{ "text": "..." }` and replace the analysis |
//! | `POST` | `/analysis/stories/{id}` | Re-classify one story from a `.docx` request body |
//! | `PUT`  | `/analysis/stories/{id}` | Apply an edited story record |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "story not found: story-3-..." } }
//! ```
//!
//! Malformed or oversized request bodies use the same shape.
//!
//! Error codes: `bad_request` (400), `not_found` (404), `payload_too_large` (413),
//! `unsupported_media_type` (415), `invalid_document` (422),
//! `configuration` (500), `bad_classification` (502), `upstream_error` (502).
//!
//! # Locking
//!
//! The session sits behind one `tokio::sync::Mutex`. Handlers never hold it
//! while waiting on the classification service: they lock to read or mark
//! state, release, call the service, then lock again to record the result.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection},
        DefaultBodyLimit, Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use fpa_estimator_core::collection::{AnalysisCollection, Summary};
use fpa_estimator_core::models::StoryRecord;

use crate::classifier::{create_classifier, ClassifyError, Classifier};
use crate::config::Config;
use crate::extract::{self, ExtractError};
use crate::session::{reclassify_with_document, run_batch_classification, Session, SessionError};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    classifier: Arc<dyn Classifier>,
    session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(config: Config, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            config: Arc::new(config),
            classifier,
            session: Arc::new(Mutex::new(Session::new())),
        }
    }
}

/// Build the router for `state`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.config.reanalysis.max_document_bytes;

    Router::new()
        .route("/health", get(handle_health))
        .route("/analysis", get(handle_get_analysis).post(handle_analyze))
        .route(
            "/analysis/stories/{id}",
            post(handle_reanalyze).put(handle_update_story),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the server on `[server].bind`.
///
/// Fails before binding if the classifier cannot be built (e.g. missing
/// API key).
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let classifier: Arc<dyn Classifier> = Arc::from(create_classifier(config)?);
    let bind_addr = config.server.bind.clone();
    let app = router(AppState::new(config.clone(), classifier));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("FPA server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        let message = err.to_string();
        let (status, code) = match &err {
            SessionError::EmptyInput => (StatusCode::BAD_REQUEST, "bad_request"),
            SessionError::StoryNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            SessionError::Extract(e) => match e {
                ExtractError::UnsupportedContentType(_) => {
                    (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_media_type")
                }
                ExtractError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
                ExtractError::Ooxml(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_document"),
            },
            SessionError::Classify(e) => match e {
                ClassifyError::Configuration(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "configuration")
                }
                ClassifyError::EmptyResponse | ClassifyError::Unparsable(_) => {
                    (StatusCode::BAD_GATEWAY, "bad_classification")
                }
                ClassifyError::Service { .. } | ClassifyError::Transport(_) => {
                    (StatusCode::BAD_GATEWAY, "upstream_error")
                }
            },
        };
        AppError {
            status,
            code,
            message,
        }
    }
}

/// Body extraction failures (oversized upload, malformed JSON) in the JSON
/// error shape instead of axum's plain-text rejection.
fn rejection(status: StatusCode, message: String) -> AppError {
    let code = match status {
        StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "unsupported_media_type",
        _ => "bad_request",
    };
    AppError {
        status,
        code,
        message,
    }
}

impl From<BytesRejection> for AppError {
    fn from(r: BytesRejection) -> Self {
        rejection(r.status(), r.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(r: JsonRejection) -> Self {
        rejection(r.status(), r.body_text())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /analysis ============

/// Session state as seen by the front end.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSnapshot {
    analysis: Option<AnalysisCollection>,
    in_flight: Vec<String>,
    error: Option<String>,
}

async fn handle_get_analysis(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let session = state.session.lock().await;
    Json(SessionSnapshot {
        analysis: session.analysis().cloned(),
        in_flight: session.in_flight(),
        error: session.last_error().map(str::to_string),
    })
}

// ============ POST /analysis ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    text: String,
}

/// Classify the posted text. On failure the previous analysis is kept.
async fn handle_analyze(
    State(state): State<AppState>,
    req: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisCollection>, AppError> {
    let Json(req) = req?;
    if req.text.trim().is_empty() {
        return Err(SessionError::EmptyInput.into());
    }

    let result = run_batch_classification(state.classifier.as_ref(), &req.text).await;

    let mut session = state.session.lock().await;
    let collection = session.finish_batch(result)?;
    Ok(Json(collection.clone()))
}

// ============ POST /analysis/stories/{id} ============

#[derive(Serialize)]
struct StoryUpdateResponse {
    story: StoryRecord,
    summary: Summary,
}

/// Re-classify story `id` using the `.docx` document in the request body.
async fn handle_reanalyze(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<StoryUpdateResponse>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    extract::ensure_supported(&content_type).map_err(SessionError::from)?;
    let body = body?;

    let snapshot = state.session.lock().await.begin_reanalysis(&id)?;

    let result = reclassify_with_document(
        state.classifier.as_ref(),
        &snapshot,
        &body,
        &content_type,
        state.config.reanalysis.max_document_bytes,
    )
    .await;

    let mut session = state.session.lock().await;
    let story = session.finish_reanalysis(&snapshot, result)?;
    let summary = session
        .analysis()
        .map(|a| *a.summary())
        .unwrap_or_default();
    Ok(Json(StoryUpdateResponse { story, summary }))
}

// ============ PUT /analysis/stories/{id} ============

/// Apply an edited record. The path id wins over any id in the body.
async fn handle_update_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
    record: Result<Json<StoryRecord>, JsonRejection>,
) -> Result<Json<AnalysisCollection>, AppError> {
    let Json(mut record) = record?;
    record.id = id.clone();

    let mut session = state.session.lock().await;
    let collection = session
        .apply_edit(record)
        .ok_or(SessionError::StoryNotFound(id))?;
    Ok(Json(collection.clone()))
}
