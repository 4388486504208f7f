//! Classification service abstraction and implementations.
//!
//! Defines the [`Classifier`] trait and concrete implementations:
//! - **[`GeminiClassifier`]**: calls the Gemini `generateContent` endpoint with a
//!   structured `responseSchema`.
//! - **[`DisabledClassifier`]**: fails every call; used when
//!   `classifier.provider = "disabled"`.
//! - **[`MockClassifier`]**: returns preconfigured results (testing).
//!
//! # Failure policy
//!
//! A missing API key fails at construction. An empty or unparsable payload
//! is a hard failure for that call, never a partial result. Service and
//! transport errors are surfaced as-is. Retries happen only when
//! `classifier.max_retries > 0`, and only for HTTP 429, 5xx and transport
//! errors, with exponential backoff (1s, 2s, 4s, … capped at 32s).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use fpa_estimator_core::models::{ClassifiedStory, StoryRecord, StoryUpdate};
use fpa_estimator_core::prompt::{reanalysis_prompt, BATCH_SYSTEM_INSTRUCTION};
use fpa_estimator_core::schema::{batch_response_schema, single_story_schema, BatchPayload};

use crate::config::Config;

/// Errors from classification calls.
#[derive(Debug, Clone, Error)]
pub enum ClassifyError {
    #[error("classifier configuration error: {0}")]
    Configuration(String),
    #[error("no response from the classification service")]
    EmptyResponse,
    #[error("unparsable classification response: {0}")]
    Unparsable(String),
    #[error("classification service error {status}: {body}")]
    Service { status: u16, body: String },
    #[error("classification request failed: {0}")]
    Transport(String),
}

impl ClassifyError {
    fn is_retryable(&self) -> bool {
        match self {
            ClassifyError::Service { status, .. } => *status == 429 || *status >= 500,
            ClassifyError::Transport(_) => true,
            ClassifyError::Configuration(_)
            | ClassifyError::EmptyResponse
            | ClassifyError::Unparsable(_) => false,
        }
    }
}

/// A text-classification capability.
///
/// Implementations shape requests and parse responses; ids are assigned by
/// the caller and never produced here.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Provider name for logs (e.g. `"gemini"`).
    fn name(&self) -> &str;

    /// Classify every story found in `raw_text`.
    async fn classify_batch(&self, raw_text: &str) -> Result<Vec<ClassifiedStory>, ClassifyError>;

    /// Re-classify one story using extracted document text as extra context.
    async fn reclassify(
        &self,
        story: &StoryRecord,
        context: &str,
    ) -> Result<StoryUpdate, ClassifyError>;
}

/// Instantiate the classifier selected by `config.classifier.provider`.
pub fn create_classifier(config: &Config) -> Result<Box<dyn Classifier>, ClassifyError> {
    match config.classifier.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiClassifier::new(config)?)),
        "disabled" => Ok(Box::new(DisabledClassifier)),
        other => Err(ClassifyError::Configuration(format!(
            "unknown classifier provider: {}",
            other
        ))),
    }
}

// ============ Disabled ============

pub struct DisabledClassifier;

#[async_trait]
impl Classifier for DisabledClassifier {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn classify_batch(&self, _raw_text: &str) -> Result<Vec<ClassifiedStory>, ClassifyError> {
        Err(ClassifyError::Configuration(
            "classifier provider is disabled".to_string(),
        ))
    }

    async fn reclassify(
        &self,
        _story: &StoryRecord,
        _context: &str,
    ) -> Result<StoryUpdate, ClassifyError> {
        Err(ClassifyError::Configuration(
            "classifier provider is disabled".to_string(),
        ))
    }
}

// ============ Gemini ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Classifier backed by Gemini structured output.
pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    max_retries: u32,
    batch_temperature: f64,
    reanalysis_temperature: f64,
    max_context_chars: usize,
}

impl GeminiClassifier {
    /// Build a classifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Configuration`] when the environment variable
    /// named by `classifier.api_key_env` is unset or empty.
    pub fn new(config: &Config) -> Result<Self, ClassifyError> {
        let cc = &config.classifier;
        let api_key = std::env::var(&cc.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ClassifyError::Configuration(format!(
                    "API key not found: set the {} environment variable",
                    cc.api_key_env
                ))
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cc.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClassifyError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model: cc.model.clone(),
            api_base: cc.api_base.trim_end_matches('/').to_string(),
            max_retries: cc.max_retries,
            batch_temperature: cc.batch_temperature,
            reanalysis_temperature: cc.reanalysis_temperature,
            max_context_chars: config.reanalysis.max_context_chars,
        })
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    /// Send one request, retrying per `max_retries`, and return the payload text.
    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, ClassifyError> {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, ?delay, "retrying classification request");
                tokio::time::sleep(delay).await;
            }

            match self.send_once(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() => last_err = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or(ClassifyError::EmptyResponse))
    }

    async fn send_once(&self, request: &GenerateContentRequest) -> Result<String, ClassifyError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ClassifyError::Unparsable(e.to_string()))?;
        payload_text(json)
    }
}

/// Pull the structured payload out of a `generateContent` response body.
fn payload_text(json: Value) -> Result<String, ClassifyError> {
    let response: GenerateContentResponse =
        serde_json::from_value(json).map_err(|e| ClassifyError::Unparsable(e.to_string()))?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ClassifyError::EmptyResponse);
    }
    Ok(text)
}

fn parse_batch(text: &str) -> Result<Vec<ClassifiedStory>, ClassifyError> {
    let payload: BatchPayload =
        serde_json::from_str(text).map_err(|e| ClassifyError::Unparsable(e.to_string()))?;
    Ok(payload.stories)
}

fn parse_update(text: &str) -> Result<StoryUpdate, ClassifyError> {
    serde_json::from_str(text).map_err(|e| ClassifyError::Unparsable(e.to_string()))
}

fn user_content(text: String) -> Vec<Content> {
    vec![Content {
        role: Some("user".to_string()),
        parts: vec![Part { text }],
    }]
}

#[async_trait]
impl Classifier for GeminiClassifier {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn classify_batch(&self, raw_text: &str) -> Result<Vec<ClassifiedStory>, ClassifyError> {
        let request = GenerateContentRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: BATCH_SYSTEM_INSTRUCTION.to_string(),
                }],
            }),
            contents: user_content(raw_text.to_string()),
            generation_config: GenerationConfig {
                temperature: self.batch_temperature,
                response_mime_type: "application/json".to_string(),
                response_schema: batch_response_schema(),
            },
        };

        tracing::info!(model = %self.model, chars = raw_text.len(), "batch classification");
        let text = self.generate(&request).await?;
        let stories = parse_batch(&text)?;
        tracing::info!(stories = stories.len(), "batch classification complete");
        Ok(stories)
    }

    async fn reclassify(
        &self,
        story: &StoryRecord,
        context: &str,
    ) -> Result<StoryUpdate, ClassifyError> {
        let prompt = reanalysis_prompt(story, context, self.max_context_chars);
        let request = GenerateContentRequest {
            system_instruction: None,
            contents: user_content(prompt),
            generation_config: GenerationConfig {
                temperature: self.reanalysis_temperature,
                response_mime_type: "application/json".to_string(),
                response_schema: single_story_schema(),
            },
        };

        tracing::info!(model = %self.model, story = %story.id, "single-story re-classification");
        let text = self.generate(&request).await?;
        parse_update(&text)
    }
}

// ============ Mock ============

/// Classifier returning preconfigured results and counting calls.
pub struct MockClassifier {
    batch: Result<Vec<ClassifiedStory>, ClassifyError>,
    update: Result<StoryUpdate, ClassifyError>,
    calls: AtomicUsize,
    last_context: Mutex<Option<String>>,
}

impl MockClassifier {
    /// A mock whose calls all fail with [`ClassifyError::EmptyResponse`]
    /// until configured.
    pub fn new() -> Self {
        Self {
            batch: Err(ClassifyError::EmptyResponse),
            update: Err(ClassifyError::EmptyResponse),
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        }
    }

    pub fn with_batch(mut self, stories: Vec<ClassifiedStory>) -> Self {
        self.batch = Ok(stories);
        self
    }

    pub fn with_batch_failure(mut self, error: ClassifyError) -> Self {
        self.batch = Err(error);
        self
    }

    pub fn with_update(mut self, update: StoryUpdate) -> Self {
        self.update = Ok(update);
        self
    }

    pub fn with_update_failure(mut self, error: ClassifyError) -> Self {
        self.update = Err(error);
        self
    }

    /// Number of classification calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Document context received by the latest `reclassify` call.
    pub fn last_context(&self) -> Option<String> {
        self.last_context.lock().ok().and_then(|c| c.clone())
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn classify_batch(&self, _raw_text: &str) -> Result<Vec<ClassifiedStory>, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch.clone()
    }

    async fn reclassify(
        &self,
        _story: &StoryRecord,
        context: &str,
    ) -> Result<StoryUpdate, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_context.lock() {
            *last = Some(context.to_string());
        }
        self.update.clone()
    }
}

/// Build a `generateContent` response body wrapping `payload` (testing).
pub fn mock_generate_response(payload: &Value) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": payload.to_string() }] },
            "finishReason": "STOP"
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_text_reads_first_candidate() {
        let body = mock_generate_response(&json!({ "stories": [] }));
        assert_eq!(payload_text(body).unwrap(), r#"{"stories":[]}"#);
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        let err = payload_text(json!({ "candidates": [] })).unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyResponse));
        let err = payload_text(json!({})).unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyResponse));
    }

    #[test]
    fn blocked_candidate_without_content_is_empty_response() {
        let err = payload_text(json!({ "candidates": [{ "finishReason": "SAFETY" }] })).unwrap_err();
        assert!(matches!(err, ClassifyError::EmptyResponse));
    }

    #[test]
    fn invalid_json_payload_is_unparsable() {
        assert!(matches!(
            parse_batch("not json").unwrap_err(),
            ClassifyError::Unparsable(_)
        ));
        assert!(matches!(
            parse_update(r#"{"shortName":"x"}"#).unwrap_err(),
            ClassifyError::Unparsable(_)
        ));
    }

    #[test]
    fn out_of_set_enum_is_unparsable() {
        let text = r#"{"stories":[{"originalText":"a","shortName":"b","functionType":"XX",
            "projectType":"Outros","confidence":0.5,"warnings":[],"isDuplicate":false,
            "reasoningFunctionType":"","reasoningProjectType":""}]}"#;
        assert!(matches!(parse_batch(text).unwrap_err(), ClassifyError::Unparsable(_)));
    }

    #[test]
    fn retry_classification() {
        assert!(ClassifyError::Service { status: 429, body: String::new() }.is_retryable());
        assert!(ClassifyError::Service { status: 503, body: String::new() }.is_retryable());
        assert!(!ClassifyError::Service { status: 400, body: String::new() }.is_retryable());
        assert!(ClassifyError::Transport("reset".into()).is_retryable());
        assert!(!ClassifyError::Unparsable("x".into()).is_retryable());
        assert!(!ClassifyError::EmptyResponse.is_retryable());
    }

    #[test]
    fn request_serializes_in_gemini_shape() {
        let request = GenerateContentRequest {
            system_instruction: None,
            contents: user_content("hello".into()),
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json".into(),
                response_schema: json!({ "type": "OBJECT" }),
            },
        };
        let v = serde_json::to_value(&request).unwrap();
        assert!(v.get("systemInstruction").is_none());
        assert_eq!(v["contents"][0]["role"], "user");
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn missing_api_key_fails_construction() {
        let mut config = Config::default();
        config.classifier.api_key_env = "FPA_TEST_KEY_THAT_IS_NEVER_SET".into();
        let err = GeminiClassifier::new(&config).err().unwrap();
        assert!(matches!(err, ClassifyError::Configuration(_)));
        assert!(err.to_string().contains("FPA_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[tokio::test]
    async fn disabled_classifier_always_fails() {
        let mut config = Config::default();
        config.classifier.provider = "disabled".into();
        let classifier = create_classifier(&config).unwrap();
        assert_eq!(classifier.name(), "disabled");
        assert!(classifier.classify_batch("x").await.is_err());
    }
}
