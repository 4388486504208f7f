//! Analysis session: the current collection plus per-story UI state.
//!
//! A [`Session`] holds at most one [`AnalysisCollection`], the set of story
//! ids with a re-classification in flight, and the last error message.
//!
//! Operations come in two shapes. [`Session::analyze`] and
//! [`Session::reanalyze`] run a whole classification against a `&mut`
//! session and suit single-owner callers such as the CLI. The server holds
//! the session behind a mutex and must not keep it locked across a network
//! call, so it uses the split steps instead: [`run_batch_classification`]
//! with [`Session::finish_batch`], and [`Session::begin_reanalysis`] with
//! [`Session::finish_reanalysis`].
//!
//! Overlapping re-classifications of one story are last-write-wins: each
//! response is merged when it arrives, and the in-flight marker clears on
//! the first completion.

use std::collections::HashSet;

use thiserror::Error;

use fpa_estimator_core::collection::AnalysisCollection;
use fpa_estimator_core::models::{assign_ids, StoryRecord, StoryUpdate};

use crate::classifier::{ClassifyError, Classifier};
use crate::extract::{self, ExtractError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("story text must not be empty")]
    EmptyInput,
    #[error("story not found: {0}")]
    StoryNotFound(String),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

/// Run batch classification on `raw_text` and build a fresh collection.
///
/// Whitespace-only input is rejected before the classifier is called.
pub async fn run_batch_classification(
    classifier: &dyn Classifier,
    raw_text: &str,
) -> Result<AnalysisCollection, SessionError> {
    if raw_text.trim().is_empty() {
        return Err(SessionError::EmptyInput);
    }
    let items = classifier.classify_batch(raw_text).await?;
    Ok(AnalysisCollection::from_stories(assign_ids(items)))
}

#[derive(Debug, Default)]
pub struct Session {
    analysis: Option<AnalysisCollection>,
    in_flight: HashSet<String>,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously saved collection.
    pub fn with_analysis(analysis: AnalysisCollection) -> Self {
        Self {
            analysis: Some(analysis),
            ..Self::default()
        }
    }

    pub fn analysis(&self) -> Option<&AnalysisCollection> {
        self.analysis.as_ref()
    }

    pub fn into_analysis(self) -> Option<AnalysisCollection> {
        self.analysis
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains(id)
    }

    /// Ids with a re-classification in flight, sorted.
    pub fn in_flight(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.in_flight.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Record the outcome of a batch run.
    ///
    /// Success replaces the collection and clears the error. Failure keeps
    /// the existing collection and records the error message.
    pub fn finish_batch(
        &mut self,
        result: Result<AnalysisCollection, SessionError>,
    ) -> Result<&AnalysisCollection, SessionError> {
        match result {
            Ok(collection) => {
                self.last_error = None;
                Ok(&*self.analysis.insert(collection))
            }
            Err(e) => {
                tracing::error!(error = %e, "batch classification failed");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Classify `raw_text` and replace the collection on success.
    ///
    /// Empty input is rejected without touching the session.
    pub async fn analyze(
        &mut self,
        classifier: &dyn Classifier,
        raw_text: &str,
    ) -> Result<&AnalysisCollection, SessionError> {
        let result = run_batch_classification(classifier, raw_text).await;
        if matches!(result, Err(SessionError::EmptyInput)) {
            return Err(SessionError::EmptyInput);
        }
        self.finish_batch(result)
    }

    /// Snapshot story `id` and mark it in flight.
    pub fn begin_reanalysis(&mut self, id: &str) -> Result<StoryRecord, SessionError> {
        let story = self
            .analysis
            .as_ref()
            .and_then(|a| a.get(id))
            .cloned()
            .ok_or_else(|| SessionError::StoryNotFound(id.to_string()))?;
        self.in_flight.insert(id.to_string());
        self.last_error = None;
        Ok(story)
    }

    /// Clear the in-flight marker for `snapshot` and merge `result`.
    ///
    /// On success the update is merged over the snapshot (id and original
    /// text come from the snapshot) and reconciled into the collection. If
    /// the story has since disappeared, e.g. replaced by a newer batch, the
    /// update is dropped and [`SessionError::StoryNotFound`] is returned. On
    /// classifier or extraction failure the record is left unchanged and the
    /// error is recorded.
    pub fn finish_reanalysis(
        &mut self,
        snapshot: &StoryRecord,
        result: Result<StoryUpdate, SessionError>,
    ) -> Result<StoryRecord, SessionError> {
        self.in_flight.remove(&snapshot.id);
        match result {
            Ok(update) => {
                let merged = update.merge_into(snapshot);
                let applied = self
                    .analysis
                    .as_mut()
                    .map(|a| a.apply_update(merged.clone()))
                    .unwrap_or(false);
                if !applied {
                    tracing::warn!(story = %snapshot.id, "story no longer in collection, update dropped");
                    return Err(SessionError::StoryNotFound(snapshot.id.clone()));
                }
                Ok(merged)
            }
            Err(e) => {
                tracing::error!(story = %snapshot.id, error = %e, "re-classification failed");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Reconcile a caller-edited record into the collection.
    ///
    /// Returns `None`, leaving everything unchanged, when there is no
    /// analysis or no story with that id.
    pub fn apply_edit(&mut self, record: StoryRecord) -> Option<&AnalysisCollection> {
        let analysis = self.analysis.as_mut()?;
        if analysis.apply_update(record) {
            Some(analysis)
        } else {
            None
        }
    }

    /// Re-classify story `id` with the text of an attached document.
    ///
    /// An unsupported `content_type` is rejected before anything else
    /// happens: no in-flight marker, no classifier call, no error state.
    pub async fn reanalyze(
        &mut self,
        classifier: &dyn Classifier,
        id: &str,
        document: &[u8],
        content_type: &str,
        max_document_bytes: usize,
    ) -> Result<StoryRecord, SessionError> {
        extract::ensure_supported(content_type)?;
        let snapshot = self.begin_reanalysis(id)?;
        let result = reclassify_with_document(
            classifier,
            &snapshot,
            document,
            content_type,
            max_document_bytes,
        )
        .await;
        self.finish_reanalysis(&snapshot, result)
    }
}

/// Extract `document` and ask the classifier for an update to `story`.
pub async fn reclassify_with_document(
    classifier: &dyn Classifier,
    story: &StoryRecord,
    document: &[u8],
    content_type: &str,
    max_document_bytes: usize,
) -> Result<StoryUpdate, SessionError> {
    let context = extract::extract_text(document, content_type, max_document_bytes)?;
    tracing::debug!(story = %story.id, chars = context.chars().count(), "document extracted");
    Ok(classifier.reclassify(story, &context).await?)
}
