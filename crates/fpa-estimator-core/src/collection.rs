//! Analysis collection and result reconciliation.
//!
//! An [`AnalysisCollection`] owns the ordered story records of one analysis
//! and a [`Summary`] derived from them. The summary is private and only ever
//! rebuilt by a full recount, so it cannot drift from the records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{normalize_confidence, FunctionType, StoryRecord};

/// Aggregate counts over a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_stories: usize,
    #[serde(rename = "totalALI")]
    pub total_ali: usize,
    #[serde(rename = "totalAIE")]
    pub total_aie: usize,
    #[serde(rename = "totalEE")]
    pub total_ee: usize,
    #[serde(rename = "totalCE")]
    pub total_ce: usize,
    #[serde(rename = "totalSE")]
    pub total_se: usize,
    pub total_unknown: usize,
}

impl Summary {
    /// Count `stories` from scratch.
    pub fn recount(stories: &[StoryRecord]) -> Self {
        let mut summary = Summary {
            total_stories: stories.len(),
            ..Summary::default()
        };
        for story in stories {
            *summary.slot_mut(story.function_type) += 1;
        }
        summary
    }

    /// Number of stories classified as `function_type`.
    pub fn count(&self, function_type: FunctionType) -> usize {
        match function_type {
            FunctionType::InternalLogicalFile => self.total_ali,
            FunctionType::ExternalInterfaceFile => self.total_aie,
            FunctionType::ExternalInput => self.total_ee,
            FunctionType::ExternalQuery => self.total_ce,
            FunctionType::ExternalOutput => self.total_se,
            FunctionType::Unknown => self.total_unknown,
        }
    }

    fn slot_mut(&mut self, function_type: FunctionType) -> &mut usize {
        match function_type {
            FunctionType::InternalLogicalFile => &mut self.total_ali,
            FunctionType::ExternalInterfaceFile => &mut self.total_aie,
            FunctionType::ExternalInput => &mut self.total_ee,
            FunctionType::ExternalQuery => &mut self.total_ce,
            FunctionType::ExternalOutput => &mut self.total_se,
            FunctionType::Unknown => &mut self.total_unknown,
        }
    }
}

/// Ordered story records plus their derived summary.
///
/// Deserializing recomputes the summary from `stories`; any stored
/// `summary` value is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredCollection")]
pub struct AnalysisCollection {
    stories: Vec<StoryRecord>,
    summary: Summary,
    analyzed_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCollection {
    stories: Vec<StoryRecord>,
    #[serde(default = "Utc::now")]
    analyzed_at: DateTime<Utc>,
}

impl From<StoredCollection> for AnalysisCollection {
    fn from(stored: StoredCollection) -> Self {
        let mut stories = stored.stories;
        for story in &mut stories {
            story.confidence = normalize_confidence(story.confidence);
        }
        let summary = Summary::recount(&stories);
        Self {
            stories,
            summary,
            analyzed_at: stored.analyzed_at,
        }
    }
}

impl Default for AnalysisCollection {
    fn default() -> Self {
        Self::from_stories(Vec::new())
    }
}

impl AnalysisCollection {
    pub fn from_stories(stories: Vec<StoryRecord>) -> Self {
        Self::from(StoredCollection {
            stories,
            analyzed_at: Utc::now(),
        })
    }

    pub fn stories(&self) -> &[StoryRecord] {
        &self.stories
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn analyzed_at(&self) -> DateTime<Utc> {
        self.analyzed_at
    }

    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&StoryRecord> {
        self.stories.iter().find(|s| s.id == id)
    }

    /// Replace the record whose id equals `updated.id`, then recount.
    ///
    /// The stored record keeps its original text and its confidence is
    /// clamped into [0, 1]. Returns `false` and leaves
    /// the collection untouched when no record has that id.
    pub fn apply_update(&mut self, updated: StoryRecord) -> bool {
        let Some(slot) = self.stories.iter_mut().find(|s| s.id == updated.id) else {
            return false;
        };
        let original_text = std::mem::take(&mut slot.original_text);
        *slot = StoryRecord {
            original_text,
            confidence: normalize_confidence(updated.confidence),
            ..updated
        };
        self.summary = Summary::recount(&self.stories);
        true
    }
}

/// Value-returning form of [`AnalysisCollection::apply_update`].
pub fn reconcile(mut collection: AnalysisCollection, updated: StoryRecord) -> AnalysisCollection {
    collection.apply_update(updated);
    collection
}
