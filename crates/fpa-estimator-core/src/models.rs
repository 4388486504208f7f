//! Story records and the closed classification enumerations.
//!
//! Wire names follow the classification service contract: function types use
//! the Portuguese FPA abbreviations (`ALI`, `AIE`, `EE`, `CE`, `SE`) and
//! project types use their Portuguese labels. Record fields serialize in
//! camelCase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// FPA function type of a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionType {
    /// Arquivo Lógico Interno: data maintained by the application.
    #[serde(rename = "ALI")]
    InternalLogicalFile,
    /// Arquivo de Interface Externa: data read from another system.
    #[serde(rename = "AIE")]
    ExternalInterfaceFile,
    /// Entrada Externa: transaction that writes data.
    #[serde(rename = "EE")]
    ExternalInput,
    /// Consulta Externa: retrieval with derived data.
    #[serde(rename = "CE")]
    ExternalQuery,
    /// Saída Externa: report or generated output.
    #[serde(rename = "SE")]
    ExternalOutput,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl FunctionType {
    pub const ALL: [FunctionType; 6] = [
        FunctionType::InternalLogicalFile,
        FunctionType::ExternalInterfaceFile,
        FunctionType::ExternalInput,
        FunctionType::ExternalQuery,
        FunctionType::ExternalOutput,
        FunctionType::Unknown,
    ];

    /// Wire value sent to and received from the classification service.
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionType::InternalLogicalFile => "ALI",
            FunctionType::ExternalInterfaceFile => "AIE",
            FunctionType::ExternalInput => "EE",
            FunctionType::ExternalQuery => "CE",
            FunctionType::ExternalOutput => "SE",
            FunctionType::Unknown => "UNKNOWN",
        }
    }

    /// Short English description used in table legends.
    pub fn label(&self) -> &'static str {
        match self {
            FunctionType::InternalLogicalFile => "Entities",
            FunctionType::ExternalInterfaceFile => "Interface",
            FunctionType::ExternalInput => "Inputs",
            FunctionType::ExternalQuery => "Queries",
            FunctionType::ExternalOutput => "Outputs",
            FunctionType::Unknown => "Unclassified",
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of project work a story represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    #[serde(rename = "Desenvolvimento")]
    Development,
    #[serde(rename = "Melhoria Inclusão")]
    ImprovementInclusion,
    #[serde(rename = "Melhoria Alteração")]
    ImprovementAlteration,
    #[serde(rename = "Melhoria Alteração com Redocumentação")]
    ImprovementAlterationRedoc,
    #[serde(rename = "Melhoria Exclusão")]
    ImprovementExclusion,
    #[serde(rename = "Manutenção Corretiva")]
    CorrectiveMaintenance,
    #[serde(rename = "Migração de Dados")]
    DataMigration,
    #[serde(rename = "Pipeline DevOps")]
    Devops,
    #[serde(rename = "Verificação de Erros")]
    ErrorVerification,
    #[serde(rename = "Manutenção de Documentação")]
    Documentation,
    #[serde(rename = "Outros")]
    Other,
}

impl ProjectType {
    pub const ALL: [ProjectType; 11] = [
        ProjectType::Development,
        ProjectType::ImprovementInclusion,
        ProjectType::ImprovementAlteration,
        ProjectType::ImprovementAlterationRedoc,
        ProjectType::ImprovementExclusion,
        ProjectType::CorrectiveMaintenance,
        ProjectType::DataMigration,
        ProjectType::Devops,
        ProjectType::ErrorVerification,
        ProjectType::Documentation,
        ProjectType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Development => "Desenvolvimento",
            ProjectType::ImprovementInclusion => "Melhoria Inclusão",
            ProjectType::ImprovementAlteration => "Melhoria Alteração",
            ProjectType::ImprovementAlterationRedoc => "Melhoria Alteração com Redocumentação",
            ProjectType::ImprovementExclusion => "Melhoria Exclusão",
            ProjectType::CorrectiveMaintenance => "Manutenção Corretiva",
            ProjectType::DataMigration => "Migração de Dados",
            ProjectType::Devops => "Pipeline DevOps",
            ProjectType::ErrorVerification => "Verificação de Erros",
            ProjectType::Documentation => "Manutenção de Documentação",
            ProjectType::Other => "Outros",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified story with a locally assigned identity.
///
/// `id` is stable across re-classification and `original_text` never
/// changes once the record exists. Both are only ever copied from an
/// existing record, never from a classification payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRecord {
    pub id: String,
    pub original_text: String,
    pub short_name: String,
    pub function_type: FunctionType,
    pub project_type: ProjectType,
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub is_duplicate: bool,
    pub reasoning_function_type: String,
    pub reasoning_project_type: String,
}

/// One item of a batch classification response: every record field but `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedStory {
    pub original_text: String,
    pub short_name: String,
    pub function_type: FunctionType,
    pub project_type: ProjectType,
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub is_duplicate: bool,
    pub reasoning_function_type: String,
    pub reasoning_project_type: String,
}

impl ClassifiedStory {
    /// Attach a locally generated identity.
    pub fn into_record(self, id: String) -> StoryRecord {
        StoryRecord {
            id,
            original_text: self.original_text,
            short_name: self.short_name,
            function_type: self.function_type,
            project_type: self.project_type,
            confidence: normalize_confidence(self.confidence),
            warnings: self.warnings,
            is_duplicate: self.is_duplicate,
            reasoning_function_type: self.reasoning_function_type,
            reasoning_project_type: self.reasoning_project_type,
        }
    }
}

/// Payload of a single-story re-classification.
///
/// Has no identity or original-text fields: if the service echoes `id` or
/// `originalText` anyway, those keys are dropped during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryUpdate {
    pub short_name: String,
    pub function_type: FunctionType,
    pub project_type: ProjectType,
    pub confidence: f64,
    pub warnings: Vec<String>,
    pub is_duplicate: bool,
    pub reasoning_function_type: String,
    pub reasoning_project_type: String,
}

impl StoryUpdate {
    /// Overlay this update on `existing`, keeping its id and original text.
    pub fn merge_into(self, existing: &StoryRecord) -> StoryRecord {
        StoryRecord {
            id: existing.id.clone(),
            original_text: existing.original_text.clone(),
            short_name: self.short_name,
            function_type: self.function_type,
            project_type: self.project_type,
            confidence: normalize_confidence(self.confidence),
            warnings: self.warnings,
            is_duplicate: self.is_duplicate,
            reasoning_function_type: self.reasoning_function_type,
            reasoning_project_type: self.reasoning_project_type,
        }
    }
}

/// Clamp a model-reported confidence into `[0, 1]`; non-finite values become 0.
pub fn normalize_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Generate a story id for the item at `index` of a batch.
pub fn new_story_id(index: usize) -> String {
    format!("story-{}-{}", index, uuid::Uuid::new_v4().simple())
}

/// Assign fresh ids to a batch result, preserving order.
pub fn assign_ids(items: Vec<ClassifiedStory>) -> Vec<StoryRecord> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| item.into_record(new_story_id(i)))
        .collect()
}
