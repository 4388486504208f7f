//! Structured-output schemas for the classification service.
//!
//! Schemas use the OpenAPI subset accepted by the Gemini `responseSchema`
//! field (upper-case type names). Enumerations are generated from
//! [`FunctionType::ALL`] and [`ProjectType::ALL`].

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::models::{ClassifiedStory, FunctionType, ProjectType};

/// Fields every classified item must carry, in schema order.
pub const REQUIRED_ITEM_FIELDS: [&str; 8] = [
    "shortName",
    "functionType",
    "projectType",
    "confidence",
    "warnings",
    "isDuplicate",
    "reasoningFunctionType",
    "reasoningProjectType",
];

/// Top-level shape of a batch classification payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchPayload {
    pub stories: Vec<ClassifiedStory>,
}

fn function_type_values() -> Vec<&'static str> {
    FunctionType::ALL.iter().map(|t| t.as_str()).collect()
}

fn project_type_values() -> Vec<&'static str> {
    ProjectType::ALL.iter().map(|t| t.as_str()).collect()
}

fn item_properties(reasoning_hint: &str) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(
        "shortName".into(),
        json!({
            "type": "STRING",
            "description": "Clean, concise name of the functionality described by the story."
        }),
    );
    props.insert(
        "functionType".into(),
        json!({ "type": "STRING", "enum": function_type_values() }),
    );
    props.insert(
        "projectType".into(),
        json!({ "type": "STRING", "enum": project_type_values() }),
    );
    props.insert(
        "confidence".into(),
        json!({ "type": "NUMBER", "description": "Confidence score between 0 and 1." }),
    );
    props.insert(
        "warnings".into(),
        json!({
            "type": "ARRAY",
            "items": { "type": "STRING" },
            "description": "Critiques in PORTUGUESE. Warn when an ALI looks like a mere calculation table, or when the story looks like a duplicate."
        }),
    );
    props.insert(
        "isDuplicate".into(),
        json!({
            "type": "BOOLEAN",
            "description": "True when another story in the list describes the same functionality."
        }),
    );
    props.insert(
        "reasoningFunctionType".into(),
        json!({
            "type": "STRING",
            "description": format!("{} explaining why this function type was chosen.", reasoning_hint)
        }),
    );
    props.insert(
        "reasoningProjectType".into(),
        json!({
            "type": "STRING",
            "description": format!("{} explaining why this project type was chosen.", reasoning_hint)
        }),
    );
    props
}

/// Schema for a batch response: `{ stories: [item, ...] }`.
pub fn batch_response_schema() -> Value {
    let mut props = Map::new();
    props.insert("originalText".into(), json!({ "type": "STRING" }));
    props.extend(item_properties("Detailed explanation in PORTUGUESE"));

    let mut required = vec!["originalText"];
    required.extend(REQUIRED_ITEM_FIELDS);

    json!({
        "type": "OBJECT",
        "properties": {
            "stories": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": props,
                    "required": required,
                }
            }
        },
        "required": ["stories"]
    })
}

/// Schema for a single-story re-classification: no id, no original text.
pub fn single_story_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": item_properties("Very detailed explanation in PORTUGUESE citing the attached document,"),
        "required": REQUIRED_ITEM_FIELDS,
    })
}
