//! # FPA Estimator Core
//!
//! I/O-free logic for FPA Estimator: story models and the closed
//! classification enumerations, structured-output schemas, prompt text, and
//! reconciliation of classification results into an analysis collection.
//!
//! This crate performs no network, filesystem, or async work. The HTTP
//! classifier, document extraction, CLI and server live in the
//! `fpa-estimator` crate.
//!
//! # Example
//!
//! ```rust
//! use fpa_estimator_core::collection::{reconcile, AnalysisCollection};
//! use fpa_estimator_core::models::{FunctionType, ProjectType, StoryRecord};
//!
//! let story = StoryRecord {
//!     id: "s1".into(),
//!     original_text: "Cadastrar cliente".into(),
//!     short_name: "Cadastro de cliente".into(),
//!     function_type: FunctionType::ExternalInput,
//!     project_type: ProjectType::Development,
//!     confidence: 0.9,
//!     warnings: vec![],
//!     is_duplicate: false,
//!     reasoning_function_type: String::new(),
//!     reasoning_project_type: String::new(),
//! };
//! let collection = AnalysisCollection::from_stories(vec![story.clone()]);
//!
//! let updated = StoryRecord { function_type: FunctionType::ExternalOutput, ..story };
//! let collection = reconcile(collection, updated);
//! assert_eq!(collection.summary().total_se, 1);
//! assert_eq!(collection.summary().total_ee, 0);
//! ```

pub mod collection;
pub mod models;
pub mod prompt;
pub mod schema;
