//! # FPA Estimator
//!
//! Function Point Analysis story classification backed by a generative-AI
//! classification service.
//!
//! Raw story text goes to the service with a fixed structured-output schema;
//! each returned story gets a local id and lands in an
//! [`AnalysisCollection`](fpa_estimator_core::collection::AnalysisCollection)
//! whose summary is always a recount of its records. A single story can
//! later be re-classified with the text of an attached `.docx`; the result is
//! merged back keeping the story's id and original text.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌────────────┐   ┌────────────┐
//! │ raw text  │──▶│  Classifier  │──▶│  Session   │──▶│ CLI table  │
//! │ or .docx  │   │ (Gemini API) │   │ reconcile  │   │ / HTTP API │
//! └───────────┘   └──────────────┘   └────────────┘   └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`classifier`] | Classification service abstraction (Gemini, mock) |
//! | [`extract`] | `.docx` text extraction |
//! | [`session`] | Analysis session: batch and single-story operations |
//! | [`render`] | Terminal table rendering |
//! | [`commands`] | CLI command implementations |
//! | [`server`] | JSON HTTP API |
//!
//! Models, schemas, prompts and the reconciler live in `fpa-estimator-core`.

pub mod classifier;
pub mod commands;
pub mod config;
pub mod extract;
pub mod render;
pub mod server;
pub mod session;
