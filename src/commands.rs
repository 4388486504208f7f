//! CLI command implementations.
//!
//! Each `run_*` function backs one `fpa` subcommand and prints its result to
//! stdout. Saved analyses are plain JSON files in the collection wire shape;
//! loading one recomputes its summary.

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

use fpa_estimator_core::collection::AnalysisCollection;

use crate::classifier::create_classifier;
use crate::config::Config;
use crate::extract;
use crate::render::{render_story_details, render_summary, render_table};
use crate::session::Session;

/// Read story text from `input`, or stdin when `None` or `-`.
fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(p) if p != Path::new("-") => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read input file: {}", p.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stories from stdin")?;
            Ok(text)
        }
    }
}

pub fn load_analysis(path: &Path) -> Result<AnalysisCollection> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read analysis file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse analysis file: {}", path.display()))
}

pub fn save_analysis(path: &Path, analysis: &AnalysisCollection) -> Result<()> {
    let json = serde_json::to_string_pretty(analysis)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write analysis file: {}", path.display()))
}

/// `fpa analyze`
pub async fn run_analyze(
    config: &Config,
    input: Option<PathBuf>,
    json: bool,
    details: bool,
    save: Option<PathBuf>,
) -> Result<()> {
    let text = read_input(input.as_deref())?;
    if text.trim().is_empty() {
        bail!("No story text provided");
    }

    let classifier = create_classifier(config)?;
    let mut session = Session::new();
    let analysis = session.analyze(classifier.as_ref(), &text).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(analysis)?);
    } else {
        print!("{}", render_table(analysis));
        if details {
            for story in analysis.stories() {
                println!();
                print!("{}", render_story_details(story));
            }
        }
    }

    if let Some(path) = save {
        save_analysis(&path, analysis)?;
        eprintln!("Saved analysis to {}", path.display());
    }
    Ok(())
}

/// `fpa reanalyze`
///
/// The results file is only rewritten when re-classification succeeds.
pub async fn run_reanalyze(
    config: &Config,
    results: &Path,
    story_id: &str,
    doc: &Path,
    json: bool,
) -> Result<()> {
    let content_type = extract::content_type_for_path(doc).unwrap_or("application/octet-stream");
    extract::ensure_supported(content_type)
        .with_context(|| format!("Cannot use {} as context", doc.display()))?;

    let analysis = load_analysis(results)?;
    if analysis.get(story_id).is_none() {
        bail!("story not found: {}", story_id);
    }
    let bytes = std::fs::read(doc)
        .with_context(|| format!("Failed to read document: {}", doc.display()))?;

    let classifier = create_classifier(config)?;
    let mut session = Session::with_analysis(analysis);
    let story = session
        .reanalyze(
            classifier.as_ref(),
            story_id,
            &bytes,
            content_type,
            config.reanalysis.max_document_bytes,
        )
        .await?;

    let Some(analysis) = session.into_analysis() else {
        bail!("analysis lost during re-classification");
    };
    save_analysis(results, &analysis)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&story)?);
    } else {
        print!("{}", render_story_details(&story));
        println!();
        println!("{}", render_summary(analysis.summary()));
    }
    Ok(())
}

/// `fpa extract`
pub fn run_extract(config: &Config, doc: &Path) -> Result<()> {
    let content_type = extract::content_type_for_path(doc).unwrap_or("application/octet-stream");
    let bytes = std::fs::read(doc)
        .with_context(|| format!("Failed to read document: {}", doc.display()))?;
    let text = extract::extract_text(&bytes, content_type, config.reanalysis.max_document_bytes)?;
    println!("{}", text);
    Ok(())
}
