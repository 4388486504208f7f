//! Plain-text rendering of an analysis for the terminal.

use std::fmt::Write;

use fpa_estimator_core::collection::{AnalysisCollection, Summary};
use fpa_estimator_core::models::{FunctionType, StoryRecord};

const NAME_WIDTH: usize = 40;
const PROJECT_WIDTH: usize = 24;

/// Cut `s` to `width` characters, marking the cut with `…`.
fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// One-line summary, e.g. `stories: 4 | ALI 1 | AIE 0 | EE 2 | CE 1 | SE 0 | UNKNOWN 0`.
pub fn render_summary(summary: &Summary) -> String {
    let mut out = format!("stories: {}", summary.total_stories);
    for t in FunctionType::ALL {
        let _ = write!(out, " | {} {}", t, summary.count(t));
    }
    out
}

fn flags(story: &StoryRecord) -> String {
    let mut parts = Vec::new();
    if story.is_duplicate {
        parts.push("DUP".to_string());
    }
    if !story.warnings.is_empty() {
        parts.push(format!("{}w", story.warnings.len()));
    }
    parts.join(" ")
}

/// Render the story table followed by the summary line.
pub fn render_table(collection: &AnalysisCollection) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<name$}  {:<7}  {:<proj$}  {:>5}  FLAGS",
        "#",
        "NAME",
        "TYPE",
        "PROJECT",
        "CONF",
        name = NAME_WIDTH,
        proj = PROJECT_WIDTH,
    );
    for (idx, story) in collection.stories().iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:<name$}  {:<7}  {:<proj$}  {:>4}%  {}",
            idx + 1,
            fit(&story.short_name, NAME_WIDTH),
            story.function_type.as_str(),
            fit(story.project_type.as_str(), PROJECT_WIDTH),
            (story.confidence * 100.0).round() as u32,
            flags(story),
            name = NAME_WIDTH,
            proj = PROJECT_WIDTH,
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", render_summary(collection.summary()));
    out
}

/// Full detail block for one story: id, raw text, warnings and reasoning.
pub fn render_story_details(story: &StoryRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", story.short_name, story.id);
    let _ = writeln!(out, "  raw:      {}", story.original_text);
    let _ = writeln!(
        out,
        "  type:     {} ({})",
        story.function_type,
        story.function_type.label()
    );
    let _ = writeln!(out, "  project:  {}", story.project_type);
    let _ = writeln!(out, "  conf:     {:.2}", story.confidence);
    if story.is_duplicate {
        let _ = writeln!(out, "  duplicate");
    }
    for w in &story.warnings {
        let _ = writeln!(out, "  warning:  {}", w);
    }
    let _ = writeln!(out, "  why type: {}", story.reasoning_function_type);
    let _ = writeln!(out, "  why proj: {}", story.reasoning_project_type);
    out
}
