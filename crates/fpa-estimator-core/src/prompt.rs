//! Prompt text for batch classification and document-backed re-classification.

use crate::models::StoryRecord;

/// Default bound on document context sent with a re-classification.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 50_000;

/// System instruction for batch classification.
pub const BATCH_SYSTEM_INSTRUCTION: &str = "\
You are a senior Function Point Analysis (FPA) specialist.
You receive a raw list of user stories or tasks from a software project and
must classify each one with high precision.

For every story:
1. Extract a short, clean name for the functionality (shortName) and echo the
   story text unchanged in originalText.
2. Classify the function type:
   - ALI (Arquivo Lógico Interno): major entities maintained by the
     application. Do not confuse them with calculation or lookup tables.
   - AIE (Arquivo de Interface Externa): data read from other systems only.
   - EE (Entrada Externa): transactions that create or update data.
   - CE (Consulta Externa): retrievals that present derived data.
   - SE (Saída Externa): reports and generated documents.
   - UNKNOWN: not enough information to decide.
3. Classify the project type strictly:
   - Desenvolvimento: new modules or applications.
   - Melhoria Inclusão: new fields, buttons or features on existing screens.
   - Melhoria Alteração: changes to existing logic or layout.
   - Melhoria Alteração com Redocumentação: changes that also require
     rewriting the documentation of the function.
   - Melhoria Exclusão: removal of features.
   - Manutenção Corretiva: bug fixes.
   - Migração de Dados: data movement between systems.
   - Pipeline DevOps: build and deployment work.
   - Verificação de Erros: security and vulnerability verification.
   - Manutenção de Documentação: documentation-only work.
   - Outros: anything else.
4. Flag duplicates (isDuplicate) when two stories describe the same function.

All reasoning and warnings MUST be written in PORTUGUESE, whatever the
language of the input.";

/// Cut `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_context(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the re-classification prompt for `story` given extracted document text.
pub fn reanalysis_prompt(story: &StoryRecord, context: &str, max_context_chars: usize) -> String {
    format!(
        "TASK: Re-evaluate one user story for Function Point Analysis using the attached technical documentation.

STORY:
- Text: \"{text}\"
- Current function type: {function_type}
- Current project type: {project_type}

ATTACHED DOCUMENT CONTENT:
\"\"\"
{context}
\"\"\"

INSTRUCTIONS:
1. Read the attached document to understand the technical scope of this story.
2. Re-classify the function type (ALI, AIE, EE, CE, SE) and the project type based on that evidence.
3. Write very detailed reasoning in PORTUGUESE, citing specific details from the document.
4. If a classification changes, explain why the previous one was wrong.",
        text = story.original_text,
        function_type = story.function_type,
        project_type = story.project_type,
        context = truncate_context(context, max_context_chars),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FunctionType, ProjectType};

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "ação".repeat(10);
        let cut = truncate_context(&text, 5);
        assert_eq!(cut.chars().count(), 5);
        assert_eq!(cut, "açãoa");
    }

    #[test]
    fn truncate_short_text_is_unchanged() {
        assert_eq!(truncate_context("abc", 10), "abc");
        assert_eq!(truncate_context("abc", 3), "abc");
        assert_eq!(truncate_context("", 0), "");
    }

    #[test]
    fn prompt_carries_current_classification_and_bounded_context() {
        let story = StoryRecord {
            id: "s1".into(),
            original_text: "Gerar relatório de vendas".into(),
            short_name: "Relatório de vendas".into(),
            function_type: FunctionType::ExternalQuery,
            project_type: ProjectType::ImprovementInclusion,
            confidence: 0.6,
            warnings: vec![],
            is_duplicate: false,
            reasoning_function_type: String::new(),
            reasoning_project_type: String::new(),
        };
        let context = "x".repeat(100);
        let prompt = reanalysis_prompt(&story, &context, 10);
        assert!(prompt.contains("Gerar relatório de vendas"));
        assert!(prompt.contains("Current function type: CE"));
        assert!(prompt.contains("Current project type: Melhoria Inclusão"));
        assert!(prompt.contains(&"x".repeat(10)));
        assert!(!prompt.contains(&"x".repeat(11)));
    }
}
