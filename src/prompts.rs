//! Prompts for the analysis stage.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the analysis framing or the
//!    structured-output contract is an edit in exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the prompts directly without
//!    a live LLM, so prompt regressions are caught cheaply.
//!
//! Callers can override the system prompt via
//! [`crate::config::PipelineConfig::system_prompt`]; the constants here are
//! used only when no override is provided.

/// Default system prompt for analysing aggregated note text.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that analyzes notes and \
whiteboards based on user instructions.";

/// Appended to the system prompt when structured JSON output is requested.
///
/// The JSON contract here must stay in sync with
/// [`crate::output::AnalysisResult`]: same field names, arrays of strings for
/// the list fields, objects with content/category/position for notes.
pub const STRUCTURED_OUTPUT_SUFFIX: &str = r#"

Respond with a single JSON object and nothing else, using exactly these fields:
{
  "summary": "concise summary of the notes",
  "categories": ["topic category", ...],
  "keyInsights": ["notable insight", ...],
  "actionSteps": ["concrete next step", ...],
  "notes": [{"content": "one note", "category": "its category", "position": 1}, ...]
}
Omit a list field rather than inventing content for it. Do not wrap the JSON
in markdown fences."#;

/// Build the user prompt: instructions first, then the aggregated text.
///
/// The ordering mirrors how a person would brief an assistant — what to do,
/// then the material to do it with.
pub fn build_user_prompt(instructions: &str, aggregated_text: &str) -> String {
    format!(
        "{instructions}\n\nHere is the extracted text from notes/whiteboard:\n\n{aggregated_text}"
    )
}
