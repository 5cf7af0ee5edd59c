//! Result types produced by the pipeline.
//!
//! All wire structs serialise with camelCase field names to match the JSON
//! shape clients already speak (`imageNumber`, `extractedTexts`,
//! `actionSteps`, …).

use serde::{Deserialize, Serialize};

/// Text extracted from one image of a batch.
///
/// `image_number` is 1-based and matches the image's position in the
/// originally submitted batch — images that yielded no text are dropped from
/// the result set without renumbering the survivors, so the numbers a caller
/// sees always point back at the upload order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedText {
    pub image_number: usize,
    pub text: String,
}

impl ExtractedText {
    pub fn new(image_number: usize, text: impl Into<String>) -> Self {
        Self {
            image_number,
            text: text.into(),
        }
    }
}

/// One categorised note inside an [`AnalysisResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteItem {
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub position: usize,
}

/// The analysis produced for one aggregated document.
///
/// Every field except `summary` is absent-tolerant: a provider response that
/// omits `actionSteps` or `keyInsights` deserialises to an empty vector,
/// never `null`. A missing `summary` is surfaced as an empty string — tolerant,
/// not an error.
///
/// A result is immutable once created; a second analysis call supersedes the
/// previous result wholesale rather than merging into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub action_steps: Vec<String>,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<NoteItem>,
}

/// Output of the one-shot pipeline: extraction provenance plus the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutput {
    pub extracted_texts: Vec<ExtractedText>,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}
