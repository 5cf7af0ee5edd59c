//! End-to-end pipeline entry points.
//!
//! Three request shapes are supported:
//!
//! * [`extract_images`] — extract-only. The caller receives the per-image
//!   items and may edit them before analysis (the first half of the
//!   two-step flow).
//! * [`analyze_extracted`] — the second half of the two-step flow. The
//!   request carries the full (possibly user-edited) item list plus
//!   instructions, so the pause between the two steps costs the server
//!   nothing: there is no session to keep.
//! * [`process`] — one shot: extract, aggregate, analyse in a single call.
//!
//! Any stage's fatal error aborts the request; there is no resumption and
//! no partial result once a stage has failed.

use crate::config::PipelineConfig;
use crate::error::NotelensError;
use crate::output::{AnalysisResult, ExtractedText, ProcessOutput};
use crate::pipeline::aggregate;
use crate::pipeline::analyze::{self, ChatCompleter, OpenAiChat};
use crate::pipeline::extract::{self, UploadedImage};
use crate::pipeline::ocr::{GoogleVisionOcr, ServiceAccountKey, TextDetector};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Extract text from a batch of images.
///
/// Returns one [`ExtractedText`] per image that yielded non-empty text, in
/// batch order, numbered by original batch position.
pub async fn extract_images(
    images: Vec<UploadedImage>,
    config: &PipelineConfig,
) -> Result<Vec<ExtractedText>, NotelensError> {
    let detector = resolve_detector(config)?;
    extract::extract_batch(detector, images, config).await
}

/// Analyse previously extracted (possibly user-edited) items.
///
/// Hard preconditions, checked before any collaborator call: the item list
/// must be non-empty and `instructions` must be non-blank.
pub async fn analyze_extracted(
    items: &[ExtractedText],
    instructions: &str,
    config: &PipelineConfig,
) -> Result<AnalysisResult, NotelensError> {
    if items.is_empty() {
        return Err(NotelensError::Validation(
            "No text provided for analysis".into(),
        ));
    }

    let completer = resolve_completer(config)?;
    let aggregated = aggregate::aggregate(items);
    analyze::analyze(completer.as_ref(), config, &aggregated, instructions).await
}

/// One-shot pipeline: extract, aggregate, and analyse in a single call.
///
/// Both inputs are validated up front so a request missing its instructions
/// fails before any OCR work is spent on it.
pub async fn process(
    images: Vec<UploadedImage>,
    instructions: &str,
    config: &PipelineConfig,
) -> Result<ProcessOutput, NotelensError> {
    if images.is_empty() {
        return Err(NotelensError::Validation("No images provided".into()));
    }
    if instructions.trim().is_empty() {
        return Err(NotelensError::Validation(
            "User instructions are required".into(),
        ));
    }

    let start = Instant::now();
    let extracted_texts = extract_images(images, config).await?;
    let analysis = analyze_extracted(&extracted_texts, instructions, config).await?;

    info!(
        images = extracted_texts.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "one-shot pipeline complete"
    );

    Ok(ProcessOutput {
        extracted_texts,
        analysis,
    })
}

// ── Collaborator resolution ──────────────────────────────────────────────

/// Resolve the OCR collaborator, from most-specific to least-specific:
///
/// 1. **Pre-built detector** (`config.detector`) — the caller constructed
///    it entirely; used as-is. This is how tests inject stubs.
/// 2. **Explicit credentials** (`config.ocr_credentials`).
/// 3. **Environment** — `GOOGLE_CREDENTIALS_BASE64`, then
///    `GOOGLE_APPLICATION_CREDENTIALS`.
pub fn resolve_detector(
    config: &PipelineConfig,
) -> Result<Arc<dyn TextDetector>, NotelensError> {
    if let Some(ref detector) = config.detector {
        return Ok(Arc::clone(detector));
    }

    let key = match config.ocr_credentials {
        Some(ref creds) => ServiceAccountKey::resolve(creds)?,
        None => ServiceAccountKey::from_env()?,
    };

    Ok(Arc::new(GoogleVisionOcr::new(key, config.api_timeout_secs)?))
}

/// Resolve the LLM collaborator: pre-built completer, then explicit API key,
/// then `OPENAI_API_KEY` from the environment.
pub fn resolve_completer(
    config: &PipelineConfig,
) -> Result<Arc<dyn ChatCompleter>, NotelensError> {
    if let Some(ref completer) = config.completer {
        return Ok(Arc::clone(completer));
    }

    let api_key = match config.llm_api_key {
        Some(ref key) if !key.is_empty() => key.clone(),
        _ => std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                NotelensError::Credentials(
                    "no LLM API key: set OPENAI_API_KEY or configure llm_api_key".into(),
                )
            })?,
    };

    Ok(Arc::new(OpenAiChat::new(api_key, config.api_timeout_secs)?))
}
