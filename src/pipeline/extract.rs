//! Multi-image extraction orchestration.
//!
//! Takes the ordered batch of uploaded images and produces ordered
//! [`ExtractedText`] items. This is where batch policy lives: input
//! validation, the uniform size-limit policy, the bounded concurrent OCR
//! fan-out, and the all-empty post-condition.
//!
//! Per-image OCR calls are independent, so they fan out concurrently up to
//! `config.concurrency`; results are reconciled by image number afterwards,
//! never by completion order. A hard per-image error (collaborator failure,
//! undecodable image, size violation under the reject policy) aborts the
//! whole batch — no partial-batch success once anything has gone wrong.

use crate::config::{PipelineConfig, SizeLimitPolicy};
use crate::error::NotelensError;
use crate::output::ExtractedText;
use crate::pipeline::{normalize, ocr};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

/// One uploaded image, held in memory for the duration of a single request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    /// Declared content type from the upload, if any. Informational only;
    /// the bytes are what gets decoded.
    pub content_type: Option<String>,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: None,
        }
    }

    pub fn with_content_type(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: Some(content_type.into()),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Extract text from every image in the batch.
///
/// * Empty batch → [`NotelensError::Validation`].
/// * Oversized image → rejected (naming its 1-based image number) or
///   normalised in place, per `config.size_limit_policy`, uniformly.
/// * Images whose OCR result is empty are dropped from the output — no
///   placeholder item is emitted, and surviving items keep their original
///   batch position as `image_number`.
/// * Any per-image hard error aborts the batch with that error.
/// * All images empty → [`NotelensError::NoTextFound`].
pub async fn extract_batch(
    detector: Arc<dyn ocr::TextDetector>,
    images: Vec<UploadedImage>,
    config: &PipelineConfig,
) -> Result<Vec<ExtractedText>, NotelensError> {
    if images.is_empty() {
        return Err(NotelensError::Validation("No images provided".into()));
    }

    let total = images.len();
    info!(total, "extracting text from image batch");

    // Under the reject policy, size violations are checked up front so the
    // lowest offending image number fails the batch deterministically,
    // before any OCR call is made.
    if config.size_limit_policy == SizeLimitPolicy::Reject {
        for (i, image) in images.iter().enumerate() {
            if image.size() > config.max_image_size_bytes {
                return Err(NotelensError::SizeLimit {
                    image_number: i + 1,
                    size: image.size(),
                    limit: config.max_image_size_bytes,
                });
            }
        }
    }

    let budget = config.max_image_size_bytes;
    let policy = config.size_limit_policy;

    let mut results: Vec<(usize, Result<String, NotelensError>)> =
        stream::iter(images.into_iter().enumerate().map(|(i, image)| {
            let detector = Arc::clone(&detector);
            async move {
                let image_number = i + 1;
                let outcome =
                    extract_one(detector.as_ref(), image, image_number, budget, policy).await;
                (image_number, outcome)
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    // Reconcile by image number, not completion order.
    results.sort_by_key(|(n, _)| *n);

    let mut items = Vec::new();
    for (image_number, outcome) in results {
        let text = outcome?;
        if text.is_empty() {
            debug!(image_number, "no text detected, dropping image");
        } else {
            items.push(ExtractedText::new(image_number, text));
        }
    }

    if items.is_empty() {
        return Err(NotelensError::NoTextFound);
    }

    info!(kept = items.len(), total, "extraction complete");
    Ok(items)
}

/// Normalise (if needed) and OCR a single image.
async fn extract_one(
    detector: &dyn ocr::TextDetector,
    image: UploadedImage,
    image_number: usize,
    budget: usize,
    policy: SizeLimitPolicy,
) -> Result<String, NotelensError> {
    let bytes = if policy == SizeLimitPolicy::Normalize && image.size() > budget {
        debug!(
            image_number,
            size = image.size(),
            budget,
            "image over budget, normalising"
        );
        // JPEG re-encoding is CPU-bound; keep it off the async executor.
        tokio::task::spawn_blocking(move || {
            normalize::fit_to_budget(&image.bytes, budget, image_number)
        })
        .await
        .map_err(|e| NotelensError::Internal(format!("normalise task: {e}")))??
    } else {
        image.bytes
    };

    ocr::extract_text(detector, &bytes).await
}
