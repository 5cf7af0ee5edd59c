//! # notelens
//!
//! Extract and analyse handwritten or whiteboard notes: OCR the uploaded
//! photos, aggregate the text with per-image provenance, and have an LLM
//! produce a summary, categories, key insights, and action steps guided by
//! free-form user instructions.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images
//!  │
//!  ├─ 1. Normalize  fit oversized photos to the transfer budget (JPEG ladder)
//!  ├─ 2. Extract    per-image OCR, concurrent fan-out, provenance numbering
//!  ├─ 3. Aggregate  one document, "--- Image N ---" markers
//!  └─ 4. Analyze    LLM call, structured JSON or free prose
//! ```
//!
//! The two network collaborators sit behind narrow traits
//! ([`TextDetector`], [`ChatCompleter`]) so tests run against deterministic
//! stubs. The two-step flow (extract, let the user edit, then analyse) needs
//! no server-side state: the second request carries the full edited item
//! list.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notelens::{process, PipelineConfig, UploadedImage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Collaborators resolved from GOOGLE_CREDENTIALS_BASE64 /
//!     // GOOGLE_APPLICATION_CREDENTIALS and OPENAI_API_KEY.
//!     let config = PipelineConfig::default();
//!     let images = vec![UploadedImage::new(std::fs::read("whiteboard.jpg")?)];
//!     let output = process(images, "list the action items", &config).await?;
//!     println!("{}", output.analysis.summary);
//!     for step in &output.analysis.action_steps {
//!         println!("- {step}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `notelens` binary (clap + anyhow + tracing-subscriber) |
//! | `server` | on      | Enables the axum HTTP surface ([`server`]) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    OcrCredentials, PipelineConfig, PipelineConfigBuilder, ResponseFormat, SizeLimitPolicy,
};
pub use error::{ErrorClass, NotelensError};
pub use output::{AnalysisResult, ExtractedText, NoteItem, ProcessOutput};
pub use pipeline::analyze::{ChatCompleter, CompletionRequest};
pub use pipeline::extract::UploadedImage;
pub use pipeline::ocr::TextDetector;
pub use process::{analyze_extracted, extract_images, process};
