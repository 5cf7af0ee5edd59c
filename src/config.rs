//! Configuration types for the extraction-and-analysis pipeline.
//!
//! All behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config across requests, log it, and diff two runs to
//! understand why their outputs differ.
//!
//! The collaborator fields (`detector`, `completer`) deliberately accept
//! pre-built trait objects: tests inject deterministic stubs instead of the
//! real Google Vision / OpenAI clients, and nothing in the library reaches
//! for ambient global state.

use crate::error::NotelensError;
use crate::pipeline::analyze::ChatCompleter;
use crate::pipeline::ocr::TextDetector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default per-image size budget: 1 MiB, matching the transfer limit the
/// OCR collaborator is comfortable with.
pub const DEFAULT_MAX_IMAGE_SIZE: usize = 1024 * 1024;

/// Configuration for one pipeline instance.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use notelens::{PipelineConfig, SizeLimitPolicy};
///
/// let config = PipelineConfig::builder()
///     .model("gpt-4o-mini")
///     .concurrency(4)
///     .size_limit_policy(SizeLimitPolicy::Normalize)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Per-image size budget in bytes. Default: 1 MiB.
    ///
    /// Images over the budget are handled according to
    /// [`size_limit_policy`](Self::size_limit_policy).
    pub max_image_size_bytes: usize,

    /// What to do with an image over the size budget. Default: [`SizeLimitPolicy::Normalize`].
    ///
    /// Applied uniformly to every image in a batch — a batch is never
    /// half-rejected, half-compressed.
    pub size_limit_policy: SizeLimitPolicy,

    /// Number of concurrent OCR calls within one batch. Default: 4.
    ///
    /// OCR calls are network-bound and independent per image; results are
    /// reconciled by image number afterwards, so completion order does not
    /// matter.
    pub concurrency: usize,

    /// LLM model identifier. Default: "gpt-4o-mini".
    pub model: String,

    /// Sampling temperature for the analysis completion. Default: 0.7.
    ///
    /// Summarising handwritten notes benefits from a little variability;
    /// this is not a transcription task where determinism wins.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per analysis. Default: 2048.
    pub max_tokens: usize,

    /// Whether the analysis is requested as structured JSON or free prose.
    /// Default: [`ResponseFormat::StructuredJson`].
    pub response_format: ResponseFormat,

    /// Custom system prompt for the analysis call. If None, uses the
    /// built-in default from [`crate::prompts`].
    pub system_prompt: Option<String>,

    /// OCR credential material. If None, resolved from the environment
    /// (`GOOGLE_CREDENTIALS_BASE64`, then `GOOGLE_APPLICATION_CREDENTIALS`).
    pub ocr_credentials: Option<OcrCredentials>,

    /// LLM API key. If None, read from `OPENAI_API_KEY`.
    pub llm_api_key: Option<String>,

    /// Pre-constructed OCR collaborator. Takes precedence over credentials.
    pub detector: Option<Arc<dyn TextDetector>>,

    /// Pre-constructed LLM collaborator. Takes precedence over `llm_api_key`.
    pub completer: Option<Arc<dyn ChatCompleter>>,

    /// Per-collaborator-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_image_size_bytes: DEFAULT_MAX_IMAGE_SIZE,
            size_limit_policy: SizeLimitPolicy::default(),
            concurrency: 4,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            response_format: ResponseFormat::default(),
            system_prompt: None,
            ocr_credentials: None,
            llm_api_key: None,
            detector: None,
            completer: None,
            api_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("max_image_size_bytes", &self.max_image_size_bytes)
            .field("size_limit_policy", &self.size_limit_policy)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("response_format", &self.response_format)
            .field("llm_api_key", &self.llm_api_key.as_ref().map(|_| "<redacted>"))
            .field("detector", &self.detector.as_ref().map(|_| "<dyn TextDetector>"))
            .field("completer", &self.completer.as_ref().map(|_| "<dyn ChatCompleter>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn max_image_size_bytes(mut self, bytes: usize) -> Self {
        self.config.max_image_size_bytes = bytes;
        self
    }

    pub fn size_limit_policy(mut self, policy: SizeLimitPolicy) -> Self {
        self.config.size_limit_policy = policy;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.config.response_format = format;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn ocr_credentials(mut self, creds: OcrCredentials) -> Self {
        self.config.ocr_credentials = Some(creds);
        self
    }

    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.llm_api_key = Some(key.into());
        self
    }

    pub fn detector(mut self, detector: Arc<dyn TextDetector>) -> Self {
        self.config.detector = Some(detector);
        self
    }

    pub fn completer(mut self, completer: Arc<dyn ChatCompleter>) -> Self {
        self.config.completer = Some(completer);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, NotelensError> {
        let c = &self.config;
        if c.max_image_size_bytes == 0 {
            return Err(NotelensError::InvalidConfig(
                "max_image_size_bytes must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(NotelensError::InvalidConfig(
                "concurrency must be ≥ 1".into(),
            ));
        }
        if c.model.is_empty() {
            return Err(NotelensError::InvalidConfig("model must be set".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What to do when an image exceeds the size budget.
///
/// Exactly one policy applies to the whole batch. Earlier variants of this
/// system rejected oversized uploads on one route and silently compressed on
/// another; that inconsistency is resolved here as an explicit choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizeLimitPolicy {
    /// Re-encode the image down to the budget before extraction (default).
    #[default]
    Normalize,
    /// Fail the whole batch, naming the offending image number.
    Reject,
}

/// Shape of the analysis response requested from the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseFormat {
    /// Machine-parseable JSON: summary, categories, key insights, action steps. (default)
    #[default]
    StructuredJson,
    /// Free prose; the whole completion lands in `AnalysisResult::summary`.
    FreeText,
}

/// Where the Google service-account JSON comes from.
///
/// Mirrors the deployment realities: inline JSON for config files,
/// base64 for single-env-var hosting platforms, a file path for local
/// development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrCredentials {
    /// The service-account JSON itself.
    Inline(String),
    /// Base64-encoded service-account JSON.
    Base64(String),
    /// Path to a service-account JSON file.
    Path(PathBuf),
}
