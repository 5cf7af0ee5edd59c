//! LLM interaction: turn aggregated note text plus user instructions into an
//! [`AnalysisResult`].
//!
//! This stage is intentionally thin — all prompt wording lives in
//! [`crate::prompts`] so it can change without touching the request or
//! parsing logic here. [`ChatCompleter`] is the collaborator seam; tests
//! substitute stubs, production uses [`OpenAiChat`].
//!
//! No retries, no streaming: a failed call fails the request.

use crate::config::{PipelineConfig, ResponseFormat};
use crate::error::NotelensError;
use crate::output::AnalysisResult;
use crate::prompts::{build_user_prompt, DEFAULT_SYSTEM_PROMPT, STRUCTURED_OUTPUT_SUFFIX};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// External LLM completion service: one chat call, assistant content out.
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    async fn chat_complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        request: &CompletionRequest,
    ) -> Result<String, NotelensError>;
}

/// Per-call parameters, fixed by configuration rather than negotiated per
/// request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub format: ResponseFormat,
}

impl CompletionRequest {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            format: config.response_format,
        }
    }
}

/// Analyse aggregated text under the caller's instructions.
///
/// Hard precondition: `instructions` must be non-blank — checked here,
/// before any collaborator call is made. (The companion precondition, a
/// non-empty item list, is enforced by the orchestrator that produced
/// `aggregated_text`.)
///
/// With [`ResponseFormat::StructuredJson`] the response is parsed into
/// [`AnalysisResult`]; optional list fields the provider omitted come back
/// as empty vectors, a missing `summary` as an empty string. A response that
/// does not parse is an [`NotelensError::AnalysisParse`] carrying the raw
/// payload — never a silently half-filled default.
///
/// With [`ResponseFormat::FreeText`] the whole completion lands in
/// `summary` and the list fields stay empty.
pub async fn analyze(
    completer: &dyn ChatCompleter,
    config: &PipelineConfig,
    aggregated_text: &str,
    instructions: &str,
) -> Result<AnalysisResult, NotelensError> {
    if instructions.trim().is_empty() {
        return Err(NotelensError::Validation(
            "User instructions are required".into(),
        ));
    }

    let mut system_prompt = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    if config.response_format == ResponseFormat::StructuredJson {
        system_prompt.push_str(STRUCTURED_OUTPUT_SUFFIX);
    }

    let user_prompt = build_user_prompt(instructions, aggregated_text);
    let request = CompletionRequest::from_config(config);

    debug!(
        model = %request.model,
        format = ?request.format,
        text_len = aggregated_text.len(),
        "requesting analysis"
    );

    let content = completer
        .chat_complete(&system_prompt, &user_prompt, &request)
        .await?;

    match config.response_format {
        ResponseFormat::FreeText => Ok(AnalysisResult {
            summary: content,
            ..Default::default()
        }),
        ResponseFormat::StructuredJson => parse_structured(&content),
    }
}

/// Parse a structured completion, tolerating markdown fences some models
/// insist on adding around JSON.
fn parse_structured(content: &str) -> Result<AnalysisResult, NotelensError> {
    let trimmed = strip_json_fences(content);
    serde_json::from_str::<AnalysisResult>(trimmed).map_err(|e| {
        warn!(error = %e, raw = content, "structured analysis did not parse");
        NotelensError::AnalysisParse {
            detail: e.to_string(),
            raw: content.to_string(),
        }
    })
}

fn strip_json_fences(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

// ── OpenAI implementation ────────────────────────────────────────────────

/// [`ChatCompleter`] backed by the OpenAI chat-completions API.
pub struct OpenAiChat {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiChat {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, NotelensError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| NotelensError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            client,
        })
    }
}

#[async_trait]
impl ChatCompleter for OpenAiChat {
    async fn chat_complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        request: &CompletionRequest,
    ) -> Result<String, NotelensError> {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.format == ResponseFormat::StructuredJson {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let resp = self
            .client
            .post(OPENAI_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotelensError::Analysis {
                detail: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let payload = resp.text().await.unwrap_or_default();
            warn!(%status, payload, "OpenAI error response");
            return Err(NotelensError::Analysis {
                detail: format!("LLM API returned HTTP {status}"),
            });
        }

        let chat: ChatResponse = resp.json().await.map_err(|e| NotelensError::Analysis {
            detail: format!("malformed LLM response: {e}"),
        })?;

        Ok(chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
