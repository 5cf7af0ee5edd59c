//! Error types for the notelens library.
//!
//! A single [`NotelensError`] enum covers the whole pipeline, but every
//! variant belongs to one of two classes (see [`NotelensError::class`]):
//!
//! * **User-correctable** — bad or missing input (empty batch, corrupt image,
//!   oversized image under the reject policy, no text found anywhere).
//!   The HTTP surface maps these to 400-class responses.
//!
//! * **Provider** — the OCR or LLM collaborator failed, or returned a
//!   response we could not parse. Nothing the caller can fix by changing
//!   their upload; mapped to 500-class responses.
//!
//! No variant is retried anywhere: every error aborts its request and is
//! reported as a single flat message. Internal detail (provider payloads)
//! stays in the tracing log, never in the response body.

use thiserror::Error;

/// All errors returned by the notelens pipeline.
#[derive(Debug, Error)]
pub enum NotelensError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Missing or empty request input (no images, blank instructions, …).
    #[error("{0}")]
    Validation(String),

    /// An image exceeds the configured size limit under the reject policy.
    #[error("Image {image_number} is {size} bytes, over the {limit}-byte limit")]
    SizeLimit {
        image_number: usize,
        size: usize,
        limit: usize,
    },

    /// The buffer is not a decodable image.
    #[error("Image {image_number} could not be decoded: {detail}")]
    Decode { image_number: usize, detail: String },

    /// Every image in the batch yielded empty text.
    #[error("No text found in any images")]
    NoTextFound,

    // ── Collaborator errors ───────────────────────────────────────────────
    /// The OCR collaborator failed (transport, auth, or API error).
    #[error("Text extraction failed: {detail}")]
    Extraction { detail: String },

    /// The LLM collaborator failed (transport, auth, or API error).
    #[error("Analysis failed: {detail}")]
    Analysis { detail: String },

    /// The LLM returned structured output that did not parse.
    ///
    /// `raw` carries the full response body for diagnostics; it is logged,
    /// never returned to the caller.
    #[error("Analysis response could not be parsed: {detail}")]
    AnalysisParse { detail: String, raw: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// OCR credentials were missing or unusable.
    #[error("OCR credentials error: {0}")]
    Credentials(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error class used by the HTTP surface to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller can fix this by changing their input (400-class).
    UserInput,
    /// A collaborator or the server itself failed (500-class).
    Provider,
}

impl NotelensError {
    /// Classify this error for status-code mapping.
    pub fn class(&self) -> ErrorClass {
        match self {
            NotelensError::Validation(_)
            | NotelensError::SizeLimit { .. }
            | NotelensError::Decode { .. }
            | NotelensError::NoTextFound => ErrorClass::UserInput,
            NotelensError::Extraction { .. }
            | NotelensError::Analysis { .. }
            | NotelensError::AnalysisParse { .. }
            | NotelensError::InvalidConfig(_)
            | NotelensError::Credentials(_)
            | NotelensError::Internal(_) => ErrorClass::Provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_display_names_image() {
        let e = NotelensError::SizeLimit {
            image_number: 3,
            size: 5_000_000,
            limit: 1_048_576,
        };
        let msg = e.to_string();
        assert!(msg.contains("Image 3"), "got: {msg}");
        assert!(msg.contains("1048576"), "got: {msg}");
    }

    #[test]
    fn decode_display_names_image() {
        let e = NotelensError::Decode {
            image_number: 1,
            detail: "not a JPEG".into(),
        };
        assert!(e.to_string().contains("Image 1"));
        assert!(e.to_string().contains("not a JPEG"));
    }

    #[test]
    fn parse_error_hides_raw_payload() {
        let e = NotelensError::AnalysisParse {
            detail: "expected value at line 1".into(),
            raw: "SECRET PROVIDER PAYLOAD".into(),
        };
        assert!(!e.to_string().contains("SECRET"));
    }

    #[test]
    fn classes_split_user_from_provider() {
        assert_eq!(NotelensError::NoTextFound.class(), ErrorClass::UserInput);
        assert_eq!(
            NotelensError::Validation("no images provided".into()).class(),
            ErrorClass::UserInput
        );
        assert_eq!(
            NotelensError::Extraction {
                detail: "HTTP 503".into()
            }
            .class(),
            ErrorClass::Provider
        );
        assert_eq!(
            NotelensError::AnalysisParse {
                detail: "bad json".into(),
                raw: String::new()
            }
            .class(),
            ErrorClass::Provider
        );
    }
}
