//! Pipeline stages for note extraction and analysis.
//!
//! Each submodule implements exactly one transformation step. Keeping the
//! stages separate makes each independently testable and lets us swap a
//! collaborator implementation without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! images ──▶ normalize ──▶ ocr ──▶ extract ──▶ aggregate ──▶ analyze
//! (bytes)    (size budget)  (per image)  (batch)  (provenance)  (LLM)
//! ```
//!
//! 1. [`normalize`]  — fit oversized image bytes to the transfer budget
//! 2. [`ocr`]        — the OCR collaborator seam; one image in, text out
//! 3. [`extract`]    — batch orchestration: policy, fan-out, reconciliation
//! 4. [`aggregate`]  — join per-image text into one document with markers
//! 5. [`analyze`]    — the LLM collaborator seam; the only other network stage

pub mod aggregate;
pub mod analyze;
pub mod extract;
pub mod normalize;
pub mod ocr;
