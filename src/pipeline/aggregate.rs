//! Text aggregation: join per-image extractions into one document.
//!
//! Pure and deterministic — the same items always yield byte-identical
//! output, which downstream tests rely on. Each segment is demarcated with
//! its source image number so the analysis (and the user) can trace any line
//! back to the photo it came from.

use crate::output::ExtractedText;

/// Join extracted items into a single document.
///
/// Each item renders as a marker line `--- Image {n} ---` followed by its
/// text; segments are separated by one blank line. Items are emitted in
/// ascending image-number order regardless of input order.
pub fn aggregate(items: &[ExtractedText]) -> String {
    let mut sorted: Vec<&ExtractedText> = items.iter().collect();
    sorted.sort_by_key(|item| item.image_number);

    sorted
        .iter()
        .map(|item| format!("--- Image {} ---\n{}", item.image_number, item.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
