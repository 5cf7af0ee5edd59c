//! Image normalisation: fit raw bytes into the transfer-size budget.
//!
//! OCR uploads have a practical size ceiling. Rather than bouncing a 6 MB
//! phone photo back to the user, we re-encode it as JPEG at decreasing
//! quality until it fits. Handwriting survives lossy compression far better
//! than it survives a rejected request.
//!
//! The ladder starts at quality 80 and steps down by 10 to a floor of 10.
//! At the floor the last attempt is returned even if it still exceeds the
//! budget: the normaliser degrades, it never fails outright. The only hard
//! failure is a buffer that does not decode as an image at all.

use crate::error::NotelensError;
use image::codecs::jpeg::JpegEncoder;
use std::io::Cursor;
use tracing::debug;

/// Starting JPEG quality for the re-encode ladder.
const QUALITY_START: u8 = 80;
/// Quality decrement per attempt.
const QUALITY_STEP: u8 = 10;
/// Quality floor; the attempt at this level is returned regardless of size.
const QUALITY_FLOOR: u8 = 10;

/// Fit `bytes` to `max_size_bytes`, re-encoding as JPEG if necessary.
///
/// * Already within budget → returned unchanged (byte-identical).
/// * Over budget → decoded once, then re-encoded at 80, 70, … 10 quality
///   until the result fits or the floor is reached.
/// * Not a decodable image → [`NotelensError::Decode`] naming `image_number`.
///
/// Pure CPU work, no I/O. Termination is bounded by the fixed ladder length.
pub fn fit_to_budget(
    bytes: &[u8],
    max_size_bytes: usize,
    image_number: usize,
) -> Result<Vec<u8>, NotelensError> {
    if bytes.len() <= max_size_bytes {
        return Ok(bytes.to_vec());
    }

    let img = image::load_from_memory(bytes).map_err(|e| NotelensError::Decode {
        image_number,
        detail: e.to_string(),
    })?;
    // JPEG has no alpha channel; flatten before encoding.
    let rgb = img.to_rgb8();

    let mut quality = QUALITY_START;
    let mut attempt: Vec<u8>;
    loop {
        attempt = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut attempt), quality);
        rgb.write_with_encoder(encoder)
            .map_err(|e| NotelensError::Decode {
                image_number,
                detail: format!("re-encode at quality {quality} failed: {e}"),
            })?;

        debug!(
            image_number,
            quality,
            size = attempt.len(),
            "normalised attempt"
        );

        if attempt.len() <= max_size_bytes || quality <= QUALITY_FLOOR {
            break;
        }
        quality -= QUALITY_STEP;
    }

    Ok(attempt)
}
