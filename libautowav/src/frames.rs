//! Frame segmentation and normalization
//!
//! A stream is cut into frames of `sample_rate / 100` interleaved samples.
//! The tail is always zero-padded, even when the input is already aligned,
//! so an aligned stream carries one fully synthetic trailing frame. The
//! padding is dropped again by [`crate::reconstruct`].

use ndarray::Array2;
use tracing::{debug, warn};

use crate::core::{normalize_sample, AwResult, CodecError, FRAMES_PER_SECOND};

/// Samples per frame for a sample rate (1/100 s)
pub fn frame_length(sample_rate: u32) -> AwResult<usize> {
    let frame_length = (sample_rate / FRAMES_PER_SECOND) as usize;
    if frame_length == 0 {
        return Err(CodecError::DegenerateFrame {
            sample_rate,
            frame_length,
        });
    }
    Ok(frame_length)
}

/// Zero samples appended to `n` samples. Never zero.
pub fn padding(n: usize, frame_length: usize) -> usize {
    frame_length - (n % frame_length)
}

/// Number of frames `pad_and_split` produces for `n` samples
pub fn frame_count(n: usize, frame_length: usize) -> usize {
    (n + padding(n, frame_length)) / frame_length
}

/// Pad with zeros and split into rows of `frame_length`, in order
pub fn pad_and_split(samples: &[i64], frame_length: usize) -> AwResult<Array2<i64>> {
    if frame_length == 0 {
        return Err(CodecError::DegenerateFrame {
            sample_rate: 0,
            frame_length,
        });
    }

    let pad = padding(samples.len(), frame_length);
    let mut padded = Vec::with_capacity(samples.len() + pad);
    padded.extend_from_slice(samples);
    padded.resize(samples.len() + pad, 0);

    let total = padded.len();
    let rows = total / frame_length;
    debug!(samples = samples.len(), pad, rows, frame_length, "split into frames");

    Array2::from_shape_vec((rows, frame_length), padded).map_err(|_| CodecError::ShapeMismatch {
        what: "padded samples",
        expected: rows * frame_length,
        found: total,
    })
}

/// Map integer frames into the transform's `[0, 1]` domain
pub fn normalize_frames(frames: &Array2<i64>) -> Array2<f32> {
    frames.mapv(normalize_sample)
}

/// Note when a stream is not 16-bit.
///
/// Normalization is fixed to 16-bit full scale, so other widths are
/// misscaled. Kept as is; this only makes it visible.
pub fn warn_if_not_16_bit(sample_width: u8) {
    if sample_width != 2 {
        warn!(
            sample_width,
            "normalization assumes 16-bit full scale; amplitudes of this width will be misscaled"
        );
    }
}
