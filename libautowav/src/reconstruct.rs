use ndarray::Array2;
use tracing::debug;

use crate::core::{denormalize_sample, AwResult, CodecError, StreamParams};

/// Rebuild interleaved integer samples from decoded frames.
///
/// Rows are concatenated in order, every value is denormalized and clamped,
/// then the result is cut to exactly `sample_count * channels`. This is where
/// the segmenter's padding tail is discarded.
pub fn reconstruct(frames: &Array2<f32>, params: &StreamParams) -> AwResult<Vec<i64>> {
    let total = params.total_samples()?;
    if frames.len() < total {
        return Err(CodecError::ShapeMismatch {
            what: "decoded samples",
            expected: total,
            found: frames.len(),
        });
    }

    // iter() walks in logical row-major order whatever the memory layout
    let samples: Vec<i64> = frames
        .iter()
        .take(total)
        .map(|&v| denormalize_sample(v))
        .collect();

    debug!(
        decoded = frames.len(),
        kept = samples.len(),
        "reconstructed samples"
    );
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncates_padding() {
        let params = StreamParams {
            channels: 1,
            sample_count: 5,
            sample_width: 2,
            sample_rate: 400,
        };
        let frames = Array2::from_elem((2, 4), 0.5f32);
        let out = reconstruct(&frames, &params).unwrap();
        assert_eq!(out, vec![0; 5]);
    }

    #[test]
    fn test_too_few_values() {
        let params = StreamParams {
            channels: 2,
            sample_count: 5,
            sample_width: 2,
            sample_rate: 400,
        };
        let frames = Array2::from_elem((2, 4), 0.5f32);
        assert!(matches!(
            reconstruct(&frames, &params),
            Err(CodecError::ShapeMismatch { expected: 10, found: 8, .. })
        ));
    }
}
