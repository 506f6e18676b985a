use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{check_columns, FrameDecoder, FrameTransform};
use crate::core::{AwResult, CodecError};

/// Pass-through transform: latents are the normalized frames themselves.
///
/// Useful for checking everything around the model, since any error left
/// after a round trip comes from quantization alone.
#[derive(Debug, Clone, Default)]
pub struct IdentityTransform {
    frame_length: Option<usize>,
}

/// decoder half of [`IdentityTransform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDecoder {
    pub frame_length: usize,
}

impl IdentityTransform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameTransform for IdentityTransform {
    type Decoder = IdentityDecoder;

    fn fit(&mut self, frames: &Array2<f32>, frame_length: usize) -> AwResult<()> {
        check_columns("frame width", frame_length, frames)?;
        self.frame_length = Some(frame_length);
        Ok(())
    }

    fn encode(&self, frames: &Array2<f32>) -> AwResult<Array2<f32>> {
        let frame_length = self.frame_length.ok_or(CodecError::Untrained)?;
        check_columns("frame width", frame_length, frames)?;
        Ok(frames.to_owned())
    }

    fn decoder(&self) -> AwResult<IdentityDecoder> {
        let frame_length = self.frame_length.ok_or(CodecError::Untrained)?;
        Ok(IdentityDecoder { frame_length })
    }
}

impl FrameDecoder for IdentityDecoder {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn latent_width(&self) -> usize {
        self.frame_length
    }

    fn decode(&self, latents: &Array2<f32>) -> AwResult<Array2<f32>> {
        check_columns("latent width", self.frame_length, latents)?;
        Ok(latents.to_owned())
    }
}
