//! Trainable frame transforms
//!
//! The pipeline only sees two capabilities: a [`FrameTransform`] that learns a
//! compressive mapping and produces latents, and the [`FrameDecoder`] half that
//! is persisted and used at decode time.

pub mod autoencoder;
pub mod dense;
pub mod identity;


pub use autoencoder::{Autoencoder, AutoencoderDecoder, TrainingConfig};
pub use dense::{Activation, Adam, Dense};
pub use identity::{IdentityDecoder, IdentityTransform};

use ndarray::Array2;

use crate::core::{AwResult, CodecError};

/// Decoder half of a trained transform: latents back to normalized frames
pub trait FrameDecoder {
    /// width of the frames this decoder produces
    fn frame_length(&self) -> usize;

    /// width of the latents it expects
    fn latent_width(&self) -> usize;

    /// Decode one latent row per frame.
    ///
    /// Fails with `ShapeMismatch` when the latent width is not
    /// [`FrameDecoder::latent_width`].
    fn decode(&self, latents: &Array2<f32>) -> AwResult<Array2<f32>>;

    /// Internal consistency of a freshly deserialized decoder
    fn validate(&self) -> AwResult<()> {
        Ok(())
    }
}

/// Trainable compressor/decompressor pair
pub trait FrameTransform {
    type Decoder: FrameDecoder;

    /// Train on normalized frames, using them as their own targets.
    ///
    /// Blocks until training is finished. Replaces any earlier state.
    fn fit(&mut self, frames: &Array2<f32>, frame_length: usize) -> AwResult<()>;

    /// Latent row for every frame, in order
    fn encode(&self, frames: &Array2<f32>) -> AwResult<Array2<f32>>;

    /// Detach the trained decoder half
    fn decoder(&self) -> AwResult<Self::Decoder>;
}

/// column count check shared by the transforms
pub(crate) fn check_columns(what: &'static str, expected: usize, rows: &Array2<f32>) -> AwResult<()> {
    if rows.ncols() != expected {
        return Err(CodecError::ShapeMismatch {
            what,
            expected,
            found: rows.ncols(),
        });
    }
    Ok(())
}
