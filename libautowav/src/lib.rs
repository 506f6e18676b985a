//! autowav - an experimental lossy audio codec built on a dense autoencoder
//!
//! Encoding cuts a PCM stream into 1/100 s frames, maps them into `[0, 1]`,
//! trains an autoencoder on them and keeps only the latent vectors plus the
//! trained decoder half. Decoding runs the decoder, maps back to integers,
//! clamps, and drops the padding added at encode time.
//!
//! ```text
//! encode: wave -> frames -> normalize -> fit + encode -> <out> + <out>.model
//! decode: <in> + <in>.model -> decode -> denormalize -> truncate -> <out>.wav
//! ```

pub mod config;
pub mod container;
pub mod core;
pub mod device;
pub mod frames;
pub mod reconstruct;
pub mod transform;

mod reader;
mod writer;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use crate::core::{
    norm, AwResult, CodecError, SampleStream, StreamParams, FRAMES_PER_SECOND, LATENT_DIVISOR,
    MODEL_SUFFIX, SUPPORTED_WIDTHS,
};
pub use config::CodecConfig;
pub use container::{model_path, wav_path, EncodedContainer};
pub use frames::{frame_length, normalize_frames, pad_and_split};
pub use reader::{read_samples, WaveReader};
pub use reconstruct::reconstruct;
pub use transform::{
    Autoencoder, AutoencoderDecoder, FrameDecoder, FrameTransform, IdentityDecoder,
    IdentityTransform, TrainingConfig,
};
pub use writer::{write_samples, WaveWriter};

/// what an encode produced
#[derive(Debug, Clone)]
pub struct EncodeSummary {
    pub params: StreamParams,
    pub frame_length: usize,
    pub frame_count: usize,
    pub latent_width: usize,
    /// final training loss, if any epochs ran
    pub loss: Option<f32>,
    pub data_path: PathBuf,
    pub model_path: PathBuf,
}

/// what a decode produced
#[derive(Debug, Clone)]
pub struct DecodeSummary {
    pub params: StreamParams,
    pub frame_count: usize,
    pub wav_path: PathBuf,
}

/// library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Train `model` on a stream and return its latents.
///
/// frame length -> pad + split -> normalize -> fit -> encode
pub fn encode_stream<T: FrameTransform>(
    stream: &SampleStream,
    model: &mut T,
) -> AwResult<EncodedContainer> {
    let params = stream.params();
    let total = params.total_samples()?;
    if stream.samples.len() != total {
        return Err(CodecError::ShapeMismatch {
            what: "samples",
            expected: total,
            found: stream.samples.len(),
        });
    }

    let frame_length = frame_length(stream.sample_rate)?;
    frames::warn_if_not_16_bit(stream.sample_width);

    let frames = pad_and_split(&stream.samples, frame_length)?;
    let normalized = normalize_frames(&frames);

    model.fit(&normalized, frame_length)?;
    let latents = model.encode(&normalized)?;

    if latents.nrows() != normalized.nrows() {
        return Err(CodecError::ShapeMismatch {
            what: "latent rows",
            expected: normalized.nrows(),
            found: latents.nrows(),
        });
    }

    debug!(
        frames = latents.nrows(),
        latent_width = latents.ncols(),
        "stream encoded"
    );
    Ok(EncodedContainer { latents, params })
}

/// Rebuild a stream from a container with its decoder.
///
/// decode -> denormalize + clamp -> truncate
pub fn decode_container<D: FrameDecoder>(
    container: &EncodedContainer,
    decoder: &D,
) -> AwResult<SampleStream> {
    if decoder.latent_width() != container.latent_width() {
        return Err(CodecError::ShapeMismatch {
            what: "latent width",
            expected: decoder.latent_width(),
            found: container.latent_width(),
        });
    }

    let frames = decoder.decode(&container.latents)?;
    let samples = reconstruct(&frames, &container.params)?;
    Ok(SampleStream::new(container.params, samples))
}

/// Encode a wave file to `output` and `output.model`.
pub fn encode_file(input: &Path, output: &Path, config: &CodecConfig) -> AwResult<EncodeSummary> {
    config.validate()?;

    let stream = read_samples(input)?;
    let frame_length = frame_length(stream.sample_rate)?;

    let mut model = Autoencoder::new(config.training());
    let container = encode_stream(&stream, &mut model)?;
    let decoder = model.decoder()?;

    container::save(output, &container, &decoder)?;

    let summary = EncodeSummary {
        params: container.params,
        frame_length,
        frame_count: container.frame_count(),
        latent_width: container.latent_width(),
        loss: model.last_loss(),
        data_path: output.to_path_buf(),
        model_path: model_path(output),
    };
    info!(
        input = %input.display(),
        output = %output.display(),
        frames = summary.frame_count,
        "encoded"
    );
    Ok(summary)
}

/// Decode `input` + `input.model` to `output.wav`.
pub fn decode_file(input: &Path, output: &Path) -> AwResult<DecodeSummary> {
    let (container, decoder): (EncodedContainer, AutoencoderDecoder) = container::load(input)?;
    let stream = decode_container(&container, &decoder)?;

    let wav = wav_path(output);
    write_samples(&wav, &stream)?;

    info!(input = %input.display(), output = %wav.display(), "decoded");
    Ok(DecodeSummary {
        params: container.params,
        frame_count: container.frame_count(),
        wav_path: wav,
    })
}
