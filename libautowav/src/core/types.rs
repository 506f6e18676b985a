//! common types for the autowav codec

use super::error::{AwResult, CodecError};

// constants

/// Magic number of the data container "AEW!"
pub const MAGIC: [u8; 4] = [0x41, 0x45, 0x57, 0x21];

/// Magic number of the model artifact "AEWM"
pub const MODEL_MAGIC: [u8; 4] = [0x41, 0x45, 0x57, 0x4d];

/// on-disk format version for both artifacts; 2 = zstd-compressed payload
pub const FORMAT_VERSION: u8 = 2;

/// zstd level for both artifacts
pub const COMPRESSION_LEVEL: i32 = 3;

/// frames per second of audio; one frame covers 1/100 s
pub const FRAMES_PER_SECOND: u32 = 100;

/// latent width is the frame length divided by this
pub const LATENT_DIVISOR: usize = 4;

/// suffix appended to the data path for the paired model artifact
pub const MODEL_SUFFIX: &str = ".model";

/// suffix appended to the decode output prefix
pub const WAV_SUFFIX: &str = ".wav";

/// sample widths (bytes) the wave codec understands
pub const SUPPORTED_WIDTHS: [u8; 5] = [1, 2, 3, 4, 8];

// types

/// header parameters needed to rebuild a stream
///
/// Persisted in the container as `[channels, sample_count, sample_width, sample_rate]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub channels: u16,
    /// frames in the wave sense: one sample per channel
    pub sample_count: u64,
    pub sample_width: u8,
    pub sample_rate: u32,
}

impl StreamParams {
    /// total interleaved values across all channels
    ///
    /// Fails with `InvalidContainer` when the product does not fit in memory
    /// addressing, which only a corrupt header can produce.
    pub fn total_samples(&self) -> AwResult<usize> {
        usize::try_from(self.sample_count)
            .ok()
            .and_then(|n| n.checked_mul(self.channels as usize))
            .ok_or_else(|| {
                CodecError::InvalidContainer(format!(
                    "{} samples x {} channels overflows",
                    self.sample_count, self.channels
                ))
            })
    }

    /// duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_count as f64 / self.sample_rate as f64
    }

    /// the 4-integer tuple stored in the container
    pub fn to_array(self) -> [i64; 4] {
        [
            self.channels as i64,
            self.sample_count as i64,
            self.sample_width as i64,
            self.sample_rate as i64,
        ]
    }

    /// rebuild from the stored tuple, rejecting values that don't fit
    pub fn from_array(values: [i64; 4]) -> AwResult<Self> {
        let field = |name: &str, v: i64, max: i64| -> AwResult<i64> {
            if v < 0 || v > max {
                return Err(CodecError::InvalidContainer(format!(
                    "{} out of range: {}",
                    name, v
                )));
            }
            Ok(v)
        };

        Ok(StreamParams {
            channels: field("channels", values[0], u16::MAX as i64)? as u16,
            sample_count: field("sample count", values[1], i64::MAX)? as u64,
            sample_width: field("sample width", values[2], u8::MAX as i64)? as u8,
            sample_rate: field("sample rate", values[3], u32::MAX as i64)? as u32,
        })
    }
}

/// decoded PCM audio, channel-interleaved
///
/// Width 3 samples are held sign-extended from 24 bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleStream {
    pub channels: u16,
    pub sample_count: u64,
    pub sample_width: u8,
    pub sample_rate: u32,
    pub samples: Vec<i64>,
}

impl SampleStream {
    pub fn new(params: StreamParams, samples: Vec<i64>) -> Self {
        SampleStream {
            channels: params.channels,
            sample_count: params.sample_count,
            sample_width: params.sample_width,
            sample_rate: params.sample_rate,
            samples,
        }
    }

    pub fn params(&self) -> StreamParams {
        StreamParams {
            channels: self.channels,
            sample_count: self.sample_count,
            sample_width: self.sample_width,
            sample_rate: self.sample_rate,
        }
    }
}

/// check a width against [`SUPPORTED_WIDTHS`]
pub fn check_width(width: u16) -> AwResult<u8> {
    if width <= u8::MAX as u16 && SUPPORTED_WIDTHS.contains(&(width as u8)) {
        Ok(width as u8)
    } else {
        Err(CodecError::UnsupportedWidth(width))
    }
}
