//! error types for the autowav codec

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Unsupported sample width: {0} bytes")]
    UnsupportedWidth(u16),

    #[error("Degenerate frame: sample rate {sample_rate} Hz gives {frame_length} samples per frame")]
    DegenerateFrame { sample_rate: u32, frame_length: usize },

    #[error("Missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Shape mismatch: expected {expected} {what}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Model artifact does not belong to this container")]
    PairingMismatch,

    #[error("Invalid wave file: {0}")]
    InvalidWave(String),

    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    #[error("Transform has not been trained")]
    Untrained,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// result type for autowav stuff
pub type AwResult<T> = Result<T, CodecError>;
