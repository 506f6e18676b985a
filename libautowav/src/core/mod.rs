pub mod audio_constants;
pub mod error;
pub mod types;

pub use audio_constants::*;
pub use error::{AwResult, CodecError};
pub use types::*;
