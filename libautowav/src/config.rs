use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{AwResult, CodecError};
use crate::transform::TrainingConfig;

/// Share of the compute budget used when nothing else is configured
pub const DEFAULT_MEMORY_FRACTION: f32 = 0.7;

/// Encoding options
///
/// Everything has a default, so a JSON file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Training passes over the frame set
    pub epochs: usize,
    /// Frames per gradient step
    pub batch_size: usize,
    /// Adam step size
    pub learning_rate: f32,
    /// Fixed seed for reproducible models
    pub seed: Option<u64>,
    /// Process-wide resource cap (0.0-1.0], see [`crate::device`]
    pub memory_fraction: f32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        let training = TrainingConfig::default();
        Self {
            epochs: training.epochs,
            batch_size: training.batch_size,
            learning_rate: training.learning_rate,
            seed: training.seed,
            memory_fraction: DEFAULT_MEMORY_FRACTION,
        }
    }
}

impl CodecConfig {
    /// Load options from a JSON file
    pub fn from_json_file(path: &Path) -> AwResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: CodecConfig = serde_json::from_str(&text)
            .map_err(|e| CodecError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the number of training epochs
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the mini-batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Fix the seed for weight init and shuffling
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_memory_fraction(mut self, fraction: f32) -> Self {
        self.memory_fraction = fraction;
        self
    }

    /// Reject values training cannot run with
    pub fn validate(&self) -> AwResult<()> {
        if self.batch_size == 0 {
            return Err(CodecError::Config("batch_size must be positive".to_string()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(CodecError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.memory_fraction > 0.0 && self.memory_fraction <= 1.0) {
            return Err(CodecError::Config(format!(
                "memory_fraction must be in (0, 1], got {}",
                self.memory_fraction
            )));
        }
        Ok(())
    }

    /// Hyperparameters for the autoencoder
    pub fn training(&self) -> TrainingConfig {
        TrainingConfig {
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: CodecConfig = serde_json::from_str(r#"{"epochs": 3, "seed": 42}"#).unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.memory_fraction, DEFAULT_MEMORY_FRACTION);
    }

    #[test]
    fn test_validate() {
        assert!(CodecConfig::default().validate().is_ok());
        assert!(CodecConfig::default().with_batch_size(0).validate().is_err());
        assert!(CodecConfig::default().with_memory_fraction(1.5).validate().is_err());
        assert!(CodecConfig::default().with_learning_rate(0.0).validate().is_err());
    }
}
