//! Dense autoencoder over normalized frames
//!
//! Layer widths for frame length `L`:
//!
//! | Part    | Layer | Width | Activation |
//! |---------|-------|-------|------------|
//! | encoder | 1     | L     | relu       |
//! | encoder | 2     | L/2   | relu       |
//! | encoder | 3     | L/4   | relu       |
//! | decoder | 4     | L/2   | relu       |
//! | decoder | 5     | L     | sigmoid    |
//!
//! Layer 3's output is the latent vector. Only layers 4-5 are persisted.

use ndarray::{s, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::dense::{Activation, Adam, Dense};
use super::{check_columns, FrameDecoder, FrameTransform};
use crate::core::{AwResult, CodecError, FRAMES_PER_SECOND, LATENT_DIVISOR};

/// rows per parallel inference chunk
const PREDICT_CHUNK_ROWS: usize = 256;

/// number of encoder layers; the rest decode
const ENCODER_LAYERS: usize = 3;

/// training hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// passes over the whole frame set
    pub epochs: usize,
    /// frames per gradient step
    pub batch_size: usize,
    pub learning_rate: f32,
    /// fixed seed for weight init and shuffling
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            batch_size: 32,
            learning_rate: 0.001,
            seed: None,
        }
    }
}

/// trainable autoencoder
pub struct Autoencoder {
    config: TrainingConfig,
    /// encoder layers followed by decoder layers, empty until fit
    layers: Vec<Dense>,
    frame_length: usize,
    last_loss: Option<f32>,
}

/// persisted decoder half
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoencoderDecoder {
    frame_length: usize,
    latent_width: usize,
    layers: Vec<Dense>,
}

impl Autoencoder {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            layers: Vec::new(),
            frame_length: 0,
            last_loss: None,
        }
    }

    /// mean squared error of the final epoch
    pub fn last_loss(&self) -> Option<f32> {
        self.last_loss
    }

    pub fn is_trained(&self) -> bool {
        !self.layers.is_empty()
    }

    fn build(frame_length: usize, rng: &mut StdRng) -> Vec<Dense> {
        let half = frame_length / 2;
        let latent = frame_length / LATENT_DIVISOR;

        vec![
            Dense::glorot(frame_length, frame_length, Activation::Relu, rng),
            Dense::glorot(frame_length, half, Activation::Relu, rng),
            Dense::glorot(half, latent, Activation::Relu, rng),
            Dense::glorot(latent, half, Activation::Relu, rng),
            Dense::glorot(half, frame_length, Activation::Sigmoid, rng),
        ]
    }
}

impl FrameTransform for Autoencoder {
    type Decoder = AutoencoderDecoder;

    fn fit(&mut self, frames: &Array2<f32>, frame_length: usize) -> AwResult<()> {
        check_columns("frame width", frame_length, frames)?;
        if frame_length / LATENT_DIVISOR == 0 {
            return Err(CodecError::DegenerateFrame {
                sample_rate: frame_length as u32 * FRAMES_PER_SECOND,
                frame_length,
            });
        }
        if frames.nrows() == 0 {
            return Err(CodecError::ShapeMismatch {
                what: "training frames",
                expected: 1,
                found: 0,
            });
        }
        if self.config.batch_size == 0 {
            return Err(CodecError::Config("batch size must be positive".to_string()));
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut layers = Self::build(frame_length, &mut rng);
        let mut optimizers: Vec<Adam> = layers
            .iter()
            .map(|l| Adam::new(l, self.config.learning_rate))
            .collect();

        let n = frames.nrows();
        let mut order: Vec<usize> = (0..n).collect();
        let mut epoch_loss = 0.0f32;

        debug!(
            frames = n,
            frame_length,
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            "training autoencoder"
        );

        for epoch in 0..self.config.epochs {
            order.shuffle(&mut rng);

            let mut total = 0.0f64;
            for batch_rows in order.chunks(self.config.batch_size) {
                let batch = frames.select(Axis(0), batch_rows);
                let loss = train_step(&mut layers, &mut optimizers, &batch);
                total += loss as f64 * batch_rows.len() as f64;
            }

            epoch_loss = (total / n as f64) as f32;
            debug!(epoch = epoch + 1, loss = epoch_loss, "epoch finished");
        }

        info!(frames = n, loss = epoch_loss, "autoencoder trained");

        self.layers = layers;
        self.frame_length = frame_length;
        self.last_loss = (self.config.epochs > 0).then_some(epoch_loss);
        Ok(())
    }

    fn encode(&self, frames: &Array2<f32>) -> AwResult<Array2<f32>> {
        if !self.is_trained() {
            return Err(CodecError::Untrained);
        }
        check_columns("frame width", self.frame_length, frames)?;
        Ok(predict(&self.layers[..ENCODER_LAYERS], frames.view()))
    }

    fn decoder(&self) -> AwResult<AutoencoderDecoder> {
        if !self.is_trained() {
            return Err(CodecError::Untrained);
        }
        Ok(AutoencoderDecoder {
            frame_length: self.frame_length,
            latent_width: self.frame_length / LATENT_DIVISOR,
            layers: self.layers[ENCODER_LAYERS..].to_vec(),
        })
    }
}

impl FrameDecoder for AutoencoderDecoder {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn latent_width(&self) -> usize {
        self.latent_width
    }

    fn decode(&self, latents: &Array2<f32>) -> AwResult<Array2<f32>> {
        check_columns("latent width", self.latent_width, latents)?;
        Ok(predict(&self.layers, latents.view()))
    }

    fn validate(&self) -> AwResult<()> {
        let first = self
            .layers
            .first()
            .ok_or_else(|| CodecError::InvalidContainer("model has no layers".to_string()))?;
        let last = &self.layers[self.layers.len() - 1];

        if first.inputs() != self.latent_width || last.outputs() != self.frame_length {
            return Err(CodecError::InvalidContainer(format!(
                "model layers map {} -> {}, header says {} -> {}",
                first.inputs(),
                last.outputs(),
                self.latent_width,
                self.frame_length
            )));
        }
        for pair in self.layers.windows(2) {
            if pair[0].outputs() != pair[1].inputs() {
                return Err(CodecError::InvalidContainer(
                    "model layers do not chain".to_string(),
                ));
            }
        }
        for layer in &self.layers {
            if layer.bias.len() != layer.outputs() {
                return Err(CodecError::InvalidContainer(
                    "bias does not match layer width".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// One Adam step on a batch; returns the batch's mean squared error.
fn train_step(layers: &mut [Dense], optimizers: &mut [Adam], batch: &Array2<f32>) -> f32 {
    // activations[i] is the input of layer i, the last one is the reconstruction
    let mut activations = Vec::with_capacity(layers.len() + 1);
    activations.push(batch.clone());
    for layer in layers.iter() {
        let next = layer.forward(activations[activations.len() - 1].view());
        activations.push(next);
    }

    let output = &activations[layers.len()];
    let error = output - batch;
    let count = error.len() as f32;
    let loss = error.mapv(|e| e * e).sum() / count;

    // d(mean(e^2))/dy
    let mut grad = error.mapv(|e| 2.0 * e / count);

    for i in (0..layers.len()).rev() {
        let grads = layers[i].backward(activations[i].view(), &activations[i + 1], &grad);
        optimizers[i].step(&mut layers[i], &grads);
        grad = grads.input;
    }

    loss
}

/// Forward pass through `layers`, rows evaluated in parallel chunks
fn predict(layers: &[Dense], input: ArrayView2<f32>) -> Array2<f32> {
    let rows = input.nrows();
    let width = layers.last().map_or(input.ncols(), Dense::outputs);

    let ranges: Vec<(usize, usize)> = (0..rows)
        .step_by(PREDICT_CHUNK_ROWS)
        .map(|start| (start, (start + PREDICT_CHUNK_ROWS).min(rows)))
        .collect();

    let parts: Vec<Array2<f32>> = ranges
        .par_iter()
        .map(|&(start, end)| {
            let chunk = input.slice(s![start..end, ..]).to_owned();
            layers
                .iter()
                .fold(chunk, |x, layer| layer.forward(x.view()))
        })
        .collect();

    let mut output = Array2::zeros((rows, width));
    for (&(start, end), part) in ranges.iter().zip(&parts) {
        output.slice_mut(s![start..end, ..]).assign(part);
    }
    output
}
