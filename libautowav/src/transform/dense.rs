//! Fully connected layer and its Adam optimizer state

use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// layer non-linearity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    /// bounded to (0, 1), used on the reconstruction layer
    Sigmoid,
}

impl Activation {
    fn apply(self, z: &mut Array2<f32>) {
        match self {
            Activation::Relu => z.mapv_inplace(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp())),
        }
    }

    /// derivative expressed through the activation output
    fn derivative(self, output: &Array2<f32>) -> Array2<f32> {
        match self {
            Activation::Relu => output.mapv(|a| if a > 0.0 { 1.0 } else { 0.0 }),
            Activation::Sigmoid => output.mapv(|a| a * (1.0 - a)),
        }
    }
}

/// dense layer, `output = activation(input · weights + bias)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    /// shape (inputs, outputs)
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    pub activation: Activation,
}

/// gradients of one backward pass
#[derive(Debug, Clone)]
pub struct Gradients {
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    /// gradient w.r.t. the layer input, fed to the previous layer
    pub input: Array2<f32>,
}

impl Dense {
    /// Glorot-uniform weights, zero bias
    pub fn glorot<R: Rng>(inputs: usize, outputs: usize, activation: Activation, rng: &mut R) -> Self {
        let limit = (6.0 / (inputs + outputs) as f32).sqrt();
        let weights = Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(-limit..=limit));

        Dense {
            weights,
            bias: Array1::zeros(outputs),
            activation,
        }
    }

    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn outputs(&self) -> usize {
        self.weights.ncols()
    }

    /// one row per example
    pub fn forward(&self, input: ArrayView2<f32>) -> Array2<f32> {
        let mut z = input.dot(&self.weights) + &self.bias;
        self.activation.apply(&mut z);
        z
    }

    /// Backpropagate `grad_output` (dLoss/dOutput) through this layer.
    ///
    /// `input` and `output` must be the values of the matching forward pass.
    pub fn backward(
        &self,
        input: ArrayView2<f32>,
        output: &Array2<f32>,
        grad_output: &Array2<f32>,
    ) -> Gradients {
        let delta = grad_output * &self.activation.derivative(output);

        Gradients {
            weights: input.t().dot(&delta),
            bias: delta.sum_axis(Axis(0)),
            input: delta.dot(&self.weights.t()),
        }
    }
}

/// Adam moments for one layer
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    m_weights: Array2<f32>,
    v_weights: Array2<f32>,
    m_bias: Array1<f32>,
    v_bias: Array1<f32>,
}

impl Adam {
    pub fn new(layer: &Dense, learning_rate: f32) -> Self {
        Self::with_config(layer, learning_rate, 0.9, 0.999, 1e-7)
    }

    pub fn with_config(layer: &Dense, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m_weights: Array2::zeros(layer.weights.raw_dim()),
            v_weights: Array2::zeros(layer.weights.raw_dim()),
            m_bias: Array1::zeros(layer.bias.raw_dim()),
            v_bias: Array1::zeros(layer.bias.raw_dim()),
        }
    }

    /// apply one update to `layer`
    pub fn step(&mut self, layer: &mut Dense, grads: &Gradients) {
        self.t += 1;

        // bias correction folded into the step size
        let lr_t = self.learning_rate * (1.0 - self.beta2.powi(self.t)).sqrt()
            / (1.0 - self.beta1.powi(self.t));
        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);

        let update = |p: &mut f32, m: &mut f32, v: &mut f32, g: &f32| {
            *m = b1 * *m + (1.0 - b1) * g;
            *v = b2 * *v + (1.0 - b2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + eps);
        };

        Zip::from(&mut layer.weights)
            .and(&mut self.m_weights)
            .and(&mut self.v_weights)
            .and(&grads.weights)
            .for_each(update);
        Zip::from(&mut layer.bias)
            .and(&mut self.m_bias)
            .and(&mut self.v_bias)
            .and(&grads.bias)
            .for_each(update);
    }
}
