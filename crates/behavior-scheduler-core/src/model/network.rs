//! Small dense feed-forward network with manual backpropagation.
//!
//! Layout is fixed by [`Network::priority`]: 3 → 8 (ReLU) → 4 (ReLU) → 1
//! (sigmoid). Weights are stored row-major, one row per output unit.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Probability clamp used by the cross-entropy loss.
const LOSS_EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-z).exp()),
        }
    }

    /// Derivative expressed through the pre-activation `z`.
    fn derivative(self, z: f64) -> f64 {
        match self {
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Sigmoid => {
                let s = self.apply(z);
                s * (1.0 - s)
            }
        }
    }
}

/// One fully connected layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dense {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl Dense {
    /// Glorot-uniform weights, zero bias.
    pub fn glorot<R: Rng + ?Sized>(
        inputs: usize,
        outputs: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (inputs + outputs) as f64).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();
        Self {
            inputs,
            outputs,
            weights,
            bias: vec![0.0; outputs],
            activation,
        }
    }

    fn pre_activation(&self, input: &[f64]) -> Vec<f64> {
        (0..self.outputs)
            .map(|j| {
                let row = &self.weights[j * self.inputs..(j + 1) * self.inputs];
                row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + self.bias[j]
            })
            .collect()
    }
}

/// Gradient (or optimizer moment) with the same shape as a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGrad {
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
}

impl LayerGrad {
    pub fn zeros_like(layer: &Dense) -> Self {
        Self {
            weights: vec![0.0; layer.weights.len()],
            bias: vec![0.0; layer.bias.len()],
        }
    }
}

/// Cached values from one forward pass, needed for backprop.
struct Trace {
    /// activations[0] is the input; activations[l + 1] is layer l's output.
    activations: Vec<Vec<f64>>,
    /// Pre-activations per layer.
    pre: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    layers: Vec<Dense>,
}

impl Network {
    /// The completion-likelihood architecture: 3 → 8 → 4 → 1.
    pub fn priority<R: Rng + ?Sized>(inputs: usize, rng: &mut R) -> Self {
        Self {
            layers: vec![
                Dense::glorot(inputs, 8, Activation::Relu, rng),
                Dense::glorot(8, 4, Activation::Relu, rng),
                Dense::glorot(4, 1, Activation::Sigmoid, rng),
            ],
        }
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map(|l| l.inputs).unwrap_or(0)
    }

    pub fn layers(&self) -> &[Dense] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Dense] {
        &mut self.layers
    }

    /// Output of the last layer's first unit.
    pub fn forward(&self, input: &[f64]) -> f64 {
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer
                .pre_activation(&current)
                .into_iter()
                .map(|z| layer.activation.apply(z))
                .collect();
        }
        current.first().copied().unwrap_or(0.0)
    }

    fn trace(&self, input: &[f64]) -> Trace {
        let mut activations = vec![input.to_vec()];
        let mut pre = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let z = layer.pre_activation(activations.last().map(Vec::as_slice).unwrap_or(&[]));
            let a = z.iter().map(|&v| layer.activation.apply(v)).collect();
            pre.push(z);
            activations.push(a);
        }
        Trace { activations, pre }
    }

    /// Mean binary cross-entropy over `(features, label)` pairs.
    pub fn loss(&self, examples: &[(Vec<f64>, f64)]) -> f64 {
        if examples.is_empty() {
            return 0.0;
        }
        let total: f64 = examples
            .iter()
            .map(|(x, y)| binary_cross_entropy(self.forward(x), *y))
            .sum();
        total / examples.len() as f64
    }

    /// Mean gradient of the cross-entropy loss over a batch, plus the batch loss.
    pub fn gradients(&self, batch: &[&(Vec<f64>, f64)]) -> (Vec<LayerGrad>, f64) {
        let mut grads: Vec<LayerGrad> = self.layers.iter().map(LayerGrad::zeros_like).collect();
        if batch.is_empty() {
            return (grads, 0.0);
        }
        let mut loss = 0.0;

        for (x, y) in batch.iter().map(|e| (&e.0, e.1)) {
            let trace = self.trace(x);
            let output = trace.activations.last().and_then(|a| a.first()).copied().unwrap_or(0.0);
            loss += binary_cross_entropy(output, y);

            // Sigmoid + cross-entropy: dL/dz = p - y.
            let mut delta: Vec<f64> = vec![output - y];

            for l in (0..self.layers.len()).rev() {
                let layer = &self.layers[l];
                let input = &trace.activations[l];
                let grad = &mut grads[l];
                for j in 0..layer.outputs {
                    grad.bias[j] += delta[j];
                    for i in 0..layer.inputs {
                        grad.weights[j * layer.inputs + i] += delta[j] * input[i];
                    }
                }
                if l == 0 {
                    break;
                }
                let below = &self.layers[l - 1];
                delta = (0..layer.inputs)
                    .map(|i| {
                        let upstream: f64 = (0..layer.outputs)
                            .map(|j| layer.weights[j * layer.inputs + i] * delta[j])
                            .sum();
                        upstream * below.activation.derivative(trace.pre[l - 1][i])
                    })
                    .collect();
            }
        }

        let n = batch.len() as f64;
        for grad in &mut grads {
            grad.weights.iter_mut().for_each(|g| *g /= n);
            grad.bias.iter_mut().for_each(|g| *g /= n);
        }
        (grads, loss / n)
    }
}

fn binary_cross_entropy(p: f64, y: f64) -> f64 {
    let p = p.clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}
