//! Adam optimizer.
//!
//! State lives only for the duration of one training run; every retrain
//! starts from fresh moments.

use super::network::{LayerGrad, Network};

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    first_moment: Vec<LayerGrad>,
    second_moment: Vec<LayerGrad>,
}

impl Adam {
    pub fn new(network: &Network, learning_rate: f64) -> Self {
        let zeros = || -> Vec<LayerGrad> {
            network.layers().iter().map(LayerGrad::zeros_like).collect()
        };
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            step: 0,
            first_moment: zeros(),
            second_moment: zeros(),
        }
    }

    /// Apply one bias-corrected update.
    pub fn apply(&mut self, network: &mut Network, grads: &[LayerGrad]) {
        self.step += 1;
        let correction1 = 1.0 - self.beta1.powi(self.step);
        let correction2 = 1.0 - self.beta2.powi(self.step);

        for (l, layer) in network.layers_mut().iter_mut().enumerate() {
            let (m, v, g) = (&mut self.first_moment[l], &mut self.second_moment[l], &grads[l]);
            update(
                &mut layer.weights,
                &mut m.weights,
                &mut v.weights,
                &g.weights,
                self.learning_rate,
                (self.beta1, self.beta2, self.epsilon),
                (correction1, correction2),
            );
            update(
                &mut layer.bias,
                &mut m.bias,
                &mut v.bias,
                &g.bias,
                self.learning_rate,
                (self.beta1, self.beta2, self.epsilon),
                (correction1, correction2),
            );
        }
    }
}

fn update(
    params: &mut [f64],
    m: &mut [f64],
    v: &mut [f64],
    g: &[f64],
    lr: f64,
    (beta1, beta2, epsilon): (f64, f64, f64),
    (correction1, correction2): (f64, f64),
) {
    for i in 0..params.len() {
        m[i] = beta1 * m[i] + (1.0 - beta1) * g[i];
        v[i] = beta2 * v[i] + (1.0 - beta2) * g[i] * g[i];
        let m_hat = m[i] / correction1;
        let v_hat = v[i] / correction2;
        params[i] -= lr * m_hat / (v_hat.sqrt() + epsilon);
    }
}
