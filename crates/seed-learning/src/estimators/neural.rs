//! Small feed-forward network regressor.
//!
//! Architecture: input → hidden (ReLU, dropout) → hidden (ReLU, dropout) →
//! linear output. Trained with Adam on mean squared error over shuffled
//! minibatches. Inputs and target are standardised with statistics from the
//! fit data.

use super::{Regressor, check_fit_input, check_predict_input};
use crate::error::{LearningError, Result};
use crate::params::ParamSet;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub(crate) const PARAMS: &[&str] = &["batch_size", "epochs", "hidden_dim", "lr"];

const DROPOUT: f64 = 0.2;
const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;
/// The family takes no seed; a fixed one keeps training reproducible.
const INIT_SEED: u64 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralNetRegressor {
    pub hidden_dim: usize,
    pub lr: f64,
    pub epochs: usize,
    pub batch_size: usize,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    x_mean: Array1<f64>,
    x_scale: Array1<f64>,
    y_mean: f64,
    y_scale: f64,
}

impl Default for NeuralNetRegressor {
    fn default() -> Self {
        Self {
            hidden_dim: 64,
            lr: 0.001,
            epochs: 20,
            batch_size: 32,
            weights: Vec::new(),
            biases: Vec::new(),
            x_mean: Array1::zeros(0),
            x_scale: Array1::zeros(0),
            y_mean: 0.0,
            y_scale: 1.0,
        }
    }
}

/// First and second moment estimates for every parameter tensor.
struct Adam {
    m_w: Vec<Array2<f64>>,
    v_w: Vec<Array2<f64>>,
    m_b: Vec<Array1<f64>>,
    v_b: Vec<Array1<f64>>,
    step: i32,
}

impl Adam {
    fn new(weights: &[Array2<f64>], biases: &[Array1<f64>]) -> Self {
        Self {
            m_w: weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect(),
            v_w: weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect(),
            m_b: biases.iter().map(|b| Array1::zeros(b.len())).collect(),
            v_b: biases.iter().map(|b| Array1::zeros(b.len())).collect(),
            step: 0,
        }
    }

    fn update(
        &mut self,
        lr: f64,
        weights: &mut [Array2<f64>],
        biases: &mut [Array1<f64>],
        grads: Vec<(Array2<f64>, Array1<f64>)>,
    ) {
        self.step += 1;
        let c1 = 1.0 - BETA1.powi(self.step);
        let c2 = 1.0 - BETA2.powi(self.step);

        for (layer, (gw, gb)) in grads.into_iter().enumerate() {
            self.m_w[layer] = &self.m_w[layer] * BETA1 + &gw * (1.0 - BETA1);
            self.v_w[layer] = &self.v_w[layer] * BETA2 + &gw.mapv(|g| g * g) * (1.0 - BETA2);
            self.m_b[layer] = &self.m_b[layer] * BETA1 + &gb * (1.0 - BETA1);
            self.v_b[layer] = &self.v_b[layer] * BETA2 + &gb.mapv(|g| g * g) * (1.0 - BETA2);

            ndarray::Zip::from(&mut weights[layer])
                .and(&self.m_w[layer])
                .and(&self.v_w[layer])
                .for_each(|p, &m, &v| *p -= lr * (m / c1) / ((v / c2).sqrt() + EPSILON));
            ndarray::Zip::from(&mut biases[layer])
                .and(&self.m_b[layer])
                .and(&self.v_b[layer])
                .for_each(|p, &m, &v| *p -= lr * (m / c1) / ((v / c2).sqrt() + EPSILON));
        }
    }
}

impl NeuralNetRegressor {
    pub fn from_params(params: &ParamSet) -> Result<Self> {
        params.ensure_known("SimpleNNRegressor", PARAMS)?;
        let mut net = Self::default();
        if let Some(dim) = params.usize_param("hidden_dim")? {
            net.hidden_dim = dim;
        }
        if let Some(lr) = params.f64_param("lr")? {
            net.lr = lr;
        }
        if let Some(epochs) = params.usize_param("epochs")? {
            net.epochs = epochs;
        }
        if let Some(size) = params.usize_param("batch_size")? {
            net.batch_size = size;
        }

        if net.hidden_dim == 0 || net.batch_size == 0 || net.epochs == 0 {
            return Err(LearningError::InvalidConfig(
                "hidden_dim, epochs and batch_size must be at least 1".to_string(),
            ));
        }
        if !(net.lr > 0.0 && net.lr.is_finite()) {
            return Err(LearningError::InvalidConfig("lr must be positive".to_string()));
        }
        Ok(net)
    }

    pub fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("hidden_dim", self.hidden_dim as i64)
            .with("lr", self.lr)
            .with("epochs", self.epochs as i64)
            .with("batch_size", self.batch_size as i64)
    }

    fn init_layers(&mut self, n_inputs: usize, rng: &mut ChaCha8Rng) {
        let sizes = [n_inputs, self.hidden_dim, self.hidden_dim, 1];
        self.weights.clear();
        self.biases.clear();
        for pair in sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            // Xavier/Glorot uniform
            let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
            self.weights
                .push(Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-limit..limit)));
            self.biases.push(Array1::zeros(fan_out));
        }
    }

    fn standardize(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.x_mean.view().insert_axis(Axis(0))) / &self.x_scale.view().insert_axis(Axis(0))
    }

    /// One minibatch step. `xb` is already standardised, `yb` scaled.
    fn gradients(
        &self,
        xb: &Array2<f64>,
        yb: &Array1<f64>,
        rng: &mut ChaCha8Rng,
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let keep = 1.0 - DROPOUT;
        let mut mask = |shape: (usize, usize)| {
            Array2::from_shape_fn(shape, |_| if rng.r#gen::<f64>() < keep { 1.0 / keep } else { 0.0 })
        };

        let z1 = xb.dot(&self.weights[0]) + &self.biases[0];
        let m1 = mask(z1.dim());
        let h1 = z1.mapv(relu) * &m1;

        let z2 = h1.dot(&self.weights[1]) + &self.biases[1];
        let m2 = mask(z2.dim());
        let h2 = z2.mapv(relu) * &m2;

        let out = h2.dot(&self.weights[2]) + &self.biases[2];
        let n = yb.len() as f64;
        let g_out = (&out - &yb.view().insert_axis(Axis(1))) * (2.0 / n);

        let g_w3 = h2.t().dot(&g_out);
        let g_b3 = g_out.sum_axis(Axis(0));

        let g_z2 = g_out.dot(&self.weights[2].t()) * &m2 * &z2.mapv(relu_grad);
        let g_w2 = h1.t().dot(&g_z2);
        let g_b2 = g_z2.sum_axis(Axis(0));

        let g_z1 = g_z2.dot(&self.weights[1].t()) * &m1 * &z1.mapv(relu_grad);
        let g_w1 = xb.t().dot(&g_z1);
        let g_b1 = g_z1.sum_axis(Axis(0));

        vec![(g_w1, g_b1), (g_w2, g_b2), (g_w3, g_b3)]
    }

    fn forward(&self, xs: &Array2<f64>) -> Array1<f64> {
        let h1 = (xs.dot(&self.weights[0]) + &self.biases[0]).mapv(relu);
        let h2 = (h1.dot(&self.weights[1]) + &self.biases[1]).mapv(relu);
        let out = h2.dot(&self.weights[2]) + &self.biases[2];
        out.column(0).to_owned()
    }
}

fn relu(v: f64) -> f64 {
    v.max(0.0)
}

fn relu_grad(v: f64) -> f64 {
    if v > 0.0 { 1.0 } else { 0.0 }
}

fn scale_of(std: f64) -> f64 {
    if std > 1e-12 && std.is_finite() { std } else { 1.0 }
}

impl Regressor for NeuralNetRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_input(x, y)?;
        let n = x.nrows();

        self.x_mean = x.sum_axis(Axis(0)) / n as f64;
        self.x_scale = x.std_axis(Axis(0), 0.0).mapv(scale_of);
        self.y_mean = y.sum() / n as f64;
        self.y_scale = scale_of(y.std(0.0));

        let mut rng = ChaCha8Rng::seed_from_u64(INIT_SEED);
        self.init_layers(x.ncols(), &mut rng);
        let mut adam = Adam::new(&self.weights, &self.biases);

        let xs = self.standardize(x);
        let ys = y.mapv(|v| (v - self.y_mean) / self.y_scale);
        let mut order: Vec<usize> = (0..n).collect();

        for _ in 0..self.epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(self.batch_size) {
                let xb = xs.select(Axis(0), batch);
                let yb = ys.select(Axis(0), batch);
                let grads = self.gradients(&xb, &yb, &mut rng);
                adam.update(self.lr, &mut self.weights, &mut self.biases, grads);
            }
        }

        if self.weights.iter().any(|w| w.iter().any(|v| !v.is_finite())) {
            return Err(LearningError::TrainingFailed(
                "network weights diverged".to_string(),
            ));
        }
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.weights.is_empty() {
            return Err(LearningError::InferenceError(
                "neural network is not fitted".to_string(),
            ));
        }
        check_predict_input(x, self.x_mean.len())?;
        let out = self.forward(&self.standardize(x));
        Ok(out.mapv(|v| v * self.y_scale + self.y_mean))
    }
}
