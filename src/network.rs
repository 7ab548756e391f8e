//! Two-layer fully-connected classifier with hand-derived gradients,
//! minibatch SGD training, and persistence.
//!
//! Architecture: input - fully connected - ReLU - (inverted dropout) -
//! fully connected - softmax. Gradients for every parameter are computed
//! in closed form; no autodiff.
use crate::loss::{cross_entropy, l2_penalty, softmax_rows};
use crate::matrix::{affine, col_sum, matmul_a_bt, matmul_at_b, zeros, Matrix};
use crate::metrics::accuracy;
use anyhow::{anyhow, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};

/// Default standard deviation for Gaussian weight initialization.
pub const DEFAULT_INIT_SCALE: f64 = 1e-4;

/// The full trainable state: two weight matrices and two bias vectors.
///
/// Shapes are fixed at construction: `w1` is (D x H), `b1` has length H,
/// `w2` is (H x C), `b2` has length C.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSet {
    pub w1: Matrix,
    pub b1: Vec<f64>,
    pub w2: Matrix,
    pub b2: Vec<f64>,
}

/// One gradient entry per parameter entry, same shapes as [`ParameterSet`].
#[derive(Debug, Clone)]
pub struct GradientSet {
    pub w1: Matrix,
    pub b1: Vec<f64>,
    pub w2: Matrix,
    pub b2: Vec<f64>,
}

/// Hyperparameters for `step` and `train`.
///
/// `dropout` is a keep probability: 1.0 disables dropout entirely.
#[derive(Debug, Clone)]
pub struct SgdConfig {
    pub learning_rate: f64,
    pub learning_rate_decay: f64,
    pub reg: f64,
    pub num_iters: usize,
    pub batch_size: usize,
    pub momentum: f64,
    pub dropout: f64,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            learning_rate_decay: 0.95,
            reg: 1e-5,
            num_iters: 100,
            batch_size: 200,
            momentum: 0.0,
            dropout: 1.0,
        }
    }
}

/// Per-iteration and per-epoch training curves collected by [`TwoLayerNet::train`].
#[derive(Debug, Clone, Default)]
pub struct TrainingStats {
    pub loss_history: Vec<f64>,
    pub train_acc_history: Vec<f64>,
    pub val_acc_history: Vec<f64>,
}

/// Two-layer network engine.
///
/// Owns its [`ParameterSet`] and the previous combined gradient used by the
/// momentum update. Not re-entrant: callers must serialize `step` calls.
#[derive(Debug)]
pub struct TwoLayerNet {
    params: ParameterSet,
    last_grads: Option<GradientSet>,
    input_size: usize,
    hidden_size: usize,
    num_classes: usize,
}

impl TwoLayerNet {
    /// Create a network with Gaussian-initialized weights (scale
    /// [`DEFAULT_INIT_SCALE`]) and zero biases.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        num_classes: usize,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        Self::with_init_scale(input_size, hidden_size, num_classes, DEFAULT_INIT_SCALE, rng)
    }

    /// Create a network with an explicit weight initialization scale.
    pub fn with_init_scale(
        input_size: usize,
        hidden_size: usize,
        num_classes: usize,
        init_scale: f64,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        if input_size == 0 || hidden_size == 0 || num_classes == 0 {
            return Err(anyhow!("All layer sizes must be positive"));
        }
        if init_scale <= 0.0 {
            return Err(anyhow!("init_scale must be positive, got {}", init_scale));
        }
        fn gaussian(rows: usize, cols: usize, scale: f64, rng: &mut impl Rng) -> Matrix {
            (0..rows)
                .map(|_| {
                    (0..cols)
                        .map(|_| scale * rng.sample::<f64, _>(StandardNormal))
                        .collect()
                })
                .collect()
        }
        let params = ParameterSet {
            w1: gaussian(input_size, hidden_size, init_scale, rng),
            b1: vec![0.0; hidden_size],
            w2: gaussian(hidden_size, num_classes, init_scale, rng),
            b2: vec![0.0; num_classes],
        };
        Ok(Self {
            params,
            last_grads: None,
            input_size,
            hidden_size,
            num_classes,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Read access to the trainable state, e.g. for checkpoint snapshots.
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Replace the trainable state wholesale. Shapes must match the sizes
    /// fixed at construction. Clears any accumulated momentum state.
    pub fn set_params(&mut self, params: ParameterSet) -> Result<()> {
        let ok = params.w1.len() == self.input_size
            && params.w1.iter().all(|row| row.len() == self.hidden_size)
            && params.b1.len() == self.hidden_size
            && params.w2.len() == self.hidden_size
            && params.w2.iter().all(|row| row.len() == self.num_classes)
            && params.b2.len() == self.num_classes;
        if !ok {
            return Err(anyhow!("Parameter shapes do not match network sizes"));
        }
        self.params = params;
        self.last_grads = None;
        Ok(())
    }

    fn check_batch(&self, x: &Matrix) -> Result<()> {
        if x.is_empty() {
            return Err(anyhow!("Empty batch: at least one example required"));
        }
        if let Some(row) = x.iter().find(|row| row.len() != self.input_size) {
            return Err(anyhow!(
                "Input width mismatch: expected {}, got {}",
                self.input_size,
                row.len()
            ));
        }
        Ok(())
    }

    fn check_labels(&self, x: &Matrix, y: &[usize]) -> Result<()> {
        if y.len() != x.len() {
            return Err(anyhow!(
                "Label count mismatch: {} examples but {} labels",
                x.len(),
                y.len()
            ));
        }
        if let Some(&bad) = y.iter().find(|&&label| label >= self.num_classes) {
            return Err(anyhow!(
                "Label {} out of range for {} classes",
                bad,
                self.num_classes
            ));
        }
        Ok(())
    }

    /// Inference-mode forward pass: class scores of shape (N, C).
    ///
    /// Dropout is never applied here, regardless of how the network was
    /// trained.
    pub fn scores(&self, x: &Matrix) -> Result<Matrix> {
        self.check_batch(x)?;
        let z1 = affine(x, &self.params.w1, &self.params.b1);
        let h1: Matrix = z1
            .iter()
            .map(|row| row.iter().map(|&v| v.max(0.0)).collect())
            .collect();
        Ok(affine(&h1, &self.params.w2, &self.params.b2))
    }

    /// Training-mode forward/loss/backward pass.
    ///
    /// Computes scores, softmax cross-entropy data loss plus
    /// `0.5 * reg * (Σ w1² + Σ w2²)`, batch accuracy on the pre-softmax
    /// scores, and closed-form gradients for all four parameters.
    ///
    /// `dropout` is the keep probability for inverted dropout on the hidden
    /// activations: each unit is retained with probability `dropout` and
    /// rescaled by `1/dropout`, so the expected activation is unchanged.
    /// Gradients flow only through retained, rescaled units.
    ///
    /// Does not mutate the network; `rng` is drawn from only when
    /// `dropout < 1`.
    pub fn loss(
        &self,
        x: &Matrix,
        y: &[usize],
        reg: f64,
        dropout: f64,
        rng: &mut impl Rng,
    ) -> Result<(f64, f64, GradientSet)> {
        self.check_batch(x)?;
        self.check_labels(x, y)?;
        if reg < 0.0 {
            return Err(anyhow!("reg must be non-negative, got {}", reg));
        }
        if dropout <= 0.0 || dropout > 1.0 {
            return Err(anyhow!("dropout must be in (0, 1], got {}", dropout));
        }
        let n = x.len();
        let w1 = &self.params.w1;
        let w2 = &self.params.w2;

        // Forward: affine, ReLU, optional inverted dropout, affine.
        let z1 = affine(x, w1, &self.params.b1);
        let mut h1: Matrix = z1
            .iter()
            .map(|row| row.iter().map(|&v| v.max(0.0)).collect())
            .collect();
        let mask = if dropout < 1.0 {
            let mask: Matrix = h1
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|_| if rng.gen::<f64>() < dropout { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect();
            for (h_row, m_row) in h1.iter_mut().zip(&mask) {
                for (h, &m) in h_row.iter_mut().zip(m_row) {
                    *h *= m / dropout;
                }
            }
            Some(mask)
        } else {
            None
        };
        let scores = affine(&h1, w2, &self.params.b2);

        // Loss and accuracy on the raw scores.
        let softmax = softmax_rows(&scores);
        let loss = cross_entropy(&softmax, y) + l2_penalty(w1, reg) + l2_penalty(w2, reg);
        let predicted: Vec<usize> = scores.iter().map(|row| argmax(row)).collect();
        let acc = accuracy(&predicted, y);

        // Backward: dZ2[i][c] = (softmax[i][c] - 1{c == y[i]}) / N.
        let mut dz2 = softmax;
        for (row, &label) in dz2.iter_mut().zip(y) {
            row[label] -= 1.0;
            for v in row.iter_mut() {
                *v /= n as f64;
            }
        }

        let mut grad_w2 = matmul_at_b(&h1, &dz2);
        for (g_row, w_row) in grad_w2.iter_mut().zip(w2) {
            for (g, &w) in g_row.iter_mut().zip(w_row) {
                *g += reg * w;
            }
        }
        let grad_b2 = col_sum(&dz2);

        // ReLU gate, with the dropout mask and 1/dropout rescale folded in
        // so the gradient matches the forward computation exactly.
        let dh1 = matmul_a_bt(&dz2, w2);
        let mut dz1 = zeros(n, self.hidden_size);
        for i in 0..n {
            for j in 0..self.hidden_size {
                if z1[i][j] > 0.0 {
                    let gate = match &mask {
                        Some(m) => m[i][j] / dropout,
                        None => 1.0,
                    };
                    dz1[i][j] = dh1[i][j] * gate;
                }
            }
        }

        let mut grad_w1 = matmul_at_b(x, &dz1);
        for (g_row, w_row) in grad_w1.iter_mut().zip(w1) {
            for (g, &w) in g_row.iter_mut().zip(w_row) {
                *g += reg * w;
            }
        }
        let grad_b1 = col_sum(&dz1);

        Ok((
            loss,
            acc,
            GradientSet {
                w1: grad_w1,
                b1: grad_b1,
                w2: grad_w2,
                b2: grad_b2,
            },
        ))
    }

    /// One minibatch SGD step over the full training set `(x, y)`.
    ///
    /// Samples `cfg.batch_size` examples uniformly with replacement, computes
    /// loss and gradients on the minibatch, and updates every parameter.
    ///
    /// With `cfg.momentum > 0`, the previous step's combined gradient is
    /// added, scaled by the momentum coefficient, into the current gradient
    /// before the update, and the combined gradient is stored for the next
    /// step. This is a one-step-back additive scheme, not an
    /// exponentially-decayed velocity; changing it would change convergence
    /// behavior.
    ///
    /// Returns the minibatch `(loss, accuracy)`.
    pub fn step(
        &mut self,
        x: &Matrix,
        y: &[usize],
        cfg: &SgdConfig,
        rng: &mut impl Rng,
    ) -> Result<(f64, f64)> {
        self.check_batch(x)?;
        self.check_labels(x, y)?;
        if cfg.learning_rate <= 0.0 {
            return Err(anyhow!(
                "learning_rate must be positive, got {}",
                cfg.learning_rate
            ));
        }
        if !(0.0..1.0).contains(&cfg.momentum) {
            return Err(anyhow!("momentum must be in [0, 1), got {}", cfg.momentum));
        }
        let n = x.len();
        if cfg.batch_size == 0 || cfg.batch_size > n {
            return Err(anyhow!(
                "batch_size must be in 1..={}, got {}",
                n,
                cfg.batch_size
            ));
        }

        let mut x_batch = Vec::with_capacity(cfg.batch_size);
        let mut y_batch = Vec::with_capacity(cfg.batch_size);
        for _ in 0..cfg.batch_size {
            let idx = rng.gen_range(0..n);
            x_batch.push(x[idx].clone());
            y_batch.push(y[idx]);
        }

        let (loss, acc, mut grads) =
            self.loss(&x_batch, &y_batch, cfg.reg, cfg.dropout, rng)?;

        if cfg.momentum > 0.0 {
            if let Some(prev) = &self.last_grads {
                grads.add_scaled(prev, cfg.momentum);
            }
            self.last_grads = Some(grads.clone());
        }
        self.params.apply_step(&grads, cfg.learning_rate);

        Ok((loss, acc))
    }

    /// Arg-max class per example. Dropout is never applied.
    pub fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        let scores = self.scores(x)?;
        Ok(scores.iter().map(|row| argmax(row)).collect())
    }

    /// Full training loop: `cfg.num_iters` minibatch steps, with validation
    /// accuracy measured and the learning rate decayed once per epoch
    /// (`max(N / batch_size, 1)` iterations).
    pub fn train(
        &mut self,
        x: &Matrix,
        y: &[usize],
        x_val: &Matrix,
        y_val: &[usize],
        cfg: &SgdConfig,
        verbose: bool,
        rng: &mut impl Rng,
    ) -> Result<TrainingStats> {
        self.check_batch(x)?;
        self.check_labels(x, y)?;
        self.check_batch(x_val)?;
        self.check_labels(x_val, y_val)?;
        if cfg.learning_rate_decay <= 0.0 || cfg.learning_rate_decay > 1.0 {
            return Err(anyhow!(
                "learning_rate_decay must be in (0, 1], got {}",
                cfg.learning_rate_decay
            ));
        }
        if cfg.batch_size == 0 || cfg.batch_size > x.len() {
            return Err(anyhow!(
                "batch_size must be in 1..={}, got {}",
                x.len(),
                cfg.batch_size
            ));
        }
        let iterations_per_epoch = (x.len() / cfg.batch_size).max(1);
        let mut cfg = cfg.clone();
        let mut stats = TrainingStats::default();

        for it in 0..cfg.num_iters {
            let (loss, acc) = self.step(x, y, &cfg, rng)?;
            stats.loss_history.push(loss);

            if verbose && it % 100 == 0 {
                println!("iteration {} / {}: loss {:.6}", it, cfg.num_iters, loss);
            }

            // Epoch boundary: record accuracies and decay the learning rate.
            if it % iterations_per_epoch == 0 {
                let val_pred = self.predict(x_val)?;
                stats.train_acc_history.push(acc);
                stats.val_acc_history.push(accuracy(&val_pred, y_val));
                cfg.learning_rate *= cfg.learning_rate_decay;
            }
        }
        Ok(stats)
    }

    /// Save the model as gzipped JSON.
    pub fn save(&self, path: &str) -> Result<()> {
        let dto = NetDto::from_net(self);
        let json = serde_json::to_vec(&dto)?;
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(&json)?;
        enc.finish()?;
        Ok(())
    }

    /// Load a model saved by [`TwoLayerNet::save`].
    pub fn load(path: &str) -> Result<Self> {
        let file = File::open(path)?;
        let mut dec = GzDecoder::new(file);
        let mut buf = Vec::new();
        dec.read_to_end(&mut buf)?;
        let dto: NetDto = serde_json::from_slice(&buf)?;
        dto.into_net()
    }
}

impl fmt::Display for TwoLayerNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TwoLayerNet: [{}, {}, {}]",
            self.input_size, self.hidden_size, self.num_classes
        )
    }
}

impl GradientSet {
    /// `self += scale * other`, elementwise across all four entries.
    fn add_scaled(&mut self, other: &GradientSet, scale: f64) {
        for (row, o_row) in self.w1.iter_mut().zip(&other.w1) {
            for (g, &o) in row.iter_mut().zip(o_row) {
                *g += scale * o;
            }
        }
        for (g, &o) in self.b1.iter_mut().zip(&other.b1) {
            *g += scale * o;
        }
        for (row, o_row) in self.w2.iter_mut().zip(&other.w2) {
            for (g, &o) in row.iter_mut().zip(o_row) {
                *g += scale * o;
            }
        }
        for (g, &o) in self.b2.iter_mut().zip(&other.b2) {
            *g += scale * o;
        }
    }
}

impl ParameterSet {
    /// `param -= lr * grad` for every parameter entry.
    fn apply_step(&mut self, grads: &GradientSet, lr: f64) {
        for (row, g_row) in self.w1.iter_mut().zip(&grads.w1) {
            for (w, &g) in row.iter_mut().zip(g_row) {
                *w -= lr * g;
            }
        }
        for (b, &g) in self.b1.iter_mut().zip(&grads.b1) {
            *b -= lr * g;
        }
        for (row, g_row) in self.w2.iter_mut().zip(&grads.w2) {
            for (w, &g) in row.iter_mut().zip(g_row) {
                *w -= lr * g;
            }
        }
        for (b, &g) in self.b2.iter_mut().zip(&grads.b2) {
            *b -= lr * g;
        }
    }
}

fn argmax(row: &[f64]) -> usize {
    row.iter()
        .enumerate()
        .fold(0usize, |max_i, (i, &v)| if v > row[max_i] { i } else { max_i })
}

// ============ Persistence DTO ============

#[derive(Debug, Serialize, Deserialize)]
struct NetDto {
    input_size: usize,
    hidden_size: usize,
    num_classes: usize,
    params: ParameterSet,
}

impl NetDto {
    fn from_net(net: &TwoLayerNet) -> Self {
        Self {
            input_size: net.input_size,
            hidden_size: net.hidden_size,
            num_classes: net.num_classes,
            params: net.params.clone(),
        }
    }

    fn into_net(self) -> Result<TwoLayerNet> {
        let mut net = TwoLayerNet {
            params: ParameterSet {
                w1: Vec::new(),
                b1: Vec::new(),
                w2: Vec::new(),
                b2: Vec::new(),
            },
            last_grads: None,
            input_size: self.input_size,
            hidden_size: self.hidden_size,
            num_classes: self.num_classes,
        };
        net.set_params(self.params)?;
        Ok(net)
    }
}
