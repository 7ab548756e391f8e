//! A minimal neural network crate for educational purposes: a two-layer
//! fully-connected classifier with every gradient derived by hand.
//!
//! - ReLU hidden layer, softmax cross-entropy loss, L2 regularization
//! - Inverted dropout on the hidden activations
//! - Minibatch SGD with one-step-back additive momentum
//! - CIFAR-10 and MNIST loaders, metrics, gzipped-JSON checkpoints
//!
//! All randomness (weight init, batch sampling, dropout masks) flows
//! through caller-supplied [`rand::Rng`] handles, so runs are reproducible
//! with a seeded generator.

pub mod datasets;
pub mod loss;
pub mod matrix;
pub mod metrics;
pub mod network;
pub mod utils;

pub use datasets::{
    center_columns, load_cifar10_batch, load_cifar10_train, load_mnist, mean_image,
    split_train_val_test,
};
pub use loss::{cross_entropy, l2_penalty, softmax_rows};
pub use matrix::Matrix;
pub use metrics::{accuracy, confusion_matrix};
pub use network::{
    GradientSet, ParameterSet, SgdConfig, TrainingStats, TwoLayerNet, DEFAULT_INIT_SCALE,
};
pub use utils::{generate_synthetic_data, print_model_summary, print_summary_table};
