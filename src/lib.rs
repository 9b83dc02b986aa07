//! Byte-oriented backpropagation library
//!
//! This library provides feed-forward networks of fully connected sigmoid
//! layers that map byte strings to byte strings, a supervised trainer with an
//! adaptive learning rate, stagnation detection and pruning, and a population
//! optimizer that mates trained networks toward the best performer.
//!
//! # Modules
//!
//! - `buffers`: Owned fixed-length buffers and allocation accounting
//! - `context`: Random stream and allocation tracker passed into every operation
//! - `layers`: The sigmoid layer
//! - `network`: Networks, network shapes and network statistics
//! - `training_set`: Input/output byte pairs
//! - `trainer`: Exercise, TeachPair, TrainPair, TrainSet, TrainBatch and Train
//! - `evolver`: Population-based optimization
//! - `config`: Trainer and evolver configuration
//! - `architecture`: Network shapes loaded from JSON
//! - `io`: Weights and training set text formats, key/value export
//! - `utils`: RNG, sigmoid, learning accelerator

pub mod architecture;
pub mod buffers;
pub mod config;
pub mod context;
pub mod error;
pub mod evolver;
pub mod io;
pub mod layers;
pub mod network;
pub mod trainer;
pub mod training_set;
pub mod utils;

/// Number of network inputs (or outputs) per byte.
pub const BITS_PER_SYMBOL: usize = 8;

pub use config::{EvolverConfig, TrainerConfig};
pub use context::Context;
pub use error::{BackpropError, Result};
pub use evolver::Evolver;
pub use network::{Network, NetworkShape};
pub use trainer::Trainer;
pub use training_set::TrainingSet;
