//! Shared utilities for the network engine
//!
//! This module provides the random number stream, the sigmoid activation and
//! the learning rate accelerator used by the trainer.

pub mod activations;
pub mod learning_accelerator;
pub mod rng;

pub use activations::{sigmoid, sigmoid_derivative};
pub use learning_accelerator::LearningAccelerator;
pub use rng::SimpleRng;
