//! Layer implementations for the network engine
//!
//! Every network is a linear chain of fully connected sigmoid layers, so this
//! module provides the single layer type used throughout the crate.

pub mod sigmoid;

pub use sigmoid::SigmoidLayer;
