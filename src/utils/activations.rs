//! Activation functions for neural networks
//!
//! Every layer in this crate is a sigmoid layer, so this module only carries
//! the logistic function and its derivative.

/// Sigmoid activation function.
///
/// Returns the sigmoid of the input: 1 / (1 + exp(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative assuming y = sigmoid(z).
///
/// Returns the derivative: y * (1 - y)
pub fn sigmoid_derivative(y: f64) -> f64 {
    y * (1.0 - y)
}
