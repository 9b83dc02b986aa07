//! Fully connected sigmoid layer
//!
//! This module provides a SigmoidLayer that performs the transformation:
//! y = sigmoid(W × x), with no bias term. The layer owns its weight matrix,
//! its gradient vector and the input/output vectors of its last activation.

use crate::buffers::{element_count, FloatBuffer};
use crate::context::Context;
use crate::error::{BackpropError, Result};
use crate::network::LayerShape;
use crate::utils::{sigmoid, sigmoid_derivative, SimpleRng};
use serde::Serialize;

/// Fully connected sigmoid layer.
///
/// Each of the `y_count` neurons sees all `x_count` inputs.
///
/// # Fields
///
/// * `x_count` - Number of inputs per neuron (M)
/// * `y_count` - Number of neurons (N)
/// * `w` - Weight matrix stored row-major by neuron (N × M)
/// * `g` - Local gradient per neuron (N)
/// * `x` - Inputs of the last activation (M)
/// * `y` - Outputs of the last activation (N)
///
/// # Example
///
/// ```
/// use backprop::layers::SigmoidLayer;
/// use backprop::Context;
///
/// let ctx = Context::new(42);
/// let layer = SigmoidLayer::new(&ctx, 16, 8).unwrap();
/// assert_eq!(layer.x_count(), 16);
/// assert_eq!(layer.y_count(), 8);
/// assert_eq!(layer.weights_count(), 128);
/// ```
#[derive(Debug, Serialize)]
pub struct SigmoidLayer {
    x_count: usize,
    y_count: usize,
    #[serde(rename = "W")]
    w: FloatBuffer,
    g: FloatBuffer,
    x: FloatBuffer,
    y: FloatBuffer,
}

impl SigmoidLayer {
    /// Create a new SigmoidLayer with all buffers zeroed.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Context whose allocation tracker (if any) accounts the buffers
    /// * `x_count` - Number of inputs per neuron
    /// * `y_count` - Number of neurons
    ///
    /// # Returns
    ///
    /// The layer, or `BackpropError::Allocation` if a buffer cannot be allocated
    pub fn new(ctx: &Context, x_count: usize, y_count: usize) -> Result<Self> {
        let tracker = ctx.tracker();
        Ok(Self {
            x_count,
            y_count,
            w: FloatBuffer::allocate(element_count(x_count, y_count)?, tracker)?,
            g: FloatBuffer::allocate(y_count, tracker)?,
            x: FloatBuffer::allocate(x_count, tracker)?,
            y: FloatBuffer::allocate(y_count, tracker)?,
        })
    }

    pub fn x_count(&self) -> usize {
        self.x_count
    }

    pub fn y_count(&self) -> usize {
        self.y_count
    }

    pub fn shape(&self) -> LayerShape {
        LayerShape::new(self.x_count, self.y_count)
    }

    pub fn weights(&self) -> &[f64] {
        &self.w
    }

    pub fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.w
    }

    pub fn gradients(&self) -> &[f64] {
        &self.g
    }

    pub fn gradients_mut(&mut self) -> &mut [f64] {
        &mut self.g
    }

    pub fn inputs(&self) -> &[f64] {
        &self.x
    }

    pub fn inputs_mut(&mut self) -> &mut [f64] {
        &mut self.x
    }

    pub fn outputs(&self) -> &[f64] {
        &self.y
    }

    pub fn outputs_mut(&mut self) -> &mut [f64] {
        &mut self.y
    }

    /// Weight connecting input `m` to neuron `n`.
    pub fn weight(&self, n: usize, m: usize) -> Result<f64> {
        let index = self.weight_index(n, m)?;
        Ok(self.w[index])
    }

    pub fn set_weight(&mut self, n: usize, m: usize, value: f64) -> Result<()> {
        let index = self.weight_index(n, m)?;
        self.w[index] = value;
        Ok(())
    }

    /// All `x_count` weights of neuron `n`.
    pub fn weight_row(&self, n: usize) -> Result<&[f64]> {
        check_index(n, self.y_count)?;
        let start = n * self.x_count;
        Ok(&self.w[start..start + self.x_count])
    }

    pub fn set_weight_row(&mut self, n: usize, values: &[f64]) -> Result<()> {
        check_index(n, self.y_count)?;
        if values.len() != self.x_count {
            return Err(BackpropError::InputSize {
                expected: self.x_count,
                actual: values.len(),
            });
        }
        let start = n * self.x_count;
        self.w[start..start + self.x_count].copy_from_slice(values);
        Ok(())
    }

    pub fn gradient(&self, n: usize) -> Result<f64> {
        check_index(n, self.y_count)?;
        Ok(self.g[n])
    }

    pub fn set_gradient(&mut self, n: usize, value: f64) -> Result<()> {
        check_index(n, self.y_count)?;
        self.g[n] = value;
        Ok(())
    }

    pub fn input(&self, m: usize) -> Result<f64> {
        check_index(m, self.x_count)?;
        Ok(self.x[m])
    }

    pub fn set_input(&mut self, m: usize, value: f64) -> Result<()> {
        check_index(m, self.x_count)?;
        self.x[m] = value;
        Ok(())
    }

    pub fn output(&self, n: usize) -> Result<f64> {
        check_index(n, self.y_count)?;
        Ok(self.y[n])
    }

    pub fn set_output(&mut self, n: usize, value: f64) -> Result<()> {
        check_index(n, self.y_count)?;
        self.y[n] = value;
        Ok(())
    }

    /// Forward pass: y[n] = sigmoid(Σ_m W[n,m] * x[m]).
    pub fn activate(&mut self) {
        let x = &self.x;
        for (y, row) in self.y.iter_mut().zip(self.w.chunks_exact(self.x_count.max(1))) {
            let net: f64 = row.iter().zip(x.iter()).map(|(w, x)| w * x).sum();
            *y = sigmoid(net);
        }
    }

    /// Add `gain * uniform(-1, 1)` to every weight.
    pub fn randomize(&mut self, rng: &mut SimpleRng, gain: f64) {
        for w in self.w.iter_mut() {
            *w += gain * rng.random_weight();
        }
    }

    /// Set W to the identity pattern (1.0 where n == m, 0.0 elsewhere).
    pub fn identity(&mut self) {
        let x_count = self.x_count;
        for (index, w) in self.w.iter_mut().enumerate() {
            *w = if index / x_count == index % x_count { 1.0 } else { 0.0 };
        }
    }

    /// Zero every weight whose magnitude is below `threshold`.
    pub fn prune(&mut self, threshold: f64) {
        for w in self.w.iter_mut() {
            if w.abs() < threshold {
                *w = 0.0;
            }
        }
    }

    pub fn round(&mut self) {
        for w in self.w.iter_mut() {
            *w = w.round();
        }
    }

    /// Zero x, y and g; weights are left alone.
    pub fn reset(&mut self) {
        self.x.clear();
        self.y.clear();
        self.g.clear();
    }

    /// Propagate this layer's gradient back through its weights.
    ///
    /// Writes `dest[m] = Σ_n W[n,m] * g[n]` for every input index m, which is
    /// the error signal of the previous layer's outputs.
    ///
    /// # Arguments
    ///
    /// * `dest` - Destination slice, must hold exactly `x_count` values
    pub fn weighted_gradient(&self, dest: &mut [f64]) -> Result<()> {
        if dest.len() != self.x_count {
            return Err(BackpropError::InputSize {
                expected: self.x_count,
                actual: dest.len(),
            });
        }
        dest.fill(0.0);
        for (row, g) in self.w.chunks_exact(self.x_count.max(1)).zip(self.g.iter()) {
            for (d, w) in dest.iter_mut().zip(row.iter()) {
                *d += w * g;
            }
        }
        Ok(())
    }

    pub fn weights_count(&self) -> usize {
        self.w.len()
    }

    /// Bytes held by the weight matrix.
    pub fn byte_size(&self) -> usize {
        self.w.byte_size()
    }

    /// Bytes held by all four buffers.
    pub fn buffers_byte_size(&self) -> usize {
        self.w.byte_size() + self.g.byte_size() + self.x.byte_size() + self.y.byte_size()
    }

    pub fn weights_sum(&self) -> f64 {
        self.w.iter().sum()
    }

    pub fn weights_mean(&self) -> f64 {
        if self.w.is_empty() {
            return 0.0;
        }
        self.weights_sum() / self.w.len() as f64
    }

    /// Population standard deviation of the weights; 0.0 when there are none.
    pub fn weights_stddev(&self) -> f64 {
        if self.w.is_empty() {
            return 0.0;
        }
        let mean = self.weights_mean();
        let variance =
            self.w.iter().map(|w| (w - mean) * (w - mean)).sum::<f64>() / self.w.len() as f64;
        variance.sqrt()
    }

    /// Output-layer local gradients: g[n] = y(1 - y) * (desired[n] - y).
    pub(crate) fn output_gradients<I>(&mut self, desired: I)
    where
        I: IntoIterator<Item = f64>,
    {
        for ((g, &y), d) in self.g.iter_mut().zip(self.y.iter()).zip(desired) {
            *g = sigmoid_derivative(y) * (d - y);
        }
    }

    /// Hidden-layer local gradients, scaling the weighted gradient already
    /// stored in g by y(1 - y).
    pub(crate) fn hidden_gradients(&mut self) {
        for (g, &y) in self.g.iter_mut().zip(self.y.iter()) {
            *g *= sigmoid_derivative(y);
        }
    }

    /// Apply W[n,m] += rate * g[n] * x[m], plus `mutation_rate` scaled noise
    /// when it is non-zero.
    ///
    /// Returns the sum of the magnitudes of the gradient corrections; the
    /// noise is not counted.
    pub(crate) fn correct_weights(
        &mut self,
        learning_rate: f64,
        mutation_rate: f64,
        rng: &mut SimpleRng,
    ) -> f64 {
        let mut correction_total = 0.0;
        let x = &self.x;
        for (row, &g) in self.w.chunks_exact_mut(self.x_count.max(1)).zip(self.g.iter()) {
            let strength = learning_rate * g;
            for (w, &x) in row.iter_mut().zip(x.iter()) {
                let mutation = if mutation_rate != 0.0 {
                    mutation_rate * rng.random_weight()
                } else {
                    0.0
                };
                let correction = strength * x;
                correction_total += correction.abs();
                *w += correction + mutation;
            }
        }
        correction_total
    }

    pub(crate) fn is_similar(&self, other: &SigmoidLayer) -> bool {
        self.x_count == other.x_count && self.y_count == other.y_count
    }

    /// Copy weights, gradients and activations from a layer of the same shape.
    pub(crate) fn copy_from(&mut self, other: &SigmoidLayer) {
        self.w.copy_from_slice(&other.w);
        self.g.copy_from_slice(&other.g);
        self.x.copy_from_slice(&other.x);
        self.y.copy_from_slice(&other.y);
    }

    /// Blend this layer's weights toward `alpha`.
    ///
    /// Each weight becomes the mean of `alpha + r_a * mate_rate` and
    /// `self + r_b * (1 - mate_rate)`, with r_a then r_b drawn from [-1, 1].
    pub(crate) fn mate_with(&mut self, alpha: &SigmoidLayer, mate_rate: f64, rng: &mut SimpleRng) {
        let beta_rate = 1.0 - mate_rate;
        for (w_b, w_a) in self.w.iter_mut().zip(alpha.w.iter()) {
            let rand_a = rng.random_weight() * mate_rate;
            let rand_b = rng.random_weight() * beta_rate;
            *w_b = ((w_a + rand_a) + (*w_b + rand_b)) / 2.0;
        }
    }

    fn weight_index(&self, n: usize, m: usize) -> Result<usize> {
        check_index(n, self.y_count)?;
        check_index(m, self.x_count)?;
        Ok(n * self.x_count + m)
    }
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(BackpropError::IndexOutOfRange { index, len })
    }
}
