//! Byte-oriented feed-forward network
//!
//! A [`Network`] is a linear chain of [`SigmoidLayer`]s fronted by a byte
//! input port and backed by a byte output port. Activation expands every input
//! byte into `BITS_PER_SYMBOL` floating inputs, propagates them through the
//! chain and collapses the last layer's outputs back into bytes.

use crate::buffers::{element_count, ByteBuffer};
use crate::context::Context;
use crate::error::{BackpropError, Result};
use crate::layers::SigmoidLayer;
use crate::utils::SimpleRng;
use crate::BITS_PER_SYMBOL;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Dimensions of one layer: inputs per neuron and neuron count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerShape {
    pub x_count: usize,
    pub y_count: usize,
}

impl LayerShape {
    pub fn new(x_count: usize, y_count: usize) -> Self {
        Self { x_count, y_count }
    }
}

impl fmt::Display for LayerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x_count, self.y_count)
    }
}

/// Comparable description of a network's dimensions.
///
/// Two networks can exchange weights exactly when their shapes are equal.
///
/// # Example
///
/// ```
/// use backprop::network::{LayerShape, NetworkShape};
///
/// let shape = NetworkShape::chained(1, 1, 2).unwrap();
/// assert_eq!(shape.layers, vec![LayerShape::new(8, 8), LayerShape::new(8, 8)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkShape {
    pub x_size: usize,
    pub y_size: usize,
    pub layers: Vec<LayerShape>,
}

impl NetworkShape {
    /// Build the standard chained shape for `layers_count` layers.
    ///
    /// A single layer maps `x_size * 8` inputs straight to `y_size * 8`
    /// outputs. Deeper networks use hidden layers of width
    /// `8 * max(x_size, y_size)`.
    ///
    /// # Arguments
    ///
    /// * `x_size` - Input width in bytes
    /// * `y_size` - Output width in bytes
    /// * `layers_count` - Number of layers, at least 1
    pub fn chained(x_size: usize, y_size: usize, layers_count: usize) -> Result<Self> {
        if layers_count == 0 {
            return Err(BackpropError::InvalidShape(
                "a network needs at least one layer".to_string(),
            ));
        }

        let x_count = element_count(x_size, BITS_PER_SYMBOL)?;
        let y_count = element_count(y_size, BITS_PER_SYMBOL)?;

        let layers = if layers_count == 1 {
            vec![LayerShape::new(x_count, y_count)]
        } else {
            let hidden = x_count.max(y_count);
            let mut layers = Vec::with_capacity(layers_count);
            layers.push(LayerShape::new(x_count, hidden));
            for _ in 1..layers_count - 1 {
                layers.push(LayerShape::new(hidden, hidden));
            }
            layers.push(LayerShape::new(hidden, y_count));
            layers
        };

        let shape = Self {
            x_size,
            y_size,
            layers,
        };
        shape.validate()?;
        Ok(shape)
    }

    pub fn layers_count(&self) -> usize {
        self.layers.len()
    }

    /// Check the chaining invariants.
    ///
    /// Sizes must be non-zero, the first layer must take `x_size * 8` inputs,
    /// the last must produce `y_size * 8` outputs and every layer must consume
    /// exactly what its predecessor produces.
    pub fn validate(&self) -> Result<()> {
        if self.x_size == 0 || self.y_size == 0 {
            return Err(BackpropError::InvalidShape(format!(
                "x_size and y_size must be positive, got {}",
                self
            )));
        }

        let (first, last) = match (self.layers.first(), self.layers.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(BackpropError::InvalidShape(
                    "a network needs at least one layer".to_string(),
                ))
            }
        };

        let x_count = element_count(self.x_size, BITS_PER_SYMBOL)?;
        if first.x_count != x_count {
            return Err(BackpropError::InvalidShape(format!(
                "first layer takes {} inputs, x_size {} needs {}",
                first.x_count, self.x_size, x_count
            )));
        }

        let y_count = element_count(self.y_size, BITS_PER_SYMBOL)?;
        if last.y_count != y_count {
            return Err(BackpropError::InvalidShape(format!(
                "last layer has {} outputs, y_size {} needs {}",
                last.y_count, self.y_size, y_count
            )));
        }

        for (i, pair) in self.layers.windows(2).enumerate() {
            if pair[1].x_count != pair[0].y_count {
                return Err(BackpropError::InvalidShape(format!(
                    "layer {} takes {} inputs but layer {} produces {}",
                    i + 1,
                    pair[1].x_count,
                    i,
                    pair[0].y_count
                )));
            }
            if pair[0].y_count == 0 {
                return Err(BackpropError::InvalidShape(format!(
                    "layer {} has no neurons",
                    i
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for NetworkShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{x_size: {}, y_size: {}, layers: [",
            self.x_size, self.y_size
        )?;
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", layer)?;
        }
        write!(f, "]}}")
    }
}

/// Aggregate figures about a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkStats {
    pub x_size: usize,
    pub y_size: usize,
    pub layers_count: usize,
    /// Bytes held by all layer buffers (weights, gradients, inputs, outputs).
    pub layers_size: usize,
    pub layers_w_count: usize,
    pub layers_w_size: usize,
    pub layers_w_avg: f64,
    pub layers_w_stddev: f64,
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "network_stats: {{ x_size: {}, y_size: {}, layers_count: {}, layers_size: {}, \
             layers_W_count: {}, layers_W_size: {}, layers_W_avg: {:.6}, layers_W_stddev: {:.6} }}",
            self.x_size,
            self.y_size,
            self.layers_count,
            self.layers_size,
            self.layers_w_count,
            self.layers_w_size,
            self.layers_w_avg,
            self.layers_w_stddev
        )
    }
}

/// Feed-forward network of sigmoid layers with byte input and output.
///
/// # Example
///
/// ```
/// use backprop::{Context, Network};
///
/// let mut ctx = Context::new(1);
/// let mut network = Network::new(&ctx, 2, 2, 1).unwrap();
/// network.identity();
/// network.input(b"hi").unwrap();
/// network.activate(&mut ctx.rng);
/// assert_eq!(network.output(), b"hi");
/// ```
pub struct Network {
    x: ByteBuffer,
    y: ByteBuffer,
    jitter: f64,
    layers: Vec<SigmoidLayer>,
}

impl Network {
    /// Allocate a network using the chained layer sizing rule.
    pub fn new(ctx: &Context, x_size: usize, y_size: usize, layers_count: usize) -> Result<Self> {
        let shape = NetworkShape::chained(x_size, y_size, layers_count)?;
        Self::with_shape(ctx, &shape)
    }

    /// Allocate a network with explicit layer dimensions.
    pub fn with_shape(ctx: &Context, shape: &NetworkShape) -> Result<Self> {
        shape.validate()?;

        let tracker = ctx.tracker();
        let layers = shape
            .layers
            .iter()
            .map(|layer| SigmoidLayer::new(ctx, layer.x_count, layer.y_count))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            x: ByteBuffer::allocate(shape.x_size, tracker)?,
            y: ByteBuffer::allocate(shape.y_size, tracker)?,
            jitter: 0.0,
            layers,
        })
    }

    pub fn x_size(&self) -> usize {
        self.x.len()
    }

    pub fn y_size(&self) -> usize {
        self.y.len()
    }

    pub fn layers_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[SigmoidLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [SigmoidLayer] {
        &mut self.layers
    }

    pub fn layer(&self, index: usize) -> Result<&SigmoidLayer> {
        let len = self.layers.len();
        self.layers
            .get(index)
            .ok_or(BackpropError::IndexOutOfRange { index, len })
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut SigmoidLayer> {
        let len = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or(BackpropError::IndexOutOfRange { index, len })
    }

    pub fn first_layer(&self) -> &SigmoidLayer {
        &self.layers[0]
    }

    pub fn last_layer(&self) -> &SigmoidLayer {
        &self.layers[self.layers.len() - 1]
    }

    pub fn shape(&self) -> NetworkShape {
        NetworkShape {
            x_size: self.x_size(),
            y_size: self.y_size(),
            layers: self.layers.iter().map(SigmoidLayer::shape).collect(),
        }
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Noise amplitude added to every expanded input bit.
    pub fn set_jitter(&mut self, jitter: f64) {
        self.jitter = jitter;
    }

    /// Load the byte input port; `values` must be exactly `x_size` long.
    pub fn input(&mut self, values: &[u8]) -> Result<()> {
        self.x.copy_from(values)
    }

    /// Load the input port from a string's bytes. An empty string is ignored.
    pub fn input_str(&mut self, values: &str) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        self.input(values.as_bytes())
    }

    /// Current contents of the byte input port.
    pub fn input_bytes(&self) -> &[u8] {
        &self.x
    }

    /// Bytes produced by the last activation.
    pub fn output(&self) -> &[u8] {
        &self.y
    }

    /// Expand the input, propagate it through every layer and collapse the
    /// result into the output port.
    ///
    /// `rng` only feeds input jitter and is left untouched when jitter is 0.
    pub fn activate(&mut self, rng: &mut SimpleRng) {
        self.expand_input(rng);
        self.activate_layers();
        self.collapse_output();
    }

    fn expand_input(&mut self, rng: &mut SimpleRng) {
        let jitter = self.jitter;
        let first = &mut self.layers[0];
        for (bits, x) in self
            .x
            .iter()
            .zip(first.inputs_mut().chunks_exact_mut(BITS_PER_SYMBOL))
        {
            for (b, value) in x.iter_mut().enumerate() {
                let bit = f64::from((bits >> b) & 1);
                *value = if jitter == 0.0 {
                    bit
                } else {
                    bit + 2.0 * jitter * rng.next_f64() - jitter
                };
            }
        }
    }

    fn activate_layers(&mut self) {
        let last = self.layers.len() - 1;
        for i in 0..last {
            let (head, tail) = self.layers.split_at_mut(i + 1);
            let layer = &mut head[i];
            layer.activate();
            tail[0].inputs_mut().copy_from_slice(layer.outputs());
        }
        self.layers[last].activate();
    }

    fn collapse_output(&mut self) {
        let last = &self.layers[self.layers.len() - 1];
        for (byte, y) in self
            .y
            .iter_mut()
            .zip(last.outputs().chunks_exact(BITS_PER_SYMBOL))
        {
            *byte = y
                .iter()
                .enumerate()
                .fold(0u8, |bits, (b, &value)| bits | (u8::from(value > 0.5) << b));
        }
    }

    /// Restart `rng` from `seed` and add `gain`-scaled noise to every weight.
    pub fn randomize(&mut self, rng: &mut SimpleRng, gain: f64, seed: u64) {
        rng.reseed(seed);
        for layer in &mut self.layers {
            layer.randomize(rng, gain);
        }
    }

    pub fn identity(&mut self) {
        self.layers.iter_mut().for_each(SigmoidLayer::identity);
    }

    pub fn reset(&mut self) {
        self.layers.iter_mut().for_each(SigmoidLayer::reset);
    }

    pub fn prune(&mut self, threshold: f64) {
        for layer in &mut self.layers {
            layer.prune(threshold);
        }
    }

    pub fn round(&mut self) {
        self.layers.iter_mut().for_each(SigmoidLayer::round);
    }

    pub fn weights_count(&self) -> usize {
        self.layers.iter().map(SigmoidLayer::weights_count).sum()
    }

    pub fn weights_size(&self) -> usize {
        self.layers.iter().map(SigmoidLayer::byte_size).sum()
    }

    pub fn weights_sum(&self) -> f64 {
        self.layers.iter().map(SigmoidLayer::weights_sum).sum()
    }

    pub fn weights_mean(&self) -> f64 {
        let count = self.weights_count();
        if count == 0 {
            return 0.0;
        }
        self.weights_sum() / count as f64
    }

    /// Population standard deviation over the weights of all layers.
    pub fn weights_stddev(&self) -> f64 {
        let count = self.weights_count();
        if count == 0 {
            return 0.0;
        }
        let mean = self.weights_mean();
        let squares: f64 = self
            .layers
            .iter()
            .flat_map(|layer| layer.weights().iter())
            .map(|w| (w - mean) * (w - mean))
            .sum();
        (squares / count as f64).sqrt()
    }

    fn layers_size(&self) -> usize {
        self.layers.iter().map(SigmoidLayer::buffers_byte_size).sum()
    }

    pub fn stats(&self) -> NetworkStats {
        NetworkStats {
            x_size: self.x_size(),
            y_size: self.y_size(),
            layers_count: self.layers_count(),
            layers_size: self.layers_size(),
            layers_w_count: self.weights_count(),
            layers_w_size: self.weights_size(),
            layers_w_avg: self.weights_mean(),
            layers_w_stddev: self.weights_stddev(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.x_size() > 0 && self.y_size() > 0 && !self.layers.is_empty()
    }

    /// True when both networks have identical shapes.
    pub fn is_similar(&self, other: &Network) -> bool {
        self.x_size() == other.x_size()
            && self.y_size() == other.y_size()
            && self.layers.len() == other.layers.len()
            && self
                .layers
                .iter()
                .zip(other.layers.iter())
                .all(|(a, b)| a.is_similar(b))
    }

    /// Deep-copy every layer of `other` into this network.
    ///
    /// Fails with `ShapeMismatch`, leaving this network untouched, when the
    /// shapes differ.
    pub fn copy_weights_from(&mut self, other: &Network) -> Result<()> {
        if !self.is_similar(other) {
            return Err(BackpropError::ShapeMismatch {
                expected: self.shape(),
                actual: other.shape(),
            });
        }
        for (dest, src) in self.layers.iter_mut().zip(other.layers.iter()) {
            dest.copy_from(src);
        }
        Ok(())
    }

    /// Flat copy of every weight, layer after layer.
    pub(crate) fn weights_snapshot(&self) -> Vec<f64> {
        self.layers
            .iter()
            .flat_map(|layer| layer.weights().iter().copied())
            .collect()
    }

    /// Overwrite all weights from a snapshot taken on a network of this shape.
    pub(crate) fn restore_weights(&mut self, snapshot: &[f64]) -> Result<()> {
        if snapshot.len() != self.weights_count() {
            return Err(BackpropError::InputSize {
                expected: self.weights_count(),
                actual: snapshot.len(),
            });
        }
        let mut offset = 0;
        for layer in &mut self.layers {
            let count = layer.weights_count();
            layer
                .weights_mut()
                .copy_from_slice(&snapshot[offset..offset + count]);
            offset += count;
        }
        Ok(())
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("shape", &self.shape())
            .field("jitter", &self.jitter)
            .finish()
    }
}

impl Serialize for Network {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Network", 7)?;
        state.serialize_field("x_size", &self.x_size())?;
        state.serialize_field("y_size", &self.y_size())?;
        state.serialize_field("layers_count", &self.layers_count())?;
        state.serialize_field("jitter", &self.jitter)?;
        state.serialize_field("x", &self.x)?;
        state.serialize_field("y", &self.y)?;
        state.serialize_field("layers", &self.layers)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_chained_single_layer() {
        let shape = NetworkShape::chained(2, 3, 1).unwrap();
        assert_eq!(shape.layers, vec![LayerShape::new(16, 24)]);
    }

    #[test]
    fn test_chained_hidden_width() {
        let shape = NetworkShape::chained(1, 3, 3).unwrap();
        assert_eq!(
            shape.layers,
            vec![
                LayerShape::new(8, 24),
                LayerShape::new(24, 24),
                LayerShape::new(24, 24),
            ]
        );
    }

    #[test]
    fn test_chained_rejects_zero_layers() {
        assert!(NetworkShape::chained(1, 1, 0).is_err());
        assert!(NetworkShape::chained(0, 1, 1).is_err());
    }

    #[test]
    fn test_validate_broken_chain() {
        let shape = NetworkShape {
            x_size: 1,
            y_size: 1,
            layers: vec![LayerShape::new(8, 4), LayerShape::new(5, 8)],
        };
        assert!(matches!(
            shape.validate(),
            Err(BackpropError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_shape_display() {
        let shape = NetworkShape::chained(1, 1, 2).unwrap();
        assert_eq!(
            shape.to_string(),
            "{x_size: 1, y_size: 1, layers: [8x8, 8x8]}"
        );
    }

    #[test]
    fn test_identity_round_trip() {
        let mut ctx = Context::new(5);
        let mut network = Network::new(&ctx, 3, 3, 1).unwrap();
        network.identity();

        for input in [[0u8, 0, 0], [0xff, 0x01, 0x80], [0x5a, 0xa5, 0x3c]] {
            network.input(&input).unwrap();
            network.activate(&mut ctx.rng);
            assert_eq!(network.output(), &input);
        }
    }

    #[test]
    fn test_input_size_checked() {
        let ctx = Context::new(5);
        let mut network = Network::new(&ctx, 2, 1, 1).unwrap();

        assert!(matches!(
            network.input(&[1, 2, 3]),
            Err(BackpropError::InputSize {
                expected: 2,
                actual: 3
            })
        ));
        network.input_str("").unwrap();
        network.input_str("ok").unwrap();
        assert_eq!(network.input_bytes(), b"ok");
    }

    #[test]
    fn test_expand_lsb_first() {
        let mut ctx = Context::new(5);
        let mut network = Network::new(&ctx, 1, 1, 1).unwrap();
        network.input(&[0b0000_0101]).unwrap();
        network.activate(&mut ctx.rng);

        assert_eq!(
            network.first_layer().inputs(),
            &[1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_jitter_bounds() {
        let mut ctx = Context::new(9);
        let mut network = Network::new(&ctx, 1, 1, 1).unwrap();
        network.set_jitter(0.1);
        network.input(&[0xf0]).unwrap();
        network.activate(&mut ctx.rng);

        for (b, &x) in network.first_layer().inputs().iter().enumerate() {
            let bit = if b >= 4 { 1.0 } else { 0.0 };
            assert!((x - bit).abs() <= 0.1 + 1e-12);
        }
    }

    #[test]
    fn test_randomize_deterministic() {
        let mut ctx = Context::new(1);
        let mut a = Network::new(&ctx, 1, 1, 2).unwrap();
        let mut b = Network::new(&ctx, 1, 1, 2).unwrap();

        a.randomize(&mut ctx.rng, 1.0, 77);
        b.randomize(&mut ctx.rng, 1.0, 77);

        assert_eq!(a.weights_snapshot(), b.weights_snapshot());
        assert_ne!(a.weights_sum(), 0.0);
    }

    #[test]
    fn test_weights_stddev_across_layers() {
        let ctx = Context::new(1);
        let mut network = Network::new(&ctx, 1, 1, 2).unwrap();
        network.layers_mut()[0].weights_mut().fill(1.0);
        network.layers_mut()[1].weights_mut().fill(3.0);

        assert_eq!(network.weights_count(), 128);
        assert_relative_eq!(network.weights_mean(), 2.0);
        assert_relative_eq!(network.weights_stddev(), 1.0);
    }

    #[test]
    fn test_stats() {
        let ctx = Context::new(1);
        let network = Network::new(&ctx, 1, 2, 2).unwrap();
        let stats = network.stats();

        assert_eq!(stats.layers_count, 2);
        assert_eq!(stats.layers_w_count, 8 * 16 + 16 * 16);
        assert_eq!(stats.layers_w_size, stats.layers_w_count * 8);
        assert!(stats.layers_size > stats.layers_w_size);
        assert!(stats.to_string().starts_with("network_stats: { x_size: 1, y_size: 2"));
    }

    #[test]
    fn test_copy_weights_requires_same_shape() {
        let mut ctx = Context::new(1);
        let mut source = Network::new(&ctx, 1, 1, 2).unwrap();
        source.randomize(&mut ctx.rng, 1.0, 3);

        let mut same = Network::new(&ctx, 1, 1, 2).unwrap();
        same.copy_weights_from(&source).unwrap();
        assert_eq!(same.weights_snapshot(), source.weights_snapshot());

        let mut other = Network::new(&ctx, 1, 1, 3).unwrap();
        assert!(!other.is_similar(&source));
        assert!(matches!(
            other.copy_weights_from(&source),
            Err(BackpropError::ShapeMismatch { .. })
        ));
        assert_eq!(other.weights_sum(), 0.0);
    }

    #[test]
    fn test_restore_snapshot() {
        let mut ctx = Context::new(1);
        let mut network = Network::new(&ctx, 1, 1, 1).unwrap();
        network.randomize(&mut ctx.rng, 1.0, 3);
        let snapshot = network.weights_snapshot();

        network.prune(10.0);
        assert_eq!(network.weights_sum(), 0.0);

        network.restore_weights(&snapshot).unwrap();
        assert_eq!(network.weights_snapshot(), snapshot);
        assert!(network.restore_weights(&snapshot[1..]).is_err());
    }
}
