//! Network weights text format.
//!
//! ```text
//! {network_weights: {x_size: 1, y_size: 1, layers_count: 2, layers: [
//! [ w, w, ... ],
//! [ w, w, ... ]
//! ]
//! }}
//! ```
//!
//! Each layer is its flattened row-major weight matrix, one neuron per line.

use super::scanner::Scanner;
use crate::error::{BackpropError, Result};
use crate::network::Network;
use log::warn;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Render the weights of every layer.
///
/// Floats use the shortest representation that parses back to the same
/// value, so a save/load round trip is exact. Non-finite weights are written
/// as `NaN`, `inf` or `-inf` and read back as such.
pub fn format_weights(network: &Network) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write!(
        out,
        "{{network_weights: {{x_size: {}, y_size: {}, layers_count: {}, layers: [\n",
        network.x_size(),
        network.y_size(),
        network.layers_count()
    );

    for (i, layer) in network.layers().iter().enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        out.push_str("[ ");
        let row_len = layer.x_count().max(1);
        for (j, w) in layer.weights().iter().enumerate() {
            if j > 0 {
                out.push_str(if j % row_len == 0 { ",\n  " } else { ", " });
            }
            let _ = write!(out, "{}", w);
        }
        out.push_str(" ]");
    }

    out.push_str("\n]\n}}\n");
    out
}

pub fn save_weights<P: AsRef<Path>>(network: &Network, path: P) -> Result<()> {
    fs::write(path, format_weights(network))?;
    Ok(())
}

/// Parse a weights document into `network`.
///
/// The header must match the network's `x_size`, `y_size` and
/// `layers_count`, and every layer must carry exactly as many weights as the
/// corresponding network layer. The whole document is parsed before anything
/// is written, so on error the network is left unchanged.
pub fn parse_weights_into(network: &mut Network, text: &str) -> Result<()> {
    let mut scanner = Scanner::new(text);
    scanner.expect("{")?;
    scanner.expect("network_weights")?;
    scanner.expect(":")?;
    scanner.expect("{")?;
    let x_size = scanner.field_usize("x_size")?;
    scanner.expect(",")?;
    let y_size = scanner.field_usize("y_size")?;
    scanner.expect(",")?;
    let layers_count = scanner.field_usize("layers_count")?;

    if x_size != network.x_size()
        || y_size != network.y_size()
        || layers_count != network.layers_count()
    {
        let message = format!(
            "weights describe x_size {}, y_size {}, layers_count {} but the network is {}",
            x_size,
            y_size,
            layers_count,
            network.shape()
        );
        warn!("rejected weights: {}", message);
        return Err(BackpropError::InvalidShape(message));
    }

    scanner.expect(",")?;
    scanner.expect("layers")?;
    scanner.expect(":")?;
    let layers = scanner.list(|s| s.list(Scanner::f64))?;
    scanner.expect("}")?;
    scanner.expect("}")?;

    if layers.len() != network.layers_count() {
        return Err(BackpropError::InvalidShape(format!(
            "weights list {} layers, header says {}",
            layers.len(),
            layers_count
        )));
    }
    for (i, (weights, layer)) in layers.iter().zip(network.layers()).enumerate() {
        if weights.len() != layer.weights_count() {
            let message = format!(
                "layer {} has {} weights, the network layer needs {}",
                i,
                weights.len(),
                layer.weights_count()
            );
            warn!("rejected weights: {}", message);
            return Err(BackpropError::InvalidShape(message));
        }
    }

    for (weights, layer) in layers.iter().zip(network.layers_mut()) {
        layer.weights_mut().copy_from_slice(weights);
    }
    Ok(())
}

/// Read a weights file into `network`; see [`parse_weights_into`].
pub fn load_weights<P: AsRef<Path>>(network: &mut Network, path: P) -> Result<()> {
    let text = fs::read_to_string(path)?;
    parse_weights_into(network, &text)
}
