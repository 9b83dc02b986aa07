//! Architecture configuration structures
//!
//! This module reads network shapes from JSON files so experiments can change
//! layer counts and widths without code changes.

use crate::error::{BackpropError, Result};
use crate::network::{LayerShape, NetworkShape};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Network architecture as written in a JSON file.
///
/// Either `layers_count` (layers sized by the chained rule) or an explicit
/// `layers` list must be present, not both.
///
/// # Examples
///
/// ```json
/// { "x_size": 1, "y_size": 1, "layers_count": 2 }
/// ```
///
/// ```json
/// {
///   "x_size": 1,
///   "y_size": 1,
///   "layers": [
///     { "x_count": 8, "y_count": 16 },
///     { "x_count": 16, "y_count": 8 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    /// Input width in bytes
    pub x_size: usize,
    /// Output width in bytes
    pub y_size: usize,
    pub layers_count: Option<usize>,
    pub layers: Option<Vec<LayerShape>>,
}

impl ArchitectureConfig {
    /// Resolve the configuration into a validated shape.
    pub fn to_shape(&self) -> Result<NetworkShape> {
        let shape = match (self.layers_count, &self.layers) {
            (Some(_), Some(_)) => {
                return Err(BackpropError::InvalidConfig(
                    "architecture sets both layers_count and layers".to_string(),
                ))
            }
            (None, None) => {
                return Err(BackpropError::InvalidConfig(
                    "architecture needs layers_count or layers".to_string(),
                ))
            }
            (Some(layers_count), None) => {
                NetworkShape::chained(self.x_size, self.y_size, layers_count)?
            }
            (None, Some(layers)) => NetworkShape {
                x_size: self.x_size,
                y_size: self.y_size,
                layers: layers.clone(),
            },
        };
        shape.validate()?;
        Ok(shape)
    }
}

/// Loads a network shape from a JSON architecture file.
///
/// # Returns
///
/// `Ok(NetworkShape)` on success, or an error if the file cannot be read, the
/// JSON is invalid or the layers do not chain.
///
/// # Examples
///
/// ```no_run
/// use backprop::architecture::load_architecture;
///
/// let shape = load_architecture("config/architectures/xor.json").unwrap();
/// assert_eq!(shape.layers_count(), 2);
/// ```
pub fn load_architecture<P: AsRef<Path>>(path: P) -> Result<NetworkShape> {
    let contents = fs::read_to_string(path)?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    config.to_shape()
}
