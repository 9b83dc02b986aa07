//! Persistence and export
//!
//! - `weights`: the network weights text format
//! - `training_set`: the training set text format
//! - [`to_hash`]: export of any entity as a plain key/value tree

mod scanner;
pub mod training_set;
pub mod weights;

pub use training_set::{
    format_training_set, load_training_set, load_training_set_dimensions, parse_training_set,
    parse_training_set_into, save_training_set,
};
pub use weights::{format_weights, load_weights, parse_weights_into, save_weights};

use crate::error::Result;
use serde::Serialize;
use serde_json::Value;

/// Export an entity (network, layer, training set, config, stats) as a
/// `serde_json::Value` tree.
///
/// # Example
///
/// ```
/// use backprop::{io::to_hash, Context, Network};
///
/// let ctx = Context::new(0);
/// let network = Network::new(&ctx, 1, 1, 1).unwrap();
/// let hash = to_hash(&network).unwrap();
/// assert_eq!(hash["x_size"], 1);
/// assert_eq!(hash["layers"][0]["W"].as_array().unwrap().len(), 64);
/// ```
pub fn to_hash<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
