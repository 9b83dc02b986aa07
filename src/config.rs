//! Configuration structures for training and evolution
//!
//! This module provides the hyperparameter records of the [`Trainer`] and the
//! [`Evolver`], their defaults, and loaders that read them from JSON files.
//! Every field is optional in the file; missing fields keep their defaults.
//!
//! [`Trainer`]: crate::trainer::Trainer
//! [`Evolver`]: crate::evolver::Evolver

use crate::error::{BackpropError, Result};
use crate::utils::LearningAccelerator;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The smaller golden section, 1 - 1/phi.
pub const MIN_GOLD: f64 = 0.3819660113;

/// Hyperparameters of the nested training loops.
///
/// # Example
///
/// ```json
/// {
///   "error_tolerance": 0.0,
///   "learning_rate": 0.3819660113,
///   "max_batches": 255,
///   "batch_prune_threshold": 0.5,
///   "learning_accelerator": { "min_learning_rate": 0.1, "max_learning_rate": 0.9 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Error (in bits) at or below which training stops
    pub error_tolerance: f64,

    /// Step size of each weight update; adapted between sets
    pub learning_rate: f64,

    /// Configured but not applied to weight updates
    pub momentum_rate: f64,

    /// Scale of the uniform noise added to every weight update
    pub mutation_rate: f64,

    /// Maximum TeachPair repetitions per TrainPair
    pub max_reps: usize,

    /// Maximum sets per batch (0 means unbounded)
    pub max_batch_sets: usize,

    /// Maximum batches per Train (0 means unbounded)
    pub max_batches: usize,

    /// Minimum error improvement for a stubborn set or batch to count as progress
    pub stagnate_tolerance: f64,

    pub max_stagnate_sets: usize,

    /// 0 means unbounded
    pub max_stagnate_batches: usize,

    /// Weight correction below which a set is stubborn
    pub min_set_weight_correction_limit: f64,

    /// Weight correction below which a batch is stubborn
    pub min_batch_weight_correction_limit: f64,

    /// Highest prune threshold Train advances to (0 disables pruning)
    pub batch_prune_threshold: f64,

    /// Step of the prune threshold after each successful batch
    pub batch_prune_rate: f64,

    /// Share of the training set sampled by each TrainSet
    pub training_ratio: f64,

    pub learning_accelerator: LearningAccelerator,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            error_tolerance: 0.0,
            learning_rate: MIN_GOLD,
            momentum_rate: 0.01,
            mutation_rate: 0.001,
            max_reps: 255,
            max_batch_sets: 255,
            max_batches: 255,
            stagnate_tolerance: 1.0,
            max_stagnate_sets: 15,
            max_stagnate_batches: 15,
            min_set_weight_correction_limit: 0.1,
            min_batch_weight_correction_limit: 0.1,
            batch_prune_threshold: 0.5,
            batch_prune_rate: 0.1,
            training_ratio: 0.5,
            learning_accelerator: LearningAccelerator::default(),
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("error_tolerance", self.error_tolerance),
            ("learning_rate", self.learning_rate),
            ("momentum_rate", self.momentum_rate),
            ("mutation_rate", self.mutation_rate),
            ("stagnate_tolerance", self.stagnate_tolerance),
            (
                "min_set_weight_correction_limit",
                self.min_set_weight_correction_limit,
            ),
            (
                "min_batch_weight_correction_limit",
                self.min_batch_weight_correction_limit,
            ),
            ("batch_prune_threshold", self.batch_prune_threshold),
            ("batch_prune_rate", self.batch_prune_rate),
        ];

        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(BackpropError::InvalidConfig(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        if !(self.training_ratio > 0.0 && self.training_ratio <= 1.0) {
            return Err(BackpropError::InvalidConfig(format!(
                "training_ratio must be in (0, 1], got {}",
                self.training_ratio
            )));
        }

        if self.batch_prune_threshold > 0.0 && self.batch_prune_rate <= 0.0 {
            return Err(BackpropError::InvalidConfig(
                "batch_prune_rate must be positive when pruning is enabled".to_string(),
            ));
        }

        let accelerator = &self.learning_accelerator;
        if accelerator.min_learning_rate < 0.0 || accelerator.acceleration < 0.0 {
            return Err(BackpropError::InvalidConfig(
                "learning_accelerator rates must be non-negative".to_string(),
            ));
        }
        if accelerator.min_learning_rate > accelerator.max_learning_rate {
            return Err(BackpropError::InvalidConfig(format!(
                "learning_accelerator min_learning_rate {} exceeds max_learning_rate {}",
                accelerator.min_learning_rate, accelerator.max_learning_rate
            )));
        }

        Ok(())
    }
}

/// Parameters of the population optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolverConfig {
    /// Networks in the pool, including the copy of the caller's network
    pub pool_count: usize,
    pub max_generations: usize,
    /// Weight of the best network's noise when mating
    pub mate_rate: f64,
    /// Configured but not applied
    pub mutation_limit: f64,
    /// First seed used to randomize pool members; incremented per member
    pub seed: u64,
    pub random_gain: f64,
}

impl Default for EvolverConfig {
    fn default() -> Self {
        Self {
            pool_count: 4,
            max_generations: 4,
            mate_rate: MIN_GOLD,
            mutation_limit: 1.0,
            seed: 0,
            random_gain: 4.0,
        }
    }
}

impl EvolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pool_count == 0 {
            return Err(BackpropError::InvalidConfig(
                "pool_count must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.mate_rate) {
            return Err(BackpropError::InvalidConfig(format!(
                "mate_rate must be in [0, 1], got {}",
                self.mate_rate
            )));
        }
        if self.random_gain.is_nan() || self.random_gain < 0.0 {
            return Err(BackpropError::InvalidConfig(format!(
                "random_gain must be non-negative, got {}",
                self.random_gain
            )));
        }
        Ok(())
    }
}

/// Loads a trainer configuration from a JSON file.
///
/// # Returns
///
/// `Ok(TrainerConfig)` on success, or an error if the file cannot be read,
/// the JSON is invalid or a value is out of range.
///
/// # Examples
///
/// ```no_run
/// use backprop::config::load_trainer_config;
///
/// let cfg = load_trainer_config("config/trainer.json").unwrap();
/// assert_eq!(cfg.max_reps, 255);
/// ```
pub fn load_trainer_config<P: AsRef<Path>>(path: P) -> Result<TrainerConfig> {
    let contents = fs::read_to_string(path)?;
    let config: TrainerConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Loads an evolver configuration from a JSON file.
pub fn load_evolver_config<P: AsRef<Path>>(path: P) -> Result<EvolverConfig> {
    let contents = fs::read_to_string(path)?;
    let config: EvolverConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
