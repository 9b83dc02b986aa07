//! Supervised training of byte networks
//!
//! The [`Trainer`] drives gradient descent through four nested loops:
//!
//! - `teach_pair`: one backpropagation step for one input/output pair
//! - `train_pair`: repeat `teach_pair` until the pair is learned or `max_reps` runs out
//! - `train_set`: `train_pair` over a random sample of the training set
//! - `train_batch`: repeat `train_set` with an adaptive learning rate until the
//!   error reaches tolerance, corrections dry up or sets stagnate
//! - `train`: repeat `train_batch`, pruning after every successful batch, until
//!   the error reaches tolerance or batches stagnate
//!
//! Error is always the Hamming distance between the network's output bytes and
//! the desired bytes, summed over the pairs involved.

pub mod events;
pub mod stats;

pub use events::{LogListener, TrainerEvent, TrainerListener};
pub use stats::{ExerciseStats, TrainingStats};

use crate::config::TrainerConfig;
use crate::context::Context;
use crate::error::{BackpropError, Result};
use crate::network::Network;
use crate::training_set::{TrainingSet, TrainingSetDimensions};
use crate::utils::SimpleRng;
use crate::BITS_PER_SYMBOL;
use log::debug;
use std::time::Instant;

/// Training driver: hyperparameters plus optional event listeners.
///
/// The only state that changes across calls is `config.learning_rate`, which
/// the learning accelerator adapts after every set.
///
/// # Example
///
/// ```
/// use backprop::{Context, Network, Trainer, TrainingSet};
/// use backprop::trainer::ExerciseStats;
///
/// let mut ctx = Context::new(3);
/// let mut network = Network::new(&ctx, 1, 1, 1).unwrap();
/// let set = TrainingSet::from_pairs(&ctx, &[(&[0x00][..], &[0x00][..])]).unwrap();
///
/// let mut trainer = Trainer::default();
/// let mut stats = ExerciseStats::default();
/// let error = trainer.exercise(&mut ctx, &mut stats, &mut network, &set).unwrap();
/// assert_eq!(error, 0.0);
/// assert_eq!(stats.activate_count, 1);
/// ```
pub struct Trainer {
    pub config: TrainerConfig,
    listeners: Vec<Box<dyn TrainerListener>>,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainerConfig::default())
    }
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            listeners: Vec::new(),
        }
    }

    /// Subscribe a listener to every subsequent event.
    pub fn add_listener(&mut self, listener: Box<dyn TrainerListener>) {
        self.listeners.push(listener);
    }

    pub fn clear_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn learning_rate(&self) -> f64 {
        self.config.learning_rate
    }

    fn emit(&mut self, event: TrainerEvent<'_>) {
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
    }

    /// Activate the network on every pair and sum the errors.
    ///
    /// Weights are never modified. `stats` is overwritten with this call's
    /// error, elapsed time and activation count.
    pub fn exercise(
        &mut self,
        ctx: &mut Context,
        stats: &mut ExerciseStats,
        network: &mut Network,
        training_set: &TrainingSet,
    ) -> Result<f64> {
        check_dimensions(network, training_set)?;

        let start = Instant::now();
        *stats = ExerciseStats::default();

        let mut error = 0.0;
        for (x, y) in training_set.iter() {
            network.input(x)?;
            self.emit(TrainerEvent::AfterInput { network: &*network });

            network.activate(&mut ctx.rng);
            self.emit(TrainerEvent::AfterActivate { network: &*network });

            error += compute_error(network.output(), y);
            stats.activate_count += 1;
        }

        stats.exercise_elapsed = start.elapsed();
        stats.error = error;
        Ok(error)
    }

    /// One backpropagation step toward `y_desired`.
    ///
    /// Returns immediately, without touching any weight, when the current
    /// output is already within tolerance. Otherwise corrects every layer from
    /// the output back to the input and returns the error after the update.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Source of jitter and mutation noise
    /// * `stats` - Receives the weight correction and the teach count
    /// * `network` - Network to correct
    /// * `x` - Input bytes, `network.x_size()` long
    /// * `y_desired` - Desired output bytes, `network.y_size()` long
    pub fn teach_pair(
        &mut self,
        ctx: &mut Context,
        stats: &mut TrainingStats,
        network: &mut Network,
        x: &[u8],
        y_desired: &[u8],
    ) -> Result<f64> {
        check_pair(network, x, y_desired)?;

        self.emit(TrainerEvent::BeforeTeachPair { x, y_desired });

        network.input(x)?;
        self.emit(TrainerEvent::AfterInput { network: &*network });

        network.activate(&mut ctx.rng);
        self.emit(TrainerEvent::AfterActivate { network: &*network });

        let error = compute_error(network.output(), y_desired);
        if error <= self.config.error_tolerance {
            return Ok(error);
        }

        let weight_correction = self.backpropagate(&mut ctx.rng, network, y_desired)?;

        network.activate(&mut ctx.rng);
        self.emit(TrainerEvent::AfterActivate { network: &*network });

        let error = compute_error(network.output(), y_desired);
        self.emit(TrainerEvent::AfterTeachPair {
            x,
            y_desired,
            y_actual: network.output(),
            error,
            weight_correction,
        });

        stats.batch_weight_correction_total += weight_correction;
        stats.set_weight_correction_total += weight_correction;
        stats.teach_total += 1;

        Ok(error)
    }

    /// Correct every layer's weights; returns the total weight correction.
    fn backpropagate(
        &self,
        rng: &mut SimpleRng,
        network: &mut Network,
        y_desired: &[u8],
    ) -> Result<f64> {
        let learning_rate = self.config.learning_rate;
        let mutation_rate = self.config.mutation_rate;

        let layers = network.layers_mut();
        let last = layers.len() - 1;

        let output = &mut layers[last];
        output.output_gradients(desired_bits(y_desired));
        let mut correction_total = output.correct_weights(learning_rate, mutation_rate, rng);

        // Hidden layers, from the output side toward the input.
        for k in (1..=last).rev() {
            let (head, tail) = layers.split_at_mut(k);
            let layer = &mut head[k - 1];
            tail[0].weighted_gradient(layer.gradients_mut())?;
            layer.hidden_gradients();
            correction_total += layer.correct_weights(learning_rate, mutation_rate, rng);
        }

        Ok(correction_total)
    }

    /// Teach one pair until its error is within tolerance, at most `max_reps` times.
    pub fn train_pair(
        &mut self,
        ctx: &mut Context,
        stats: &mut TrainingStats,
        network: &mut Network,
        x: &[u8],
        y_desired: &[u8],
    ) -> Result<f64> {
        check_pair(network, x, y_desired)?;

        self.emit(TrainerEvent::BeforeTrainPair { x, y_desired });

        let tolerance = self.config.error_tolerance;
        let max_reps = self.config.max_reps.max(1);
        let mut reps = 0;
        let error = loop {
            let error = self.teach_pair(ctx, stats, network, x, y_desired)?;
            reps += 1;
            if reps >= max_reps || error <= tolerance {
                break error;
            }
        };

        self.emit(TrainerEvent::AfterTrainPair {
            x,
            y_desired,
            y_actual: network.output(),
            error,
        });

        stats.pair_total += 1;
        Ok(error)
    }

    /// Train a random sample of the set's pairs.
    ///
    /// The sample holds `round(training_ratio * count)` pairs, kept within
    /// `[1, count - 1]`; pairs are drawn independently, so repeats happen.
    /// An empty set returns 0 without doing anything.
    pub fn train_set(
        &mut self,
        ctx: &mut Context,
        stats: &mut TrainingStats,
        network: &mut Network,
        training_set: &TrainingSet,
    ) -> Result<f64> {
        if training_set.is_empty() {
            return Ok(0.0);
        }
        check_dimensions(network, training_set)?;

        let count = training_set.count();
        let sample_count = sample_count(self.config.training_ratio, count);

        self.emit(TrainerEvent::BeforeTrainSet { training_set });

        let mut error = 0.0;
        for _ in 0..sample_count {
            let index = ctx.rng.random_index(0, count);
            let (x, y) = training_set.pair(index)?;
            error += self.train_pair(ctx, stats, network, x, y)?;
        }

        self.emit(TrainerEvent::AfterTrainSet {
            training_set,
            error,
            weight_correction: stats.set_weight_correction_total,
        });

        stats.set_total += 1;
        Ok(error)
    }

    /// Repeat `train_set`, adapting the learning rate after each set.
    ///
    /// Stops when the error reaches tolerance, after `max_batch_sets` sets
    /// (unless 0), after `max_stagnate_sets` stagnating sets, or as soon as a
    /// set's weight correction falls to `min_set_weight_correction_limit`.
    pub fn train_batch(
        &mut self,
        ctx: &mut Context,
        stats: &mut TrainingStats,
        exercise_stats: &mut ExerciseStats,
        network: &mut Network,
        training_set: &TrainingSet,
    ) -> Result<f64> {
        let tolerance = self.config.error_tolerance;
        let stagnate_tolerance = self.config.stagnate_tolerance;
        let max_stagnate_sets = self.config.max_stagnate_sets;
        let max_batch_sets = self.config.max_batch_sets;
        let min_set_limit = self.config.min_set_weight_correction_limit;

        let mut stagnate_sets = 0;
        let mut batch_sets = 0;

        let mut error = self.exercise(ctx, exercise_stats, network, training_set)?;
        let mut last_error = error;

        self.emit(TrainerEvent::BeforeTrainBatch { training_set });

        loop {
            stats.set_weight_correction_total = 0.0;

            error = self.train_set(ctx, stats, network, training_set)?;

            self.config.learning_rate = self.config.learning_accelerator.accelerate(
                self.config.learning_rate,
                error,
                last_error,
            );

            if error <= tolerance {
                error = self.exercise(ctx, exercise_stats, network, training_set)?;
            }

            if min_set_limit > stats.set_weight_correction_total {
                self.emit(TrainerEvent::AfterStubbornSet { error });

                if last_error <= error || (last_error - error) < stagnate_tolerance {
                    stagnate_sets += 1;
                    self.emit(TrainerEvent::AfterStagnateSet {
                        batch_sets,
                        stagnate_sets,
                        error,
                    });
                } else {
                    stagnate_sets = 0;
                }
            }

            last_error = error;
            batch_sets += 1;

            if error <= tolerance {
                break;
            }
            if max_batch_sets != 0 && batch_sets >= max_batch_sets {
                break;
            }
            if stagnate_sets >= max_stagnate_sets {
                break;
            }
            if stats.set_weight_correction_total <= min_set_limit {
                break;
            }
        }

        if stagnate_sets >= max_stagnate_sets {
            self.emit(TrainerEvent::AfterMaxStagnateSets {
                batch_sets,
                stagnate_sets,
                error,
            });
        }

        self.emit(TrainerEvent::AfterTrainBatch { batch_sets, error });

        stats.batches_total += 1;
        debug!(
            "train_batch: sets={} error={} learning_rate={}",
            batch_sets, error, self.config.learning_rate
        );
        Ok(error)
    }

    /// Train the network on the set until it reproduces it within tolerance
    /// or progress stops.
    ///
    /// After every batch that reaches tolerance the network is pruned with a
    /// running threshold that starts at `batch_prune_rate` and grows by it up
    /// to `batch_prune_threshold`. Stops when the error reaches tolerance,
    /// after `max_batches` batches (unless 0), once the running threshold
    /// reaches `batch_prune_threshold` (unless pruning is disabled with 0), or
    /// after `max_stagnate_batches` stagnating batches (unless 0).
    ///
    /// The weights with the lowest error seen are kept, so the network never
    /// ends up worse than it started.
    pub fn train(
        &mut self,
        ctx: &mut Context,
        stats: &mut TrainingStats,
        exercise_stats: &mut ExerciseStats,
        network: &mut Network,
        training_set: &TrainingSet,
    ) -> Result<f64> {
        let tolerance = self.config.error_tolerance;
        let stagnate_tolerance = self.config.stagnate_tolerance;
        let max_stagnate_batches = self.config.max_stagnate_batches;
        let max_batches = self.config.max_batches;
        let min_batch_limit = self.config.min_batch_weight_correction_limit;
        let prune_limit = self.config.batch_prune_threshold;
        let prune_rate = self.config.batch_prune_rate;

        let start = Instant::now();

        let mut error = self.exercise(ctx, exercise_stats, network, training_set)?;
        let mut last_error = error;
        if error <= tolerance {
            return Ok(error);
        }

        self.emit(TrainerEvent::BeforeTrain { training_set });

        let mut prune_threshold = prune_rate;
        let mut stagnate_batches = 0;
        let mut batch_count = 0;
        let mut best_error = error;
        let mut best_weights = network.weights_snapshot();

        loop {
            stats.batch_weight_correction_total = 0.0;

            error = self.train_batch(ctx, stats, exercise_stats, network, training_set)?;

            if error <= tolerance && prune_limit > 0.0 {
                self.prune(network, prune_threshold);
                prune_threshold = (prune_threshold + prune_rate).min(prune_limit);
            }

            error = self.exercise(ctx, exercise_stats, network, training_set)?;
            if error < best_error {
                best_error = error;
                best_weights = network.weights_snapshot();
            }

            if error > tolerance && min_batch_limit > stats.batch_weight_correction_total {
                stats.stubborn_batches_total += 1;
                self.emit(TrainerEvent::AfterStubbornBatch { error });

                if last_error <= error || (last_error - error) < stagnate_tolerance {
                    self.emit(TrainerEvent::AfterStagnateBatch {
                        stagnate_batches,
                        error,
                    });
                    stagnate_batches += 1;
                    stats.stagnate_batches_total += 1;
                }
            }

            last_error = error;
            batch_count += 1;

            if error <= tolerance {
                break;
            }
            if max_batches != 0 && batch_count >= max_batches {
                break;
            }
            if prune_limit > 0.0 && prune_threshold >= prune_limit {
                break;
            }
            if max_stagnate_batches != 0 && stagnate_batches >= max_stagnate_batches {
                break;
            }
        }

        if best_error < error {
            network.restore_weights(&best_weights)?;
            error = self.exercise(ctx, exercise_stats, network, training_set)?;
            debug!("train: restored best weights, error={}", error);
        }

        if max_stagnate_batches != 0 && stagnate_batches >= max_stagnate_batches {
            self.emit(TrainerEvent::AfterMaxStagnateBatches {
                stagnate_batches,
                error,
            });
        }

        if error > tolerance {
            self.emit(TrainerEvent::AfterTrainFailure { error });
        } else {
            self.emit(TrainerEvent::AfterTrainSuccess { error });
        }
        self.emit(TrainerEvent::AfterTrain {
            batches: batch_count,
            error,
        });

        stats.train_elapsed = start.elapsed();
        debug!("train: batches={} error={}", batch_count, error);
        Ok(error)
    }

    /// Zero every weight of `network` whose magnitude is below `threshold`.
    pub fn prune(&self, network: &mut Network, threshold: f64) {
        network.prune(threshold);
    }
}

/// Hamming distance between two byte strings of equal length.
pub fn compute_error(actual: &[u8], desired: &[u8]) -> f64 {
    actual
        .iter()
        .zip(desired.iter())
        .map(|(a, d)| (a ^ d).count_ones())
        .sum::<u32>() as f64
}

/// Number of pairs presented by one `train_set` call.
fn sample_count(training_ratio: f64, count: usize) -> usize {
    let mut sample_count = (training_ratio * count as f64).round() as usize;
    if sample_count >= count {
        sample_count = count.saturating_sub(1);
    }
    sample_count.max(1)
}

/// Desired bytes expanded LSB-first into 0.0/1.0 bit values.
fn desired_bits(bytes: &[u8]) -> impl Iterator<Item = f64> + '_ {
    bytes
        .iter()
        .flat_map(|&byte| (0..BITS_PER_SYMBOL).map(move |b| f64::from((byte >> b) & 1)))
}

fn check_pair(network: &Network, x: &[u8], y_desired: &[u8]) -> Result<()> {
    if x.len() != network.x_size() {
        return Err(BackpropError::InputSize {
            expected: network.x_size(),
            actual: x.len(),
        });
    }
    if y_desired.len() != network.y_size() {
        return Err(BackpropError::InputSize {
            expected: network.y_size(),
            actual: y_desired.len(),
        });
    }
    Ok(())
}

fn check_dimensions(network: &Network, training_set: &TrainingSet) -> Result<()> {
    if training_set.is_empty() {
        return Ok(());
    }
    let dims = training_set.dimensions();
    if dims.x_size != network.x_size() || dims.y_size != network.y_size() {
        return Err(BackpropError::DimensionMismatch {
            expected: TrainingSetDimensions::new(dims.count, network.x_size(), network.y_size()),
            actual: dims,
        });
    }
    Ok(())
}
