//! Population-based hybrid optimizer
//!
//! The [`Evolver`] trains a pool of networks with the same shape side by side
//! and, after every generation, mates each ordinary pool member with the best
//! performer. The caller's network is the first pool member; the weights that
//! achieved the lowest error are copied back into it at the end.

use crate::config::EvolverConfig;
use crate::context::Context;
use crate::error::Result;
use crate::network::Network;
use crate::trainer::{ExerciseStats, Trainer, TrainingStats};
use crate::training_set::TrainingSet;
use log::debug;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Counters of one `evolve` run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvolutionStats {
    pub generation_count: usize,
    pub mate_networks_count: usize,
    pub evolve_elapsed: Duration,
}

impl fmt::Display for EvolutionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "evolution_stats: {{ generation_count: {}, mate_networks_count: {}, evolve_elapsed_us: {} }}",
            self.generation_count,
            self.mate_networks_count,
            self.evolve_elapsed.as_micros()
        )
    }
}

/// One lifecycle point of an evolution run.
///
/// `member` and `best` are pool indices; index 0 holds the caller's network.
#[derive(Debug)]
pub enum EvolverEvent<'a> {
    BeforeGeneration { generation: usize },
    AfterGeneration { generation: usize, best_error: f64 },
    BeforeMateNetworks { member: usize, network: &'a Network },
    AfterMateNetworks { member: usize, best: usize },
    BeforeMateLayers { member: usize, layer: usize },
    AfterMateLayers { member: usize, layer: usize },
}

/// Receiver of evolver events.
pub trait EvolverListener {
    fn on_event(&mut self, event: &EvolverEvent<'_>, stats: &EvolutionStats);
}

/// Population optimizer parameters plus optional event listeners.
pub struct Evolver {
    pub config: EvolverConfig,
    listeners: Vec<Box<dyn EvolverListener>>,
}

impl Default for Evolver {
    fn default() -> Self {
        Self::new(EvolverConfig::default())
    }
}

impl Evolver {
    pub fn new(config: EvolverConfig) -> Self {
        Self {
            config,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: Box<dyn EvolverListener>) {
        self.listeners.push(listener);
    }

    fn emit(&mut self, event: EvolverEvent<'_>, stats: &EvolutionStats) {
        for listener in &mut self.listeners {
            listener.on_event(&event, stats);
        }
    }

    /// Evolve `network` toward the training set.
    ///
    /// Builds a pool of `pool_count` networks: a copy of `network` followed by
    /// members randomized with `random_gain` and seeds `seed`, `seed + 1`, ...
    /// Each generation batch-trains every member except the copy, then mates
    /// every member that is neither the best nor the worst with the best.
    /// Runs for at most `max_generations` generations, or until a member
    /// reaches the trainer's error tolerance.
    ///
    /// Member errors are measured by exercising the whole set after each
    /// batch. The returned error is the lowest seen, never worse than the
    /// unevolved network's, and `network` ends up holding the weights that
    /// produced it.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Context used for pool allocation, randomization and training
    /// * `stats` - Overwritten with this run's counters
    /// * `trainer` - Trainer used for every batch; its learning rate adapts
    /// * `training_stats` - Accumulates the trainer's counters
    /// * `exercise_stats` - Receives the last exercise measurement
    /// * `network` - Seed network, replaced by the best weights found
    /// * `training_set` - Pairs to learn
    #[allow(clippy::too_many_arguments)]
    pub fn evolve(
        &mut self,
        ctx: &mut Context,
        stats: &mut EvolutionStats,
        trainer: &mut Trainer,
        training_stats: &mut TrainingStats,
        exercise_stats: &mut ExerciseStats,
        network: &mut Network,
        training_set: &TrainingSet,
    ) -> Result<f64> {
        let start = Instant::now();
        let tolerance = trainer.config.error_tolerance;
        let pool_count = self.config.pool_count.max(1);
        let mate_rate = self.config.mate_rate;

        let shape = network.shape();
        let mut pool = Vec::with_capacity(pool_count);
        for _ in 0..pool_count {
            pool.push(Network::with_shape(ctx, &shape)?);
        }

        pool[0].copy_weights_from(network)?;
        pool[0].set_jitter(network.jitter());

        let mut seed = self.config.seed;
        for member in pool.iter_mut().skip(1) {
            member.set_jitter(network.jitter());
            member.randomize(&mut ctx.rng, self.config.random_gain, seed);
            seed = seed.wrapping_add(1);
        }

        let error = trainer.exercise(ctx, exercise_stats, &mut pool[0], training_set)?;

        let mut best_error = error;
        let mut best = 0;
        let mut best_weights = pool[0].weights_snapshot();

        let mut worst_error = error;
        let mut worst = 0;

        *stats = EvolutionStats::default();

        let mut generation = 0;
        while best_error > tolerance && generation < self.config.max_generations {
            self.emit(EvolverEvent::BeforeGeneration { generation }, stats);

            for (i, member) in pool.iter_mut().enumerate().skip(1) {
                trainer.train_batch(ctx, training_stats, exercise_stats, member, training_set)?;
                let error = trainer.exercise(ctx, exercise_stats, member, training_set)?;

                if error < best_error {
                    best_error = error;
                    best = i;
                    best_weights = member.weights_snapshot();
                }

                if best_error <= tolerance {
                    break;
                }

                if error > worst_error {
                    worst_error = error;
                    worst = i;
                }
            }

            if best_error <= tolerance {
                break;
            }

            for i in 0..pool.len() {
                if i == best || i == worst {
                    continue;
                }
                self.mate_networks(ctx, stats, &mut pool, i, best, mate_rate);
            }

            self.emit(
                EvolverEvent::AfterGeneration {
                    generation,
                    best_error,
                },
                stats,
            );

            generation += 1;
            stats.generation_count += 1;
        }

        network.restore_weights(&best_weights)?;

        stats.evolve_elapsed = start.elapsed();
        debug!(
            "evolve: generations={} best_member={} best_error={}",
            stats.generation_count, best, best_error
        );
        Ok(best_error)
    }

    /// Mate pool member `member` with pool member `best`, layer by layer.
    fn mate_networks(
        &mut self,
        ctx: &mut Context,
        stats: &mut EvolutionStats,
        pool: &mut [Network],
        member: usize,
        best: usize,
        mate_rate: f64,
    ) {
        self.emit(
            EvolverEvent::BeforeMateNetworks {
                member,
                network: &pool[member],
            },
            stats,
        );

        stats.mate_networks_count += 1;

        let (beta, alpha) = pair_mut(pool, member, best);
        for (layer, (beta_layer, alpha_layer)) in beta
            .layers_mut()
            .iter_mut()
            .zip(alpha.layers().iter())
            .enumerate()
        {
            self.emit(EvolverEvent::BeforeMateLayers { member, layer }, stats);
            beta_layer.mate_with(alpha_layer, mate_rate, &mut ctx.rng);
            self.emit(EvolverEvent::AfterMateLayers { member, layer }, stats);
        }

        self.emit(EvolverEvent::AfterMateNetworks { member, best }, stats);
    }
}

/// Mutable access to `pool[member]` alongside shared access to `pool[best]`.
fn pair_mut(pool: &mut [Network], member: usize, best: usize) -> (&mut Network, &Network) {
    if member < best {
        let (head, tail) = pool.split_at_mut(best);
        (&mut head[member], &tail[0])
    } else {
        let (head, tail) = pool.split_at_mut(member);
        (&mut tail[0], &head[best])
    }
}
