//! Lifecycle events fired by the trainer and the evolver.
//!
//! Listeners observe training; they never influence control flow. A trainer
//! with no listeners skips dispatch entirely.

use crate::evolver::{EvolutionStats, EvolverEvent, EvolverListener};
use crate::network::Network;
use crate::training_set::TrainingSet;
use log::{log, log_enabled, Level};

/// One lifecycle point of the training loops.
#[derive(Debug)]
pub enum TrainerEvent<'a> {
    AfterInput {
        network: &'a Network,
    },
    AfterActivate {
        network: &'a Network,
    },
    BeforeTeachPair {
        x: &'a [u8],
        y_desired: &'a [u8],
    },
    AfterTeachPair {
        x: &'a [u8],
        y_desired: &'a [u8],
        y_actual: &'a [u8],
        error: f64,
        weight_correction: f64,
    },
    BeforeTrainPair {
        x: &'a [u8],
        y_desired: &'a [u8],
    },
    AfterTrainPair {
        x: &'a [u8],
        y_desired: &'a [u8],
        y_actual: &'a [u8],
        error: f64,
    },
    BeforeTrainSet {
        training_set: &'a TrainingSet,
    },
    AfterTrainSet {
        training_set: &'a TrainingSet,
        error: f64,
        weight_correction: f64,
    },
    BeforeTrainBatch {
        training_set: &'a TrainingSet,
    },
    AfterStubbornSet {
        error: f64,
    },
    AfterStagnateSet {
        batch_sets: usize,
        stagnate_sets: usize,
        error: f64,
    },
    AfterMaxStagnateSets {
        batch_sets: usize,
        stagnate_sets: usize,
        error: f64,
    },
    AfterTrainBatch {
        batch_sets: usize,
        error: f64,
    },
    BeforeTrain {
        training_set: &'a TrainingSet,
    },
    AfterStubbornBatch {
        error: f64,
    },
    AfterStagnateBatch {
        stagnate_batches: usize,
        error: f64,
    },
    AfterMaxStagnateBatches {
        stagnate_batches: usize,
        error: f64,
    },
    AfterTrainSuccess {
        error: f64,
    },
    AfterTrainFailure {
        error: f64,
    },
    AfterTrain {
        batches: usize,
        error: f64,
    },
}

/// Receiver of trainer events.
pub trait TrainerListener {
    fn on_event(&mut self, event: &TrainerEvent<'_>);
}

/// Renders trainer and evolver events as log records.
///
/// Input, activation and pair events go to `trace`, set, batch and generation
/// events to `debug`, and the outcome of a whole training run to `info`
/// (success) or `warn` (failure).
#[derive(Debug, Default, Clone)]
pub struct LogListener;

impl LogListener {
    pub fn new() -> Self {
        Self
    }
}

/// Log level a [`LogListener`] uses for `event`.
pub fn trainer_event_level(event: &TrainerEvent<'_>) -> Level {
    match event {
        TrainerEvent::AfterInput { .. }
        | TrainerEvent::AfterActivate { .. }
        | TrainerEvent::BeforeTeachPair { .. }
        | TrainerEvent::AfterTeachPair { .. }
        | TrainerEvent::BeforeTrainPair { .. }
        | TrainerEvent::AfterTrainPair { .. } => Level::Trace,
        TrainerEvent::AfterTrainSuccess { .. } => Level::Info,
        TrainerEvent::AfterTrainFailure { .. } => Level::Warn,
        _ => Level::Debug,
    }
}

/// One-line rendering of `event` in the listener's key/value style.
pub fn format_trainer_event(event: &TrainerEvent<'_>) -> String {
    match event {
        TrainerEvent::AfterInput { network } => {
            format!("input: {{ x: {:02X?} }}", network.input_bytes())
        }
        TrainerEvent::AfterActivate { network } => {
            format!("activated: {{ y: {:02X?} }}", network.output())
        }
        TrainerEvent::BeforeTeachPair { x, y_desired } => format!(
            "teach_pair: {{ x: {:02X?}, y_desired: {:02X?} }}",
            x, y_desired
        ),
        TrainerEvent::AfterTeachPair {
            error,
            weight_correction,
            ..
        } => format!(
            "taught_pair: {{ error: {:.6}, weight_correction: {:.6} }}",
            error, weight_correction
        ),
        TrainerEvent::BeforeTrainPair { x, y_desired } => format!(
            "train_pair: {{ x: {:02X?}, y_desired: {:02X?} }}",
            x, y_desired
        ),
        TrainerEvent::AfterTrainPair {
            x,
            y_desired,
            y_actual,
            error,
        } => format!(
            "trained_pair: {{ x: {:02X?}, y_desired: {:02X?}, y: {:02X?}, error: {:.6} }}",
            x, y_desired, y_actual, error
        ),
        TrainerEvent::BeforeTrainSet { training_set } => {
            format!("train_set: {{ {} }}", training_set.dimensions())
        }
        TrainerEvent::AfterTrainSet {
            error,
            weight_correction,
            ..
        } => format!(
            "trained_set: {{ error: {:.6}, weight_correction: {:.6} }}",
            error, weight_correction
        ),
        TrainerEvent::BeforeTrainBatch { training_set } => {
            format!("train_batch: {{ {} }}", training_set.dimensions())
        }
        TrainerEvent::AfterStubbornSet { error } => {
            format!("stubborn_set: {{ error: {:.6} }}", error)
        }
        TrainerEvent::AfterStagnateSet {
            batch_sets,
            stagnate_sets,
            error,
        } => format!(
            "stagnate_set: {{ set: {}, batch: {}, error: {:.6} }}",
            stagnate_sets, batch_sets, error
        ),
        TrainerEvent::AfterMaxStagnateSets {
            batch_sets,
            stagnate_sets,
            error,
        } => format!(
            "max_stagnate_sets: {{ sets: {}, stagnant: {}, error: {:.6} }}",
            batch_sets, stagnate_sets, error
        ),
        TrainerEvent::AfterTrainBatch { batch_sets, error } => format!(
            "trained_batch: {{ sets: {}, error: {:.6} }}",
            batch_sets, error
        ),
        TrainerEvent::BeforeTrain { training_set } => {
            format!("train: {{ {} }}", training_set.dimensions())
        }
        TrainerEvent::AfterStubbornBatch { error } => {
            format!("stubborn_batch: {{ error: {:.6} }}", error)
        }
        TrainerEvent::AfterStagnateBatch {
            stagnate_batches,
            error,
        } => format!(
            "stagnate_batch: {{ batch: {}, error: {:.6} }}",
            stagnate_batches, error
        ),
        TrainerEvent::AfterMaxStagnateBatches {
            stagnate_batches,
            error,
        } => format!(
            "max_stagnate_batches: {{ stagnant: {}, error: {:.6} }}",
            stagnate_batches, error
        ),
        TrainerEvent::AfterTrainSuccess { error } => {
            format!("train: {{ success: true, error: {:.6} }}", error)
        }
        TrainerEvent::AfterTrainFailure { error } => {
            format!("train: {{ success: false, error: {:.6} }}", error)
        }
        TrainerEvent::AfterTrain { batches, error } => format!(
            "trained: {{ batches: {}, error: {:.6} }}",
            batches, error
        ),
    }
}

impl TrainerListener for LogListener {
    fn on_event(&mut self, event: &TrainerEvent<'_>) {
        let level = trainer_event_level(event);
        if log_enabled!(level) {
            log!(level, "{}", format_trainer_event(event));
        }
    }
}

/// One-line rendering of an evolver event, with the running mate count.
pub fn format_evolver_event(event: &EvolverEvent<'_>, stats: &EvolutionStats) -> String {
    match event {
        EvolverEvent::BeforeGeneration { generation } => {
            format!("generation: {{ index: {} }}", generation)
        }
        EvolverEvent::AfterGeneration {
            generation,
            best_error,
        } => format!(
            "generation: {{ index: {}, best_error: {:.6}, mated: {} }}",
            generation, best_error, stats.mate_networks_count
        ),
        EvolverEvent::BeforeMateNetworks { member, .. } => {
            format!("mate_network: {{ member: {} }}", member)
        }
        EvolverEvent::AfterMateNetworks { member, best } => {
            format!("mated_network: {{ member: {}, best: {} }}", member, best)
        }
        EvolverEvent::BeforeMateLayers { member, layer } => {
            format!("mate_layer: {{ member: {}, layer: {} }}", member, layer)
        }
        EvolverEvent::AfterMateLayers { member, layer } => {
            format!("mated_layer: {{ member: {}, layer: {} }}", member, layer)
        }
    }
}

impl EvolverListener for LogListener {
    fn on_event(&mut self, event: &EvolverEvent<'_>, stats: &EvolutionStats) {
        let level = match event {
            EvolverEvent::BeforeGeneration { .. } | EvolverEvent::AfterGeneration { .. } => {
                Level::Debug
            }
            _ => Level::Trace,
        };
        if log_enabled!(level) {
            log!(level, "{}", format_evolver_event(event, stats));
        }
    }
}
