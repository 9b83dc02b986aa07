//! Counters filled in by the trainer.
//!
//! Stats records are owned by the caller and passed in by reference; the
//! trainer only ever adds to them (or resets them where a call documents it).

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Result of the most recent `exercise` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExerciseStats {
    /// Summed Hamming error over the set
    pub error: f64,
    pub exercise_elapsed: Duration,
    pub activate_count: usize,
}

impl fmt::Display for ExerciseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exercise_stats: {{ error: {:.6}, exercise_elapsed_us: {}, activate_count: {} }}",
            self.error,
            self.exercise_elapsed.as_micros(),
            self.activate_count
        )
    }
}

/// Accumulated progress of the training loops.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingStats {
    /// Weight correction applied during the current set (reset per set)
    pub set_weight_correction_total: f64,
    /// Weight correction applied during the current batch (reset per batch)
    pub batch_weight_correction_total: f64,
    pub teach_total: usize,
    pub pair_total: usize,
    pub set_total: usize,
    pub batches_total: usize,
    pub stubborn_batches_total: usize,
    pub stagnate_batches_total: usize,
    pub train_elapsed: Duration,
}

impl fmt::Display for TrainingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "training_stats: {{ set_weight_correction_total: {:.6}, \
             batch_weight_correction_total: {:.6}, teach_total: {}, pair_total: {}, \
             set_total: {}, batches_total: {}, stubborn_batches_total: {}, \
             stagnate_batches_total: {}, train_elapsed_us: {} }}",
            self.set_weight_correction_total,
            self.batch_weight_correction_total,
            self.teach_total,
            self.pair_total,
            self.set_total,
            self.batches_total,
            self.stubborn_batches_total,
            self.stagnate_batches_total,
            self.train_elapsed.as_micros()
        )
    }
}
