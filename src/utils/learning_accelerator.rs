//! Error-driven learning rate adaptation.
//!
//! Unlike an epoch-based scheduler, the accelerator looks at two consecutive
//! error measurements and decides the next learning rate from them: a worse
//! error drops the rate to the floor, an improvement lets it climb by a fixed
//! step until it leaves the allowed band, where it is clamped.

use serde::{Deserialize, Serialize};

/// Learning rate accelerator.
///
/// # Fields
///
/// * `min_learning_rate` - Floor the rate falls back to when error grows
/// * `max_learning_rate` - Ceiling the rate is clamped to
/// * `acceleration` - Step added to the rate after each non-worsening measurement
///
/// # Example
///
/// ```
/// use backprop::utils::learning_accelerator::LearningAccelerator;
///
/// let accelerator = LearningAccelerator::default();
/// // Error got worse: the rate restarts at the floor.
/// assert_eq!(accelerator.accelerate(0.6, 3.0, 2.0), 0.1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningAccelerator {
    pub min_learning_rate: f64,
    pub max_learning_rate: f64,
    pub acceleration: f64,
}

impl Default for LearningAccelerator {
    fn default() -> Self {
        Self {
            min_learning_rate: 0.1,
            max_learning_rate: 0.9,
            acceleration: 0.1,
        }
    }
}

impl LearningAccelerator {
    pub fn new(min_learning_rate: f64, max_learning_rate: f64, acceleration: f64) -> Self {
        Self {
            min_learning_rate,
            max_learning_rate,
            acceleration,
        }
    }

    /// Compute the next learning rate from the current one and two errors.
    ///
    /// The accelerator keeps no state between calls: a reset of the
    /// acceleration only affects the value returned by this call.
    pub fn accelerate(&self, learning_rate: f64, error_now: f64, error_prev: f64) -> f64 {
        let max_learning_rate = self.max_learning_rate;
        let min_learning_rate = self.min_learning_rate.min(max_learning_rate);
        let mut acceleration = self.acceleration;
        let mut learning_rate = learning_rate;

        if error_now > error_prev {
            learning_rate = min_learning_rate;
            acceleration = 0.0;
        } else if learning_rate < min_learning_rate {
            learning_rate = min_learning_rate;
            acceleration = 0.0;
        } else if learning_rate > max_learning_rate {
            learning_rate = max_learning_rate;
            acceleration = 0.0;
        }

        learning_rate + acceleration
    }
}
