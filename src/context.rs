//! Explicit engine context.
//!
//! The context bundles the state every operation may need but no entity owns:
//! the random number stream and an optional allocation tracker. It is passed
//! by reference into constructors and training calls, so two contexts never
//! interfere with each other.

use crate::buffers::AllocationTracker;
use crate::utils::SimpleRng;
use std::rc::Rc;

/// Random stream plus optional allocation accounting.
///
/// # Example
///
/// ```
/// use backprop::Context;
///
/// let mut ctx = Context::new(42);
/// let a = ctx.rng.next_f64();
/// ctx.reseed(42);
/// assert_eq!(a, ctx.rng.next_f64());
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    pub rng: SimpleRng,
    tracker: Option<Rc<AllocationTracker>>,
}

impl Context {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SimpleRng::new(seed),
            tracker: None,
        }
    }

    /// Context whose buffers report to `tracker`.
    pub fn with_tracker(seed: u64, tracker: Rc<AllocationTracker>) -> Self {
        Self {
            rng: SimpleRng::new(seed),
            tracker: Some(tracker),
        }
    }

    pub fn tracker(&self) -> Option<&Rc<AllocationTracker>> {
        self.tracker.as_ref()
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }
}

impl Default for Context {
    fn default() -> Self {
        let mut rng = SimpleRng::new(0);
        rng.reseed_from_time();
        Self { rng, tracker: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::ByteBuffer;

    #[test]
    fn test_context_tracker_is_shared() {
        let tracker = Rc::new(AllocationTracker::new());
        let ctx = Context::with_tracker(1, Rc::clone(&tracker));

        let _buffer = ByteBuffer::allocate(4, ctx.tracker()).unwrap();
        assert_eq!(tracker.allocated_total(), 4);
    }

    #[test]
    fn test_context_without_tracker() {
        let ctx = Context::new(1);
        assert!(ctx.tracker().is_none());
    }
}
