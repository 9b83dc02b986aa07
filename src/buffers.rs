//! Owned, fixed-length numeric buffers with allocation accounting.
//!
//! Every array the engine owns (layer weights, gradients, inputs, outputs,
//! network byte ports, training set records) is a [`Buffer`]. Buffers are
//! allocated fallibly and, when a context carries an [`AllocationTracker`],
//! report their byte size on allocation and on drop.

use crate::error::{BackpropError, Result};
use serde::{Serialize, Serializer};
use std::cell::Cell;
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

/// Observer for allocation traffic.
///
/// All methods default to no-ops so an implementation only overrides what it
/// cares about.
pub trait AllocationHook {
    fn on_allocate(&self, _bytes: usize) {}
    fn on_free(&self, _bytes: usize) {}
    fn on_failure(&self, _bytes: usize) {}
}

/// Running totals of bytes allocated and freed by tracked buffers.
///
/// Purely diagnostic: nothing in the engine reads these counters back except
/// the optional `limit`, which makes allocations beyond a byte budget fail.
#[derive(Default)]
pub struct AllocationTracker {
    allocated: Cell<usize>,
    freed: Cell<usize>,
    limit: Option<usize>,
    hook: Option<Box<dyn AllocationHook>>,
}

impl AllocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that refuses allocations once `limit` bytes are in use.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_hook(mut self, hook: Box<dyn AllocationHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn allocated_total(&self) -> usize {
        self.allocated.get()
    }

    pub fn freed_total(&self) -> usize {
        self.freed.get()
    }

    pub fn in_use(&self) -> usize {
        self.allocated.get().saturating_sub(self.freed.get())
    }

    pub fn reset_totals(&self) {
        self.allocated.set(0);
        self.freed.set(0);
    }

    fn admits(&self, bytes: usize) -> bool {
        match self.limit {
            Some(limit) => self.in_use().saturating_add(bytes) <= limit,
            None => true,
        }
    }

    fn record_allocate(&self, bytes: usize) {
        self.allocated.set(self.allocated.get() + bytes);
        if let Some(hook) = &self.hook {
            hook.on_allocate(bytes);
        }
    }

    fn record_free(&self, bytes: usize) {
        self.freed.set(self.freed.get() + bytes);
        if let Some(hook) = &self.hook {
            hook.on_free(bytes);
        }
    }

    fn record_failure(&self, bytes: usize) {
        log::warn!("allocation of {} bytes failed", bytes);
        if let Some(hook) = &self.hook {
            hook.on_failure(bytes);
        }
    }
}

impl fmt::Debug for AllocationTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationTracker")
            .field("allocated", &self.allocated.get())
            .field("freed", &self.freed.get())
            .field("limit", &self.limit)
            .finish()
    }
}

/// Element count of a `rows` by `cols` array.
///
/// An overflowing product can never be allocated, so it is reported as an
/// allocation failure of `usize::MAX` bytes.
pub fn element_count(rows: usize, cols: usize) -> Result<usize> {
    rows.checked_mul(cols)
        .ok_or(BackpropError::Allocation { bytes: usize::MAX })
}

/// Fixed-length, zero-initialised array of `T`.
///
/// The length is set at allocation and never changes; element access goes
/// through `Deref<Target = [T]>`.
pub struct Buffer<T> {
    data: Vec<T>,
    tracker: Option<Rc<AllocationTracker>>,
}

/// Byte buffer used for network ports and training records.
pub type ByteBuffer = Buffer<u8>;

/// Float buffer used for layer vectors and matrices.
pub type FloatBuffer = Buffer<f64>;

impl<T: Copy + Default> Buffer<T> {
    /// Allocate `len` zeroed elements, reporting to `tracker` when present.
    pub fn allocate(len: usize, tracker: Option<&Rc<AllocationTracker>>) -> Result<Self> {
        let bytes = element_count(len, mem::size_of::<T>())?;

        if let Some(tracker) = tracker {
            if !tracker.admits(bytes) {
                tracker.record_failure(bytes);
                return Err(BackpropError::Allocation { bytes });
            }
        }

        let mut data = Vec::new();
        if data.try_reserve_exact(len).is_err() {
            if let Some(tracker) = tracker {
                tracker.record_failure(bytes);
            }
            return Err(BackpropError::Allocation { bytes });
        }
        data.resize(len, T::default());

        if let Some(tracker) = tracker {
            tracker.record_allocate(bytes);
        }

        Ok(Self {
            data,
            tracker: tracker.cloned(),
        })
    }

    /// Size of the buffer contents in bytes.
    pub fn byte_size(&self) -> usize {
        self.data.len() * mem::size_of::<T>()
    }

    /// Overwrite every element with the default value.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
    }

    /// Copy `values` into the buffer; lengths must match.
    pub fn copy_from(&mut self, values: &[T]) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(BackpropError::InputSize {
                expected: self.data.len(),
                actual: values.len(),
            });
        }
        self.data.copy_from_slice(values);
        Ok(())
    }
}

impl<T> Deref for Buffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for Buffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Drop for Buffer<T> {
    fn drop(&mut self) {
        if let Some(tracker) = &self.tracker {
            tracker.record_free(self.data.len() * mem::size_of::<T>());
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

impl<T: Serialize> Serialize for Buffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}
