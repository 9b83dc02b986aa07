//! Fixed-size collections of byte input/output pairs.

use crate::buffers::{element_count, ByteBuffer};
use crate::context::Context;
use crate::error::{BackpropError, Result};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Record count and record widths of a training set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrainingSetDimensions {
    pub count: usize,
    pub x_size: usize,
    pub y_size: usize,
}

impl TrainingSetDimensions {
    pub fn new(count: usize, x_size: usize, y_size: usize) -> Self {
        Self {
            count,
            x_size,
            y_size,
        }
    }
}

impl fmt::Display for TrainingSetDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dimensions: {{count: {}, x_size: {}, y_size: {}}}",
            self.count, self.x_size, self.y_size
        )
    }
}

/// `count` input records of `x_size` bytes paired with `count` desired output
/// records of `y_size` bytes, stored back to back in two flat buffers.
///
/// # Example
///
/// ```
/// use backprop::{Context, TrainingSet};
///
/// let ctx = Context::new(0);
/// let set = TrainingSet::from_pairs(&ctx, &[(&[0x00][..], &[0x00][..]), (&[0x01][..], &[0x01][..])]).unwrap();
/// assert_eq!(set.count(), 2);
/// assert_eq!(set.pair(1).unwrap(), (&[0x01][..], &[0x01][..]));
/// ```
pub struct TrainingSet {
    dims: TrainingSetDimensions,
    x: ByteBuffer,
    y: ByteBuffer,
}

impl TrainingSet {
    /// Allocate a zero-filled set.
    pub fn new(ctx: &Context, count: usize, x_size: usize, y_size: usize) -> Result<Self> {
        Self::with_dimensions(ctx, TrainingSetDimensions::new(count, x_size, y_size))
    }

    pub fn with_dimensions(ctx: &Context, dims: TrainingSetDimensions) -> Result<Self> {
        let tracker = ctx.tracker();
        Ok(Self {
            dims,
            x: ByteBuffer::allocate(element_count(dims.count, dims.x_size)?, tracker)?,
            y: ByteBuffer::allocate(element_count(dims.count, dims.y_size)?, tracker)?,
        })
    }

    /// Build a set from `(x, y)` records; every record must share the widths
    /// of the first.
    pub fn from_pairs(ctx: &Context, pairs: &[(&[u8], &[u8])]) -> Result<Self> {
        let (x_size, y_size) = pairs
            .first()
            .map(|(x, y)| (x.len(), y.len()))
            .unwrap_or((0, 0));

        let mut set = Self::new(ctx, pairs.len(), x_size, y_size)?;
        for (i, (x, y)) in pairs.iter().enumerate() {
            set.set_pair(i, x, y)?;
        }
        Ok(set)
    }

    pub fn dimensions(&self) -> TrainingSetDimensions {
        self.dims
    }

    pub fn count(&self) -> usize {
        self.dims.count
    }

    pub fn x_size(&self) -> usize {
        self.dims.x_size
    }

    pub fn y_size(&self) -> usize {
        self.dims.y_size
    }

    pub fn is_empty(&self) -> bool {
        self.dims.count == 0
    }

    /// All input records, back to back.
    pub fn x(&self) -> &[u8] {
        &self.x
    }

    /// All desired output records, back to back.
    pub fn y(&self) -> &[u8] {
        &self.y
    }

    pub(crate) fn x_mut(&mut self) -> &mut [u8] {
        &mut self.x
    }

    pub(crate) fn y_mut(&mut self) -> &mut [u8] {
        &mut self.y
    }

    /// Input and desired output of record `index`.
    pub fn pair(&self, index: usize) -> Result<(&[u8], &[u8])> {
        self.check_index(index)?;
        let (x_size, y_size) = (self.dims.x_size, self.dims.y_size);
        Ok((
            &self.x[index * x_size..(index + 1) * x_size],
            &self.y[index * y_size..(index + 1) * y_size],
        ))
    }

    pub fn set_pair(&mut self, index: usize, x: &[u8], y: &[u8]) -> Result<()> {
        self.check_index(index)?;
        let (x_size, y_size) = (self.dims.x_size, self.dims.y_size);
        if x.len() != x_size || y.len() != y_size {
            return Err(BackpropError::DimensionMismatch {
                expected: self.dims,
                actual: TrainingSetDimensions::new(self.dims.count, x.len(), y.len()),
            });
        }
        self.x[index * x_size..(index + 1) * x_size].copy_from_slice(x);
        self.y[index * y_size..(index + 1) * y_size].copy_from_slice(y);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        let x_size = self.dims.x_size.max(1);
        let y_size = self.dims.y_size.max(1);
        self.x
            .chunks(x_size)
            .zip(self.y.chunks(y_size))
            .take(self.dims.count)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.dims.count {
            Ok(())
        } else {
            Err(BackpropError::IndexOutOfRange {
                index,
                len: self.dims.count,
            })
        }
    }
}

impl fmt::Debug for TrainingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingSet")
            .field("dims", &self.dims)
            .finish()
    }
}

impl Serialize for TrainingSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let x: Vec<&[u8]> = self.iter().map(|(x, _)| x).collect();
        let y: Vec<&[u8]> = self.iter().map(|(_, y)| y).collect();

        let mut state = serializer.serialize_struct("TrainingSet", 3)?;
        state.serialize_field("dimensions", &self.dims)?;
        state.serialize_field("x", &x)?;
        state.serialize_field("y", &y)?;
        state.end()
    }
}
