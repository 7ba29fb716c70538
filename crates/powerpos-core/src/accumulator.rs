//! Fixed-size numeric array with per-slot locking.
//!
//! Every slot owns its own mutex, so workers folding contributions into
//! different buckets never contend with each other, while two workers hitting
//! the same bucket are serialized by that bucket's guard. All aggregation
//! funnels through [`BucketedAccumulator::add`], the single read-modify-write
//! primitive.
//!
//! Bulk operations are deliberately weaker than a global lock:
//! [`BucketedAccumulator::add_to_all`] walks the slots in index order, so a
//! concurrent reader may observe some buckets updated and others not yet.

use crate::error::{CoreError, Result};
use parking_lot::Mutex;
use std::ops::AddAssign;
use tracing::{debug, warn};

/// Fixed-length array of independently lockable numeric slots.
#[derive(Debug)]
pub struct BucketedAccumulator<T = f64> {
    /// One guarded value per bucket. Length never changes after construction.
    slots: Box<[Mutex<T>]>,
    /// Serializes whole-array copies.
    snapshot_lock: Mutex<()>,
}

impl<T> BucketedAccumulator<T>
where
    T: Copy + Default + AddAssign,
{
    /// Create an accumulator with `len` zeroed slots.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidLength`] when `len` is zero.
    pub fn new(len: usize) -> Result<Self> {
        if len == 0 {
            return Err(CoreError::InvalidLength(len));
        }

        let slots = (0..len).map(|_| Mutex::new(T::default())).collect();
        debug!(len, "Initialized bucketed accumulator");

        Ok(Self {
            slots,
            snapshot_lock: Mutex::new(()),
        })
    }

    /// Number of buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false; an accumulator has at least one bucket.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Read one bucket, locking only that bucket.
    pub fn get(&self, index: usize) -> Result<T> {
        Ok(*self.slot(index)?.lock())
    }

    /// Overwrite one bucket, locking only that bucket.
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        *self.slot(index)?.lock() = value;
        Ok(())
    }

    /// Add `delta` to one bucket under that bucket's guard.
    pub fn add(&self, index: usize, delta: T) -> Result<()> {
        let mut value = self.slot(index)?.lock();
        *value += delta;
        Ok(())
    }

    /// Add `delta` to every bucket, one guard at a time in index order.
    ///
    /// Not atomic across the array: readers of a bucket not yet reached still
    /// see its previous value.
    pub fn add_to_all(&self, delta: T) {
        for slot in self.slots.iter() {
            *slot.lock() += delta;
        }
    }

    /// Copy of all current values.
    ///
    /// Each element reflects some completed write to its bucket; concurrent
    /// snapshots are serialized by a dedicated lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        let _guard = self.snapshot_lock.lock();
        self.slots.iter().map(|slot| *slot.lock()).collect()
    }

    /// Lazy iterator over the buckets.
    ///
    /// Each step locks, copies and releases a single bucket. Call again to
    /// start a new pass.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: &self.slots,
            next: 0,
        }
    }

    fn slot(&self, index: usize) -> Result<&Mutex<T>> {
        self.slots.get(index).ok_or_else(|| {
            warn!(index, len = self.slots.len(), "Accumulator index out of range");
            CoreError::IndexOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
                len: self.slots.len(),
            }
        })
    }
}

/// Single-pass iterator returned by [`BucketedAccumulator::iter`].
#[derive(Debug)]
pub struct Iter<'a, T> {
    slots: &'a [Mutex<T>],
    next: usize,
}

impl<T: Copy> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slots.get(self.next)?;
        self.next += 1;
        let value = *slot.lock();
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.slots.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl<T: Copy> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a BucketedAccumulator<T>
where
    T: Copy + Default + AddAssign,
{
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
