// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pooled complex (I/Q) sample buffers.
//!
//! Rendering repeatedly needs fixed-size scratch and output buffers. A
//! [`ComplexBufferPool`] recycles the underlying `Vec<f64>` allocations,
//! bucketed by power-of-two capacity. A [`PooledComplexArray`] owns one
//! in-phase and one quadrature buffer checked out from a pool and gives them
//! back exactly once, either through [`PooledComplexArray::dispose`] or when
//! dropped. [`ComplexView`] and [`ComplexViewMut`] borrow a contiguous
//! sub-range without copying; the borrow checker keeps them from outliving
//! (or surviving the disposal of) their array.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use num_complex::Complex64;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::PoolConfig;
use crate::error::{RenderError, Result, ValidationError};

/// Smallest capacity class handed out by the pool.
const MIN_CAPACITY: usize = 64;

static SHARED_POOL: OnceLock<Arc<ComplexBufferPool>> = OnceLock::new();

/// A pool of reusable `f64` buffers.
///
/// The pool is thread-safe; it carries no request-visible state and only
/// recycles memory.
#[derive(Debug)]
pub struct ComplexBufferPool {
    state: Mutex<PoolState>,
    max_retained_per_bucket: usize,
}

#[derive(Debug, Default)]
struct PoolState {
    /// Free buffers keyed by capacity class (a power of two).
    buckets: HashMap<usize, Vec<Vec<f64>>>,
    /// Buffers currently checked out.
    outstanding: usize,
}

impl ComplexBufferPool {
    /// Create a standalone pool.
    pub fn new(max_retained_per_bucket: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PoolState::default()),
            max_retained_per_bucket,
        })
    }

    /// Create a standalone pool from configuration.
    pub fn from_config(config: &PoolConfig) -> Arc<Self> {
        Self::new(config.max_retained_per_bucket)
    }

    /// The process-wide pool.
    pub fn shared() -> Arc<Self> {
        SHARED_POOL
            .get_or_init(|| Self::from_config(&PoolConfig::default()))
            .clone()
    }

    /// Initialize the process-wide pool from configuration.
    ///
    /// Embedders call this once at startup, after [`Config::load`], and
    /// before the first request that renders without an explicit pool.
    /// Has no effect if the shared pool already exists; the existing pool
    /// is returned.
    ///
    /// ```no_run
    /// use qubit_os_pulsegen::{ComplexBufferPool, Config};
    ///
    /// let config = Config::load(None)?;
    /// ComplexBufferPool::init_shared(&config.pool);
    /// # Ok::<(), qubit_os_pulsegen::Error>(())
    /// ```
    ///
    /// [`Config::load`]: crate::config::Config::load
    pub fn init_shared(config: &PoolConfig) -> Arc<Self> {
        let mut created = false;
        let pool = SHARED_POOL
            .get_or_init(|| {
                created = true;
                Self::from_config(config)
            })
            .clone();
        if !created {
            debug!("Shared buffer pool already initialized, keeping existing settings");
        }
        pool
    }

    /// Check out an I/Q array of `len` samples from this pool.
    ///
    /// Recycled buffers keep stale samples unless `clear` is set.
    pub fn acquire(self: &Arc<Self>, len: usize, clear: bool) -> PooledComplexArray {
        let (i, q) = {
            let mut state = self.state.lock();
            let i = state.take(len);
            let q = state.take(len);
            state.outstanding += 2;
            (i, q)
        };
        let mut array = PooledComplexArray {
            buffers: Some((i, q)),
            len,
            pool: Arc::clone(self),
        };
        if clear {
            if let Some((i, q)) = array.buffers.as_mut() {
                i.fill(0.0);
                q.fill(0.0);
            }
        }
        array
    }

    /// Number of buffers currently checked out.
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// Number of free buffers held for reuse.
    pub fn retained(&self) -> usize {
        self.state.lock().buckets.values().map(Vec::len).sum()
    }

    fn give_back(&self, i: Vec<f64>, q: Vec<f64>) {
        let mut state = self.state.lock();
        state.outstanding = state.outstanding.saturating_sub(2);
        for buf in [i, q] {
            let class = capacity_class(buf.capacity());
            let bucket = state.buckets.entry(class).or_default();
            if bucket.len() < self.max_retained_per_bucket {
                bucket.push(buf);
            }
        }
    }
}

impl PoolState {
    fn take(&mut self, len: usize) -> Vec<f64> {
        let class = len.max(MIN_CAPACITY).next_power_of_two();
        let mut buf = self
            .buckets
            .get_mut(&class)
            .and_then(Vec::pop)
            .unwrap_or_else(|| Vec::with_capacity(class));
        if buf.len() >= len {
            buf.truncate(len);
        } else {
            buf.resize(len, 0.0);
        }
        buf
    }
}

/// Largest power of two not exceeding `capacity`.
fn capacity_class(capacity: usize) -> usize {
    if capacity == 0 {
        return 0;
    }
    1 << (usize::BITS - 1 - capacity.leading_zeros())
}

/// An owned pair of I/Q buffers rented from a [`ComplexBufferPool`].
///
/// # Invariants
///
/// - The length is fixed at construction.
/// - Buffers go back to the pool exactly once.
/// - Every sample access after disposal returns
///   [`RenderError::DisposedResource`].
#[derive(Debug)]
pub struct PooledComplexArray {
    buffers: Option<(Vec<f64>, Vec<f64>)>,
    len: usize,
    pool: Arc<ComplexBufferPool>,
}

impl PooledComplexArray {
    /// Check out an array from the process-wide pool.
    pub fn acquire(len: usize, clear: bool) -> Self {
        ComplexBufferPool::shared().acquire(len, clear)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the array has zero samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the buffers have been returned to the pool.
    pub fn is_disposed(&self) -> bool {
        self.buffers.is_none()
    }

    fn buffers(&self) -> Result<&(Vec<f64>, Vec<f64>)> {
        self.buffers
            .as_ref()
            .ok_or_else(|| RenderError::DisposedResource("pooled complex array".into()).into())
    }

    fn buffers_mut(&mut self) -> Result<&mut (Vec<f64>, Vec<f64>)> {
        self.buffers
            .as_mut()
            .ok_or_else(|| RenderError::DisposedResource("pooled complex array".into()).into())
    }

    /// In-phase samples.
    pub fn i(&self) -> Result<&[f64]> {
        Ok(&self.buffers()?.0)
    }

    /// Quadrature samples.
    pub fn q(&self) -> Result<&[f64]> {
        Ok(&self.buffers()?.1)
    }

    /// Sample at `index`.
    pub fn get(&self, index: usize) -> Result<Complex64> {
        self.view()?.get(index)
    }

    /// View over the whole array.
    pub fn view(&self) -> Result<ComplexView<'_>> {
        let (i, q) = self.buffers()?;
        Ok(ComplexView { i, q })
    }

    /// Mutable view over the whole array.
    pub fn view_mut(&mut self) -> Result<ComplexViewMut<'_>> {
        let (i, q) = self.buffers_mut()?;
        Ok(ComplexViewMut { i, q })
    }

    /// View over `len` samples starting at `start`.
    pub fn slice(&self, start: usize, len: usize) -> Result<ComplexView<'_>> {
        self.view()?.slice(start, len)
    }

    /// View from `start` to the end of the array.
    pub fn slice_from(&self, start: usize) -> Result<ComplexView<'_>> {
        let len = self.len.checked_sub(start).ok_or_else(|| range_error(start, 0, self.len))?;
        self.slice(start, len)
    }

    /// Mutable view over `len` samples starting at `start`.
    pub fn slice_mut(&mut self, start: usize, len: usize) -> Result<ComplexViewMut<'_>> {
        self.view_mut()?.into_slice(start, len)
    }

    /// Independent copy rented from the same pool.
    pub fn copy(&self) -> Result<Self> {
        let (src_i, src_q) = self.buffers()?;
        let mut out = self.pool.acquire(self.len, false);
        if let Some((i, q)) = out.buffers.as_mut() {
            i.copy_from_slice(src_i);
            q.copy_from_slice(src_q);
        }
        Ok(out)
    }

    /// Collect the samples as complex values.
    pub fn to_complex_vec(&self) -> Result<Vec<Complex64>> {
        Ok(self.view()?.iter().collect())
    }

    /// Return the buffers to the pool. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if let Some((i, q)) = self.buffers.take() {
            self.pool.give_back(i, q);
        }
    }
}

impl Drop for PooledComplexArray {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn range_error(start: usize, len: usize, available: usize) -> crate::Error {
    ValidationError::Field {
        field: "range".into(),
        message: format!(
            "[{}, {}) is out of bounds for length {}",
            start,
            start.saturating_add(len),
            available
        ),
    }
    .into()
}

/// Read-only view of a contiguous I/Q range.
#[derive(Debug, Clone, Copy)]
pub struct ComplexView<'a> {
    i: &'a [f64],
    q: &'a [f64],
}

impl<'a> ComplexView<'a> {
    pub fn len(&self) -> usize {
        self.i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }

    pub fn i(&self) -> &'a [f64] {
        self.i
    }

    pub fn q(&self) -> &'a [f64] {
        self.q
    }

    /// Sample at `index` within the view.
    pub fn get(&self, index: usize) -> Result<Complex64> {
        if index >= self.len() {
            return Err(range_error(index, 1, self.len()));
        }
        Ok(Complex64::new(self.i[index], self.q[index]))
    }

    /// Sub-view relative to this view.
    pub fn slice(&self, start: usize, len: usize) -> Result<ComplexView<'a>> {
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.len())
            .ok_or_else(|| range_error(start, len, self.len()))?;
        Ok(ComplexView {
            i: &self.i[start..end],
            q: &self.q[start..end],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Complex64> + 'a {
        let (i, q) = (self.i, self.q);
        i.iter().zip(q).map(|(&re, &im)| Complex64::new(re, im))
    }
}

/// Mutable view of a contiguous I/Q range.
#[derive(Debug)]
pub struct ComplexViewMut<'a> {
    i: &'a mut [f64],
    q: &'a mut [f64],
}

impl<'a> ComplexViewMut<'a> {
    pub fn len(&self) -> usize {
        self.i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }

    /// Narrow this view to a sub-range.
    pub fn into_slice(self, start: usize, len: usize) -> Result<ComplexViewMut<'a>> {
        let available = self.len();
        let end = start
            .checked_add(len)
            .filter(|&end| end <= available)
            .ok_or_else(|| range_error(start, len, available))?;
        let ComplexViewMut { i, q } = self;
        Ok(ComplexViewMut {
            i: &mut i[start..end],
            q: &mut q[start..end],
        })
    }

    /// Split into raw I and Q slices.
    pub fn parts(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut *self.i, &mut *self.q)
    }

    pub fn as_view(&self) -> ComplexView<'_> {
        ComplexView {
            i: &*self.i,
            q: &*self.q,
        }
    }

    /// Accumulate `value` into the sample at `index`.
    ///
    /// # Errors
    ///
    /// [`ValidationError::Field`] if `index` lies outside the view.
    #[inline]
    pub fn add_at(&mut self, index: usize, value: Complex64) -> Result<()> {
        let available = self.len();
        match (self.i.get_mut(index), self.q.get_mut(index)) {
            (Some(i), Some(q)) => {
                *i += value.re;
                *q += value.im;
                Ok(())
            }
            _ => Err(range_error(index, 1, available)),
        }
    }

    pub fn fill(&mut self, value: Complex64) {
        self.i.fill(value.re);
        self.q.fill(value.im);
    }
}
