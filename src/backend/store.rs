//! Persistent value store
//!
//! Sparse numeric arrays addressed by `(id, index)`, shared by every pass and
//! every recompile of a formula. Arrays only grow: a slot that was written
//! once stays addressable until [`ValueStore::clear`].
//!
//! Extents are the zero-filled lengths produced by geometric growth, so a
//! read just past the highest written index usually returns `0.0` rather
//! than NaN.

use std::fmt;

use parking_lot::Mutex;

use super::config::StoreConfig;
use super::growth::grown_len;

/// Host-visible result of a successful `store`
pub const STORE_OK: f64 = 0.0;

/// Error storing a value; each bound has its own sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Store id negative or not below the id limit
    BadId(i64),
    /// Index negative or not below the length limit
    BadIndex(i64),
}

impl StoreError {
    /// Sentinel returned to the formula
    pub fn sentinel(self) -> f64 {
        match self {
            Self::BadId(_) => -1.0,
            Self::BadIndex(_) => -2.0,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadId(id) => write!(f, "store id {} out of range", id),
            Self::BadIndex(index) => write!(f, "store index {} out of range", index),
        }
    }
}

impl std::error::Error for StoreError {}

/// Sparse, growable, process-lifetime numeric store
#[derive(Debug)]
pub struct ValueStore {
    arrays: Mutex<Vec<Vec<f64>>>,
    limits: StoreConfig,
}

impl Default for ValueStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl ValueStore {
    pub fn new(limits: StoreConfig) -> Self {
        Self {
            arrays: Mutex::new(Vec::new()),
            limits,
        }
    }

    pub fn limits(&self) -> &StoreConfig {
        &self.limits
    }

    /// Write `value` at `(id, index)`, growing the arrays as needed
    pub fn store(&self, id: i64, index: i64, value: f64) -> Result<(), StoreError> {
        if id < 0 || id as u64 >= self.limits.max_ids as u64 {
            return Err(StoreError::BadId(id));
        }
        if index < 0 || index as u64 >= self.limits.max_len as u64 {
            return Err(StoreError::BadIndex(index));
        }
        let (id, index) = (id as usize, index as usize);

        let mut arrays = self.arrays.lock();

        let outer_len = grown_len(arrays.len(), id + 1, self.limits.outer_growth, self.limits.max_ids);
        if outer_len > arrays.len() {
            arrays.resize_with(outer_len, Vec::new);
        }

        let inner = &mut arrays[id];
        let inner_len = grown_len(inner.len(), index + 1, self.limits.inner_growth, self.limits.max_len);
        if inner_len > inner.len() {
            inner.reserve_exact(inner_len - inner.len());
            inner.resize(inner_len, 0.0);
        }

        inner[index] = value;
        Ok(())
    }

    /// Read `(id, index)`; NaN outside the current extents
    pub fn retrieve(&self, id: i64, index: i64) -> f64 {
        if id < 0 || index < 0 {
            return f64::NAN;
        }

        let arrays = self.arrays.lock();
        arrays
            .get(id as usize)
            .and_then(|inner| inner.get(index as usize))
            .copied()
            .unwrap_or(f64::NAN)
    }

    /// Release every array
    pub fn clear(&self) {
        let mut arrays = self.arrays.lock();
        *arrays = Vec::new();
    }

    /// Number of ids currently addressable
    pub fn id_count(&self) -> usize {
        self.arrays.lock().len()
    }

    /// Zero-filled length of one array (0 when the id is not addressable)
    pub fn array_len(&self, id: usize) -> usize {
        self.arrays.lock().get(id).map_or(0, Vec::len)
    }

    /// Host binding for `store(id, index, value)`
    pub fn store_sentinel(&self, id: i64, index: i64, value: f64) -> f64 {
        match self.store(id, index, value) {
            Ok(()) => STORE_OK,
            Err(e) => e.sentinel(),
        }
    }
}
