//! Bounded, process-wide cache of per-shape precomputations.
//!
//! Sersic, Moffat and Airy profiles share expensive derived tables between
//! every instance with the same shape parameter. Entries are built on first
//! use, never mutated, and never evicted: profiles hold `Arc`s into the
//! cache and rely on pointer identity for sharing.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use crate::error::ProfileError;

/// Distinct entries allowed in each process-wide shape cache.
pub const MAX_CACHED_TABLES: usize = 100;

/// Capacity-bounded map from shape key to shared, immutable entry.
pub struct ShapeCache<K, V> {
    name: &'static str,
    capacity: usize,
    entries: Mutex<HashMap<K, Arc<V>>>,
}

impl<K, V> ShapeCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cache bounded by [`MAX_CACHED_TABLES`].
    pub fn with_default_capacity(name: &'static str) -> Self {
        Self::new(name, MAX_CACHED_TABLES)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Arc<V>>> {
        // A panic inside a builder leaves the map itself consistent
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return the entry for `key`, building it with `build` on first use.
    ///
    /// The lock is held while building, so concurrent callers asking for the
    /// same key receive the same `Arc`.
    ///
    /// # Errors
    /// `CacheFull` when a new key would exceed the capacity; errors from
    /// `build` propagate and leave the cache unchanged.
    pub fn get_or_try_insert_with<F>(&self, key: K, build: F) -> Result<Arc<V>, ProfileError>
    where
        F: FnOnce() -> Result<V, ProfileError>,
    {
        let mut entries = self.lock();
        if let Some(entry) = entries.get(&key) {
            return Ok(Arc::clone(entry));
        }
        if entries.len() >= self.capacity {
            return Err(ProfileError::CacheFull {
                cache: self.name,
                capacity: self.capacity,
            });
        }

        let entry = Arc::new(build()?);
        debug!(
            "{} cache: built entry for {:?} ({} of {})",
            self.name,
            key,
            entries.len() + 1,
            self.capacity
        );
        entries.insert(key, Arc::clone(&entry));
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains_key(key)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Hashable key for a floating-point shape parameter.
///
/// Keys compare by bit pattern, so `-0.0` and `0.0` are distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamKey(u64);

impl From<f64> for ParamKey {
    fn from(value: f64) -> Self {
        ParamKey(value.to_bits())
    }
}

impl ParamKey {
    pub fn value(&self) -> f64 {
        f64::from_bits(self.0)
    }
}
