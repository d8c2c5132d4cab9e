//! Record lookup by id, mirroring window membership.
//!
//! Every record appended to the window is `put` here; every evicted record is
//! `remove`d; a reset `clear`s everything. Consumers use it to find a resident
//! record (or its fuller detail) by id without a position in the window.
//!
//! # Residency
//!
//! A page may repeat an id that is already resident when the source shifts
//! under the cursor. Each entry therefore counts how many window slots hold
//! its id; `remove` only drops the entry once the last slot is gone.

use std::cell::Cell;

use rustc_hash::FxHashMap;

use crate::record::Record;

/// Statistics about cache lookups.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheStats {
    /// Number of entries currently in the cache.
    pub entries: usize,
    /// Lookups that found a record.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Hit rate as a fraction (0.0 to 1.0).
    pub hit_rate: f64,
}

#[derive(Debug, Clone)]
struct CacheEntry<R> {
    record: R,
    residency: u32,
}

/// Id-keyed record cache.
///
/// Lookup counters use [`Cell`], so the cache belongs to one thread, like the
/// engine that owns it.
#[derive(Debug, Clone)]
pub struct RecordCache<R: Record> {
    entries: FxHashMap<R::Id, CacheEntry<R>>,
    resident: usize,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<R: Record> Default for RecordCache<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> RecordCache<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            resident: 0,
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Look up a resident record.
    pub fn get(&self, id: &R::Id) -> Option<&R> {
        match self.entries.get(id) {
            Some(entry) => {
                self.hits.set(self.hits.get() + 1);
                Some(&entry.record)
            }
            None => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    /// Whether `id` is resident. Does not count as a lookup.
    #[must_use]
    pub fn contains(&self, id: &R::Id) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert `record`, or take one more residency of an existing id.
    ///
    /// The stored record is replaced with the newer copy.
    pub fn put(&mut self, record: R) {
        self.resident += 1;
        let id = record.id();
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.record = record;
                entry.residency += 1;
            }
            None => {
                self.entries.insert(
                    id,
                    CacheEntry {
                        record,
                        residency: 1,
                    },
                );
            }
        }
    }

    /// Swap in a fuller version of a resident record.
    ///
    /// Returns `false` (and drops `record`) when the id is not resident.
    pub fn replace(&mut self, record: R) -> bool {
        match self.entries.get_mut(&record.id()) {
            Some(entry) => {
                entry.record = record;
                true
            }
            None => false,
        }
    }

    /// Release one residency of `id`.
    ///
    /// Returns `true` when this was the last one and the entry was dropped.
    pub fn remove(&mut self, id: &R::Id) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            return false;
        };
        self.resident -= 1;
        entry.residency -= 1;
        if entry.residency == 0 {
            self.entries.remove(id);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.resident = 0;
    }

    /// Number of distinct ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Window slots accounted for, counting repeated ids once per slot.
    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.resident
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.get();
        let misses = self.misses.get();
        let total = hits + misses;
        CacheStats {
            entries: self.entries.len(),
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    pub fn reset_stats(&mut self) {
        self.hits.set(0);
        self.misses.set(0);
    }
}
