//! Sliding window store.
//!
//! Owns the three structures whose sizes must stay bounded together: the
//! resident records, the [`RecordCache`] mirroring them, and the measured
//! heights in the [`HeightOracle`]. Records enter only through
//! [`reset`](SlidingWindow::reset) and [`append`](SlidingWindow::append);
//! eviction drops the oldest records from all three at once.
//!
//! # Invariants
//!
//! 1. `len() <= max_size()` after every mutation.
//! 2. `window_offset() + len() == next_fetch_offset()`, checked against an
//!    independent count of records received since the last reset.
//! 3. `window_offset()` never decreases between resets.
//! 4. Cache residency equals `len()`; measured heights only exist for
//!    resident ids.

use rustc_hash::FxHashSet;

use crate::cache::RecordCache;
use crate::config::HeightConfig;
use crate::error::InvariantViolation;
use crate::height::HeightOracle;
use crate::record::Record;

/// What an [`append`](SlidingWindow::append) did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendReport {
    /// Records added to the tail.
    pub appended: usize,
    /// Records evicted from the front.
    pub evicted: usize,
    /// Summed height of the evicted records, taken before eviction.
    pub evicted_height: u64,
}

/// Bounded, contiguous slice of the remote dataset.
#[derive(Debug, Clone)]
pub struct SlidingWindow<R: Record> {
    items: Vec<R>,
    window_offset: usize,
    received: usize,
    max_size: usize,
    cache: RecordCache<R>,
    heights: HeightOracle<R::Id>,
    expanded: FxHashSet<R::Id>,
}

impl<R: Record + Clone> SlidingWindow<R> {
    /// Create an empty window holding at most `max_size` records.
    #[must_use]
    pub fn new(max_size: usize, heights: HeightConfig) -> Self {
        Self {
            items: Vec::with_capacity(max_size.min(4096)),
            window_offset: 0,
            received: 0,
            max_size: max_size.max(1),
            cache: RecordCache::new(),
            heights: HeightOracle::new(heights),
            expanded: FxHashSet::default(),
        }
    }

    /// Replace the window wholesale and restart at dataset offset 0.
    ///
    /// Clears the cache, measured heights and expanded rows. If `items` is
    /// longer than the cap, the oldest are evicted as by `append`.
    pub fn reset(&mut self, items: Vec<R>) -> AppendReport {
        let dropped = self.items.len();
        self.items.clear();
        self.window_offset = 0;
        self.received = 0;
        self.cache.clear();
        self.heights.clear();
        self.expanded.clear();
        tracing::debug!(dropped, incoming = items.len(), "window reset");
        self.append(items)
    }

    /// Append a page to the tail, evicting from the front past the cap.
    pub fn append(&mut self, items: Vec<R>) -> AppendReport {
        let appended = items.len();
        self.received += appended;
        for record in &items {
            self.cache.put(record.clone());
        }
        self.items.extend(items);

        let mut report = AppendReport {
            appended,
            ..AppendReport::default()
        };

        if self.items.len() > self.max_size {
            let evict = self.items.len() - self.max_size;
            report.evicted_height = self.items[..evict]
                .iter()
                .map(|r| u64::from(self.row_height(r)))
                .sum();
            for record in self.items.drain(..evict) {
                let id = record.id();
                if self.cache.remove(&id) {
                    self.heights.forget(&id);
                    self.expanded.remove(&id);
                }
            }
            self.window_offset += evict;
            report.evicted = evict;
            tracing::debug!(
                evicted = evict,
                window_offset = self.window_offset,
                len = self.items.len(),
                "evicted from window front"
            );
        }

        debug_assert_eq!(self.check_invariants(), Ok(()));
        report
    }

    /// Dataset position the next page request must start at.
    #[must_use]
    pub fn next_fetch_offset(&self) -> usize {
        self.window_offset + self.items.len()
    }

    /// Absolute dataset index of `items()[0]`.
    #[must_use]
    pub fn window_offset(&self) -> usize {
        self.window_offset
    }

    #[must_use]
    pub fn items(&self) -> &[R] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Records received since the last reset, evicted ones included.
    #[must_use]
    pub fn received(&self) -> usize {
        self.received
    }

    #[must_use]
    pub fn cache(&self) -> &RecordCache<R> {
        &self.cache
    }

    #[must_use]
    pub fn heights(&self) -> &HeightOracle<R::Id> {
        &self.heights
    }

    /// Rendered height of a resident row.
    #[must_use]
    pub fn row_height(&self, record: &R) -> u32 {
        let id = record.id();
        let expanded = self.expanded.contains(&id);
        self.heights.height_of(&id, record.content(expanded))
    }

    /// Record a layout measurement for a resident row.
    ///
    /// Measurements for ids no longer resident are dropped so late layout
    /// callbacks cannot grow the height table past the window.
    pub fn record_measured(&mut self, id: R::Id, height: u32) -> bool {
        if !self.cache.contains(&id) {
            tracing::trace!(?id, height, "measurement for non-resident row ignored");
            return false;
        }
        self.heights.record_measured(id, height)
    }

    #[must_use]
    pub fn is_expanded(&self, id: &R::Id) -> bool {
        self.expanded.contains(id)
    }

    /// Toggle whether a resident row's estimate uses its full content.
    ///
    /// Returns `true` when the state changed. The row's measurement is kept;
    /// the render surface reports a new one after relayout.
    pub fn set_expanded(&mut self, id: R::Id, expanded: bool) -> bool {
        if !self.cache.contains(&id) {
            return false;
        }
        if expanded {
            self.expanded.insert(id)
        } else {
            self.expanded.remove(&id)
        }
    }

    /// Swap in a fuller copy of a resident record, in the cache and in every
    /// window slot holding its id.
    pub fn replace_record(&mut self, record: R) -> bool {
        let id = record.id();
        if !self.cache.contains(&id) {
            return false;
        }
        for slot in self.items.iter_mut().filter(|r| r.id() == id) {
            *slot = record.clone();
        }
        self.cache.replace(record)
    }

    /// Verify the bookkeeping invariants.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.items.len() > self.max_size {
            return Err(InvariantViolation::CapacityExceeded {
                len: self.items.len(),
                cap: self.max_size,
            });
        }
        if self.window_offset + self.items.len() != self.received {
            return Err(InvariantViolation::OffsetMismatch {
                window_offset: self.window_offset,
                len: self.items.len(),
                received: self.received,
            });
        }
        if self.cache.resident_count() != self.items.len() {
            return Err(InvariantViolation::CacheDesync {
                resident: self.items.len(),
                cached: self.cache.resident_count(),
            });
        }
        if self.heights.len() > self.cache.len() {
            return Err(InvariantViolation::HeightDesync {
                measured: self.heights.len(),
                cached: self.cache.len(),
            });
        }
        Ok(())
    }
}
