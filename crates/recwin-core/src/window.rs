//! Visible range calculation over variable-height rows.
//!
//! [`compute`] is a single forward pass over the resident items: it builds
//! the cumulative offsets, finds the first row crossing the top of the
//! viewport and the first row crossing its bottom, and widens both by the
//! overscan margin. Cost is O(n) in the window length, which the sliding
//! window cap keeps bounded.
//!
//! # Invariants
//!
//! 1. `start_index <= end_index <= items.len()`.
//! 2. `offsets.len() == items.len()`, `offsets[0] == 0`, non-decreasing.
//! 3. `total_height == offsets[n-1] + height(n-1)` (0 when empty).
//! 4. Every row whose extent intersects the viewport lies in
//!    `start_index..end_index`.

use std::ops::Range;

/// Render range derived from the current scroll position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualWindow {
    /// First row to render (inclusive, overscan applied).
    pub start_index: usize,
    /// One past the last row to render (overscan applied).
    pub end_index: usize,
    /// Sum of every row height, including rows off screen.
    pub total_height: u64,
    /// `offsets[i]` is the summed height of rows `0..i`.
    pub offsets: Vec<u64>,
}

impl VirtualWindow {
    /// Rows to render.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }

    /// Number of rows to render.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }

    /// Number of rows the window was computed over.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.offsets.len()
    }

    /// Top position of row `index`.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> Option<u64> {
        self.offsets.get(index).copied()
    }

    /// Whether the render range reaches the last resident row.
    #[must_use]
    pub fn reaches_end(&self) -> bool {
        self.end_index >= self.offsets.len()
    }
}

/// Compute the render range for a viewport.
///
/// `height_of` is called exactly once per item, in order.
pub fn compute<T, F>(
    items: &[T],
    scroll_top: u64,
    viewport_height: u64,
    overscan: usize,
    mut height_of: F,
) -> VirtualWindow
where
    F: FnMut(&T) -> u32,
{
    let _span = tracing::trace_span!(
        "window_compute",
        items = items.len(),
        scroll_top,
        viewport_height
    )
    .entered();

    let len = items.len();
    let bottom = scroll_top.saturating_add(viewport_height);
    let mut offsets = Vec::with_capacity(len);
    let mut raw_start = None;
    let mut raw_end = None;
    let mut acc = 0u64;

    for (i, item) in items.iter().enumerate() {
        offsets.push(acc);
        acc = acc.saturating_add(u64::from(height_of(item)));
        if raw_start.is_none() && acc > scroll_top {
            raw_start = Some(i);
        }
        if raw_end.is_none() && acc > bottom {
            raw_end = Some(i);
        }
    }

    // Scrolled past all content: start clamps to the end of the list.
    let start_index = raw_start.unwrap_or(len).saturating_sub(overscan);
    let end_index = match raw_end {
        Some(end) => end.saturating_add(overscan).saturating_add(1).min(len),
        None => len,
    };

    tracing::trace!(start_index, end_index, total_height = acc, "window computed");

    VirtualWindow {
        start_index,
        end_index,
        total_height: acc,
        offsets,
    }
}
