//! Row height oracle.
//!
//! Heights come from three tiers, highest priority first:
//!
//! 1. **Measured** - reported by the render surface after the row was laid out.
//! 2. **Estimated** - `base + ceil(width / chars_per_line) * line_height`,
//!    where `width` is the display width of the record's content.
//! 3. **Default** - `base * default_multiple` when no content is available.
//!
//! A measurement is authoritative until the record is forgotten (evicted);
//! estimates never replace it.

use std::hash::Hash;

use rustc_hash::FxHashMap;
use unicode_width::UnicodeWidthStr;

use crate::config::HeightConfig;

/// Which tier produced a height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightSource {
    Measured,
    Estimated,
    Default,
}

/// Height lookup keyed by record id.
#[derive(Debug, Clone)]
pub struct HeightOracle<K> {
    measured: FxHashMap<K, u32>,
    config: HeightConfig,
}

impl<K: Clone + Eq + Hash> HeightOracle<K> {
    #[must_use]
    pub fn new(config: HeightConfig) -> Self {
        Self {
            measured: FxHashMap::default(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &HeightConfig {
        &self.config
    }

    /// Height of the row for `id`, given its current content.
    #[must_use]
    pub fn height_of(&self, id: &K, content: Option<&str>) -> u32 {
        self.resolve(id, content).0
    }

    /// Height together with the tier that produced it.
    #[must_use]
    pub fn resolve(&self, id: &K, content: Option<&str>) -> (u32, HeightSource) {
        if let Some(&h) = self.measured.get(id) {
            return (h, HeightSource::Measured);
        }
        match content {
            Some(text) => (self.estimate(text), HeightSource::Estimated),
            None => (self.config.default_height(), HeightSource::Default),
        }
    }

    /// Content-length estimate for `text`.
    #[must_use]
    pub fn estimate(&self, text: &str) -> u32 {
        let width = u32::try_from(text.width()).unwrap_or(u32::MAX);
        let lines = width.div_ceil(self.config.chars_per_line.max(1));
        self.config
            .base
            .saturating_add(lines.saturating_mul(self.config.line_height))
    }

    /// Store an observed layout height.
    ///
    /// Zero observations are ignored. Returns `true` when the stored height
    /// changed.
    pub fn record_measured(&mut self, id: K, observed: u32) -> bool {
        if observed == 0 {
            return false;
        }
        self.measured.insert(id, observed) != Some(observed)
    }

    /// Measured height for `id`, if any.
    #[must_use]
    pub fn measured(&self, id: &K) -> Option<u32> {
        self.measured.get(id).copied()
    }

    /// Drop the measurement for `id`.
    pub fn forget(&mut self, id: &K) -> Option<u32> {
        self.measured.remove(id)
    }

    pub fn clear(&mut self) {
        self.measured.clear();
    }

    /// Number of measured heights held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.measured.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.measured.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> HeightOracle<u64> {
        HeightOracle::new(HeightConfig::default())
    }

    #[test]
    fn default_tier_without_content() {
        let o = oracle();
        assert_eq!(o.resolve(&1, None), (48, HeightSource::Default));
    }

    #[test]
    fn estimate_rounds_lines_up() {
        let o = oracle();
        assert_eq!(o.height_of(&1, Some("")), 48);
        assert_eq!(o.height_of(&1, Some("x")), 68);
        assert_eq!(o.height_of(&1, Some(&"x".repeat(80))), 68);
        assert_eq!(o.height_of(&1, Some(&"x".repeat(81))), 88);
        assert_eq!(o.resolve(&1, Some("x")).1, HeightSource::Estimated);
    }

    #[test]
    fn estimate_uses_display_width() {
        let o = oracle();
        // 41 wide CJK chars occupy 82 columns: two lines.
        let wide = "漢".repeat(41);
        assert_eq!(o.height_of(&1, Some(&wide)), 48 + 2 * 20);
    }

    #[test]
    fn measured_wins_over_estimate() {
        let mut o = oracle();
        assert!(o.record_measured(7, 31));
        assert_eq!(o.resolve(&7, Some(&"x".repeat(500))), (31, HeightSource::Measured));
        assert_eq!(o.height_of(&7, None), 31);
    }

    #[test]
    fn zero_measurement_ignored() {
        let mut o = oracle();
        assert!(!o.record_measured(7, 0));
        assert_eq!(o.measured(&7), None);
        o.record_measured(7, 20);
        assert!(!o.record_measured(7, 0));
        assert_eq!(o.measured(&7), Some(20));
    }

    #[test]
    fn remeasure_is_idempotent_and_overwrites() {
        let mut o = oracle();
        assert!(o.record_measured(3, 60));
        assert!(!o.record_measured(3, 60));
        assert!(o.record_measured(3, 72));
        assert_eq!(o.height_of(&3, None), 72);
    }

    #[test]
    fn forget_falls_back_to_estimate() {
        let mut o = oracle();
        o.record_measured(3, 60);
        assert_eq!(o.forget(&3), Some(60));
        assert_eq!(o.height_of(&3, Some("abc")), 68);
        assert!(o.is_empty());
    }

    #[test]
    fn custom_default_multiple() {
        let o: HeightOracle<u64> = HeightOracle::new(HeightConfig {
            base: 10,
            default_multiple: 3,
            ..HeightConfig::default()
        });
        assert_eq!(o.height_of(&0, None), 30);
    }
}
