//! Engine configuration.
//!
//! All knobs have defaults calibrated for record rows of a few lines of text.
//! [`EngineConfig::from_env`] overlays `RECWIN_*` environment variables on top
//! of the defaults; every constructed engine validates its config first.

use crate::error::{ConfigError, ConfigResult};

/// Default cap on resident records.
pub const DEFAULT_MAX_WINDOW_SIZE: usize = 1_000;
/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 200;
/// Default rows rendered beyond each viewport edge.
pub const DEFAULT_OVERSCAN: usize = 5;
/// Default scroll progress that triggers the next page fetch.
pub const DEFAULT_PREFETCH_THRESHOLD: f64 = 0.75;

/// Parameters of the height estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct HeightConfig {
    /// Height of a row with no text lines.
    pub base: u32,
    /// Height added per wrapped line of content.
    pub line_height: u32,
    /// Display columns per wrapped line.
    pub chars_per_line: u32,
    /// Multiple of `base` used when no content is available.
    pub default_multiple: u32,
}

impl Default for HeightConfig {
    fn default() -> Self {
        Self {
            base: 48,
            line_height: 20,
            chars_per_line: 80,
            default_multiple: 1,
        }
    }
}

impl HeightConfig {
    /// Height used before any estimate is possible.
    #[must_use]
    pub fn default_height(&self) -> u32 {
        self.base.saturating_mul(self.default_multiple)
    }
}

/// Configuration for a [`ListEngine`](crate::ListEngine).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EngineConfig {
    /// Maximum records kept resident. Older records are evicted past this.
    pub max_window_size: usize,
    /// Records requested per page.
    pub page_size: usize,
    /// Extra rows rendered above and below the viewport.
    pub overscan: usize,
    /// Scroll progress (0, 1] past which the next page is fetched.
    pub prefetch_threshold: f64,
    /// Height estimate parameters.
    pub heights: HeightConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_window_size: DEFAULT_MAX_WINDOW_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            overscan: DEFAULT_OVERSCAN,
            prefetch_threshold: DEFAULT_PREFETCH_THRESHOLD,
            heights: HeightConfig::default(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_max_window_size(mut self, max: usize) -> Self {
        self.max_window_size = max;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    #[must_use]
    pub fn with_prefetch_threshold(mut self, threshold: f64) -> Self {
        self.prefetch_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_heights(mut self, heights: HeightConfig) -> Self {
        self.heights = heights;
        self
    }

    /// Check every field is within range.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_window_size == 0 {
            return Err(invalid("max_window_size", "must be at least 1"));
        }
        if self.page_size == 0 {
            return Err(invalid("page_size", "must be at least 1"));
        }
        if self.page_size > self.max_window_size {
            return Err(invalid(
                "page_size",
                format!(
                    "{} exceeds max_window_size {}",
                    self.page_size, self.max_window_size
                ),
            ));
        }
        if !self.prefetch_threshold.is_finite()
            || self.prefetch_threshold <= 0.0
            || self.prefetch_threshold > 1.0
        {
            return Err(invalid(
                "prefetch_threshold",
                format!("{} is outside (0, 1]", self.prefetch_threshold),
            ));
        }
        if self.heights.base == 0 {
            return Err(invalid("heights.base", "must be at least 1"));
        }
        if self.heights.chars_per_line == 0 {
            return Err(invalid("heights.chars_per_line", "must be at least 1"));
        }
        if self.heights.default_multiple == 0 {
            return Err(invalid("heights.default_multiple", "must be at least 1"));
        }
        Ok(())
    }

    /// Defaults overlaid with `RECWIN_*` environment variables, validated.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().apply_env_with(|name| std::env::var(name).ok())
    }

    /// Overlay overrides from `lookup` (an environment accessor) and validate.
    ///
    /// Unset or blank variables leave the current value in place.
    pub fn apply_env_with<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "RECWIN_MAX_WINDOW")? {
            self.max_window_size = v;
        }
        if let Some(v) = parse_var(&lookup, "RECWIN_PAGE_SIZE")? {
            self.page_size = v;
        }
        if let Some(v) = parse_var(&lookup, "RECWIN_OVERSCAN")? {
            self.overscan = v;
        }
        if let Some(v) = parse_var(&lookup, "RECWIN_PREFETCH_THRESHOLD")? {
            self.prefetch_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "RECWIN_ROW_BASE")? {
            self.heights.base = v;
        }
        if let Some(v) = parse_var(&lookup, "RECWIN_LINE_HEIGHT")? {
            self.heights.line_height = v;
        }
        if let Some(v) = parse_var(&lookup, "RECWIN_CHARS_PER_LINE")? {
            self.heights.chars_per_line = v;
        }
        self.validate()?;
        Ok(self)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Env {
            var,
            value: trimmed.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_window_size, 1_000);
        assert_eq!(config.overscan, 5);
        assert_eq!(config.heights.default_height(), 48);
    }

    #[test]
    fn zero_page_size_rejected() {
        let err = EngineConfig::default()
            .with_page_size(0)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "page_size",
                ..
            }
        ));
    }

    #[test]
    fn page_larger_than_window_rejected() {
        let config = EngineConfig::default()
            .with_max_window_size(100)
            .with_page_size(200);
        assert!(config.validate().is_err());
    }

    #[test]
    fn threshold_bounds() {
        for bad in [0.0, -0.5, 1.5, f64::NAN, f64::INFINITY] {
            let config = EngineConfig::default().with_prefetch_threshold(bad);
            assert!(config.validate().is_err(), "{bad} should be rejected");
        }
        let config = EngineConfig::default().with_prefetch_threshold(1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overlay_applies_values() {
        let config = EngineConfig::default()
            .apply_env_with(lookup_from(&[
                ("RECWIN_MAX_WINDOW", "500"),
                ("RECWIN_PAGE_SIZE", " 50 "),
                ("RECWIN_PREFETCH_THRESHOLD", "0.6"),
                ("RECWIN_ROW_BASE", "32"),
                ("RECWIN_OVERSCAN", ""),
            ]))
            .unwrap();
        assert_eq!(config.max_window_size, 500);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.prefetch_threshold, 0.6);
        assert_eq!(config.heights.base, 32);
        assert_eq!(config.overscan, DEFAULT_OVERSCAN);
    }

    #[test]
    fn env_overlay_reports_parse_failure() {
        let err = EngineConfig::default()
            .apply_env_with(lookup_from(&[("RECWIN_PAGE_SIZE", "many")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Env {
                var: "RECWIN_PAGE_SIZE",
                value: "many".into()
            }
        );
    }

    #[test]
    fn env_overlay_validates_result() {
        let err = EngineConfig::default()
            .apply_env_with(lookup_from(&[("RECWIN_CHARS_PER_LINE", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"page_size": 100, "heights": {"base": 30}}"#).unwrap();
        assert_eq!(config.page_size, 100);
        assert_eq!(config.max_window_size, DEFAULT_MAX_WINDOW_SIZE);
        assert_eq!(config.heights.base, 30);
        assert_eq!(config.heights.line_height, 20);
    }
}
