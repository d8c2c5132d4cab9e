//! Query parameters forwarded to the page source.
//!
//! Any change to these invalidates the whole window: the engine compares the
//! new parameters against the current ones and resets on difference.

use std::fmt;
use std::str::FromStr;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized sort order string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSortOrderError(String);

impl fmt::Display for ParseSortOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sort order {:?} (expected asc or desc)", self.0)
    }
}

impl std::error::Error for ParseSortOrderError {}

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(ParseSortOrderError(s.to_string())),
        }
    }
}

/// Sort column, direction and free-text filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct QueryParams {
    /// Column to sort by; `None` keeps the source's natural order.
    pub sort: Option<String>,
    pub order: SortOrder,
    /// Free-text filter; empty matches everything.
    pub filter: String,
}

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sort(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(column.into());
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Filter text with surrounding whitespace removed.
    #[must_use]
    pub fn filter_text(&self) -> &str {
        self.filter.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sort_order() {
        assert_eq!("asc".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert_eq!(" DESC ".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert_eq!("descending".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn order_display_and_reverse() {
        assert_eq!(SortOrder::Desc.to_string(), "desc");
        assert_eq!(SortOrder::Asc.reversed(), SortOrder::Desc);
    }

    #[test]
    fn builders_compose() {
        let q = QueryParams::new()
            .with_sort("created_at", SortOrder::Desc)
            .with_filter("  error ");
        assert_eq!(q.sort.as_deref(), Some("created_at"));
        assert_eq!(q.order, SortOrder::Desc);
        assert_eq!(q.filter_text(), "error");
        assert_ne!(q, QueryParams::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_lowercase_order() {
        let q: QueryParams = serde_json::from_str(r#"{"order": "desc"}"#).unwrap();
        assert_eq!(q.order, SortOrder::Desc);
        assert_eq!(q.sort, None);
        assert_eq!(q.filter, "");
    }
}
