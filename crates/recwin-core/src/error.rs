//! Error types.
//!
//! | Error | Cause | Behavior |
//! |-------|-------|----------|
//! | [`FetchError`] | Source failure or malformed page | Loader back to `Idle`, window untouched |
//! | [`ConfigError`] | Invalid config or env override | Engine construction fails |
//! | [`InvariantViolation`] | Window bookkeeping bug | `debug_assert!`, discarded in release |

use std::fmt;

/// Failure while fetching a page from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The source reported an error (network, server, decode).
    Source(String),
    /// The host abandoned the request.
    Cancelled,
    /// The source returned more rows than requested.
    Malformed { requested: usize, received: usize },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(msg) => write!(f, "page fetch failed: {msg}"),
            Self::Cancelled => write!(f, "page fetch cancelled"),
            Self::Malformed {
                requested,
                received,
            } => write!(
                f,
                "malformed page: requested {requested} rows, received {received}"
            ),
        }
    }
}

impl std::error::Error for FetchError {}

/// Invalid engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds a value outside its valid range.
    Invalid {
        field: &'static str,
        reason: String,
    },
    /// An environment override could not be parsed.
    Env { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { field, reason } => write!(f, "invalid config `{field}`: {reason}"),
            Self::Env { var, value } => write!(f, "cannot parse {var}={value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Internal bookkeeping of the sliding window went out of sync.
///
/// These are programmer errors. They are never produced by bad input from the
/// source; a correct engine never observes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `window_offset + len` disagrees with the number of records received.
    OffsetMismatch {
        window_offset: usize,
        len: usize,
        received: usize,
    },
    /// The window holds more items than its cap.
    CapacityExceeded { len: usize, cap: usize },
    /// Cache residency does not match window membership.
    CacheDesync { resident: usize, cached: usize },
    /// Measured heights exist for records no longer resident.
    HeightDesync { measured: usize, cached: usize },
    /// A resolution targeted an offset other than the next fetch offset.
    StaleOffset { expected: usize, requested: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OffsetMismatch {
                window_offset,
                len,
                received,
            } => write!(
                f,
                "window offset {window_offset} + len {len} != received {received}"
            ),
            Self::CapacityExceeded { len, cap } => {
                write!(f, "window holds {len} items, cap is {cap}")
            }
            Self::CacheDesync { resident, cached } => {
                write!(f, "cache residency {cached} != window len {resident}")
            }
            Self::HeightDesync { measured, cached } => {
                write!(f, "{measured} measured heights for {cached} cached records")
            }
            Self::StaleOffset {
                expected,
                requested,
            } => write!(
                f,
                "page for offset {requested} resolved, next fetch offset is {expected}"
            ),
        }
    }
}

impl std::error::Error for InvariantViolation {}
