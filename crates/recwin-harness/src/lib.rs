#![forbid(unsafe_code)]

//! Host-side harness for `recwin-core`.
//!
//! - [`record`] - deterministic synthetic records
//! - [`source`] - in-memory paginated source with filter, sort, failure and
//!   latency injection
//! - [`session`] - scripted scroll sessions that check window contiguity and
//!   engine invariants on every tick

pub mod record;
pub mod session;
pub mod source;

pub use record::{SampleRecord, SplitMix64, generate};
pub use session::{HarnessError, Session, SessionConfig, SessionReport};
pub use source::{DeferredSource, FailurePlan, MemorySource, SORT_COLUMNS};
