#![forbid(unsafe_code)]

//! Windowed rendering and bounded-memory paging for large record lists.
//!
//! The engine renders a scrollable list of variable-height records while
//! keeping both render cost and resident memory proportional to a fixed
//! window rather than to the number of records scrolled through.
//!
//! # Components
//!
//! - [`height::HeightOracle`] - measured / estimated / default row heights
//! - [`window::compute`] - visible index range, offsets and scroll extent
//! - [`store::SlidingWindow`] - bounded record window with front eviction
//! - [`loader::ProgressiveLoader`] - `Idle` / `Fetching` / `Exhausted` paging
//! - [`cache::RecordCache`] - id lookup kept in lockstep with the window
//! - [`engine::ListEngine`] - owns all of the above and drives the data flow
//!
//! # Data flow
//!
//! ```text
//! scroll ──► compute() ──► loader threshold ──► PageRequest ──► host fetch
//!    ▲                                                              │
//!    │                                                              ▼
//! on_row_laid_out ◄── render Frame ◄── recompute ◄── append/evict ◄─ resolve
//! ```
//!
//! # Example
//!
//! ```ignore
//! use recwin_core::{EngineConfig, ListEngine, QueryParams};
//!
//! let mut engine = ListEngine::new(EngineConfig::default())?;
//! engine.set_viewport(800);
//! if let Some(request) = engine.set_query(QueryParams::default()) {
//!     let result = source.fetch_page(&request);
//!     engine.resolve(&request, result);
//! }
//! let frame = engine.frame();
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod height;
pub mod loader;
pub mod query;
pub mod record;
pub mod source;
pub mod store;
pub mod window;

pub use cache::{CacheStats, RecordCache};
pub use config::{EngineConfig, HeightConfig};
pub use engine::{EngineStats, Frame, ListEngine, ListStatus, Resolution, Resolved};
pub use error::{ConfigError, FetchError, InvariantViolation};
pub use height::{HeightOracle, HeightSource};
pub use loader::{FetchTicket, LoaderState, ProgressiveLoader, TicketStatus};
pub use query::{ParseSortOrderError, QueryParams, SortOrder};
pub use record::Record;
pub use source::{Page, PageRequest, PageSource};
pub use store::{AppendReport, SlidingWindow};
pub use window::{VirtualWindow, compute};
