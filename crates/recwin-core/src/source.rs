//! Paged data source contract.
//!
//! The engine never performs I/O. It hands out [`PageRequest`]s; the host
//! fetches however it likes (synchronously through a [`PageSource`], or on an
//! executor) and feeds the result back through
//! [`ListEngine::resolve`](crate::ListEngine::resolve).

use crate::error::FetchError;
use crate::loader::FetchTicket;
use crate::query::QueryParams;

/// One page returned by the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    /// Total matching records as reported by the source. Display only; end of
    /// data is decided by `rows.len() < limit`.
    pub total: u64,
    pub rows: Vec<R>,
}

impl<R> Page<R> {
    #[must_use]
    pub fn new(total: u64, rows: Vec<R>) -> Self {
        Self { total, rows }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            total: 0,
            rows: Vec::new(),
        }
    }
}

/// A fetch the host must perform.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Reset generation the request was issued in.
    pub epoch: u64,
    /// Absolute dataset index of the first requested record.
    pub offset: usize,
    /// Maximum records to return.
    pub limit: usize,
    pub query: QueryParams,
}

impl PageRequest {
    /// Identity of this request as tracked by the loader.
    #[must_use]
    pub fn ticket(&self) -> FetchTicket {
        FetchTicket {
            epoch: self.epoch,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// Paginated record listing.
pub trait PageSource<R> {
    /// Fetch up to `request.limit` records starting at `request.offset`.
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Page<R>, FetchError>;
}

impl<R, F> PageSource<R> for F
where
    F: FnMut(&PageRequest) -> Result<Page<R>, FetchError>,
{
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Page<R>, FetchError> {
        self(request)
    }
}
