//! In-memory paginated sources.
//!
//! [`MemorySource`] serves a fixed record set with the filter and sort
//! semantics of a listing endpoint, and can inject failures.
//! [`DeferredSource`] wraps any [`PageSource`] and delivers results a fixed
//! number of ticks after submission, so resets can overtake fetches.

use std::cmp::Ordering;
use std::collections::VecDeque;

use recwin_core::{FetchError, Page, PageRequest, PageSource, QueryParams, SortOrder};
use serde::{Deserialize, Serialize};

use crate::record::SampleRecord;

/// Columns [`MemorySource`] can sort by.
pub const SORT_COLUMNS: &[&str] = &["id", "title", "priority", "created_at"];

/// When a [`MemorySource`] fails on purpose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePlan {
    #[default]
    Never,
    /// Fail every n-th call (1-based), e.g. `Every(3)` fails calls 3, 6, 9.
    Every(usize),
    /// Fail the listed 0-based call indices.
    At(Vec<usize>),
}

impl FailurePlan {
    fn fails(&self, call: usize) -> bool {
        match self {
            Self::Never => false,
            Self::Every(0) => false,
            Self::Every(n) => (call + 1) % n == 0,
            Self::At(calls) => calls.contains(&call),
        }
    }
}

/// Record listing over a vector.
#[derive(Debug, Clone)]
pub struct MemorySource {
    records: Vec<SampleRecord>,
    view: Option<(QueryParams, Vec<usize>)>,
    failures: FailurePlan,
    calls: usize,
}

impl MemorySource {
    #[must_use]
    pub fn new(records: Vec<SampleRecord>) -> Self {
        Self {
            records,
            view: None,
            failures: FailurePlan::Never,
            calls: 0,
        }
    }

    #[must_use]
    pub fn with_failures(mut self, plan: FailurePlan) -> Self {
        self.failures = plan;
        self
    }

    /// Fetch calls served so far, failed ones included.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }

    #[must_use]
    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    /// Ids matching `query`, in result order.
    pub fn matching_ids(&mut self, query: &QueryParams) -> Result<Vec<u64>, FetchError> {
        let view = self.view_for(query)?.to_vec();
        Ok(view.into_iter().map(|i| self.records[i].id).collect())
    }

    fn view_for(&mut self, query: &QueryParams) -> Result<&[usize], FetchError> {
        let cached = matches!(&self.view, Some((q, _)) if q == query);
        if !cached {
            let indices = self.build_view(query)?;
            self.view = Some((query.clone(), indices));
        }
        Ok(self.view.as_ref().map_or(&[][..], |(_, v)| v.as_slice()))
    }

    fn build_view(&self, query: &QueryParams) -> Result<Vec<usize>, FetchError> {
        let needle = query.filter_text().to_lowercase();
        let mut indices: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(&needle))
            .map(|(i, _)| i)
            .collect();

        if let Some(column) = query.sort.as_deref() {
            if !SORT_COLUMNS.contains(&column) {
                return Err(FetchError::Source(format!("unknown sort column {column:?}")));
            }
            let records = &self.records;
            indices.sort_by(|&a, &b| {
                let ord = compare(&records[a], &records[b], column);
                let ord = match query.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                };
                ord.then(records[a].id.cmp(&records[b].id))
            });
        } else if query.order == SortOrder::Desc {
            indices.reverse();
        }
        Ok(indices)
    }
}

fn compare(a: &SampleRecord, b: &SampleRecord, column: &str) -> Ordering {
    match column {
        "title" => a.title.cmp(&b.title),
        "priority" => a.priority.cmp(&b.priority),
        "created_at" => a.created_at.cmp(&b.created_at),
        _ => a.id.cmp(&b.id),
    }
}

impl PageSource<SampleRecord> for MemorySource {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Page<SampleRecord>, FetchError> {
        let call = self.calls;
        self.calls += 1;
        if self.failures.fails(call) {
            tracing::debug!(call, offset = request.offset, "injected fetch failure");
            return Err(FetchError::Source(format!("injected failure on call {call}")));
        }

        let view = self.view_for(&request.query)?;
        let total = view.len() as u64;
        let start = request.offset.min(view.len());
        let end = request.offset.saturating_add(request.limit).min(view.len());
        let picked: Vec<usize> = view[start..end].to_vec();
        let rows = picked.into_iter().map(|i| self.records[i].clone()).collect();
        Ok(Page::new(total, rows))
    }
}

#[derive(Debug, Clone)]
struct Pending {
    ready_at: u64,
    request: PageRequest,
}

/// Delivers fetch results `latency` ticks after submission, in order.
#[derive(Debug, Clone)]
pub struct DeferredSource<S> {
    inner: S,
    latency: u64,
    now: u64,
    queue: VecDeque<Pending>,
}

impl<S> DeferredSource<S> {
    #[must_use]
    pub fn new(inner: S, latency: u64) -> Self {
        Self {
            inner,
            latency,
            now: 0,
            queue: VecDeque::new(),
        }
    }

    pub fn submit(&mut self, request: PageRequest) {
        self.queue.push_back(Pending {
            ready_at: self.now + self.latency,
            request,
        });
    }

    /// Requests submitted and not yet delivered.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Deliver everything that is due at the current tick, then advance.
    pub fn tick<R>(&mut self) -> Vec<(PageRequest, Result<Page<R>, FetchError>)>
    where
        S: PageSource<R>,
    {
        let mut delivered = Vec::new();
        while self.queue.front().is_some_and(|p| p.ready_at <= self.now) {
            if let Some(Pending { request, .. }) = self.queue.pop_front() {
                let result = self.inner.fetch_page(&request);
                delivered.push((request, result));
            }
        }
        self.now += 1;
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::generate;

    fn request(offset: usize, limit: usize, query: QueryParams) -> PageRequest {
        PageRequest {
            epoch: 1,
            offset,
            limit,
            query,
        }
    }

    #[test]
    fn pages_are_contiguous_slices() {
        let mut source = MemorySource::new(generate(25, 1));
        let a = source.fetch_page(&request(0, 10, QueryParams::default())).unwrap();
        let b = source.fetch_page(&request(10, 10, QueryParams::default())).unwrap();
        let c = source.fetch_page(&request(20, 10, QueryParams::default())).unwrap();
        assert_eq!(a.rows.len(), 10);
        assert_eq!(b.rows[0].id, 10);
        assert_eq!(c.rows.len(), 5);
        assert_eq!(c.total, 25);
    }

    #[test]
    fn offset_past_end_is_empty() {
        let mut source = MemorySource::new(generate(5, 1));
        let page = source.fetch_page(&request(50, 10, QueryParams::default())).unwrap();
        assert!(page.rows.is_empty());
        assert_eq!(page.total, 5);
    }

    #[test]
    fn filter_and_sort() {
        let mut source = MemorySource::new(generate(300, 9));
        let query = QueryParams::default()
            .with_filter("GATEWAY")
            .with_sort("priority", SortOrder::Desc);
        let page = source.fetch_page(&request(0, 300, query.clone())).unwrap();
        assert!(!page.rows.is_empty());
        assert!(page.rows.iter().all(|r| r.matches("gateway")));
        assert!(page.rows.windows(2).all(|w| w[0].priority >= w[1].priority));
        assert_eq!(page.total as usize, page.rows.len());
        assert_eq!(
            source.matching_ids(&query).unwrap(),
            page.rows.iter().map(|r| r.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn unknown_sort_column_fails() {
        let mut source = MemorySource::new(generate(3, 1));
        let query = QueryParams::default().with_sort("colour", SortOrder::Asc);
        assert!(matches!(
            source.fetch_page(&request(0, 10, query)),
            Err(FetchError::Source(_))
        ));
    }

    #[test]
    fn failure_plans() {
        let mut source = MemorySource::new(generate(10, 1)).with_failures(FailurePlan::Every(2));
        let req = request(0, 5, QueryParams::default());
        assert!(source.fetch_page(&req).is_ok());
        assert!(source.fetch_page(&req).is_err());
        assert!(source.fetch_page(&req).is_ok());
        assert!(source.fetch_page(&req).is_err());
        assert_eq!(source.calls(), 4);

        let mut source = MemorySource::new(generate(10, 1)).with_failures(FailurePlan::At(vec![0]));
        assert!(source.fetch_page(&req).is_err());
        assert!(source.fetch_page(&req).is_ok());
    }

    #[test]
    fn deferred_delivery_waits_for_latency() {
        let mut source = DeferredSource::new(MemorySource::new(generate(10, 1)), 2);
        source.submit(request(0, 5, QueryParams::default()));
        assert!(source.tick::<SampleRecord>().is_empty());
        assert!(source.tick::<SampleRecord>().is_empty());
        let delivered = source.tick::<SampleRecord>();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0.offset, 0);
        assert_eq!(source.pending(), 0);
    }

    #[test]
    fn zero_latency_delivers_on_next_tick() {
        let mut source = DeferredSource::new(MemorySource::new(generate(10, 1)), 0);
        source.submit(request(0, 5, QueryParams::default()));
        source.submit(request(5, 5, QueryParams::default()));
        let delivered = source.tick::<SampleRecord>();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[1].0.offset, 5);
    }
}
