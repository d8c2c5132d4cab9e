//! The list engine.
//!
//! [`ListEngine`] owns the sliding window, its cache and height table, the
//! loader, and the current render range. It is driven by host events and
//! answers each one with an optional [`PageRequest`]: the host performs the
//! fetch and hands the outcome back to [`ListEngine::resolve`]. Nothing here
//! blocks or spawns.
//!
//! # Event contract
//!
//! | Event | Method | Effect |
//! |-------|--------|--------|
//! | query change | [`set_query`](ListEngine::set_query) | reset, new epoch, first page requested |
//! | viewport resize | [`set_viewport`](ListEngine::set_viewport) | recompute, threshold check |
//! | scroll | [`on_scroll`](ListEngine::on_scroll) | clamp, recompute, threshold check |
//! | row laid out | [`on_row_laid_out`](ListEngine::on_row_laid_out) | measured height stored, recompute |
//! | fetch outcome | [`resolve`](ListEngine::resolve) | append/evict, or discard, or surface error |
//!
//! After every event [`frame`](ListEngine::frame) reflects the new state.

use crate::cache::CacheStats;
use crate::config::EngineConfig;
use crate::error::{ConfigError, FetchError, InvariantViolation};
use crate::loader::{LoaderState, ProgressiveLoader, TicketStatus};
use crate::query::QueryParams;
use crate::record::Record;
use crate::source::{Page, PageRequest, PageSource};
use crate::store::SlidingWindow;
use crate::window::{self, VirtualWindow};

/// Load status shown alongside the rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ListStatus {
    /// Waiting for the user to approach the loaded edge.
    #[default]
    Idle,
    /// A page fetch is in flight.
    Loading,
    /// The source has no more records.
    Complete,
    /// The source has no records at all for the current query.
    Empty,
}

/// Outcome of [`ListEngine::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Rows were appended to the window.
    Applied {
        appended: usize,
        evicted: usize,
        exhausted: bool,
    },
    /// The request predates the last reset. Discarded.
    Stale,
    /// The loader was not waiting for this request. Discarded.
    Unsolicited,
    /// The fetch failed. The window is untouched.
    Failed(FetchError),
    /// Applying the page would break window bookkeeping. Discarded.
    Rejected(InvariantViolation),
}

impl Resolution {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// A resolution plus the follow-up request it triggered, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub resolution: Resolution,
    pub next: Option<PageRequest>,
}

/// Counters over the engine's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineStats {
    pub resets: u64,
    pub fetches_issued: u64,
    pub pages_applied: u64,
    pub records_received: u64,
    pub records_evicted: u64,
    pub stale_discarded: u64,
    pub unsolicited_discarded: u64,
    pub failures: u64,
    pub rejected: u64,
}

/// Everything the render surface needs for one paint.
#[derive(Debug)]
pub struct Frame<'a, R> {
    /// First rendered row, relative to the window.
    pub start_index: usize,
    /// One past the last rendered row, relative to the window.
    pub end_index: usize,
    pub total_height: u64,
    /// Top position of every resident row.
    pub offsets: &'a [u64],
    /// Rows `start_index..end_index`.
    pub visible_items: &'a [R],
    /// Dataset index of the window's first row.
    pub window_offset: usize,
    pub scroll_top: u64,
    pub progress: f64,
    pub status: ListStatus,
    /// Transient fetch error, until dismissed or retried.
    pub error: Option<&'a FetchError>,
    /// Total reported by the source on the last applied page.
    pub total: Option<u64>,
}

/// Windowed list state machine.
#[derive(Debug)]
pub struct ListEngine<R: Record> {
    config: EngineConfig,
    window: SlidingWindow<R>,
    loader: ProgressiveLoader,
    query: QueryParams,
    viewport_height: u64,
    scroll_top: u64,
    view: VirtualWindow,
    total: Option<u64>,
    stats: EngineStats,
}

impl<R: Record + Clone> ListEngine<R> {
    /// Build an engine. Nothing is requested until the first
    /// [`set_query`](Self::set_query) or [`refresh`](Self::refresh).
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            window: SlidingWindow::new(config.max_window_size, config.heights),
            loader: ProgressiveLoader::new(config.page_size, config.prefetch_threshold),
            config,
            query: QueryParams::default(),
            viewport_height: 0,
            scroll_top: 0,
            view: VirtualWindow::default(),
            total: None,
            stats: EngineStats::default(),
        })
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Apply new query parameters.
    ///
    /// Resets the window when the parameters differ from the current ones (or
    /// on the first call) and returns the request for the first page.
    pub fn set_query(&mut self, query: QueryParams) -> Option<PageRequest> {
        if self.loader.epoch() > 0 && query == self.query {
            return None;
        }
        self.query = query;
        self.reset()
    }

    /// Reset with the current query and request the first page again.
    pub fn refresh(&mut self) -> Option<PageRequest> {
        self.reset()
    }

    pub fn set_viewport(&mut self, height: u64) -> Option<PageRequest> {
        self.viewport_height = height;
        self.recompute();
        self.evaluate()
    }

    /// Scroll to `scroll_top`, clamped to [`max_scroll_top`](Self::max_scroll_top).
    pub fn on_scroll(&mut self, scroll_top: u64) -> Option<PageRequest> {
        self.scroll_top = scroll_top;
        self.recompute();
        self.evaluate()
    }

    /// Bring window row `index` to the top of the viewport.
    ///
    /// Indices past the end select the last row.
    pub fn scroll_to_index(&mut self, index: usize) -> Option<PageRequest> {
        let last = self.window.len().checked_sub(1)?;
        let top = self.view.offset_of(index.min(last)).unwrap_or(0);
        self.on_scroll(top)
    }

    /// Layout callback from the render surface.
    ///
    /// Heights for rows that are no longer resident are ignored.
    pub fn on_row_laid_out(&mut self, id: R::Id, height: u32) -> Option<PageRequest> {
        if !self.window.record_measured(id, height) {
            return None;
        }
        self.recompute();
        self.evaluate()
    }

    /// Show a row's full body (or its summary again).
    pub fn set_expanded(&mut self, id: R::Id, expanded: bool) -> bool {
        let changed = self.window.set_expanded(id, expanded);
        if changed {
            self.recompute();
        }
        changed
    }

    /// Swap in a fuller copy of a resident record. Ignored when not resident.
    pub fn replace_record(&mut self, record: R) -> bool {
        let replaced = self.window.replace_record(record);
        if replaced {
            self.recompute();
        }
        replaced
    }

    /// Hand back the outcome of a fetch issued by this engine.
    pub fn resolve(
        &mut self,
        request: &PageRequest,
        result: Result<Page<R>, FetchError>,
    ) -> Resolved {
        let ticket = request.ticket();
        match self.loader.check(&ticket) {
            TicketStatus::Stale => {
                self.stats.stale_discarded += 1;
                tracing::warn!(
                    request_epoch = ticket.epoch,
                    epoch = self.loader.epoch(),
                    offset = ticket.offset,
                    "stale page discarded"
                );
                return discarded(Resolution::Stale);
            }
            TicketStatus::Unsolicited => {
                self.stats.unsolicited_discarded += 1;
                tracing::warn!(
                    offset = ticket.offset,
                    in_flight = ?self.loader.in_flight(),
                    "unsolicited page discarded"
                );
                return discarded(Resolution::Unsolicited);
            }
            TicketStatus::Current => {}
        }

        let page = match result.and_then(|page| {
            if page.rows.len() > ticket.limit {
                Err(FetchError::Malformed {
                    requested: ticket.limit,
                    received: page.rows.len(),
                })
            } else {
                Ok(page)
            }
        }) {
            Ok(page) => page,
            Err(error) => {
                self.stats.failures += 1;
                tracing::warn!(offset = ticket.offset, %error, "page fetch failed");
                self.loader.fail(error.clone());
                return discarded(Resolution::Failed(error));
            }
        };

        let expected = self.window.next_fetch_offset();
        if ticket.offset != expected {
            let violation = InvariantViolation::StaleOffset {
                expected,
                requested: ticket.offset,
            };
            debug_assert_eq!(ticket.offset, expected, "{violation}");
            self.stats.rejected += 1;
            tracing::warn!(%violation, "page discarded");
            self.loader.abandon();
            return discarded(Resolution::Rejected(violation));
        }

        let received = page.rows.len();
        let exhausted = self.loader.complete(received) == LoaderState::Exhausted;
        let report = self.window.append(page.rows);
        self.total = Some(page.total);
        self.scroll_top = self.scroll_top.saturating_sub(report.evicted_height);
        self.stats.pages_applied += 1;
        self.stats.records_received += received as u64;
        self.stats.records_evicted += report.evicted as u64;
        self.recompute();

        tracing::debug!(
            epoch = ticket.epoch,
            offset = ticket.offset,
            received,
            evicted = report.evicted,
            window_offset = self.window.window_offset(),
            len = self.window.len(),
            exhausted,
            "page applied"
        );

        Resolved {
            resolution: Resolution::Applied {
                appended: report.appended,
                evicted: report.evicted,
                exhausted,
            },
            next: self.evaluate(),
        }
    }

    /// Re-arm the loader after a failure and check the threshold again.
    pub fn retry(&mut self) -> Option<PageRequest> {
        if !self.loader.retry() {
            return None;
        }
        self.evaluate()
    }

    /// Clear the surfaced fetch error.
    pub fn dismiss_error(&mut self) -> Option<FetchError> {
        self.loader.dismiss_error()
    }

    /// Fulfil `request` and its follow-ups synchronously from `source`, for
    /// at most `max_pages` fetches.
    ///
    /// Returns the request still pending when the budget ran out.
    pub fn pump<S>(
        &mut self,
        source: &mut S,
        mut request: Option<PageRequest>,
        max_pages: usize,
    ) -> Option<PageRequest>
    where
        S: PageSource<R> + ?Sized,
    {
        for _ in 0..max_pages {
            let Some(req) = request.take() else {
                break;
            };
            let result = source.fetch_page(&req);
            request = self.resolve(&req, result).next;
        }
        request
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn frame(&self) -> Frame<'_, R> {
        Frame {
            start_index: self.view.start_index,
            end_index: self.view.end_index,
            total_height: self.view.total_height,
            offsets: &self.view.offsets,
            visible_items: self.window.items().get(self.view.range()).unwrap_or(&[]),
            window_offset: self.window.window_offset(),
            scroll_top: self.scroll_top,
            progress: self.progress(),
            status: self.status(),
            error: self.loader.last_error(),
            total: self.total,
        }
    }

    /// Resident record by id.
    pub fn record(&self, id: &R::Id) -> Option<&R> {
        self.window.cache().get(id)
    }

    /// Scroll progress through the loaded rows, in `[0, 1]`.
    ///
    /// `start_index / len`, except that an empty window or a render range
    /// touching the last resident row reports 1.0.
    #[must_use]
    pub fn progress(&self) -> f64 {
        let len = self.window.len();
        if len == 0 || self.view.end_index >= len {
            return 1.0;
        }
        self.view.start_index as f64 / len as f64
    }

    #[must_use]
    pub fn status(&self) -> ListStatus {
        match self.loader.state() {
            LoaderState::Idle => ListStatus::Idle,
            LoaderState::Fetching => ListStatus::Loading,
            LoaderState::Exhausted if self.window.received() == 0 => ListStatus::Empty,
            LoaderState::Exhausted => ListStatus::Complete,
        }
    }

    #[must_use]
    pub fn max_scroll_top(&self) -> u64 {
        self.view.total_height.saturating_sub(self.viewport_height)
    }

    #[must_use]
    pub fn scroll_top(&self) -> u64 {
        self.scroll_top
    }

    #[must_use]
    pub fn viewport_height(&self) -> u64 {
        self.viewport_height
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    #[must_use]
    pub fn window(&self) -> &SlidingWindow<R> {
        &self.window
    }

    #[must_use]
    pub fn loader(&self) -> &ProgressiveLoader {
        &self.loader
    }

    #[must_use]
    pub fn view(&self) -> &VirtualWindow {
        &self.view
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.window.cache().stats()
    }

    /// Window bookkeeping plus agreement between the render range and the
    /// window it was computed over.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        self.window.check_invariants()?;
        if self.view.item_count() != self.window.len() {
            return Err(InvariantViolation::CacheDesync {
                resident: self.window.len(),
                cached: self.view.item_count(),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn reset(&mut self) -> Option<PageRequest> {
        self.window.reset(Vec::new());
        let epoch = self.loader.begin_epoch();
        self.scroll_top = 0;
        self.total = None;
        self.stats.resets += 1;
        self.recompute();
        tracing::debug!(epoch, query = ?self.query, "list reset");
        self.evaluate()
    }

    fn recompute(&mut self) {
        self.view = self.compute_view();
        let max = self.max_scroll_top();
        if self.scroll_top > max {
            self.scroll_top = max;
            self.view = self.compute_view();
        }
    }

    fn compute_view(&self) -> VirtualWindow {
        let store = &self.window;
        window::compute(
            store.items(),
            self.scroll_top,
            self.viewport_height,
            self.config.overscan,
            |record| store.row_height(record),
        )
    }

    /// Threshold check. Nothing is fetched before the first reset.
    fn evaluate(&mut self) -> Option<PageRequest> {
        if self.loader.epoch() == 0 {
            return None;
        }
        let progress = self.progress();
        let ticket = self
            .loader
            .on_progress(progress, self.window.next_fetch_offset())?;
        self.stats.fetches_issued += 1;
        tracing::debug!(
            epoch = ticket.epoch,
            offset = ticket.offset,
            limit = ticket.limit,
            progress,
            "page fetch issued"
        );
        Some(PageRequest {
            epoch: ticket.epoch,
            offset: ticket.offset,
            limit: ticket.limit,
            query: self.query.clone(),
        })
    }
}

fn discarded(resolution: Resolution) -> Resolved {
    Resolved {
        resolution,
        next: None,
    }
}
