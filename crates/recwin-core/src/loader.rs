//! Progressive page loader.
//!
//! # State machine
//!
//! ```text
//!            progress > threshold
//!   Idle ─────────────────────────► Fetching
//!    ▲ ▲                              │  │
//!    │ └──── rows == limit ───────────┘  │ rows < limit
//!    │ └──── failure (disarms) ──────────┤
//!    │                                   ▼
//!    └──────── begin_epoch ◄──────── Exhausted
//! ```
//!
//! At most one fetch is in flight. A failed fetch disarms the loader: the
//! next request needs progress to fall back under the threshold and cross
//! it again, or an explicit [`retry`](ProgressiveLoader::retry). Every ticket
//! carries the epoch it was issued in so results that outlive a reset can be
//! recognized and dropped.

use crate::error::FetchError;

/// Loader state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoaderState {
    #[default]
    Idle,
    Fetching,
    /// The source returned a short page. Terminal until the next epoch.
    Exhausted,
}

/// Identity of an issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub epoch: u64,
    pub offset: usize,
    pub limit: usize,
}

/// How a returning ticket relates to the loader's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    /// The ticket currently in flight.
    Current,
    /// Issued before the last reset.
    Stale,
    /// Current epoch, but not the ticket the loader is waiting on.
    Unsolicited,
}

/// Threshold-driven pager.
#[derive(Debug, Clone)]
pub struct ProgressiveLoader {
    state: LoaderState,
    epoch: u64,
    page_size: usize,
    threshold: f64,
    armed: bool,
    in_flight: Option<FetchTicket>,
    last_error: Option<FetchError>,
}

impl ProgressiveLoader {
    /// Create a loader at epoch 0 with nothing in flight.
    #[must_use]
    pub fn new(page_size: usize, threshold: f64) -> Self {
        Self {
            state: LoaderState::Idle,
            epoch: 0,
            page_size: page_size.max(1),
            threshold,
            armed: true,
            in_flight: None,
            last_error: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> LoaderState {
        self.state
    }

    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether a threshold crossing would issue a fetch from `Idle`.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<FetchTicket> {
        self.in_flight
    }

    /// Error from the last failed fetch, until dismissed or superseded.
    #[must_use]
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Feed the current scroll progress.
    ///
    /// Returns a ticket when this call moves the loader to `Fetching`. Calls
    /// outside `Idle` are no-ops.
    pub fn on_progress(&mut self, progress: f64, next_offset: usize) -> Option<FetchTicket> {
        if self.state != LoaderState::Idle {
            tracing::trace!(state = ?self.state, progress, "progress ignored");
            return None;
        }
        if progress <= self.threshold {
            self.armed = true;
            return None;
        }
        if !self.armed {
            return None;
        }
        let ticket = FetchTicket {
            epoch: self.epoch,
            offset: next_offset,
            limit: self.page_size,
        };
        self.state = LoaderState::Fetching;
        self.in_flight = Some(ticket);
        Some(ticket)
    }

    /// Start a new epoch: drop whatever is in flight and return to `Idle`.
    pub fn begin_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.state = LoaderState::Idle;
        self.armed = true;
        self.in_flight = None;
        self.last_error = None;
        self.epoch
    }

    /// Classify a returning ticket.
    #[must_use]
    pub fn check(&self, ticket: &FetchTicket) -> TicketStatus {
        if ticket.epoch != self.epoch {
            TicketStatus::Stale
        } else if self.in_flight.as_ref() == Some(ticket) {
            TicketStatus::Current
        } else {
            TicketStatus::Unsolicited
        }
    }

    /// The in-flight fetch returned `received` rows.
    ///
    /// A short page moves to `Exhausted`; a full one back to `Idle`.
    pub fn complete(&mut self, received: usize) -> LoaderState {
        let limit = self.in_flight.take().map_or(self.page_size, |t| t.limit);
        self.last_error = None;
        self.state = if received < limit {
            LoaderState::Exhausted
        } else {
            LoaderState::Idle
        };
        self.state
    }

    /// The in-flight fetch failed. Back to `Idle`, disarmed.
    pub fn fail(&mut self, error: FetchError) {
        self.in_flight = None;
        self.state = LoaderState::Idle;
        self.armed = false;
        self.last_error = Some(error);
    }

    /// Drop the in-flight fetch without recording an error.
    pub fn abandon(&mut self) {
        if self.state == LoaderState::Fetching {
            self.state = LoaderState::Idle;
        }
        self.in_flight = None;
    }

    /// Re-arm after a failure. Returns `false` outside `Idle`.
    pub fn retry(&mut self) -> bool {
        if self.state != LoaderState::Idle {
            return false;
        }
        self.armed = true;
        self.last_error = None;
        true
    }

    /// Clear the surfaced error without re-arming.
    pub fn dismiss_error(&mut self) -> Option<FetchError> {
        self.last_error.take()
    }
}
