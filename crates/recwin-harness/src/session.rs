//! Scripted scroll sessions.
//!
//! A [`Session`] plays the host: it owns a [`ListEngine`], forwards every
//! [`PageRequest`] to a [`DeferredSource`], feeds results back as they come
//! due, scrolls down by a fixed step each tick, reports simulated layout
//! heights for visible rows, and presses "retry" when an error is shown.
//!
//! After each tick the engine's invariants are checked and the window is
//! compared against the source's full result list, so any gap or overlap
//! between pages shows up as a contiguity violation.

use std::fmt;
use std::path::Path;

use recwin_core::{
    CacheStats, ConfigError, EngineConfig, EngineStats, ListEngine, ListStatus, PageRequest,
    QueryParams, Record, Resolution,
};
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::record::{SampleRecord, generate};
use crate::source::{DeferredSource, FailurePlan, MemorySource};

// ============================================================================
// Errors
// ============================================================================

/// Failure to set up or run a session.
#[derive(Debug)]
pub enum HarnessError {
    Config(ConfigError),
    /// A `RECWIN_HARNESS_*` variable could not be parsed.
    Env { var: &'static str, value: String },
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "config: {err}"),
            Self::Env { var, value } => write!(f, "cannot parse {var}={value:?}"),
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Json(err) => write!(f, "json: {err}"),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Env { .. } => None,
        }
    }
}

impl From<ConfigError> for HarnessError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

// ============================================================================
// Config
// ============================================================================

/// Everything a session needs. Missing JSON fields take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub engine: EngineConfig,
    /// Records in the in-memory dataset.
    pub dataset_size: usize,
    pub seed: u64,
    pub viewport_height: u64,
    /// Pixels scrolled per tick.
    pub scroll_step: u64,
    /// Tick budget.
    pub steps: usize,
    /// Ticks between a request and its result.
    pub latency_ticks: u64,
    pub failures: FailurePlan,
    /// Report simulated layout heights for visible rows.
    pub measure_rows: bool,
    /// Wrap width of the simulated layout.
    pub render_columns: u32,
    /// Expand the first visible row every n ticks (0 disables).
    pub expand_every: usize,
    pub query: QueryParams,
    /// Tick at which `requery` replaces `query`.
    pub requery_at: Option<usize>,
    pub requery: QueryParams,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            dataset_size: 5_000,
            seed: 42,
            viewport_height: 900,
            scroll_step: 600,
            steps: 2_000,
            latency_ticks: 1,
            failures: FailurePlan::Never,
            measure_rows: true,
            render_columns: 72,
            expand_every: 0,
            query: QueryParams::default(),
            requery_at: None,
            requery: QueryParams::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overlaid with `RECWIN_*` and `RECWIN_HARNESS_*` variables.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::default().apply_env_with(|name| std::env::var(name).ok())
    }

    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, HarnessError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.engine = self.engine.apply_env_with(&lookup)?;
        if let Some(v) = env_parse(&lookup, "RECWIN_HARNESS_DATASET")? {
            self.dataset_size = v;
        }
        if let Some(v) = env_parse(&lookup, "RECWIN_HARNESS_SEED")? {
            self.seed = v;
        }
        if let Some(v) = env_parse(&lookup, "RECWIN_HARNESS_STEPS")? {
            self.steps = v;
        }
        if let Some(v) = env_parse(&lookup, "RECWIN_HARNESS_VIEWPORT")? {
            self.viewport_height = v;
        }
        if let Some(v) = env_parse(&lookup, "RECWIN_HARNESS_SCROLL_STEP")? {
            self.scroll_step = v;
        }
        if let Some(v) = env_parse(&lookup, "RECWIN_HARNESS_LATENCY")? {
            self.latency_ticks = v;
        }
        if let Some(n) = env_parse(&lookup, "RECWIN_HARNESS_FAIL_EVERY")? {
            self.failures = FailurePlan::Every(n);
        }
        if let Some(flag) = env_flag(&lookup, "RECWIN_HARNESS_MEASURE") {
            self.measure_rows = flag;
        }
        if let Some(filter) = env_string(&lookup, "RECWIN_HARNESS_FILTER") {
            self.query.filter = filter;
        }
        Ok(self)
    }
}

fn env_parse<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, HarnessError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(value) = env_string(lookup, var) else {
        return Ok(None);
    };
    value
        .parse::<T>()
        .map(Some)
        .map_err(|_| HarnessError::Env { var, value })
}

fn env_flag<F>(lookup: &F, var: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let value = env_string(lookup, var)?;
    Some(matches!(
        value.as_str(),
        "1" | "true" | "TRUE" | "True" | "yes" | "YES" | "on" | "ON"
    ))
}

fn env_string<F>(lookup: &F, var: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

// ============================================================================
// Report
// ============================================================================

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub steps: usize,
    pub status: ListStatus,
    pub window_offset: usize,
    pub window_len: usize,
    pub peak_window_len: usize,
    /// Most measured heights held at once.
    pub peak_measured: usize,
    /// Dataset index the next fetch would start at.
    pub records_seen: usize,
    /// Total reported by the source.
    pub total: Option<u64>,
    pub scroll_top: u64,
    pub total_height: u64,
    pub failures_seen: usize,
    pub retries: usize,
    pub engine: EngineStats,
    pub cache: CacheStats,
    /// Window rows that disagree with the source's result order.
    pub contiguity_violations: usize,
    pub invariant_violations: Vec<String>,
}

impl SessionReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.contiguity_violations == 0 && self.invariant_violations.is_empty()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Host simulation around one engine.
pub struct Session {
    config: SessionConfig,
    engine: ListEngine<SampleRecord>,
    source: DeferredSource<MemorySource>,
    expected: Option<(QueryParams, Vec<u64>)>,
    step: usize,
    peak_window_len: usize,
    peak_measured: usize,
    failures_seen: usize,
    retries: usize,
    contiguity_violations: usize,
    invariant_violations: Vec<String>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, HarnessError> {
        let engine = ListEngine::new(config.engine.clone())?;
        let records = generate(config.dataset_size, config.seed);
        let memory = MemorySource::new(records).with_failures(config.failures.clone());
        let source = DeferredSource::new(memory, config.latency_ticks);

        let mut session = Self {
            config,
            engine,
            source,
            expected: None,
            step: 0,
            peak_window_len: 0,
            peak_measured: 0,
            failures_seen: 0,
            retries: 0,
            contiguity_violations: 0,
            invariant_violations: Vec::new(),
        };
        let req = session.engine.set_viewport(session.config.viewport_height);
        session.submit(req);
        let req = session.engine.set_query(session.config.query.clone());
        session.submit(req);
        Ok(session)
    }

    /// Build a session and run it to completion.
    pub fn run(config: SessionConfig) -> Result<SessionReport, HarnessError> {
        let mut session = Self::new(config)?;
        while session.step() {}
        Ok(session.report())
    }

    #[must_use]
    pub fn engine(&self) -> &ListEngine<SampleRecord> {
        &self.engine
    }

    /// Run one tick. Returns `false` once the session is over.
    pub fn step(&mut self) -> bool {
        if self.step >= self.config.steps || self.finished() {
            return false;
        }
        let step = self.step;
        self.step += 1;

        for (request, result) in self.source.tick::<SampleRecord>() {
            let resolved = self.engine.resolve(&request, result);
            if let Resolution::Failed(_) = resolved.resolution {
                self.failures_seen += 1;
            }
            self.submit(resolved.next);
        }

        if self.config.requery_at == Some(step) {
            let req = self.engine.set_query(self.config.requery.clone());
            self.submit(req);
        }

        if self.engine.frame().error.is_some() {
            self.retries += 1;
            let req = self.engine.retry();
            self.submit(req);
        }

        let target = self.engine.scroll_top() + self.config.scroll_step;
        let req = self.engine.on_scroll(target);
        self.submit(req);

        if self.config.expand_every > 0 && step % self.config.expand_every == 0 {
            let first = self.engine.frame().visible_items.first().map(|r| r.id);
            if let Some(id) = first {
                let expanded = self.engine.window().is_expanded(&id);
                self.engine.set_expanded(id, !expanded);
            }
        }

        if self.config.measure_rows {
            self.measure_visible();
        }

        self.verify(step);
        true
    }

    /// Exhausted, scrolled to the bottom, nothing outstanding.
    fn finished(&self) -> bool {
        matches!(
            self.engine.status(),
            ListStatus::Complete | ListStatus::Empty
        ) && self.engine.scroll_top() >= self.engine.max_scroll_top()
            && self.source.pending() == 0
    }

    fn submit(&mut self, request: Option<PageRequest>) {
        if let Some(request) = request {
            self.source.submit(request);
        }
    }

    /// Simulated layout: title line plus content wrapped at `render_columns`.
    fn layout_height(&self, record: &SampleRecord) -> u32 {
        let heights = self.config.engine.heights;
        let expanded = self.engine.window().is_expanded(&record.id);
        let width = record
            .content(expanded)
            .map_or(0, |text| u32::try_from(text.width()).unwrap_or(u32::MAX));
        let lines = width.div_ceil(self.config.render_columns.max(1));
        heights
            .base
            .saturating_add(lines.saturating_mul(heights.line_height))
    }

    fn measure_visible(&mut self) {
        let measured: Vec<(u64, u32)> = self
            .engine
            .frame()
            .visible_items
            .iter()
            .map(|r| (r.id, self.layout_height(r)))
            .collect();
        for (id, height) in measured {
            let req = self.engine.on_row_laid_out(id, height);
            self.submit(req);
        }
    }

    fn verify(&mut self, step: usize) {
        if let Err(violation) = self.engine.check_invariants() {
            self.invariant_violations.push(format!("step {step}: {violation}"));
        }

        let window = self.engine.window();
        self.peak_window_len = self.peak_window_len.max(window.len());
        self.peak_measured = self.peak_measured.max(window.heights().len());

        let query = self.engine.query().clone();
        let stale = !matches!(&self.expected, Some((q, _)) if *q == query);
        if stale {
            match self.source.inner_mut().matching_ids(&query) {
                Ok(ids) => self.expected = Some((query, ids)),
                Err(err) => {
                    tracing::warn!(%err, "cannot list expected ids");
                    return;
                }
            }
        }
        let Some((_, ids)) = &self.expected else {
            return;
        };
        let window = self.engine.window();
        let offset = window.window_offset();
        let mismatched = window
            .items()
            .iter()
            .enumerate()
            .filter(|(k, r)| ids.get(offset + k) != Some(&r.id))
            .count();
        if mismatched > 0 {
            tracing::warn!(step, mismatched, offset, "window out of order");
        }
        self.contiguity_violations += mismatched;
    }

    #[must_use]
    pub fn report(&self) -> SessionReport {
        let frame = self.engine.frame();
        let window = self.engine.window();
        SessionReport {
            steps: self.step,
            status: frame.status,
            window_offset: window.window_offset(),
            window_len: window.len(),
            peak_window_len: self.peak_window_len,
            peak_measured: self.peak_measured,
            records_seen: window.next_fetch_offset(),
            total: frame.total,
            scroll_top: frame.scroll_top,
            total_height: frame.total_height,
            failures_seen: self.failures_seen,
            retries: self.retries,
            engine: self.engine.stats(),
            cache: self.engine.cache_stats(),
            contiguity_violations: self.contiguity_violations,
            invariant_violations: self.invariant_violations.clone(),
        }
    }
}
