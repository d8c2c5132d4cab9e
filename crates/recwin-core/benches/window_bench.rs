//! Benchmarks for the window calculator and sliding window.
//!
//! Run with: cargo bench -p recwin-core

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use recwin_core::{
    EngineConfig, FetchError, HeightConfig, ListEngine, Page, PageRequest, QueryParams, Record,
    SlidingWindow, compute,
};
use std::hint::black_box;

// =============================================================================
// Test Data
// =============================================================================

#[derive(Debug, Clone)]
struct Row {
    id: u64,
    summary: String,
}

impl Record for Row {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn content(&self, _expanded: bool) -> Option<&str> {
        Some(&self.summary)
    }
}

/// Deterministic spread of row heights between 48 and 228.
fn heights(n: usize) -> Vec<u32> {
    (0..n as u32).map(|i| 48 + (i.wrapping_mul(2_654_435_761) % 10) * 20).collect()
}

fn rows(offset: usize, n: usize) -> Vec<Row> {
    (offset..offset + n)
        .map(|i| Row {
            id: i as u64,
            summary: "lorem ipsum ".repeat(i % 40),
        })
        .collect()
}

fn serve(req: &PageRequest) -> Result<Page<Row>, FetchError> {
    Ok(Page::new(u64::MAX, rows(req.offset, req.limit)))
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("window/compute");

    for n in [1_000, 10_000, 100_000] {
        let hs = heights(n);
        let total: u64 = hs.iter().map(|&h| u64::from(h)).sum();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("middle", n), &hs, |b, hs| {
            b.iter(|| black_box(compute(hs, total / 2, 900, 5, |h| *h)))
        });
    }

    group.finish();
}

fn bench_append_evict(c: &mut Criterion) {
    let mut group = c.benchmark_group("window/append_evict");

    for page in [50, 200] {
        group.throughput(Throughput::Elements(page as u64));
        group.bench_with_input(BenchmarkId::from_parameter(page), &page, |b, &page| {
            let mut window = SlidingWindow::new(1_000, HeightConfig::default());
            let mut offset = 0;
            b.iter(|| {
                let report = window.append(rows(offset, page));
                offset += page;
                black_box(report)
            })
        });
    }

    group.finish();
}

fn bench_scroll_full_window(c: &mut Criterion) {
    let mut engine: ListEngine<Row> = match ListEngine::new(EngineConfig::default()) {
        Ok(engine) => engine,
        Err(err) => panic!("default config rejected: {err}"),
    };
    let _ = engine.set_viewport(900);
    let mut pending = engine.set_query(QueryParams::default());
    while engine.window().len() < 1_000 {
        pending = engine.pump(&mut serve, pending, 1);
        if pending.is_none() {
            let bottom = engine.max_scroll_top();
            pending = engine.on_scroll(bottom);
        }
    }
    let max = engine.max_scroll_top();

    c.bench_function("engine/scroll_1000", |b| {
        let mut step = 0u64;
        b.iter(|| {
            step = (step + 997) % 1_000;
            let _ = engine.on_scroll(max * step / 1_000);
            black_box(engine.frame().visible_items.len())
        })
    });
}

criterion_group!(
    benches,
    bench_compute,
    bench_append_evict,
    bench_scroll_full_window,
);

criterion_main!(benches);
