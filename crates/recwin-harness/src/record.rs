//! Synthetic records.

use recwin_core::Record;
use serde::{Deserialize, Serialize};

const WORDS: &[&str] = &[
    "deploy", "rollback", "latency", "timeout", "cache", "shard", "replica", "quota", "token",
    "ingest", "backfill", "schema", "index", "vacuum", "lease", "heartbeat", "gateway", "retry",
    "throttle", "snapshot", "監視", "障害", "復旧",
];

/// A generated record with a short summary and an optional long body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub id: u64,
    pub title: String,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub priority: u32,
    pub created_at: u64,
}

impl Record for SampleRecord {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn content(&self, expanded: bool) -> Option<&str> {
        if expanded {
            self.body.as_deref().or(self.summary.as_deref())
        } else {
            self.summary.as_deref()
        }
    }
}

impl SampleRecord {
    /// Whether `needle` (lowercased) occurs in the title or summary.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(needle)
            || self
                .summary
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(needle))
    }
}

/// SplitMix64: small, deterministic, seedable.
#[derive(Debug, Clone)]
pub struct SplitMix64(u64);

impl SplitMix64 {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `0..bound` (`bound > 0`).
    pub fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound.max(1)
    }

    fn sentence(&mut self, words: usize) -> String {
        let mut out = String::new();
        for i in 0..words {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(WORDS[self.below(WORDS.len() as u64) as usize]);
        }
        out
    }
}

/// Generate `count` records with ids `0..count`.
///
/// About one in eight records has no summary, so the default height tier is
/// exercised; one in three carries a long body.
#[must_use]
pub fn generate(count: usize, seed: u64) -> Vec<SampleRecord> {
    let mut rng = SplitMix64::new(seed);
    (0..count as u64)
        .map(|id| {
            let title_words = 2 + rng.below(3) as usize;
            let title = rng.sentence(title_words);
            let summary = (rng.below(8) != 0).then(|| {
                let words = 1 + rng.below(30) as usize;
                rng.sentence(words)
            });
            let body = (rng.below(3) == 0).then(|| {
                let words = 40 + rng.below(120) as usize;
                rng.sentence(words)
            });
            SampleRecord {
                id,
                title,
                summary,
                body,
                priority: rng.below(5) as u32,
                created_at: 1_700_000_000 + id * 60 + rng.below(60),
            }
        })
        .collect()
}
