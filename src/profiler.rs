//! Benchmark hooks around dispatch.
//!
//! The dispatcher opens one benchmark per executed request (group
//! `Requests`) when profiling is enabled, stops it when the request succeeds
//! and deletes it when the request fails. Profilers are observational only:
//! none of their operations can fail a dispatch.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Identifies one open benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BenchmarkToken(pub u64);

/// Benchmark start/stop/delete hooks.
pub trait Profiler: Send + Sync {
    /// Open a benchmark named `label` in `group`.
    fn start(&self, group: &str, label: &str) -> BenchmarkToken;

    /// Close a benchmark and record its duration.
    fn stop(&self, token: BenchmarkToken);

    /// Discard a benchmark without recording it.
    fn delete(&self, token: BenchmarkToken);
}

/// An open benchmark that is deleted unless explicitly stopped.
pub(crate) struct OpenBenchmark {
    profiler: Arc<dyn Profiler>,
    token: Option<BenchmarkToken>,
}

impl OpenBenchmark {
    pub(crate) fn start(profiler: Arc<dyn Profiler>, group: &str, label: &str) -> Self {
        let token = profiler.start(group, label);
        Self {
            profiler,
            token: Some(token),
        }
    }

    /// Record the benchmark as completed.
    pub(crate) fn stop(mut self) {
        if let Some(token) = self.token.take() {
            self.profiler.stop(token);
        }
    }
}

impl Drop for OpenBenchmark {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            self.profiler.delete(token);
        }
    }
}

/// Aggregate timings of the completed benchmarks in one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupStats {
    pub count: u64,
    pub total: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl GroupStats {
    fn record(&mut self, elapsed: Duration) {
        if self.count == 0 || elapsed < self.min {
            self.min = elapsed;
        }
        if elapsed > self.max {
            self.max = elapsed;
        }
        self.count += 1;
        self.total += elapsed;
    }

    /// Mean duration, zero when nothing was recorded.
    #[must_use]
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / u32::try_from(self.count).unwrap_or(u32::MAX)
        }
    }
}

#[derive(Debug)]
struct Mark {
    group: String,
    label: String,
    started: Instant,
}

/// In-process profiler that keeps per-group statistics and reports every
/// completed benchmark as a `tracing` debug event.
#[derive(Debug, Default)]
pub struct TracingProfiler {
    next_token: AtomicU64,
    marks: DashMap<BenchmarkToken, Mark>,
    stats: DashMap<String, GroupStats>,
    deleted: AtomicU64,
}

impl TracingProfiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics for `group`, if any benchmark in it completed.
    #[must_use]
    pub fn stats(&self, group: &str) -> Option<GroupStats> {
        self.stats.get(group).map(|s| *s)
    }

    /// Number of benchmarks started but neither stopped nor deleted.
    #[must_use]
    pub fn open_benchmarks(&self) -> usize {
        self.marks.len()
    }

    /// Labels of the open benchmarks, sorted.
    #[must_use]
    pub fn open_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.marks.iter().map(|m| m.label.clone()).collect();
        labels.sort();
        labels
    }

    /// Number of benchmarks discarded with [`Profiler::delete`].
    #[must_use]
    pub fn deleted_count(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }
}

impl Profiler for TracingProfiler {
    fn start(&self, group: &str, label: &str) -> BenchmarkToken {
        let token = BenchmarkToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.marks.insert(
            token,
            Mark {
                group: group.to_string(),
                label: label.to_string(),
                started: Instant::now(),
            },
        );
        trace!(group = %group, label = %label, token = token.0, "Benchmark start");
        token
    }

    fn stop(&self, token: BenchmarkToken) {
        let Some((_, mark)) = self.marks.remove(&token) else {
            return;
        };
        let elapsed = mark.started.elapsed();
        self.stats
            .entry(mark.group.clone())
            .or_default()
            .record(elapsed);
        debug!(
            group = %mark.group,
            label = %mark.label,
            elapsed_us = elapsed.as_micros() as u64,
            "Benchmark complete"
        );
    }

    fn delete(&self, token: BenchmarkToken) {
        if let Some((_, mark)) = self.marks.remove(&token) {
            self.deleted.fetch_add(1, Ordering::Relaxed);
            trace!(group = %mark.group, label = %mark.label, "Benchmark deleted");
        }
    }
}
