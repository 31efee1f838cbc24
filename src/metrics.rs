//! In-process latency histograms for a translation run.
//! Each metric keeps its most recent samples in a bounded window; the
//! summary logged at the end of a run reports p50/p95/p99 and the mean.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Well-known metric names.
pub mod metric_names {
    /// Wall time of one `translate` call including retries (us).
    pub const TRANSLATE_REQUEST: &str = "t_translate_request";
    /// Attempts made per `translate` call that reached the network.
    pub const TRANSLATE_ATTEMPTS: &str = "translate_attempts";
    /// Wall time of one batch step (us).
    pub const BATCH_STEP: &str = "t_batch_step";
}

const DEFAULT_WINDOW: usize = 1024;

/// Records the elapsed time since creation when finished.
#[must_use = "a span records nothing until finished"]
pub struct TimingSpan {
    name: &'static str,
    started: Instant,
    registry: Arc<MetricsRegistry>,
}

impl TimingSpan {
    /// Record and return the elapsed time.
    pub fn finish(self) -> Duration {
        let elapsed = self.started.elapsed();
        self.registry.record_duration(self.name, elapsed);
        elapsed
    }
}

/// Sliding window over the latest samples of one metric.
struct Window {
    samples: VecDeque<f64>,
    limit: usize,
    total_seen: u64,
}

impl Window {
    fn new(limit: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(limit.min(64)),
            limit,
            total_seen: 0,
        }
    }

    fn push(&mut self, value: f64) {
        if self.samples.len() == self.limit {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
        self.total_seen += 1;
    }

    fn sorted(&self) -> Vec<f64> {
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        sorted
    }
}

/// Nearest-rank percentile over an already sorted slice.
fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let last = sorted.len() - 1;
    let rank = ((p.clamp(0.0, 100.0) / 100.0) * last as f64).round() as usize;
    sorted[rank.min(last)]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub mean: f64,
    /// Samples in the window.
    pub count: usize,
    /// Samples recorded over the registry's lifetime.
    pub total: u64,
}

impl MetricSummary {
    fn of(window: &Window) -> Self {
        let sorted = window.sorted();
        let mean = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };
        Self {
            p50: nearest_rank(&sorted, 50.0),
            p95: nearest_rank(&sorted, 95.0),
            p99: nearest_rank(&sorted, 99.0),
            mean,
            count: sorted.len(),
            total: window.total_seen,
        }
    }
}

pub struct MetricsRegistry {
    windows: Mutex<HashMap<&'static str, Window>>,
    window_size: usize,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window_size: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window_size: window_size.max(1),
        }
    }

    pub fn record(&self, name: &'static str, value: f64) {
        let mut windows = self.windows.lock();
        windows
            .entry(name)
            .or_insert_with(|| Window::new(self.window_size))
            .push(value);
    }

    /// Durations are stored in microseconds.
    pub fn record_duration(&self, name: &'static str, elapsed: Duration) {
        self.record(name, elapsed.as_micros() as f64);
    }

    pub fn span(self: &Arc<Self>, name: &'static str) -> TimingSpan {
        TimingSpan {
            name,
            started: Instant::now(),
            registry: Arc::clone(self),
        }
    }

    /// Percentile (0-100) of the current window; 0.0 for an unknown metric.
    pub fn percentile(&self, name: &str, p: f64) -> f64 {
        self.windows
            .lock()
            .get(name)
            .map(|w| nearest_rank(&w.sorted(), p))
            .unwrap_or(0.0)
    }

    pub fn count(&self, name: &str) -> usize {
        self.windows
            .lock()
            .get(name)
            .map_or(0, |w| w.samples.len())
    }

    pub fn summary(&self) -> BTreeMap<&'static str, MetricSummary> {
        self.windows
            .lock()
            .iter()
            .map(|(&name, window)| (name, MetricSummary::of(window)))
            .collect()
    }

    /// One debug event per metric.
    pub fn log_summary(&self) {
        for (name, s) in self.summary() {
            tracing::debug!(
                metric = name,
                p50 = s.p50,
                p95 = s.p95,
                p99 = s.p99,
                mean = s.mean,
                count = s.count,
                total = s.total,
                "metric_summary"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_samples() {
        let m = MetricsRegistry::new();
        for v in 1..=100 {
            m.record(metric_names::BATCH_STEP, v as f64);
        }
        assert_eq!(m.percentile(metric_names::BATCH_STEP, 0.0), 1.0);
        assert_eq!(m.percentile(metric_names::BATCH_STEP, 100.0), 100.0);
        assert_eq!(m.count(metric_names::BATCH_STEP), 100);
        assert_eq!(m.percentile("unknown", 50.0), 0.0);
    }

    #[test]
    fn window_keeps_latest_samples() {
        let m = MetricsRegistry::with_window(2);
        m.record("x", 1.0);
        m.record("x", 5.0);
        m.record("x", 9.0);
        let s = &m.summary()["x"];
        assert_eq!(s.count, 2);
        assert_eq!(s.total, 3);
        assert_eq!(s.p99, 9.0);
        assert_eq!(s.mean, 7.0);
        assert_eq!(m.percentile("x", 0.0), 5.0);
    }

    #[test]
    fn span_records_on_finish() {
        let m = Arc::new(MetricsRegistry::new());
        m.span(metric_names::BATCH_STEP).finish();
        assert_eq!(m.count(metric_names::BATCH_STEP), 1);
    }
}
