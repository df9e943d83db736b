use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Process-wide runtime metrics for the collector worker.
///
/// Purpose:
/// - Track runs handled by this process
/// - Track fetch / push throughput across runs
/// - Track queue and report delivery health
///
/// Design:
/// - Lock-free (Atomics)
/// - Observational only; run counters reported to the queue are
///   owned by the run coordinator and never read from here
#[derive(Default)]
pub struct RuntimeMetrics {
    // Runs
    pub runs_started: AtomicUsize,
    pub runs_done: AtomicUsize,
    pub runs_failed: AtomicUsize,

    // Provider side
    pub pages_fetched: AtomicUsize,
    pub fetch_errors: AtomicUsize,

    // Destination side
    pub items_pushed: AtomicUsize,
    pub items_skipped: AtomicUsize,
    pub push_errors: AtomicUsize,

    // Queue
    pub reports_sent: AtomicUsize,
    pub report_errors: AtomicUsize,
    pub pull_errors: AtomicUsize,
}

impl RuntimeMetrics {
    /// One-line summary for the periodic metrics log.
    pub fn summary(&self) -> String {
        format!(
            "runs={} done={} failed={} pages={} fetch_err={} pushed={} skipped={} push_err={} reports={} report_err={} pull_err={}",
            self.runs_started.load(Ordering::Relaxed),
            self.runs_done.load(Ordering::Relaxed),
            self.runs_failed.load(Ordering::Relaxed),
            self.pages_fetched.load(Ordering::Relaxed),
            self.fetch_errors.load(Ordering::Relaxed),
            self.items_pushed.load(Ordering::Relaxed),
            self.items_skipped.load(Ordering::Relaxed),
            self.push_errors.load(Ordering::Relaxed),
            self.reports_sent.load(Ordering::Relaxed),
            self.report_errors.load(Ordering::Relaxed),
            self.pull_errors.load(Ordering::Relaxed),
        )
    }
}

/// Global metrics registry (singleton)
pub static METRICS: Lazy<Arc<RuntimeMetrics>> =
    Lazy::new(|| Arc::new(RuntimeMetrics::default()));
