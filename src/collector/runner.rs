use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::{mpsc, watch, Notify};

use crate::{
    destination::Destination,
    metrics::METRICS,
    providers::adapter::ListingProvider,
    queue::ProgressSink,
    schema::{ProgressReport, RunStatus},
};

use super::{
    feeder::run_feeder,
    filter::should_skip,
    gate::OutputGate,
    plan::RunPlan,
    progress::{progress_report, PageResult, ResumeTracker, RunCounters, RunOutcome},
    worker::spawn_pool,
};

/// Executes the pagination phase of a run and sends its final report.
///
/// Lifecycle:
/// - spawns the fetch worker pool and the page feeder
/// - drains page results in arrival order (not page order)
/// - raises the page count when a page reports a larger total
/// - filters and pushes items through the output gate
/// - reports progress after every page
/// - stops the feeder once the last known page has been processed,
///   then keeps draining until every worker has exited
///
/// GUARANTEES:
/// - Exactly one final report (done / failed) is sent
/// - Page count and counters never decrease
/// - Per-page and per-item failures never abort the run
///
pub async fn run_pages(
    plan: RunPlan,
    provider: Arc<dyn ListingProvider>,
    destination: Arc<dyn Destination>,
    reporter: &dyn ProgressSink,
) -> RunOutcome {
    let started_at = Utc::now();
    let buffer = plan.workers * 2;

    info!(
        "[Collector] run={} source={} start_page={} page_count={} workers={} push_interval={:?}",
        plan.run_id,
        plan.source_name,
        plan.start_page,
        plan.initial_page_count,
        plan.workers,
        plan.push_interval
    );

    let (page_tx, page_rx) = mpsc::channel::<i64>(buffer);
    let (result_tx, mut result_rx) = mpsc::channel::<PageResult>(buffer);
    let (count_tx, count_rx) = watch::channel(plan.initial_page_count);
    let stop = Arc::new(Notify::new());

    let workers = spawn_pool(plan.workers, provider, page_rx, result_tx);
    let feeder = tokio::spawn(run_feeder(plan.start_page, count_rx, stop.clone(), page_tx));

    let mut coordinator = Coordinator::new(&plan, destination, reporter);

    while let Some(result) = result_rx.recv().await {
        if coordinator.observe(&result) {
            count_tx.send_replace(coordinator.page_count);
        }
        if coordinator.sealed_by(result.page) {
            info!(
                "[Collector] run={} all {} pages dispatched, draining",
                plan.run_id, coordinator.page_count
            );
            stop.notify_one();
        }
        coordinator.process(result).await;
    }

    if let Err(e) = feeder.await {
        error!("[Collector] feeder task failed: {}", e);
    }
    for res in futures_util::future::join_all(workers).await {
        if let Err(e) = res {
            error!("[Collector] worker task failed: {}", e);
        }
    }

    coordinator.finish(started_at).await
}

// ------------------------------------------------------------
// Coordinator state
// ------------------------------------------------------------
//
// Single writer of the page count and of every run counter.
//
struct Coordinator<'a> {
    plan: &'a RunPlan,
    destination: Arc<dyn Destination>,
    reporter: &'a dyn ProgressSink,
    gate: OutputGate,

    page_count: i64,
    max_page_seen: i64,
    sealed: bool,
    pages_processed: i64,

    tracker: ResumeTracker,
    counters: RunCounters,
    last_error: Option<String>,
}

impl<'a> Coordinator<'a> {
    fn new(
        plan: &'a RunPlan,
        destination: Arc<dyn Destination>,
        reporter: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            plan,
            destination,
            reporter,
            gate: OutputGate::new(plan.push_interval),
            page_count: plan.initial_page_count,
            max_page_seen: plan.start_page,
            sealed: false,
            pages_processed: 0,
            tracker: ResumeTracker::new(plan.start_page),
            counters: RunCounters::default(),
            last_error: None,
        }
    }

    /// Records a result's page and observed total.
    ///
    /// Returns true when the page count was raised. Only increases are
    /// honored, and none once the dispatch range is sealed.
    fn observe(&mut self, result: &PageResult) -> bool {
        self.pages_processed += 1;
        self.max_page_seen = self.max_page_seen.max(result.page);
        self.tracker.mark(result.page);

        if !self.sealed && result.page_count > self.page_count {
            info!(
                "[Collector] run={} page count {} -> {} (page {})",
                self.plan.run_id, self.page_count, result.page_count, result.page
            );
            self.page_count = result.page_count;
            return true;
        }
        false
    }

    /// True exactly once: when the result for the last known page has
    /// arrived and no higher page was ever seen.
    fn sealed_by(&mut self, page: i64) -> bool {
        if !self.sealed && page == self.page_count && self.max_page_seen == self.page_count {
            self.sealed = true;
            return true;
        }
        false
    }

    async fn process(&mut self, result: PageResult) {
        if let Some(err) = result.error {
            self.counters.errors += 1;
            self.last_error = Some(err.to_string());

            let message = format!(
                "source={} page={} fetch error: {}",
                self.plan.source_name, result.page, err
            );
            self.report(RunStatus::Failed, message).await;
            return;
        }

        info!(
            "[Collector] Got {} items from page {}, pageCount={}",
            result.items.len(),
            result.page,
            result.page_count
        );

        for item in &result.items {
            if should_skip(item, &self.plan.keywords) {
                self.counters.skipped += 1;
                METRICS.items_skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            self.gate.wait().await;

            match self.destination.push(item).await {
                Ok(acceptance) => {
                    self.counters.record_acceptance(acceptance);
                    METRICS.items_pushed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!("[Collector] push failed on page {}: {}", result.page, e);
                    self.counters.errors += 1;
                    self.last_error = Some(e.to_string());
                    METRICS.push_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let c = &self.counters;
        let message = format!(
            "source={} page={}/{} pushed={} created={} updated={} skipped={} errors={} lastError={}",
            self.plan.source_name,
            result.page,
            self.page_count,
            c.pushed,
            c.created,
            c.updated,
            c.skipped,
            c.errors,
            self.last_error.as_deref().unwrap_or(""),
        );
        self.report(RunStatus::Running, message).await;
    }

    async fn report(&self, status: RunStatus, message: String) {
        let report = progress_report(
            self.plan.run_id,
            self.plan.task_id,
            status,
            self.tracker.cursor(),
            self.page_count,
            &self.counters,
            message,
        );
        deliver(self.reporter, &report).await;
    }

    async fn finish(mut self, started_at: chrono::DateTime<Utc>) -> RunOutcome {
        if !self.sealed {
            // only reachable if every worker died before the last page
            self.last_error = Some(format!(
                "worker pool exited before page {} was processed",
                self.page_count
            ));
        }

        let status = if self.counters.errors == 0 && self.sealed {
            RunStatus::Done
        } else {
            RunStatus::Failed
        };

        let outcome = RunOutcome {
            run_id: self.plan.run_id,
            status,
            counters: self.counters,
            last_error: self.last_error.clone(),
            page_count: self.page_count,
            pages_processed: self.pages_processed,
            started_at,
            finished_at: Utc::now(),
        };

        self.report(status, outcome.message()).await;

        info!(
            "[Collector] run={} finished status={:?} pages={} pushed={} created={} updated={} unclassified={} skipped={} errors={} in {}ms",
            outcome.run_id,
            outcome.status,
            outcome.pages_processed,
            outcome.counters.pushed,
            outcome.counters.created,
            outcome.counters.updated,
            outcome.counters.unclassified,
            outcome.counters.skipped,
            outcome.counters.errors,
            outcome.elapsed_ms(),
        );

        outcome
    }
}

/// Sends a report; failures are logged and counted, never propagated.
pub async fn deliver(reporter: &dyn ProgressSink, report: &ProgressReport) {
    match reporter.report(report).await {
        Ok(()) => {
            METRICS.reports_sent.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            METRICS.report_errors.fetch_add(1, Ordering::Relaxed);
            warn!("[Collector] run={} {}", report.id, e);
        }
    }
}
