/// Collector module
///
/// This module groups all logic responsible for executing one run:
/// - Validating the job / source pair (`plan`)
/// - Producing page numbers (`feeder`)
/// - Fetching listing pages concurrently (`worker`)
/// - Filtering and pacing pushes (`filter`, `gate`)
/// - Coordinating results, counters and reports (`runner`)
///
/// The collector layer sits between:
/// - Listing providers (input)
/// - The destination CMS (output)
/// - The collector queue (progress reports)
///
/// Design notes:
/// - Provider and destination protocol details MUST NOT live here
/// - Exactly one run executes at a time per process
pub mod feeder;
pub mod filter;
pub mod gate;
pub mod plan;
pub mod progress;
pub mod runner;
pub mod worker;


use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use log::{error, info};
use reqwest::Client;

use crate::{
    destination::HttpDestination,
    error::CollectError,
    metrics::METRICS,
    providers::get_provider,
    queue::ProgressSink,
    schema::{Job, ProgressReport, Run, RunStatus, Source},
};

use plan::RunPlan;
use progress::{RunCounters, RunOutcome};

/// Executes runs against HTTP providers and the HTTP destination.
pub struct Collector {
    http: Client,
    reporter: Arc<dyn ProgressSink>,
}

impl Collector {
    pub fn new(http: Client, reporter: Arc<dyn ProgressSink>) -> Self {
        Self { http, reporter }
    }

    /// Runs `job` against `source`, resuming from the run's cursor.
    ///
    /// Configuration problems are detected before any network call and
    /// end the run with a single failed report. Otherwise the coordinator
    /// takes over and sends the final report itself.
    pub async fn execute_run(&self, run: &Run, job: &Job, source: &Source) -> RunOutcome {
        METRICS.runs_started.fetch_add(1, Ordering::Relaxed);

        let prepared = RunPlan::new(run, job, source)
            .and_then(|plan| Ok((plan, get_provider(&self.http, job, source)?)));

        let outcome = match prepared {
            Ok((plan, provider)) => {
                let destination = Arc::new(HttpDestination::new(
                    self.http.clone(),
                    &job.domain_url,
                    &job.api_pass,
                    source.id,
                ));
                info!(
                    "[Collector] run={} job={} ({}) source={} -> {}",
                    run.id,
                    job.id,
                    job.name,
                    source.name,
                    destination.target()
                );
                runner::run_pages(plan, provider, destination, self.reporter.as_ref()).await
            }
            Err(e) => self.fail_fast(run, e).await,
        };

        match outcome.status {
            RunStatus::Done => METRICS.runs_done.fetch_add(1, Ordering::Relaxed),
            _ => METRICS.runs_failed.fetch_add(1, Ordering::Relaxed),
        };

        outcome
    }

    async fn fail_fast(&self, run: &Run, err: CollectError) -> RunOutcome {
        error!("[Collector] run={} rejected: {}", run.id, err);

        let message = err.to_string();
        let report = ProgressReport::terminal(run, RunStatus::Failed, message.clone());
        runner::deliver(self.reporter.as_ref(), &report).await;

        let now = Utc::now();
        RunOutcome {
            run_id: run.id,
            status: RunStatus::Failed,
            counters: RunCounters::default(),
            last_error: Some(message),
            page_count: run.total_pages,
            pages_processed: 0,
            started_at: now,
            finished_at: now,
        }
    }
}
