use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::time::sleep;

use crate::{
    collector::{runner::deliver, Collector},
    error::Result,
    metrics::METRICS,
    queue::{ProgressSink, QueueClient},
    schema::{ProgressReport, PullResponse, RunStatus},
};

/// Source of runs for the poll loop.
#[async_trait::async_trait]
pub trait RunQueue: ProgressSink {
    async fn pull(&self, worker_id: &str) -> Result<PullResponse>;
}

#[async_trait::async_trait]
impl RunQueue for QueueClient {
    async fn pull(&self, worker_id: &str) -> Result<PullResponse> {
        QueueClient::pull(self, worker_id).await
    }
}

/// Why the poll loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// Once-mode finished (one run executed, or the queue was empty)
    Finished,
    /// Once-mode pull failed
    PullFailed,
}

impl PollExit {
    pub fn code(self) -> i32 {
        match self {
            PollExit::Finished => 0,
            PollExit::PullFailed => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub worker_id: String,
    pub once: bool,
    pub poll_sleep: Duration,
}

/// Pulls and executes runs, one at a time.
///
/// Behavior:
/// - pull error: exit in once-mode, otherwise sleep and retry
/// - empty queue: exit in once-mode, otherwise sleep and retry
/// - run without job / sources: report it failed and move on
/// - otherwise execute the run against its first source
///
/// Never returns unless `settings.once` is set.
pub async fn poll_loop<Q: RunQueue + 'static>(
    settings: &PollSettings,
    queue: Arc<Q>,
    collector: &Collector,
) -> PollExit {
    loop {
        let task = match queue.pull(&settings.worker_id).await {
            Ok(task) => task,
            Err(e) => {
                METRICS.pull_errors.fetch_add(1, Ordering::Relaxed);
                error!("[Queue] {}", e);
                if settings.once {
                    return PollExit::PullFailed;
                }
                sleep(settings.poll_sleep).await;
                continue;
            }
        };

        let Some(run) = task.run else {
            if settings.once {
                info!("[Queue] queue empty");
                return PollExit::Finished;
            }
            sleep(settings.poll_sleep).await;
            continue;
        };

        info!(
            "[Queue] claimed run={} task={} job={} cursor={}/{}",
            run.id, run.task_id, run.job_id, run.current_page, run.total_pages
        );

        match (task.job, task.sources.first()) {
            (None, _) => {
                warn!("[Queue] run={} has no job", run.id);
                let report = ProgressReport::terminal(&run, RunStatus::Failed, "job missing");
                deliver(queue.as_ref(), &report).await;
            }
            (Some(_), None) => {
                warn!("[Queue] run={} has no sources", run.id);
                let report = ProgressReport::terminal(&run, RunStatus::Failed, "no sources bound");
                deliver(queue.as_ref(), &report).await;
            }
            (Some(job), Some(source)) => {
                if task.sources.len() > 1 || (run.source_id != 0 && run.source_id != source.id) {
                    warn!(
                        "[Queue] run={} source_id={} got {} sources, using source {}",
                        run.id,
                        run.source_id,
                        task.sources.len(),
                        source.id
                    );
                }
                collector.execute_run(&run, &job, source).await;
            }
        }

        if settings.once {
            return PollExit::Finished;
        }
    }
}
