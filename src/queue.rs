use log::debug;
use reqwest::{Client, StatusCode};
use serde_json::json;

use crate::{
    error::{CollectError, Result},
    schema::{ProgressReport, PullResponse},
    util,
};

/// Pull responses larger than this are cut off.
const PULL_BODY_LIMIT: usize = 2 << 20;

/// ProgressSink receives every progress report of a run.
///
/// CONTRACT:
/// - Delivery is best-effort; a failed report must never stop the run
/// - Reports of one run arrive in the order the coordinator emits them
#[async_trait::async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, report: &ProgressReport) -> Result<()>;
}

/// ============================================================
/// QueueClient
/// ============================================================
///
/// Bearer-authenticated client for the CMS collector queue.
///
/// Endpoints:
/// - POST /collector/queue/pull    {"worker_id": ...}
/// - POST /collector/queue/report  ProgressReport
#[derive(Clone)]
pub struct QueueClient {
    client: Client,
    api_base: String,
    token: String,
}

impl QueueClient {
    pub fn new(client: Client, api_base: &str, token: &str) -> Self {
        Self {
            client,
            api_base: util::trim_base(api_base).to_string(),
            token: token.to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Claims the next queued run for `worker_id`.
    ///
    /// An empty queue is not an error: the response simply has no run.
    pub async fn pull(&self, worker_id: &str) -> Result<PullResponse> {
        let resp = self
            .client
            .post(self.endpoint("/collector/queue/pull"))
            .bearer_auth(&self.token)
            .json(&json!({ "worker_id": worker_id }))
            .send()
            .await
            .map_err(|e| CollectError::Queue(e.to_string()))?;

        let status = resp.status();
        let body = util::read_capped(resp, PULL_BODY_LIMIT)
            .await
            .map_err(|e| CollectError::Queue(e.to_string()))?;

        if status != StatusCode::OK {
            return Err(CollectError::Queue(format!(
                "pull status={} body={}",
                status.as_u16(),
                util::body_snippet(&body)
            )));
        }

        serde_json::from_slice(&body).map_err(|e| CollectError::Queue(format!("decode pull: {}", e)))
    }
}

#[async_trait::async_trait]
impl ProgressSink for QueueClient {
    async fn report(&self, report: &ProgressReport) -> Result<()> {
        debug!(
            "[Queue] report run={} status={} page={}/{}",
            report.id,
            report.status.code(),
            report.current_page,
            report.total_pages
        );

        let resp = self
            .client
            .post(self.endpoint("/collector/queue/report"))
            .bearer_auth(&self.token)
            .json(report)
            .send()
            .await
            .map_err(|e| CollectError::Report(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = util::read_capped(resp, util::ERROR_BODY_LIMIT)
                .await
                .unwrap_or_default();
            return Err(CollectError::Report(format!(
                "report status={} body={}",
                status.as_u16(),
                util::body_snippet(&body)
            )));
        }

        Ok(())
    }
}
