use std::time::Duration;

use log::debug;
use reqwest::Client;

use crate::{
    error::{CollectError, Result},
    schema::{Item, ReceiveEnvelope},
    util,
};

/// Receive endpoint, relative to the job's `domain_url`.
pub const RECEIVE_PATH: &str = "/api/receive/vod";

/// Per-request timeout for pushes.
pub const PUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// Destination classification of an accepted item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// code 1
    Created,
    /// code 2
    Updated,
    /// 2xx without a recognizable acceptance code
    Unclassified,
}

/// Destination is the output seam of a run.
///
/// CONTRACT:
/// - Called only from the run coordinator, one item at a time,
///   after the output gate has ticked
/// - Rejections and transport failures are `CollectError::Push`
#[async_trait::async_trait]
pub trait Destination: Send + Sync {
    async fn push(&self, item: &Item) -> Result<Acceptance>;
}

/// ============================================================
/// HttpDestination
/// ============================================================
///
/// Posts items as `application/x-www-form-urlencoded` to the
/// destination CMS receive endpoint.
///
/// Every request carries the job credential (`pass`) and the
/// source id next to the flattened item fields.
pub struct HttpDestination {
    client: Client,
    target: String,
    pass: String,
    source_id: i64,
}

impl HttpDestination {
    pub fn new(client: Client, domain_url: &str, pass: &str, source_id: i64) -> Self {
        Self {
            client,
            target: format!("{}{}", util::trim_base(domain_url), RECEIVE_PATH),
            pass: pass.to_string(),
            source_id,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait::async_trait]
impl Destination for HttpDestination {
    async fn push(&self, item: &Item) -> Result<Acceptance> {
        debug!(
            "[Collector] Pushing vod: {}, type_id={}, vod_name={}",
            self.target,
            item.get("type_id").unwrap_or(&serde_json::Value::Null),
            item.get("vod_name").unwrap_or(&serde_json::Value::Null),
        );

        let form = build_form(&self.pass, self.source_id, item);
        let resp = self
            .client
            .post(&self.target)
            .form(&form)
            .timeout(PUSH_TIMEOUT)
            .send()
            .await
            .map_err(|e| CollectError::push(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = util::read_capped(resp, util::ERROR_BODY_LIMIT)
            .await
            .map_err(|e| CollectError::push(e.to_string()))?;

        debug!(
            "[Collector] Push response: status={} body={}",
            status,
            util::body_snippet(&body)
        );

        classify_response(status, &body)
    }
}

/// Flattens an item into form fields.
///
/// - `pass` and `source_id` come first and cannot be overridden
/// - null values and blank keys are dropped
pub fn build_form(pass: &str, source_id: i64, item: &Item) -> Vec<(String, String)> {
    let mut form = Vec::with_capacity(item.len() + 2);
    form.push(("pass".to_string(), pass.to_string()));
    form.push(("source_id".to_string(), source_id.to_string()));

    for (key, value) in item {
        let key = key.trim();
        if key.is_empty() || key == "pass" || key == "source_id" {
            continue;
        }
        if let Some(v) = util::form_value(value) {
            form.push((key.to_string(), v));
        }
    }

    form
}

/// Maps a receive response onto an acceptance or a push error.
///
/// - non-2xx                       -> error with status and body
/// - 2xx + code 1 / 2              -> Created / Updated
/// - 2xx + any other code          -> error with msg (or raw body)
/// - 2xx + no JSON / no code       -> Unclassified
pub fn classify_response(status: u16, body: &[u8]) -> Result<Acceptance> {
    if !(200..300).contains(&status) {
        return Err(CollectError::push(format!(
            "push status={} body={}",
            status,
            util::body_snippet(body)
        )));
    }

    let Ok(envelope) = serde_json::from_slice::<ReceiveEnvelope>(body) else {
        return Ok(Acceptance::Unclassified);
    };

    match envelope.code {
        Some(1) => Ok(Acceptance::Created),
        Some(2) => Ok(Acceptance::Updated),
        None => Ok(Acceptance::Unclassified),
        Some(code) => {
            let msg = envelope.msg.trim();
            let msg = if msg.is_empty() {
                util::body_snippet(body)
            } else {
                msg.to_string()
            };
            Err(CollectError::push(format!("receive code={} msg={}", code, msg)))
        }
    }
}
