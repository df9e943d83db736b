use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single listing record as delivered by the provider.
///
/// The provider schema is not fixed: every field is forwarded to the
/// destination, so records are kept as an ordered field → value map.
pub type Item = IndexMap<String, Value>;

// ------------------------------------------------------------
// Queue payloads
// ------------------------------------------------------------
//
// Shapes exchanged with the CMS collector queue:
// - `PullResponse`:   one claimed run plus its job and sources
// - `ProgressReport`: cumulative run progress sent back
//

/// Response of `POST /collector/queue/pull`.
///
/// `run` is `None` when the queue is empty.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PullResponse {
    /// Always true on 200 responses; not inspected
    #[allow(dead_code)]
    #[serde(default)]
    pub ok: bool,

    pub run: Option<Run>,

    pub job: Option<Job>,

    #[serde(default)]
    pub sources: Vec<Source>,
}

/// One claimed execution of a collection job.
///
/// `current_page` / `total_pages` are the durable resume cursor: they hold
/// whatever the last progress report carried.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Run {
    pub id: i64,

    #[serde(default)]
    pub job_id: i64,

    #[serde(default)]
    pub task_id: i64,

    #[serde(default)]
    pub source_id: i64,

    #[serde(default, deserialize_with = "flex_i64")]
    pub current_page: i64,

    #[serde(default, deserialize_with = "flex_i64")]
    pub total_pages: i64,
}

impl Run {
    pub fn resume_cursor(&self) -> ResumeCursor {
        ResumeCursor {
            current_page: self.current_page,
            total_pages: self.total_pages,
        }
    }
}

/// Collection job settings, immutable for the lifetime of a run.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Job {
    #[serde(default)]
    pub id: i64,

    #[serde(default)]
    pub name: String,

    /// Destination site; items are posted to `<domain_url>/api/receive/vod`
    #[serde(default)]
    pub domain_url: String,

    /// Destination credential, sent as the `pass` form field
    #[serde(default)]
    pub api_pass: String,

    /// Only collect items updated in the last N hours (0 = everything)
    #[serde(default, deserialize_with = "flex_i64")]
    pub collect_time: i64,

    /// Scheduling hint used by the CMS, not by the worker
    #[allow(dead_code)]
    #[serde(default, deserialize_with = "flex_i64")]
    pub interval_seconds: i64,

    /// Informational, pushing is always serialized in the coordinator
    #[allow(dead_code)]
    #[serde(default, deserialize_with = "flex_i64")]
    pub push_workers: i64,

    #[serde(default, deserialize_with = "flex_i64")]
    pub push_interval_seconds: i64,

    #[serde(default, deserialize_with = "flex_i64")]
    pub max_workers: i64,

    /// Comma separated keywords matched against item names
    #[serde(default)]
    pub filter_keywords: String,

    #[allow(dead_code)]
    #[serde(default)]
    pub cron: String,
}

/// Provider bound to a job.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Source {
    pub id: i64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub base_url: String,

    /// 1 = xml, 2 = json
    #[serde(default, deserialize_with = "flex_i64")]
    pub collect_type: i64,
}

/// Where a run should pick up again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeCursor {
    pub current_page: i64,
    pub total_pages: i64,
}

// ------------------------------------------------------------
// Progress report
// ------------------------------------------------------------

/// Run status codes understood by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Done,
    Failed,
}

impl RunStatus {
    pub fn code(self) -> i32 {
        match self {
            RunStatus::Running => 1,
            RunStatus::Done => 2,
            RunStatus::Failed => 3,
        }
    }
}

impl Serialize for RunStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// Body of `POST /collector/queue/report`.
///
/// Zero and empty fields are left out of the JSON so a terminal report
/// without pagination data does not reset the stored cursor.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProgressReport {
    pub id: i64,

    #[serde(skip_serializing_if = "is_zero")]
    pub task_id: i64,

    pub status: RunStatus,

    #[serde(rename = "progress_page", skip_serializing_if = "is_zero")]
    pub current_page: i64,

    #[serde(rename = "progress_total_pages", skip_serializing_if = "is_zero")]
    pub total_pages: i64,

    #[serde(rename = "pushed_count", skip_serializing_if = "is_zero")]
    pub pushed: i64,

    #[serde(rename = "created_count", skip_serializing_if = "is_zero")]
    pub created: i64,

    #[serde(rename = "updated_count", skip_serializing_if = "is_zero")]
    pub updated: i64,

    #[serde(rename = "error_count", skip_serializing_if = "is_zero")]
    pub errors: i64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ProgressReport {
    /// Terminal report carrying only identity, status and message.
    pub fn terminal(run: &Run, status: RunStatus, message: impl Into<String>) -> Self {
        Self {
            id: run.id,
            task_id: run.task_id,
            status,
            current_page: 0,
            total_pages: 0,
            pushed: 0,
            created: 0,
            updated: 0,
            errors: 0,
            message: message.into(),
        }
    }
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

// ------------------------------------------------------------
// Provider / destination envelopes
// ------------------------------------------------------------

/// Listing envelope returned by the provider (`at=json`).
///
/// Numeric fields are routinely sent as strings by some providers.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ListEnvelope {
    #[allow(dead_code)]
    #[serde(default, deserialize_with = "flex_i64")]
    pub code: i64,

    #[allow(dead_code)]
    #[serde(default)]
    pub msg: String,

    #[allow(dead_code)]
    #[serde(default, deserialize_with = "flex_i64")]
    pub page: i64,

    #[serde(default, deserialize_with = "flex_i64")]
    pub pagecount: i64,

    #[allow(dead_code)]
    #[serde(default, deserialize_with = "flex_i64")]
    pub limit: i64,

    #[allow(dead_code)]
    #[serde(default, deserialize_with = "flex_i64")]
    pub total: i64,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub list: Vec<Item>,
}

/// Response of the destination receive endpoint.
///
/// `code` stays `None` when the field is absent so an unclassified
/// acceptance can be told apart from an explicit rejection.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReceiveEnvelope {
    #[serde(default, deserialize_with = "flex_opt_i64")]
    pub code: Option<i64>,

    #[serde(default)]
    pub msg: String,
}

// ------------------------------------------------------------
// Lenient numeric decoding
// ------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

fn flex_to_i64<E: serde::de::Error>(raw: FlexNumber) -> Result<Option<i64>, E> {
    match raw {
        FlexNumber::Int(n) => Ok(Some(n)),
        FlexNumber::Float(f) => Ok(Some(f as i64)),
        FlexNumber::Text(s) => {
            let s = s.trim();
            if s.is_empty() || s == "null" {
                return Ok(None);
            }
            s.parse::<i64>()
                .map(Some)
                .map_err(|_| E::custom(format!("invalid integer string {:?}", s)))
        }
    }
}

/// Accepts `12`, `"12"`, `""` and `null`; the last two decode as 0.
pub fn flex_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(flex_opt_i64(d)?.unwrap_or(0))
}

pub fn flex_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match Option::<FlexNumber>::deserialize(d)? {
        Some(raw) => flex_to_i64(raw),
        None => Ok(None),
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Item>, D::Error> {
    Ok(Option::<Vec<Item>>::deserialize(d)?.unwrap_or_default())
}
