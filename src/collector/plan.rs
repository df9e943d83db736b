use std::time::Duration;

use crate::error::{CollectError, Result};
use crate::schema::{Job, ResumeCursor, Run, Source};

/// Upper bound on concurrent fetch workers, whatever the job asks for.
pub const MAX_WORKERS: usize = 10;

/// Pacing used when the job has no push interval.
pub const DEFAULT_PUSH_INTERVAL: Duration = Duration::from_millis(50);

/// Validated, immutable settings of one run.
///
/// Built before any task is spawned; everything the coordinator,
/// feeder and workers need is derived here once.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub run_id: i64,
    pub task_id: i64,
    pub source_name: String,

    /// First page to dispatch (resume cursor, at least 1)
    pub start_page: i64,

    /// Page count known before the first result arrives
    pub initial_page_count: i64,

    pub workers: usize,
    pub push_interval: Duration,
    pub keywords: Vec<String>,
}

impl RunPlan {
    /// Validates the job/source pair and derives the run settings.
    ///
    /// Fails with `CollectError::Config` when the destination credential,
    /// destination URL or source base URL is empty.
    pub fn new(run: &Run, job: &Job, source: &Source) -> Result<Self> {
        if job.api_pass.trim().is_empty() {
            return Err(CollectError::config("job api_pass empty"));
        }
        if job.domain_url.trim().is_empty() {
            return Err(CollectError::config("job domain_url empty"));
        }
        if source.base_url.trim().trim_end_matches('/').is_empty() {
            return Err(CollectError::config("source base_url empty"));
        }

        let (start_page, initial_page_count) = page_window(run.resume_cursor());

        Ok(Self {
            run_id: run.id,
            task_id: run.task_id,
            source_name: source.name.clone(),
            start_page,
            initial_page_count,
            workers: pool_size(job.max_workers),
            push_interval: push_interval(job.push_interval_seconds),
            keywords: split_keywords(&job.filter_keywords),
        })
    }
}

/// Start page and initial page count for a resume cursor.
///
/// Both are at least 1. A cursor pointing past its own total starts with
/// the page count at the cursor so the first page can be dispatched.
pub fn page_window(cursor: ResumeCursor) -> (i64, i64) {
    let start = cursor.current_page.max(1);
    let count = cursor.total_pages.max(1).max(start);
    (start, count)
}

/// Number of fetch workers: `max_workers` clamped to `1..=MAX_WORKERS`.
pub fn pool_size(max_workers: i64) -> usize {
    max_workers.clamp(1, MAX_WORKERS as i64) as usize
}

/// Output gate interval; never zero.
pub fn push_interval(seconds: i64) -> Duration {
    if seconds > 0 {
        Duration::from_secs(seconds as u64)
    } else {
        DEFAULT_PUSH_INTERVAL
    }
}

/// Trimmed, non-empty parts of a comma separated keyword list.
pub fn split_keywords(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job {
            domain_url: "https://cms.example".into(),
            api_pass: "secret".into(),
            ..Default::default()
        }
    }

    fn source() -> Source {
        Source {
            id: 3,
            name: "src".into(),
            base_url: "https://p.example".into(),
            collect_type: 2,
        }
    }

    #[test]
    fn pool_is_clamped() {
        assert_eq!(pool_size(0), 1);
        assert_eq!(pool_size(-4), 1);
        assert_eq!(pool_size(4), 4);
        assert_eq!(pool_size(50), MAX_WORKERS);
    }

    #[test]
    fn zero_push_interval_falls_back_to_minimum() {
        assert_eq!(push_interval(0), DEFAULT_PUSH_INTERVAL);
        assert_eq!(push_interval(-1), DEFAULT_PUSH_INTERVAL);
        assert_eq!(push_interval(2), Duration::from_secs(2));
        assert!(!push_interval(0).is_zero());
    }

    #[test]
    fn keywords_are_trimmed_and_non_empty() {
        assert_eq!(split_keywords(" trailer, ,cam ,"), vec!["trailer", "cam"]);
        assert!(split_keywords("").is_empty());
        assert!(split_keywords(" , ").is_empty());
    }

    #[test]
    fn page_window_from_cursor() {
        let c = |current_page, total_pages| ResumeCursor { current_page, total_pages };
        assert_eq!(page_window(c(0, 0)), (1, 1));
        assert_eq!(page_window(c(4, 9)), (4, 9));
        assert_eq!(page_window(c(6, 3)), (6, 6));
    }

    #[test]
    fn missing_credentials_are_config_errors() {
        let run = Run::default();

        let mut j = job();
        j.api_pass = " ".into();
        let err = RunPlan::new(&run, &j, &source()).unwrap_err();
        assert!(matches!(err, CollectError::Config(_)));
        assert_eq!(err.to_string(), "job api_pass empty");

        let mut s = source();
        s.base_url = "/".into();
        let err = RunPlan::new(&run, &job(), &s).unwrap_err();
        assert_eq!(err.to_string(), "source base_url empty");

        let mut j = job();
        j.domain_url = String::new();
        assert!(RunPlan::new(&run, &j, &source()).is_err());
    }

    #[test]
    fn plan_from_queue_payload() {
        let run = Run { id: 9, task_id: 2, current_page: 3, total_pages: 7, ..Default::default() };
        let mut j = job();
        j.max_workers = 3;
        j.filter_keywords = "a,b".into();

        let plan = RunPlan::new(&run, &j, &source()).unwrap();
        assert_eq!(plan.start_page, 3);
        assert_eq!(plan.initial_page_count, 7);
        assert_eq!(plan.workers, 3);
        assert_eq!(plan.push_interval, DEFAULT_PUSH_INTERVAL);
        assert_eq!(plan.keywords, vec!["a", "b"]);
    }
}
