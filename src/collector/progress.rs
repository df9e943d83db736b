use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::destination::Acceptance;
use crate::error::CollectError;
use crate::schema::{Item, ProgressReport, RunStatus};

/// Output of one fetch worker for one page.
#[derive(Debug)]
pub struct PageResult {
    pub page: i64,

    /// Empty when `error` is set
    pub items: Vec<Item>,

    /// Page count observed in this response (0 on error)
    pub page_count: i64,

    pub error: Option<CollectError>,
}

// ------------------------------------------------------------
// Run counters
// ------------------------------------------------------------
//
// Cumulative for the whole run; only the coordinator writes them.
//
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Items accepted by the destination
    pub pushed: i64,
    pub created: i64,
    pub updated: i64,

    /// Accepted without a recognizable acceptance code
    pub unclassified: i64,

    /// Fetch failures + push failures
    pub errors: i64,

    /// Items excluded by the keyword filter
    pub skipped: i64,
}

impl RunCounters {
    pub fn record_acceptance(&mut self, acceptance: Acceptance) {
        self.pushed += 1;
        match acceptance {
            Acceptance::Created => self.created += 1,
            Acceptance::Updated => self.updated += 1,
            Acceptance::Unclassified => self.unclassified += 1,
        }
    }
}

// ------------------------------------------------------------
// Resume cursor
// ------------------------------------------------------------

/// Tracks which pages have been processed and derives the checkpoint.
///
/// Results arrive in any order, so the checkpoint is the end of the
/// contiguous run of processed pages starting at `start`. Resuming from
/// it never skips a page that was still in flight.
#[derive(Debug)]
pub struct ResumeTracker {
    start: i64,
    watermark: i64,
    pending: BTreeSet<i64>,
}

impl ResumeTracker {
    pub fn new(start: i64) -> Self {
        Self {
            start,
            watermark: start - 1,
            pending: BTreeSet::new(),
        }
    }

    pub fn mark(&mut self, page: i64) {
        if page <= self.watermark {
            return;
        }
        self.pending.insert(page);
        while self.pending.remove(&(self.watermark + 1)) {
            self.watermark += 1;
        }
    }

    /// Page a restarted run should begin at.
    pub fn cursor(&self) -> i64 {
        self.watermark.max(self.start)
    }
}

// ------------------------------------------------------------
// Report builder
// ------------------------------------------------------------

/// Builds a progress report with the full cumulative counters.
pub fn progress_report(
    run_id: i64,
    task_id: i64,
    status: RunStatus,
    cursor: i64,
    page_count: i64,
    counters: &RunCounters,
    message: String,
) -> ProgressReport {
    ProgressReport {
        id: run_id,
        task_id,
        status,
        current_page: cursor,
        total_pages: page_count,
        pushed: counters.pushed,
        created: counters.created,
        updated: counters.updated,
        errors: counters.errors,
        message,
    }
}

// ------------------------------------------------------------
// Outcome
// ------------------------------------------------------------

/// Final state of a run, as returned to the poll loop.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: i64,

    /// `Done` only when no fetch or push failed
    pub status: RunStatus,

    pub counters: RunCounters,
    pub last_error: Option<String>,

    /// Final tracked page count
    pub page_count: i64,
    pub pages_processed: i64,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    /// Message of the final report.
    pub fn message(&self) -> String {
        match (&self.status, &self.last_error) {
            (RunStatus::Done, _) => "done".to_string(),
            (_, Some(err)) => format!("collection completed with errors: {}", err),
            (_, None) => "collection failed".to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acceptance_partitions_pushed() {
        let mut c = RunCounters::default();
        c.record_acceptance(Acceptance::Created);
        c.record_acceptance(Acceptance::Updated);
        c.record_acceptance(Acceptance::Unclassified);

        assert_eq!(c.pushed, 3);
        assert_eq!(c.created + c.updated + c.unclassified, c.pushed);
    }

    #[test]
    fn cursor_follows_contiguous_pages_only() {
        let mut t = ResumeTracker::new(3);
        assert_eq!(t.cursor(), 3);

        t.mark(5);
        assert_eq!(t.cursor(), 3);

        t.mark(3);
        assert_eq!(t.cursor(), 3);

        t.mark(4);
        assert_eq!(t.cursor(), 5);

        t.mark(4);
        t.mark(6);
        assert_eq!(t.cursor(), 6);
    }

    #[test]
    fn outcome_messages() {
        let now = Utc::now();
        let mut outcome = RunOutcome {
            run_id: 1,
            status: RunStatus::Done,
            counters: RunCounters::default(),
            last_error: None,
            page_count: 1,
            pages_processed: 1,
            started_at: now,
            finished_at: now,
        };
        assert_eq!(outcome.message(), "done");
        assert_eq!(outcome.elapsed_ms(), 0);

        outcome.status = RunStatus::Failed;
        outcome.last_error = Some("status=403 (skipped)".into());
        assert_eq!(
            outcome.message(),
            "collection completed with errors: status=403 (skipped)"
        );
    }
}
