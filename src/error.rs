//! Collector error taxonomy.
//!
//! Only `Config` and `Queue` ever reach the poll loop. `Fetch` and `Push`
//! are counted by the run coordinator and never abort a run, `Report` is
//! logged and dropped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    /// Missing credential / URL; raised before any network call.
    #[error("{0}")]
    Config(String),

    /// One listing page could not be fetched or decoded.
    #[error("{0}")]
    Fetch(String),

    /// The destination rejected an item or was unreachable.
    #[error("{0}")]
    Push(String),

    /// A progress report did not reach the queue.
    #[error("report failed: {0}")]
    Report(String),

    /// The queue could not hand out a run.
    #[error("pull failed: {0}")]
    Queue(String),
}

impl CollectError {
    pub fn config(msg: impl Into<String>) -> Self {
        CollectError::Config(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        CollectError::Fetch(msg.into())
    }

    pub fn push(msg: impl Into<String>) -> Self {
        CollectError::Push(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CollectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_item_errors_display_their_raw_message() {
        let err = CollectError::push("receive code=0 msg=bad pass");
        assert_eq!(err.to_string(), "receive code=0 msg=bad pass");

        let err = CollectError::fetch("status=403 (skipped)");
        assert_eq!(err.to_string(), "status=403 (skipped)");
    }

    #[test]
    fn process_level_errors_are_prefixed() {
        let err = CollectError::Queue("pull status=500 body=oops".into());
        assert_eq!(err.to_string(), "pull failed: pull status=500 body=oops");
    }
}
