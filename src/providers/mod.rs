//! Listing provider registry and factory
//!
//! This module provides:
//! - The `ListingProvider` seam used by the fetch workers
//! - A factory resolving the adapter for a source's collect type
//!
//! All provider-specific request/response handling lives in
//! dedicated adapter modules.

pub mod adapter;
pub mod maccms;

use std::sync::Arc;

use reqwest::Client;

use adapter::ListingProvider;

use crate::error::{CollectError, Result};
use crate::schema::{Job, Source};

/// `collect_type` of XML feeds.
pub const COLLECT_TYPE_XML: i64 = 1;

/// `collect_type` of JSON feeds.
pub const COLLECT_TYPE_JSON: i64 = 2;

/// Returns the listing adapter for a source.
///
/// CONTRACT:
/// - Performs no network I/O
/// - Unsupported collect types and unparseable base URLs are
///   `CollectError::Config`
///
/// A `collect_type` of 0 means "not set" and is treated as JSON.
pub fn get_provider(client: &Client, job: &Job, source: &Source) -> Result<Arc<dyn ListingProvider>> {
    match source.collect_type {
        0 | COLLECT_TYPE_JSON => Ok(Arc::new(maccms::MacCmsJsonProvider::new(
            client.clone(),
            &source.name,
            &source.base_url,
            job.collect_time,
        )?)),
        COLLECT_TYPE_XML => Err(CollectError::config(format!(
            "source {} uses xml listings, only json is supported",
            source.name
        ))),
        other => Err(CollectError::config(format!(
            "source {} has unknown collect_type {}",
            source.name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(collect_type: i64) -> Source {
        Source {
            id: 1,
            name: "src".into(),
            base_url: "https://p.example".into(),
            collect_type,
        }
    }

    #[test]
    fn json_and_unset_resolve() {
        let client = Client::new();
        let job = Job::default();
        assert_eq!(get_provider(&client, &job, &source(2)).unwrap().name(), "src");
        assert!(get_provider(&client, &job, &source(0)).is_ok());
    }

    #[test]
    fn xml_is_rejected() {
        let err = get_provider(&Client::new(), &Job::default(), &source(1))
            .err()
            .unwrap();
        assert!(matches!(err, CollectError::Config(_)));
    }
}
