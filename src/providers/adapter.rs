use crate::error::Result;
use crate::schema::Item;

/// One decoded listing page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    /// Records in provider order
    pub items: Vec<Item>,

    /// Total page count as reported by the provider for this request
    pub page_count: i64,
}

/// ListingProvider is the abstraction layer between:
/// - The run coordinator and its fetch workers
/// - Provider-specific listing APIs
///
/// Each provider implementation must:
/// - Build the listing request for a page number
/// - Apply its own request timeout
/// - Decode the response into a `ListPage`
///
/// CONTRACT:
/// - Every transport, HTTP or decode failure is returned as
///   `CollectError::Fetch`; the worker pool never sees a panic
/// - Implementations are stateless per call, so any worker may
///   fetch any page
///
/// THREAD SAFETY:
/// - Must be Send + Sync
/// - One instance is shared by all workers of a run
///
#[async_trait::async_trait]
pub trait ListingProvider: Send + Sync {
    /// Human readable provider name, used in logs and report messages.
    fn name(&self) -> &str;

    /// Fetches and decodes listing page `page` (1-based).
    async fn fetch_page(&self, page: i64) -> Result<ListPage>;
}
