use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::metrics::METRICS;
use crate::providers::adapter::ListingProvider;

use super::progress::PageResult;

/// Spawns `size` fetch workers sharing one page receiver.
///
/// Each worker:
/// - takes the next page number from `pages`
/// - fetches it through the provider (which owns the request timeout)
/// - emits exactly one `PageResult` per page, error or not
///
/// Workers exit once `pages` is closed and drained; the results
/// channel closes when the last of them drops its sender.
pub fn spawn_pool(
    size: usize,
    provider: Arc<dyn ListingProvider>,
    pages: mpsc::Receiver<i64>,
    results: mpsc::Sender<PageResult>,
) -> Vec<JoinHandle<()>> {
    let pages = Arc::new(Mutex::new(pages));

    (0..size)
        .map(|id| {
            tokio::spawn(run_worker(
                id,
                provider.clone(),
                pages.clone(),
                results.clone(),
            ))
        })
        .collect()
}

async fn run_worker(
    id: usize,
    provider: Arc<dyn ListingProvider>,
    pages: Arc<Mutex<mpsc::Receiver<i64>>>,
    results: mpsc::Sender<PageResult>,
) {
    loop {
        // hold the lock only while waiting for a page, never while fetching
        let page = { pages.lock().await.recv().await };
        let Some(page) = page else {
            break;
        };

        debug!("[Worker {}] fetching page {} from {}", id, page, provider.name());

        let result = match provider.fetch_page(page).await {
            Ok(listing) => {
                METRICS.pages_fetched.fetch_add(1, Ordering::Relaxed);
                PageResult {
                    page,
                    items: listing.items,
                    page_count: listing.page_count,
                    error: None,
                }
            }
            Err(e) => {
                METRICS.fetch_errors.fetch_add(1, Ordering::Relaxed);
                warn!("[Worker {}] page {} failed: {}", id, page, e);
                PageResult {
                    page,
                    items: Vec::new(),
                    page_count: 0,
                    error: Some(e),
                }
            }
        };

        if results.send(result).await.is_err() {
            break;
        }
    }
}
