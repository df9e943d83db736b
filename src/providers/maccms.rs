use std::time::Duration;

use log::debug;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode, Url};

use crate::{
    error::{CollectError, Result},
    schema::ListEnvelope,
    util,
};

use super::adapter::{ListPage, ListingProvider};

/// Canonical listing endpoint of a MacCMS-style provide API.
pub const LISTING_PATH: &str = "/api.php/provide/vod/";

/// Per-request timeout for listing fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Listing bodies larger than this are cut off (and then fail to decode).
pub const LISTING_BODY_LIMIT: usize = 8 << 20;

/// Some providers refuse non-browser clients.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// JSON listing adapter for MacCMS-compatible "provide" APIs.
///
/// Requests:   GET <base>/api.php/provide/vod/?ac=detail&pg=N&at=json[&h=H]
/// Responses:  `{code, msg, page, pagecount, limit, total, list:[...]}`
///
/// DESIGN PRINCIPLES:
/// - Pure protocol translation only
/// - No filtering, no pushing, no run state
pub struct MacCmsJsonProvider {
    client: Client,
    name: String,
    base: Url,
    collect_time_hours: i64,
}

impl MacCmsJsonProvider {
    /// Creates an adapter for one source.
    ///
    /// Fails with `CollectError::Config` when the base URL cannot be parsed.
    pub fn new(client: Client, name: &str, base_url: &str, collect_time_hours: i64) -> Result<Self> {
        let base = Url::parse(util::trim_base(base_url))
            .map_err(|e| CollectError::config(format!("source base_url {:?}: {}", base_url, e)))?;

        Ok(Self {
            client,
            name: name.to_string(),
            base,
            collect_time_hours,
        })
    }
}

#[async_trait::async_trait]
impl ListingProvider for MacCmsJsonProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_page(&self, page: i64) -> Result<ListPage> {
        let url = listing_url(&self.base, page, self.collect_time_hours);
        debug!("[Collector] Fetching list: {}", url);

        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_UA)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| CollectError::fetch(e.to_string()))?;

        let status = resp.status();
        let limit = if status == StatusCode::OK {
            LISTING_BODY_LIMIT
        } else {
            util::ERROR_BODY_LIMIT
        };
        let body = match util::read_capped(resp, limit).await {
            Ok(body) => body,
            Err(e) if status == StatusCode::OK => return Err(CollectError::fetch(e.to_string())),
            Err(_) => Vec::new(),
        };

        classify_listing(status, &body)
    }
}

/// Turns a listing response into a page or a per-page fetch error.
///
/// - 200: the body is decoded as a listing envelope
/// - 403: short "skipped" error, common for throttled pages
/// - other: status plus the first `ERROR_BODY_LIMIT` bytes of the body
pub fn classify_listing(status: StatusCode, body: &[u8]) -> Result<ListPage> {
    match status {
        StatusCode::OK => parse_listing(body),
        StatusCode::FORBIDDEN => Err(CollectError::fetch("status=403 (skipped)")),
        _ => Err(CollectError::fetch(format!(
            "status={} body={}",
            status.as_u16(),
            util::body_snippet(body)
        ))),
    }
}

/// Builds the listing URL for `page`.
///
/// Path normalization:
/// - "", "/", "/api.php", "/api.php/", "/api.php/provide/vod"
///   all become `LISTING_PATH`
/// - any other path is kept as configured
///
/// Query:
/// - `ac=detail` unless the base already sets `ac`
/// - `pg`, `at=json` always overwrite
/// - `h` is set when `collect_time_hours > 0`, otherwise any `h`
///   already on the base is kept
pub fn listing_url(base: &Url, page: i64, collect_time_hours: i64) -> Url {
    let mut url = base.clone();

    if matches!(
        url.path(),
        "" | "/" | "/api.php" | "/api.php/" | "/api.php/provide/vod"
    ) {
        url.set_path(LISTING_PATH);
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| match k.as_ref() {
            "pg" | "at" => false,
            "h" => collect_time_hours <= 0,
            _ => true,
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !pairs.iter().any(|(k, v)| k == "ac" && !v.is_empty()) {
        pairs.retain(|(k, _)| k != "ac");
        pairs.push(("ac".into(), "detail".into()));
    }
    pairs.push(("pg".into(), page.to_string()));
    pairs.push(("at".into(), "json".into()));
    if collect_time_hours > 0 {
        pairs.push(("h".into(), collect_time_hours.to_string()));
    }

    url.query_pairs_mut().clear().extend_pairs(&pairs);
    url
}

/// Decodes a listing body.
pub fn parse_listing(body: &[u8]) -> Result<ListPage> {
    let envelope: ListEnvelope = serde_json::from_slice(body)
        .map_err(|e| CollectError::fetch(format!("decode listing: {}", e)))?;

    Ok(ListPage {
        items: envelope.list,
        page_count: envelope.pagecount,
    })
}
