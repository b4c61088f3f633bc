//! Complaint database client
//!
//! Pages through the public complaint search API one calendar month at a
//! time and collects the raw `_source` objects. Requests are paced by a
//! token bucket (1 req/sec by default). HTTP 429 responses are retried
//! after the server's `Retry-After` delay.
//!
//! API Documentation: https://cfpb.github.io/api/ccdb/

use crate::config::FetchConfig;
use crate::error::{ClusterError, ClusterResult};
use crate::table;
use chrono::{Datelike, NaiveDate};
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Raw complaint object as returned by the API
pub type RawComplaint = Map<String, Value>;

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: SearchHits,
}

#[derive(Debug, Default, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
    #[serde(default)]
    total: HitTotal,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source", default)]
    source: RawComplaint,
}

/// Older servers send a bare count, newer ones `{ "value": n, ... }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HitTotal {
    Count(u64),
    Object {
        #[serde(default)]
        value: u64,
    },
}

impl Default for HitTotal {
    fn default() -> Self {
        HitTotal::Count(0)
    }
}

impl HitTotal {
    fn value(&self) -> u64 {
        match self {
            HitTotal::Count(n) => *n,
            HitTotal::Object { value } => *value,
        }
    }
}

/// One decoded page of search results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    pub records: Vec<RawComplaint>,
    /// Matches in the whole window
    pub total: u64,
}

/// Decode a search response body
pub fn parse_page(body: &str) -> ClusterResult<SearchPage> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(SearchPage {
        total: response.hits.total.value(),
        records: response.hits.hits.into_iter().map(|hit| hit.source).collect(),
    })
}

/// `[start, end)` date windows covering each month of `year`
pub fn monthly_windows(year: i32) -> ClusterResult<Vec<(NaiveDate, NaiveDate)>> {
    (1..=12)
        .map(|month| {
            let start = NaiveDate::from_ymd_opt(year, month, 1);
            let end = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)
            };
            start
                .zip(end)
                .ok_or_else(|| ClusterError::InvalidConfig(format!("Invalid fetch year {year}")))
        })
        .collect()
}

/// Seconds to wait after a 429
fn retry_after(headers: &HeaderMap, default_secs: u64) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_secs)
}

/// Complaint search API client
pub struct ComplaintFetcher {
    client: Client,
    config: FetchConfig,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl ComplaintFetcher {
    pub fn new(config: FetchConfig) -> ClusterResult<Self> {
        if config.page_size == 0 {
            return Err(ClusterError::InvalidConfig("fetch.page_size must be >= 1".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("cfpb-cluster/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClusterError::Fetch(format!("Failed to build HTTP client: {e}")))?;

        let per_second = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            ClusterError::InvalidConfig("fetch.requests_per_second must be >= 1".to_string())
        })?;
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    /// Fetch every window of the configured year
    ///
    /// A failing window is logged and skipped; records already collected
    /// are kept.
    pub async fn fetch_year(&self) -> ClusterResult<Vec<RawComplaint>> {
        let mut all = Vec::new();
        for (start, end) in monthly_windows(self.config.year)? {
            info!(window = %start, "Fetching complaints");
            if let Err(e) = self.fetch_window(start, end, &mut all).await {
                warn!(window = %start, error = %e, "Window aborted, continuing with next");
            }
            info!(window = %start, total = all.len(), "Window finished");
        }
        Ok(all)
    }

    /// Fetch the configured year and write it as the raw complaint table
    ///
    /// Returns the number of records written; nothing is written when the
    /// API returned no records.
    pub async fn fetch_to_csv(&self, path: &Path) -> ClusterResult<usize> {
        let records = self.fetch_year().await?;
        if records.is_empty() {
            warn!("No complaint records retrieved");
            return Ok(0);
        }
        table::write_json_records(path, &records)?;
        info!(path = %path.display(), records = records.len(), "Saved raw complaints");
        Ok(records.len())
    }

    async fn fetch_window(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        into: &mut Vec<RawComplaint>,
    ) -> ClusterResult<()> {
        let size = self.config.page_size as u64;
        let mut offset: u64 = 0;

        loop {
            let page = self.fetch_page(start, end, offset).await?;
            if page.records.is_empty() {
                break;
            }
            into.extend(page.records);
            debug!(
                month = start.month(),
                offset,
                window_total = page.total,
                collected = into.len(),
                "Page retrieved"
            );

            offset += size;
            if offset >= page.total {
                break;
            }
        }
        Ok(())
    }

    async fn fetch_page(&self, start: NaiveDate, end: NaiveDate, offset: u64) -> ClusterResult<SearchPage> {
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let size = self.config.page_size.to_string();
        let offset = offset.to_string();
        let params = [
            ("company", self.config.company.as_str()),
            ("has_narrative", "true"),
            ("date_received_min", start.as_str()),
            ("date_received_max", end.as_str()),
            ("size", size.as_str()),
            ("frm", offset.as_str()),
        ];

        loop {
            self.rate_limiter.until_ready().await;

            let response = self
                .client
                .get(&self.config.base_url)
                .header("Accept", "application/json")
                .query(&params)
                .send()
                .await
                .map_err(|e| ClusterError::Fetch(format!("Request failed: {e}")))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after(response.headers(), self.config.default_retry_after_secs);
                warn!(wait_secs = wait, "Rate limited, sleeping before retry");
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }
            if !status.is_success() {
                return Err(ClusterError::Fetch(format!("API returned error status: {status}")));
            }

            let body = response
                .text()
                .await
                .map_err(|e| ClusterError::Fetch(format!("Failed to read response: {e}")))?;
            return parse_page(&body);
        }
    }
}
