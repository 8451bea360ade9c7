use std::collections::HashSet;
use std::time::Duration;

use futures_util::StreamExt;
use pinfeed_core::{Cursor, Item, ItemKey};
use pinfeed_logging::{feed_debug, feed_warn};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Url;

use crate::{FailureKind, FetchBatch, FetchError};

/// One way of discovering images for a query.
///
/// Implementations swallow their own failures: a broken round trip comes back
/// as an empty batch with the cursor unchanged.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        query: &str,
        cursor: Option<&Cursor>,
        seen: &HashSet<ItemKey>,
    ) -> FetchBatch;
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
    /// Upper bound on new items returned by a single fetch.
    pub max_items_per_fetch: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 8 * 1024 * 1024,
            user_agent: concat!("pinfeed/", env!("CARGO_PKG_VERSION")).to_string(),
            max_items_per_fetch: 25,
        }
    }
}

/// Thin GET-only client shared by the HTTP based strategies.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpClient {
    pub(crate) fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            max_bytes: settings.max_bytes,
        })
    }

    /// Fetches `url` as text, accepting only the listed content types.
    pub(crate) async fn get_text(
        &self,
        url: Url,
        allowed_content_types: &[&str],
    ) -> Result<String, FetchError> {
        feed_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, allowed_content_types.join(", "))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        if let Some(ct) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            if !is_content_type_allowed(ct, allowed_content_types) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn is_content_type_allowed(content_type: &str, allowed: &[&str]) -> bool {
    let ct = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();
    allowed.iter().any(|a| a.eq_ignore_ascii_case(ct))
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

/// Turns raw image URLs into items that are new to both `seen` and the batch.
pub(crate) fn collect_new<I>(urls: I, seen: &HashSet<ItemKey>, limit: usize) -> Vec<Item>
where
    I: IntoIterator<Item = String>,
{
    let mut batch_keys = HashSet::new();
    urls.into_iter()
        .map(Item::from_url)
        .filter(|item| !seen.contains(&item.key))
        .filter(|item| batch_keys.insert(item.key.clone()))
        .take(limit)
        .collect()
}

/// Collapses a strategy result into the infallible `Fetcher` contract.
pub(crate) fn settle(
    strategy: &str,
    query: &str,
    cursor: Option<&Cursor>,
    result: Result<FetchBatch, FetchError>,
) -> FetchBatch {
    match result {
        Ok(batch) => {
            feed_debug!(
                "{} fetch query={:?} new_items={} next_cursor={:?}",
                strategy,
                query,
                batch.items.len(),
                batch.next_cursor.as_ref().map(Cursor::as_str)
            );
            batch
        }
        Err(err) => {
            feed_warn!("{} fetch failed for query={:?}: {}", strategy, query, err);
            FetchBatch::unchanged(cursor.cloned())
        }
    }
}
