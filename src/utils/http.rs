// src/utils/http.rs

//! HTTP client utilities and the release fetcher.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::ApiConfig;
use crate::rate::ResponseMeta;

/// Remaining-request-budget header sent by the Discogs API.
pub const RATELIMIT_REMAINING: &str = "X-Discogs-Ratelimit-Remaining";

/// Create a configured blocking HTTP client.
///
/// The token rides along as a default header so every request through this
/// client is authenticated.
pub fn create_client(config: &ApiConfig) -> Result<Client> {
    let auth = HeaderValue::from_str(&format!("Discogs token={}", config.token))
        .map_err(|e| AppError::config(format!("api.token is not a valid header value: {e}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);

    let client = Client::builder()
        .user_agent(format!(
            "discogs-mirror-{}/{}",
            config.user,
            env!("CARGO_PKG_VERSION")
        ))
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// One fetched response: the fields the rate limiter routes on, plus the
/// payload when the fetch succeeded.
pub struct FetchOutcome {
    pub meta: ResponseMeta,
    pub body: Option<Value>,
}

/// Fetches one release by id.
///
/// A trait seam so the work loop can be driven by scripted responses in
/// tests. `Err` means a transport-level failure (no response at all);
/// HTTP-level failures come back as `Ok` with the status in the meta.
pub trait ReleaseFetcher {
    fn fetch(&self, id: u64) -> Result<FetchOutcome>;
}

/// Fetcher against the live catalog API.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl ReleaseFetcher for HttpFetcher {
    fn fetch(&self, id: u64) -> Result<FetchOutcome> {
        let url = format!("{}/releases/{id}", self.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).send()?;

        let meta = ResponseMeta {
            status: response.status().as_u16(),
            remaining: header_u64(response.headers(), RATELIMIT_REMAINING),
            retry_after: header_u64(response.headers(), RETRY_AFTER.as_str()),
        };

        let body = if meta.status == 200 {
            Some(response.json()?)
        } else {
            None
        };

        Ok(FetchOutcome { meta, body })
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_u64_parses_integral_values_only() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        headers.insert("X-Other", HeaderValue::from_static("soon"));

        assert_eq!(header_u64(&headers, RETRY_AFTER.as_str()), Some(30));
        assert_eq!(header_u64(&headers, "X-Other"), None);
        assert_eq!(header_u64(&headers, "X-Missing"), None);
    }
}
