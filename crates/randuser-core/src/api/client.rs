//! HTTP client for the randomuser.me generator.
//!
//! `ApiClient` implements `RemoteUserSource` with a single GET per fetch,
//! retrying only on rate limiting.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{ApiResponse, UserDto};

use super::{ApiError, FetchQuery, RemoteUserSource};

// ============================================================================
// Constants
// ============================================================================

/// Default generator endpoint
pub const DEFAULT_BASE_URL: &str = "https://randomuser.me";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// The generator caps a single request at 5000 results.
const MAX_RESULTS_PER_REQUEST: u32 = 5000;

/// API client for randomuser.me.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client against the public generator
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint (mirrors, local fixtures)
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn users_url(&self) -> String {
        format!("{}/api/", self.base_url)
    }

    /// Query parameters for a fetch; absent filters are omitted entirely.
    fn query_params(query: &FetchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![(
            "results",
            query.count.clamp(1, MAX_RESULTS_PER_REQUEST).to_string(),
        )];
        if let Some(ref gender) = query.gender {
            params.push(("gender", gender.clone()));
        }
        if let Some(ref nat) = query.nationality {
            params.push(("nat", nat.clone()));
        }
        params
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Result<T> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .get(url)
                .header(header::ACCEPT, "application/json")
                .query(params)
                .send()
                .await
                .map_err(ApiError::NetworkError)?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response.json().await
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }
}

#[async_trait]
impl RemoteUserSource for ApiClient {
    async fn fetch(&self, query: &FetchQuery) -> Result<Vec<UserDto>> {
        let url = self.users_url();
        let params = Self::query_params(query);
        let response: ApiResponse = self.get(&url, &params).await?;
        debug!(requested = query.count, received = response.results.len(), "Users fetched");
        Ok(response.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserFilter;

    #[test]
    fn test_query_params_without_filters() {
        let query = FetchQuery::new(&UserFilter::default(), 1);
        assert_eq!(
            ApiClient::query_params(&query),
            vec![("results", "1".to_string())]
        );
    }

    #[test]
    fn test_query_params_with_filters() {
        let query = FetchQuery::new(&UserFilter::new(Some("male"), Some("gb")), 5);
        assert_eq!(
            ApiClient::query_params(&query),
            vec![
                ("results", "5".to_string()),
                ("gender", "male".to_string()),
                ("nat", "GB".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_params_clamps_count() {
        let query = FetchQuery {
            count: 0,
            gender: None,
            nationality: None,
        };
        assert_eq!(ApiClient::query_params(&query)[0].1, "1");

        let query = FetchQuery {
            count: 10_000,
            gender: None,
            nationality: None,
        };
        assert_eq!(ApiClient::query_params(&query)[0].1, "5000");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::with_base_url("http://localhost:3000/").expect("client builds");
        assert_eq!(client.users_url(), "http://localhost:3000/api/");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Nothing listens on port 1, so the connect is refused
        let client = ApiClient::with_base_url("http://127.0.0.1:1").expect("client builds");
        let query = FetchQuery::new(&UserFilter::default(), 1);

        let err = client.fetch(&query).await.expect_err("connect fails");
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NetworkError(_))));
    }
}
