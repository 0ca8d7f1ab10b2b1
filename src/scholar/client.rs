use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{ScholarRequest, ScholarResponse, SearchResult, normalize};
use crate::config::{ApiKey, ScholarSettings};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request timed out after {0:?}")]
    Timeout(Duration),

    #[error("search API returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Abstraction for scholarly search. Never retried by callers.
/// Implemented by `SerperClient` for production; mock implementations used in tests.
#[allow(async_fn_in_trait)]
pub trait ScholarSearch {
    async fn search(&self, query: &str, num_results: u32)
    -> Result<Vec<SearchResult>, SearchError>;
}

#[derive(Debug, Clone)]
pub struct SerperClient {
    http: Client,
    api_key: ApiKey,
    url: String,
    country: String,
    locale: String,
    timeout: Duration,
}

impl SerperClient {
    pub fn new(http: Client, settings: &ScholarSettings) -> Self {
        Self {
            http,
            api_key: settings.api_key.clone(),
            url: settings.url.clone(),
            country: settings.country.clone(),
            locale: settings.locale.clone(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey::new("test-key"),
            url: url.to_string(),
            country: "vn".to_string(),
            locale: "vi".to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn classify(&self, err: reqwest::Error) -> SearchError {
        if err.is_timeout() {
            SearchError::Timeout(self.timeout)
        } else {
            SearchError::Request(err)
        }
    }
}

impl ScholarSearch for SerperClient {
    async fn search(
        &self,
        query: &str,
        num_results: u32,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let request = ScholarRequest {
            q: query,
            num: num_results,
            gl: &self.country,
            hl: &self.locale,
        };

        let response = self
            .http
            .post(&self.url)
            .header("X-API-KEY", self.api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "scholar search failed");
            return Err(SearchError::Status {
                code: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body: ScholarResponse = response.json().await.map_err(|e| self.classify(e))?;
        let results = normalize(body.organic);
        debug!(results = results.len(), "scholar search complete");
        Ok(results)
    }
}
