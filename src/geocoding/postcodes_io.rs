use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::models::Coordinates;
use crate::postcode;

/// postcodes.io accepts at most 100 postcodes per bulk request
pub const MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum PostcodesIoError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("postcodes.io returned status {0}")]
    Status(u16),
}

impl PostcodesIoError {
    /// Connection failures, timeouts, rate limiting and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            PostcodesIoError::Request(e) => e.is_connect() || e.is_timeout(),
            PostcodesIoError::Status(code) => *code == 429 || *code >= 500,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PostcodeResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl PostcodeResult {
    fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    status: u16,
    result: Option<PostcodeResult>,
}

#[derive(Debug, Serialize)]
struct BulkRequest<'a> {
    postcodes: &'a [String],
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    result: Vec<BulkEntry>,
}

#[derive(Debug, Deserialize)]
struct BulkEntry {
    query: String,
    result: Option<PostcodeResult>,
}

#[derive(Clone)]
pub struct PostcodesIoClient {
    client: Client,
    base_url: String,
    batch_pause: Duration,
    retry_delay: Duration,
    max_retries: usize,
}

impl PostcodesIoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            batch_pause: Duration::from_millis(100),
            retry_delay: Duration::from_millis(500),
            max_retries: 3,
        }
    }

    /// Pause between bulk requests
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    /// First backoff delay for transient failures
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.retry_delay)
            .with_max_delay(self.retry_delay * 8)
            .with_max_times(self.max_retries)
    }

    /// Look up a single postcode. Unknown postcodes yield `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn lookup(&self, pc: &str) -> Result<Option<Coordinates>, PostcodesIoError> {
        let Some(compact) = postcode::normalize(pc) else {
            return Ok(None);
        };
        let url = format!("{}/postcodes/{}", self.base_url, compact);

        (|| self.lookup_once(&url))
            .retry(self.backoff())
            .when(|e: &PostcodesIoError| e.is_transient())
            .notify(|e, delay| warn!("Retrying {} in {:?}: {}", url, delay, e))
            .await
    }

    async fn lookup_once(&self, url: &str) -> Result<Option<Coordinates>, PostcodesIoError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(PostcodesIoError::Status(status.as_u16()));
        }

        let body: LookupResponse = response.json().await?;
        if body.status != 200 {
            return Ok(None);
        }
        Ok(body.result.as_ref().and_then(PostcodeResult::coordinates))
    }

    /// Geocode many postcodes with bulk requests of up to [`MAX_BATCH_SIZE`].
    ///
    /// Results are keyed by the postcodes as passed in. A chunk that still
    /// fails after retries is logged and skipped.
    #[instrument(skip(self, postcodes), fields(count = postcodes.len()))]
    pub async fn lookup_batch(&self, postcodes: &[String]) -> HashMap<String, Coordinates> {
        // compact form -> caller's spellings
        let mut queries: HashMap<String, Vec<&str>> = HashMap::new();
        for pc in postcodes {
            if let Some(key) = postcode::normalize(pc) {
                queries.entry(key).or_default().push(pc.as_str());
            }
        }

        let mut unique: Vec<String> = queries.keys().cloned().collect();
        unique.sort();

        let mut resolved = HashMap::new();
        let chunk_count = unique.len().div_ceil(MAX_BATCH_SIZE);

        for (index, chunk) in unique.chunks(MAX_BATCH_SIZE).enumerate() {
            match self.bulk_once_with_retry(chunk).await {
                Ok(entries) => {
                    for entry in entries {
                        let (Some(coords), Some(key)) = (
                            entry.result.as_ref().and_then(PostcodeResult::coordinates),
                            postcode::normalize(&entry.query),
                        ) else {
                            continue;
                        };
                        if let Some(originals) = queries.get(&key) {
                            for original in originals {
                                resolved.insert((*original).to_string(), coords);
                            }
                        }
                    }
                }
                Err(e) => error!(
                    "Batch {}/{} of {} postcodes failed: {}",
                    index + 1,
                    chunk_count,
                    chunk.len(),
                    e
                ),
            }

            if index + 1 < chunk_count && !self.batch_pause.is_zero() {
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        info!(
            "Geocoded {} of {} postcodes via postcodes.io",
            resolved.len(),
            postcodes.len()
        );
        resolved
    }

    async fn bulk_once_with_retry(
        &self,
        chunk: &[String],
    ) -> Result<Vec<BulkEntry>, PostcodesIoError> {
        (|| self.bulk_once(chunk))
            .retry(self.backoff())
            .when(|e: &PostcodesIoError| e.is_transient())
            .notify(|e, delay| warn!("Retrying bulk lookup in {:?}: {}", delay, e))
            .await
    }

    async fn bulk_once(&self, chunk: &[String]) -> Result<Vec<BulkEntry>, PostcodesIoError> {
        let url = format!("{}/postcodes", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&BulkRequest { postcodes: chunk })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PostcodesIoError::Status(status.as_u16()));
        }

        let body: BulkResponse = response.json().await?;
        debug!("Bulk lookup returned {} entries", body.result.len());
        Ok(body.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        assert!(PostcodesIoError::Status(503).is_transient());
        assert!(PostcodesIoError::Status(429).is_transient());
        assert!(!PostcodesIoError::Status(400).is_transient());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = PostcodesIoClient::new("https://api.postcodes.io/");
        assert_eq!(client.base_url(), "https://api.postcodes.io");
    }

    #[test]
    fn test_result_requires_both_coordinates() {
        let partial = PostcodeResult {
            latitude: Some(51.5),
            longitude: None,
        };
        assert!(partial.coordinates().is_none());
    }
}
