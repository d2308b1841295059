//! Delivery client
//!
//! Serializes a batch into the wire payload, compresses large bodies, and
//! drives the retry/backoff state machine. The actual HTTP exchange sits
//! behind the [`HttpExchange`] trait so retry behavior is testable without a
//! server; [`ReqwestExchange`] is the production implementation.
//!
//! The read-path operations (`fetch_insights`, `fetch_recommendations`) are
//! plain authenticated GETs with no retry or batching semantics.

use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tracekit_core::{ApiError, ContextEvent, EventBatch, TracekitConfig, SDK_NAME, SDK_VERSION};

/// Maximum delivery attempts per batch (1 initial + 2 retries).
const MAX_ATTEMPTS: u32 = 3;

/// Serialized bodies above this size are gzip-compressed.
const COMPRESSION_THRESHOLD: usize = 1024;

/// Per-request timeout for the production transport.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ----------------------------------------------------------------------------
// Collector Trait
// ----------------------------------------------------------------------------

/// The seam between the event tracker and the network.
///
/// The tracker only needs "upload this batch, tell me if it was accepted";
/// tests substitute a stub, production uses [`ApiClient`].
#[async_trait]
pub trait Collector: Send + Sync {
    /// Deliver a batch of events. `Ok(())` means the collector accepted the
    /// batch and the uploaded events may be drained.
    async fn upload(&self, events: &[ContextEvent]) -> Result<(), ApiError>;
}

// ----------------------------------------------------------------------------
// HTTP Exchange Trait
// ----------------------------------------------------------------------------

/// One HTTP round trip. Implementations perform a single request with no
/// retry logic of their own.
#[async_trait]
pub trait HttpExchange: Send + Sync {
    /// POST a serialized batch body, returning the response status code.
    async fn post_batch(
        &self,
        url: &str,
        api_key: &str,
        body: Vec<u8>,
        gzipped: bool,
    ) -> Result<u16, ApiError>;

    /// GET a resource, returning status code and response body.
    async fn get_body(&self, url: &str, api_key: &str) -> Result<(u16, String), ApiError>;
}

/// Production [`HttpExchange`] backed by a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestExchange {
    client: reqwest::Client,
}

impl ReqwestExchange {
    pub fn new() -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ApiError::Network {
                reason: error.to_string(),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpExchange for ReqwestExchange {
    async fn post_batch(
        &self,
        url: &str,
        api_key: &str,
        body: Vec<u8>,
        gzipped: bool,
    ) -> Result<u16, ApiError> {
        let mut request = self
            .client
            .post(url)
            .header("X-API-Key", api_key)
            .header("Content-Type", "application/json")
            .header("User-Agent", user_agent());

        if gzipped {
            request = request.header("Content-Encoding", "gzip");
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|error| ApiError::Network {
                reason: error.to_string(),
            })?;

        Ok(response.status().as_u16())
    }

    async fn get_body(&self, url: &str, api_key: &str) -> Result<(u16, String), ApiError> {
        let response = self
            .client
            .get(url)
            .header("X-API-Key", api_key)
            .header("User-Agent", user_agent())
            .send()
            .await
            .map_err(|error| ApiError::Network {
                reason: error.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|error| ApiError::Network {
            reason: error.to_string(),
        })?;
        Ok((status, body))
    }
}

fn user_agent() -> String {
    format!("{SDK_NAME}/{SDK_VERSION}")
}

// ----------------------------------------------------------------------------
// API Client
// ----------------------------------------------------------------------------

/// Delivery client for the collector API.
#[derive(Debug)]
pub struct ApiClient<E: HttpExchange = ReqwestExchange> {
    api_key: String,
    base_url: String,
    exchange: E,
}

impl ApiClient<ReqwestExchange> {
    /// Create a client with the production HTTP transport. Fails when the
    /// configured base URL is not an absolute URL.
    pub fn new(config: &TracekitConfig) -> Result<Self, ApiError> {
        reqwest::Url::parse(&config.base_url).map_err(|_| ApiError::InvalidUrl {
            url: config.base_url.clone(),
        })?;
        Ok(Self::with_exchange(config, ReqwestExchange::new()?))
    }
}

impl<E: HttpExchange> ApiClient<E> {
    /// Create a client over a custom transport (tests).
    pub fn with_exchange(config: &TracekitConfig, exchange: E) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            exchange,
        }
    }

    /// Fetch insights for an app. No retry semantics.
    pub async fn fetch_insights(&self, app_id: &str) -> Result<Vec<Insight>, ApiError> {
        let url = format!("{}/apps/{}/insights", self.base_url, app_id);
        self.get_json(&url).await
    }

    /// Fetch recommendations, optionally scoped to a screen and market.
    /// No retry semantics.
    pub async fn fetch_recommendations(
        &self,
        app_id: &str,
        screen: Option<&str>,
        market: Option<&str>,
    ) -> Result<Vec<Recommendation>, ApiError> {
        let mut url = format!("{}/apps/{}/recommendations", self.base_url, app_id);

        let mut query = Vec::new();
        if let Some(screen) = screen {
            query.push(format!("screen={screen}"));
        }
        if let Some(market) = market {
            query.push(format!("market={market}"));
        }
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }

        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let (status, body) = self.exchange.get_body(url, &self.api_key).await?;
        if !(200..300).contains(&status) {
            return Err(ApiError::Http { status });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl<E: HttpExchange> Collector for ApiClient<E> {
    async fn upload(&self, events: &[ContextEvent]) -> Result<(), ApiError> {
        let payload = EventBatch {
            api_key: self.api_key.clone(),
            events: events.to_vec(),
            sdk_version: SDK_VERSION.to_string(),
            uploaded_at: Utc::now(),
        };

        let body = serde_json::to_vec(&payload)?;
        let (body, gzipped) = maybe_compress(body)?;
        let url = format!("{}/events", self.base_url);

        let mut attempt: u32 = 1;
        loop {
            let outcome = self
                .exchange
                .post_batch(&url, &self.api_key, body.clone(), gzipped)
                .await;

            let failure = match outcome {
                Ok(status) if (200..300).contains(&status) => {
                    debug!(events = events.len(), attempt, "batch accepted");
                    return Ok(());
                }
                // Client errors are permanent; surface immediately.
                Ok(status) if status < 500 => return Err(ApiError::Http { status }),
                Ok(status) => ApiError::Http { status },
                Err(error) if !error.is_retryable() => return Err(error),
                Err(error) => error,
            };

            if attempt >= MAX_ATTEMPTS {
                return Err(ApiError::RetriesExhausted {
                    attempts: attempt,
                    last: failure.to_string(),
                });
            }

            let delay = backoff_delay(attempt);
            warn!(attempt, ?delay, %failure, "batch upload failed, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Delay before retry n+1: 2^(n-1) seconds (1s, 2s).
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << (attempt - 1))
}

/// Gzip bodies above the compression threshold.
fn maybe_compress(body: Vec<u8>) -> Result<(Vec<u8>, bool), ApiError> {
    if body.len() <= COMPRESSION_THRESHOLD {
        return Ok((body, false));
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&body)?;
    let compressed = encoder.finish()?;
    Ok((compressed, true))
}

// ----------------------------------------------------------------------------
// Read-Path Models
// ----------------------------------------------------------------------------

/// Server-generated insight for an app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub message: String,
    pub severity: Severity,
    #[serde(default)]
    pub affected_context: BTreeMap<String, String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
    Anomaly,
    Trend,
    Benchmark,
    Opportunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Server-generated recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    pub confidence: f64,
    #[serde(default)]
    pub benchmark: Option<String>,
    #[serde(default)]
    pub expected_impact: Option<String>,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
