//! KudaGo event catalog implementation.
//!
//! Lists events through the public `/events/` endpoint, restricted to the
//! fields the pipeline needs. The endpoint is anonymous but rate limited;
//! a 429 is reported as [`UpstreamError::RateLimited`].
//!
//! API documentation: https://docs.kudago.com/api/

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::errors::UpstreamError;
use crate::models::{EpochSpan, Event};
use crate::provider::EventCatalog;

pub const DEFAULT_BASE_URL: &str = "https://kudago.com/public-api/v1.4";
const PROVIDER_ID: &str = "KUDAGO";
const EVENT_FIELDS: &str = "id,title,price,is_free";

// ============================================================================
// API Response Structures
// ============================================================================

/// Response from /events/ endpoint
#[derive(Debug, Deserialize)]
struct EventsResponse {
    /// Events on this page; absent or null when nothing matched
    #[serde(default)]
    results: Option<Vec<EventRecord>>,
    // Note: count, next, previous exist but only the first page is read
}

/// Individual event item
#[derive(Debug, Deserialize)]
struct EventRecord {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    /// Free-form price, e.g. "от 500 до 1500 рублей"
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    is_free: Option<bool>,
}

impl From<EventRecord> for Event {
    fn from(record: EventRecord) -> Self {
        Event {
            id: record.id,
            title: record.title.unwrap_or_default(),
            price_text: record.price,
            is_free: record.is_free.unwrap_or(false),
        }
    }
}

/// Decode an `/events/` body into events.
pub(crate) fn parse_events(body: &str) -> Result<Vec<Event>, UpstreamError> {
    let response: EventsResponse =
        serde_json::from_str(body).map_err(|e| UpstreamError::MalformedResponse {
            provider: PROVIDER_ID.to_string(),
            message: e.to_string(),
        })?;

    Ok(response
        .results
        .unwrap_or_default()
        .into_iter()
        .map(Event::from)
        .collect())
}

// ============================================================================
// KudaGoCatalog
// ============================================================================

/// KudaGo public events API.
pub struct KudaGoCatalog {
    client: Client,
    base_url: String,
}

impl KudaGoCatalog {
    /// Create a catalog client against `base_url` (no trailing slash needed).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Make a GET request to the KudaGo API.
    async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String, UpstreamError> {
        let url = format!("{}{}", self.base_url, endpoint);

        debug!("KudaGo request: {} with {} params", endpoint, params.len());

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout {
                        provider: PROVIDER_ID.to_string(),
                    }
                } else {
                    UpstreamError::transport(PROVIDER_ID, format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::status(
                PROVIDER_ID,
                status.as_u16(),
                format!("{} {}", status, body.trim()).trim().to_string(),
            ));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout {
                    provider: PROVIDER_ID.to_string(),
                }
            } else {
                UpstreamError::transport(PROVIDER_ID, format!("Failed to read response: {}", e))
            }
        })
    }
}

#[async_trait]
impl EventCatalog for KudaGoCatalog {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn list_events(&self, span: EpochSpan, page_size: u32) -> Result<Vec<Event>, UpstreamError> {
        let params = [
            ("actual_since", span.since.to_string()),
            ("actual_until", span.until.to_string()),
            ("fields", EVENT_FIELDS.to_string()),
            ("page_size", page_size.to_string()),
        ];

        let body = self.fetch("/events/", &params).await?;
        let events = parse_events(&body)?;

        debug!(
            "KudaGo returned {} events for [{}, {})",
            events.len(),
            span.since,
            span.until
        );
        Ok(events)
    }
}
