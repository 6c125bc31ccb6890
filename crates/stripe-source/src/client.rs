//! HTTP client for the Stripe REST API.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::sleep;

use crate::config::SourceOpts;
use crate::error::{Error, Result};
use crate::remote::{ChangeEvent, EventCursor, Page, RemoteDataSource, ResourceItem};
use crate::resources::ResourceSpec;

/// Base delay between retries, doubled per attempt.
const RETRY_BASE_DELAY_MS: u64 = 500;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`RemoteDataSource`] backed by `api.stripe.com`.
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    resource: &'static ResourceSpec,
    batch_size: usize,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl StripeClient {
    pub fn new(opts: &SourceOpts) -> Result<Self> {
        opts.validate()?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_base: opts.api_base.trim_end_matches('/').to_string(),
            secret_key: opts.secret_key.clone(),
            resource: opts.resource()?,
            batch_size: opts.batch_size,
            max_retries: opts.max_retries,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        })
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn resource(&self) -> &'static ResourceSpec {
        self.resource
    }

    fn resource_query(&self, starting_after: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![("limit", self.batch_size.to_string())];
        if let Some(id) = starting_after {
            query.push(("starting_after", id.to_string()));
        }
        query
    }

    fn event_query(&self, watermark: i64, cursor: &EventCursor) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("created[gte]", watermark.to_string()),
            ("limit", self.batch_size.to_string()),
        ];
        for event_type in self.resource.events {
            query.push(("types[]", event_type.to_string()));
        }
        match cursor {
            EventCursor::Latest => {}
            EventCursor::StartingAfter(id) => query.push(("starting_after", id.clone())),
            EventCursor::EndingBefore(id) => query.push(("ending_before", id.clone())),
        }
        query
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.api_base, path);

        let mut attempt = 0;
        loop {
            match self.get_once(&url, query).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "Request to {} failed: {}. Retrying (attempt {}/{}) in {:?}",
                        url,
                        e,
                        attempt,
                        self.max_retries,
                        delay
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.secret_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }

    /// Exponential backoff with up to 50% random jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.retry_base_delay * (1 << (attempt - 1).min(6));
        let jitter_ms = base.as_millis() as u64 / 2;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        base + Duration::from_millis(jitter)
    }
}

#[async_trait]
impl RemoteDataSource for StripeClient {
    async fn fetch_resource_page(
        &self,
        starting_after: Option<&str>,
    ) -> Result<Page<ResourceItem>> {
        let query = self.resource_query(starting_after);
        self.get(self.resource.list_path, &query).await
    }

    async fn fetch_event_page(
        &self,
        watermark: i64,
        cursor: &EventCursor,
    ) -> Result<Page<ChangeEvent>> {
        let query = self.event_query(watermark, cursor);
        self.get("events", &query).await
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Message from Stripe's `{"error": {...}}` body, or the raw body.
fn api_error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error:
                ErrorBody {
                    message: Some(message),
                    ..
                },
        }) => message,
        Ok(ErrorEnvelope {
            error: ErrorBody {
                kind: Some(kind), ..
            },
        }) => kind,
        _ => String::from_utf8_lossy(body).trim().to_string(),
    }
}
