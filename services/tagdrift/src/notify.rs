//! Slack incoming-webhook notifier.
//!
//! # Purpose
//! Delivers [`DriftAlert`]s as Slack `blocks` messages with one HTTP POST.
//!
//! # Key invariants
//! - One attempt per alert, bounded by [`NOTIFY_TIMEOUT`].
//! - Only `200 OK` counts as delivered; the response body is read either way so
//!   Slack's error string (`invalid_token`, `no_service`, ...) reaches the logs.
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tagdrift_core::{DeliveryError, DriftAlert, Notifier};

pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self> {
        Self::with_timeout(url, NOTIFY_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).with_context(|| "parse webhook url")?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "build webhook http client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, alert: &DriftAlert) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(&alert.to_payload())
            .map_err(|err| DeliveryError::Request(err.into()))?;
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|err| DeliveryError::Transport(err.into()))?;

        let status = response.status();
        let text = response.text().await.map_err(|err| DeliveryError::Body {
            status: status.as_u16(),
            source: err.into(),
        })?;
        if status != StatusCode::OK {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        tracing::debug!(event_id = %alert.event_id, vm = %alert.vm, "drift notification sent");
        Ok(())
    }
}
