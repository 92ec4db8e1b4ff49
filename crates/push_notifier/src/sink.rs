//! Delivery boundary — Expo push API.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const EXPO_PUSH_ENDPOINT: &str = "https://exp.host/--/api/v2/push/send";

/// Expo caps one request at 100 messages.
pub const EXPO_MAX_BATCH: usize = 100;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("push provider returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("recipient directory: {0}")]
    Directory(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub to:    String,
    pub title: String,
    pub body:  String,
    pub data:  Value,
    pub sound: &'static str,
}

#[async_trait]
pub trait PushSink: Send + Sync {
    /// One provider request. An `Err` fails the whole batch.
    async fn send_batch(&self, messages: &[PushMessage]) -> Result<(), DeliveryError>;
}

pub struct ExpoPushSink {
    client:   reqwest::Client,
    endpoint: String,
}

impl ExpoPushSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self { client, endpoint: endpoint.into() }
    }
}

#[async_trait]
impl PushSink for ExpoPushSink {
    async fn send_batch(&self, messages: &[PushMessage]) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(messages)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        Ok(())
    }
}
