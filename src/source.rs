use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::MailConfig;

/// One message pulled from the monitored mailbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub from: String,
    pub subject: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("message source unavailable: {0}")]
    Unavailable(String),
    #[error("message source returned malformed payload: {0}")]
    Decode(String),
}

/// Where candidate recharge messages come from.
///
/// `fetch_since` returns every message received strictly after `cursor`;
/// repeated queries with the same cursor return a superset of prior results.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn fetch_since(&self, cursor: DateTime<Utc>) -> Result<Vec<InboundMessage>, SourceError>;
}

/// Mail API client polling the monitored mailbox over HTTP
pub struct MailApiSource {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    address: String,
}

impl MailApiSource {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to create HTTP client"),
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
            address: config.address.clone(),
        }
    }
}

#[async_trait]
impl MessageSource for MailApiSource {
    async fn fetch_since(&self, cursor: DateTime<Utc>) -> Result<Vec<InboundMessage>, SourceError> {
        let url = format!("{}/mailboxes/{}/messages", self.api_url, self.address);

        let response = self
            .client
            .get(&url)
            .query(&[("after", cursor.timestamp().to_string())])
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "mail api returned {}",
                status
            )));
        }

        let messages: Vec<InboundMessage> = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        debug!(count = messages.len(), after = %cursor, "fetched candidate messages");
        Ok(messages)
    }
}
