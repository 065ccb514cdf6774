/// Transmission client for the ingestion endpoint
use std::time::Duration;

use log::{debug, info};
use thiserror::Error;

use crate::models::AggregateReading;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ingestion endpoint rejected the payload: {0}")]
    Status(reqwest::StatusCode),
}

/// Best-effort HTTP transmitter
///
/// One POST per reporting window, bounded by the client timeout. A
/// failure of any kind drops that window's aggregate: nothing is buffered,
/// retried, or re-queued, and the caller's state is never touched.
#[derive(Clone)]
pub struct IngestClient {
    http: reqwest::Client,
    endpoint: String,
}

impl IngestClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, IngestError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(IngestClient { http, endpoint })
    }

    /// POST the aggregate as JSON and check the response status
    ///
    /// A timeout expiry surfaces as an ordinary `Http` failure.
    pub async fn send(&self, aggregate: &AggregateReading) -> Result<(), IngestError> {
        debug!("POSTing window aggregate to {}", self.endpoint);

        let response = self
            .http
            .post(&self.endpoint)
            .json(aggregate)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Status(status));
        }

        info!("Ingestion endpoint accepted the aggregate ({})", status);
        Ok(())
    }
}
