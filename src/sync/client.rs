//! HTTP client for the server's snapshot endpoints.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use crate::errors::{AppError, ErrorDetails};
use crate::models::{ServerStatus, SyncReceipt, SyncSnapshot};

/// Response envelope as seen by the client.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    error: Option<ErrorDetails>,
}

#[derive(Clone)]
pub struct SyncClient {
    http: Client,
    base_url: String,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET /api/data
    pub async fn fetch_snapshot(&self) -> Result<SyncSnapshot, AppError> {
        let response = self.http.get(self.url("/api/data")).send().await?;
        read_envelope(response).await
    }

    /// POST /api/data
    pub async fn push_snapshot(&self, snapshot: &SyncSnapshot) -> Result<DateTime<Utc>, AppError> {
        let response = self
            .http
            .post(self.url("/api/data"))
            .json(snapshot)
            .send()
            .await?;
        let receipt: SyncReceipt = read_envelope(response).await?;
        Ok(receipt.last_sync)
    }

    /// GET /api/status
    pub async fn status(&self) -> Result<ServerStatus, AppError> {
        let response = self.http.get(self.url("/api/status")).send().await?;
        read_envelope(response).await
    }
}

async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AppError> {
    let status = response.status();
    let envelope: Envelope<T> = response.json().await.map_err(|e| {
        AppError::Network(format!("Unreadable response (HTTP {}): {}", status, e))
    })?;

    if !status.is_success() || !envelope.success {
        let message = envelope
            .error
            .map(|e| format!("{}: {}", e.code, e.message))
            .unwrap_or_else(|| "request rejected".to_string());
        return Err(AppError::Network(format!("Server answered {}: {}", status, message)));
    }

    envelope
        .data
        .ok_or_else(|| AppError::Network("Response carried no data".to_string()))
}
