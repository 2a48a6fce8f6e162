use crate::error::{PlayerError, PlayerResult};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Fetches bytes on behalf of the player.
///
/// Implementations must fail with [`PlayerError::FetchAborted`] when the
/// token fires before the fetch completes, so callers can tell a timeout
/// from a transport failure.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the payload and the wall-clock seconds the fetch took.
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> PlayerResult<(Bytes, f64)>;
}

/// HTTP transport backed by a shared reqwest client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn fetch_bytes(&self, url: &str) -> PlayerResult<Bytes> {
        let response = self.client.get(url).send().await.map_err(|e| {
            PlayerError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(PlayerError::FetchFailed {
                url: url.to_string(),
                reason: format!("status {}", response.status()),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| PlayerError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> PlayerResult<(Bytes, f64)> {
        let start = Instant::now();
        tokio::select! {
            _ = cancel.cancelled() => Err(PlayerError::FetchAborted),
            result = self.fetch_bytes(url) => {
                let bytes = result?;
                Ok((bytes, start.elapsed().as_secs_f64()))
            }
        }
    }
}
