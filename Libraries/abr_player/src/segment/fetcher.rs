use crate::error::PlayerResult;
use crate::segment::SegmentDescriptor;
use crate::transport::Transport;
use bytes::Bytes;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Resolves segment URLs against the manifest location and performs the
/// transfers through the configured transport.
#[derive(Clone)]
pub struct SegmentFetcher {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl SegmentFetcher {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    /**
     * Joins a manifest-relative path with the manifest location.
     * Absolute URLs pass through untouched.
     */
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path)
    }

    /// Downloads an initialization segment and returns (bytes, fetch_seconds).
    pub async fn fetch_init(
        &self,
        initialization: &str,
        cancel: &CancellationToken,
    ) -> PlayerResult<(Bytes, f64)> {
        let url = self.resolve(initialization);
        self.transport.fetch(&url, cancel).await
    }

    /// Downloads a media segment and returns (bytes, fetch_seconds).
    pub async fn fetch_media(
        &self,
        descriptor: &SegmentDescriptor,
        cancel: &CancellationToken,
    ) -> PlayerResult<(Bytes, f64)> {
        let url = self.resolve(&descriptor.url);
        self.transport.fetch(&url, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlayerError;
    use async_trait::async_trait;

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn fetch(
            &self,
            url: &str,
            _cancel: &CancellationToken,
        ) -> PlayerResult<(Bytes, f64)> {
            if url.contains("missing") {
                return Err(PlayerError::FetchFailed {
                    url: url.to_string(),
                    reason: "not found".to_string(),
                });
            }
            Ok((Bytes::from(url.to_string()), 0.5))
        }
    }

    #[test]
    fn resolves_relative_against_base() {
        let fetcher = SegmentFetcher::new(Arc::new(EchoTransport), "http://cdn.test/stream");
        assert_eq!(
            fetcher.resolve("video/seg-1.m4s"),
            "http://cdn.test/stream/video/seg-1.m4s"
        );
        assert_eq!(
            fetcher.resolve("https://other.test/abs.m4s"),
            "https://other.test/abs.m4s"
        );
    }

    #[tokio::test]
    async fn fetches_through_the_transport() {
        let fetcher = SegmentFetcher::new(Arc::new(EchoTransport), "http://cdn.test/stream");
        let cancel = CancellationToken::new();
        let (data, seconds) = fetcher.fetch_init("video/init.mp4", &cancel).await.unwrap();
        assert_eq!(data, Bytes::from("http://cdn.test/stream/video/init.mp4"));
        assert!((seconds - 0.5).abs() < 1e-9);

        let err = fetcher
            .fetch_init("missing/init.mp4", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, PlayerError::FetchFailed { .. }));
    }
}
