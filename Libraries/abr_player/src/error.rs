use thiserror::Error;

/// Errors surfaced by the player and its per-track buffers.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The fetch was cancelled, either by the per-segment timeout timer or
    /// because the player is shutting down. Recoverable: the segment cursor
    /// is left untouched and the next tick retries.
    #[error("fetch aborted")]
    FetchAborted,

    /// Transport or HTTP failure. Recoverable: logged and retried on the
    /// next tick without advancing the segment cursor.
    #[error("fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The manifest lacks data required to address segments. Fatal to the
    /// affected track's initialization.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// The append sink refused bytes. Fatal, no retry.
    #[error("append rejected: {0}")]
    AppendRejected(String),
}

pub type PlayerResult<T> = Result<T, PlayerError>;
