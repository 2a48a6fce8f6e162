//! Adaptive bitrate streaming client.
//!
//! Fetches the media segments described by a DASH manifest, picking the
//! representation to download from a rolling estimate of delivered
//! throughput, and feeds the bytes to per-track append sinks in
//! presentation order. Fetch timeouts are treated as bandwidth signals and
//! drive immediate quality downgrades.

pub mod abr;
pub mod buffer;
pub mod clock;
pub mod error;
pub mod mpd;
pub mod options;
pub mod player;
pub mod representations;
pub mod segment;
pub mod sink;
pub mod transport;

use std::sync::Arc;

pub use error::{PlayerError, PlayerResult};
pub use options::PlayerOptions;
pub use player::Player;

/// Notifications emitted while the buffering loops run.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A media segment was fetched and handed to the append sink.
    SegmentAppended {
        content_type: String,
        representation_id: String,
        segment_index: u64,
        presentation_time: f64,
        duration: f64,
        size: usize,
    },
    /// The active representation of a track changed.
    RepresentationSwitched {
        content_type: String,
        from: String,
        to: String,
    },
    /// A segment fetch failed hard; it is retried on the next tick.
    DownloadError { url: String, reason: String },
    /// A track's buffering loop hit an unrecoverable error and stopped.
    TrackFailed { content_type: String, reason: String },
    /// A recoverable anomaly, such as a fetch timeout.
    Warning(String),
    /// Every track has fetched its last segment. Fired once.
    EndOfStream,
}

/// Shared handler invoked for every [`PlayerEvent`].
pub type EventCallback = Arc<dyn Fn(PlayerEvent) + Send + Sync>;
