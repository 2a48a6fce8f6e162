//! DASH manifest data structures (MPD and related types).
//! These represent parsed MPEG-DASH metadata for static/VOD presentations.

pub mod parser;

/// A single video/audio representation within an adaptation set.
#[derive(Debug, Clone)]
pub struct Representation {
    /// Unique identifier for the representation.
    pub id: String,
    /// Average bandwidth in bits per second (bps).
    pub bandwidth: u64,
    /// URL of the initialization segment, relative to the manifest.
    pub initialization: String,
    /// URL template for the media segments (may contain $Number$).
    pub media: String,
    /// Duration of each segment in seconds. Derived from `duration / timescale`.
    pub segment_duration: f64,
    /// Timescale used to convert segment timing to seconds.
    pub timescale: u64,
    /// First segment number substituted into $Number$. Defaults to 1.
    pub start_number: u64,
    /// Explicitly listed segments (SegmentList addressing). Empty when the
    /// representation uses a SegmentTemplate.
    pub segments: Vec<SegmentEntry>,
    /// True if a usable SegmentTemplate was resolved for this representation.
    pub has_template: bool,
}

/// One entry of a SegmentList.
#[derive(Debug, Clone)]
pub struct SegmentEntry {
    /// Media URL, relative to the manifest.
    pub media: String,
    /// Start of the segment on the presentation timeline in seconds.
    pub presentation_time: f64,
    /// Duration of the segment in seconds.
    pub duration: f64,
}

/// An adaptation set groups representations with the same content type (e.g., audio or video).
#[derive(Debug, Clone)]
pub struct AdaptationSet {
    /// Content type of the adaptation set (e.g., "audio" or "video").
    pub content_type: String,
    /// MIME type of the media (e.g., "video/mp4").
    pub mime_type: String,
    /// All representations available in this adaptation set, in manifest order.
    pub representations: Vec<Representation>,
}

/// Top-level metadata parsed from an MPD file.
#[derive(Debug, Clone)]
pub struct MpdMetadata {
    /// Total length of the presentation in seconds. Zero when the manifest
    /// does not declare `mediaPresentationDuration`.
    pub media_presentation_duration: f64,
    /// All adaptation sets (audio/video tracks) in the current Period.
    pub adaptation_sets: Vec<AdaptationSet>,
}
