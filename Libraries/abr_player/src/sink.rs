use crate::error::PlayerResult;
use bytes::Bytes;

/// Media payload plus its position on the presentation timeline.
pub struct MediaChunk {
    pub data: Bytes,
    pub presentation_time: f64,
    pub duration: f64,
}

/// Receives decode-ready bytes and tracks the buffered range, mirroring the
/// contract of a media source buffer.
pub trait AppendSink: Send {
    /// Accepts an initialization segment.
    fn append_init(&mut self, data: Bytes) -> PlayerResult<()>;

    /// Accepts one media segment.
    fn append_media(&mut self, chunk: MediaChunk) -> PlayerResult<()>;

    /// True while the sink is still processing a previous append.
    fn updating(&self) -> bool;

    /// End of the buffered range in presentation seconds, or None when
    /// nothing is buffered yet.
    fn buffered_end(&self) -> Option<f64>;

    /// Abandons any in-progress append.
    fn abort(&mut self);

    /// Drops buffered media in `[start, end)`.
    fn remove(&mut self, start: f64, end: f64);
}

/// Sink for headless runs: discards payloads but keeps the buffered-range
/// bookkeeping so scheduling behaves as it would against a real buffer.
#[derive(Default)]
pub struct NullSink {
    appended_bytes: usize,
    segments: usize,
    end: Option<f64>,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn appended_bytes(&self) -> usize {
        self.appended_bytes
    }

    pub fn segments(&self) -> usize {
        self.segments
    }
}

impl AppendSink for NullSink {
    fn append_init(&mut self, data: Bytes) -> PlayerResult<()> {
        self.appended_bytes += data.len();
        Ok(())
    }

    fn append_media(&mut self, chunk: MediaChunk) -> PlayerResult<()> {
        self.appended_bytes += chunk.data.len();
        self.segments += 1;
        let end = chunk.presentation_time + chunk.duration;
        self.end = Some(self.end.map_or(end, |e| e.max(end)));
        Ok(())
    }

    fn updating(&self) -> bool {
        false
    }

    fn buffered_end(&self) -> Option<f64> {
        self.end
    }

    fn abort(&mut self) {}

    fn remove(&mut self, start: f64, end: f64) {
        if let Some(e) = self.end {
            if end >= e {
                self.end = if start > 0.0 { Some(start.min(e)) } else { None };
            }
        }
    }
}
