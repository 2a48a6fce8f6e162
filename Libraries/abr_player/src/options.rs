use std::time::Duration;

/// Player configuration.
#[derive(Clone, Debug)]
pub struct PlayerOptions {
    /// Interval between buffer update ticks.
    pub update_interval: Duration,
    /// Seconds of media to keep buffered ahead of the playback position.
    pub lookahead_secs: f64,
    /// Number of fetch samples kept for throughput estimation.
    pub history_window: usize,
    /// Lower bound for the per-segment fetch timeout in seconds. The actual
    /// timeout is the larger of this and the segment duration.
    pub min_fetch_timeout_secs: f64,
    /// Factor applied to the implied throughput when a fetch times out.
    pub timeout_penalty: f64,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(125),
            lookahead_secs: 10.0,
            history_window: 10,
            min_fetch_timeout_secs: 2.0,
            timeout_penalty: 0.5,
        }
    }
}
