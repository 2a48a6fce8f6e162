use std::collections::VecDeque;

/// One completed (or penalized) segment fetch.
///
/// `bitrate` is the declared bandwidth of the representation the segment was
/// fetched from, so samples taken at different qualities stay comparable.
#[derive(Clone, Copy, Debug)]
pub struct FetchSample {
    /// Media duration of the fetched segment in seconds.
    pub segment_duration: f64,
    /// Declared bitrate of the fetched representation in bits per second.
    pub bitrate: f64,
    /// Wall-clock seconds the fetch took.
    pub fetch_seconds: f64,
}

impl FetchSample {
    /// Throughput this fetch actually achieved relative to playback needs,
    /// in bits per second.
    pub fn effective_bitrate(&self) -> f64 {
        self.segment_duration * self.bitrate / self.fetch_seconds
    }
}

/// Sliding-window throughput estimator fed by segment fetch timings.
pub struct BandwidthEstimator {
    history: VecDeque<FetchSample>,
    window: usize,
}

impl BandwidthEstimator {
    pub fn new(window: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Appends a sample, evicting the oldest once the window is full.
    pub fn record_fetch(&mut self, sample: FetchSample) {
        self.history.push_back(sample);
        while self.history.len() > self.window {
            self.history.pop_front();
        }
    }

    /// Mean effective delivered bitrate over the window, in bits per second.
    /// Returns NaN when no samples have been recorded yet; callers treat a
    /// non-finite value as "no estimate".
    pub fn estimate_throughput(&self) -> f64 {
        if self.history.is_empty() {
            return f64::NAN;
        }
        let total: f64 = self.history.iter().map(|s| s.effective_bitrate()).sum();
        total / self.history.len() as f64
    }

    /// Mean of fetch time over segment duration. Values above 1.0 mean
    /// fetching is slower than playback consumes. NaN when empty.
    pub fn estimate_fetch_time_ratio(&self) -> f64 {
        if self.history.is_empty() {
            return f64::NAN;
        }
        let total: f64 = self
            .history
            .iter()
            .map(|s| s.fetch_seconds / s.segment_duration)
            .sum();
        total / self.history.len() as f64
    }

    pub fn window_size(&self) -> usize {
        self.window
    }

    /// Changes the window capacity. Shrinking evicts the oldest samples
    /// immediately.
    pub fn set_window_size(&mut self, window: usize) {
        self.window = window;
        while self.history.len() > self.window {
            self.history.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}
