use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Read side of the playback position, shared by every track.
pub trait PlaybackClock: Send + Sync {
    /// Current playback position in presentation seconds.
    fn current_time(&self) -> f64;

    /// False while playback is paused.
    fn is_playing(&self) -> bool;

    /// Takes a pending seek request, if the host queued one. Requests are
    /// consumed: a second call returns None until the next seek.
    fn take_seek_request(&self) -> Option<f64>;
}

/// Playback position that advances with wall time, for headless runs.
/// Starts paused at zero.
pub struct WallClock {
    state: Mutex<WallState>,
    seek_request: Mutex<Option<f64>>,
}

struct WallState {
    position: f64,
    playing: bool,
    resumed_at: Option<Instant>,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WallState {
                position: 0.0,
                playing: false,
                resumed_at: None,
            }),
            seek_request: Mutex::new(None),
        }
    }

    pub fn play(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.playing {
            state.playing = true;
            state.resumed_at = Some(Instant::now());
        }
    }

    pub fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if let Some(resumed_at) = state.resumed_at.take() {
            state.position += resumed_at.elapsed().as_secs_f64();
        }
        state.playing = false;
    }

    /// Moves the position and queues a seek request for the player.
    pub fn seek(&self, position: f64) {
        let mut state = self.state.lock().unwrap();
        state.position = position;
        if state.playing {
            state.resumed_at = Some(Instant::now());
        }
        *self.seek_request.lock().unwrap() = Some(position);
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for WallClock {
    fn current_time(&self) -> f64 {
        let state = self.state.lock().unwrap();
        match state.resumed_at {
            Some(resumed_at) if state.playing => {
                state.position + resumed_at.elapsed().as_secs_f64()
            }
            _ => state.position,
        }
    }

    fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    fn take_seek_request(&self) -> Option<f64> {
        self.seek_request.lock().unwrap().take()
    }
}

/// Manually driven clock for tests and hosts that own the timeline.
/// Starts playing at zero.
pub struct ManualClock {
    time: Mutex<f64>,
    playing: AtomicBool,
    seek_request: Mutex<Option<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            time: Mutex::new(0.0),
            playing: AtomicBool::new(true),
            seek_request: Mutex::new(None),
        }
    }

    pub fn set_time(&self, time: f64) {
        *self.time.lock().unwrap() = time;
    }

    pub fn advance(&self, seconds: f64) {
        *self.time.lock().unwrap() += seconds;
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }

    /// Moves the position and queues a seek request for the player.
    pub fn request_seek(&self, time: f64) {
        *self.time.lock().unwrap() = time;
        *self.seek_request.lock().unwrap() = Some(time);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for ManualClock {
    fn current_time(&self) -> f64 {
        *self.time.lock().unwrap()
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    fn take_seek_request(&self) -> Option<f64> {
        self.seek_request.lock().unwrap().take()
    }
}
