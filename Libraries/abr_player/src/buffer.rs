use crate::abr::{BandwidthEstimator, FetchSample};
use crate::clock::PlaybackClock;
use crate::error::{PlayerError, PlayerResult};
use crate::mpd::AdaptationSet;
use crate::options::PlayerOptions;
use crate::representations::RepresentationSet;
use crate::segment::fetcher::SegmentFetcher;
use crate::segment::{SegmentDescriptor, SegmentIndex};
use crate::sink::{AppendSink, MediaChunk};
use crate::{EventCallback, PlayerEvent};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct InFlightFetch {
    handle: JoinHandle<PlayerResult<(Bytes, f64)>>,
    timer: JoinHandle<()>,
    token: CancellationToken,
    descriptor: SegmentDescriptor,
    representation_id: String,
    bitrate: u64,
    timeout: f64,
    url: String,
    discarded: bool,
}

/// Drives fetching and appending for one track: picks the quality each time
/// a fetch is due, keeps the buffer filled ahead of the playback position,
/// and turns fetch timeouts into quality downgrades.
pub struct TrackBuffer {
    content_type: String,
    representations: RepresentationSet,
    estimator: BandwidthEstimator,
    fetcher: SegmentFetcher,
    sink: Box<dyn AppendSink + Send>,
    clock: Arc<dyn PlaybackClock>,
    callback: EventCallback,
    options: PlayerOptions,
    index: SegmentIndex,
    presentation_duration: f64,
    current_segment_index: u64,
    pending_seek: Option<f64>,
    in_flight: Option<InFlightFetch>,
    stop_token: CancellationToken,
}

impl TrackBuffer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        adaptation: &AdaptationSet,
        presentation_duration: f64,
        fetcher: SegmentFetcher,
        sink: Box<dyn AppendSink + Send>,
        clock: Arc<dyn PlaybackClock>,
        callback: EventCallback,
        options: PlayerOptions,
        stop_token: CancellationToken,
    ) -> PlayerResult<Self> {
        let representations = RepresentationSet::new(adaptation.representations.clone())?;
        let index =
            SegmentIndex::for_representation(representations.current(), presentation_duration)?;
        let presentation_duration = if presentation_duration > 0.0 {
            presentation_duration
        } else {
            index.total_duration()
        };
        let current_segment_index = index.first_index();
        let estimator = BandwidthEstimator::new(options.history_window);

        Ok(Self {
            content_type: adaptation.content_type.clone(),
            representations,
            estimator,
            fetcher,
            sink,
            clock,
            callback,
            options,
            index,
            presentation_duration,
            current_segment_index,
            pending_seek: None,
            in_flight: None,
            stop_token,
        })
    }

    /// Fetches and appends the initialization segment of the starting
    /// representation. Must succeed before the track is ticked.
    pub async fn init(&mut self) -> PlayerResult<()> {
        let rep = self.representations.current();
        if rep.initialization.is_empty() {
            return Err(PlayerError::InvalidManifest(format!(
                "representation {} has no initialization segment",
                rep.id
            )));
        }
        let initialization = rep.initialization.clone();
        let rep_id = rep.id.clone();

        let (data, _) = self
            .fetcher
            .fetch_init(&initialization, &self.stop_token)
            .await?;
        debug!(
            "{}: appended init segment for {} ({} bytes)",
            self.content_type,
            rep_id,
            data.len()
        );
        self.sink.append_init(data)?;
        Ok(())
    }

    /// One buffer tick: finish a completed fetch, then apply a pending seek,
    /// then start the next fetch if one is due. A pending seek wins over the
    /// fetch decision of its tick.
    pub async fn update(&mut self) -> PlayerResult<()> {
        self.process_completed_fetch().await?;

        if let Some(target) = self.pending_seek.take() {
            self.apply_seek(target);
            return Ok(());
        }

        if !self.should_fetch_next_segment() {
            return Ok(());
        }

        self.begin_fetch().await
    }

    /// Records a seek target. Applied at the top of the next tick.
    pub fn seek(&mut self, target: f64) {
        self.pending_seek = Some(target);
    }

    pub fn should_fetch_next_segment(&self) -> bool {
        if self.is_fetching() || self.has_reached_end() || self.sink.updating() {
            return false;
        }
        // An empty buffer reports no end and must be filled right away.
        let buffered_end = self.sink.buffered_end().unwrap_or(f64::NEG_INFINITY);
        self.clock.current_time() + self.options.lookahead_secs >= buffered_end
    }

    pub fn has_reached_end(&self) -> bool {
        self.current_segment_index >= self.index.end_index() && !self.sink.updating()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn current_segment_index(&self) -> u64 {
        self.current_segment_index
    }

    pub fn current_representation_id(&self) -> &str {
        &self.representations.current().id
    }

    pub fn estimated_throughput(&self) -> f64 {
        self.estimator.estimate_throughput()
    }

    pub fn history_window(&self) -> usize {
        self.estimator.window_size()
    }

    pub fn set_history_window(&mut self, window: usize) {
        self.estimator.set_window_size(window);
    }

    fn apply_seek(&mut self, target: f64) {
        if let Some(inflight) = self.in_flight.as_mut() {
            // A late result from before the seek must not land in the
            // post-seek buffer.
            inflight.token.cancel();
            inflight.discarded = true;
        }
        self.sink.abort();
        self.sink.remove(0.0, self.presentation_duration);
        self.current_segment_index = self.index.segment_index_at(target);
        debug!(
            "{}: seek to {:.3}s, resuming at segment {}",
            self.content_type, target, self.current_segment_index
        );
    }

    async fn process_completed_fetch(&mut self) -> PlayerResult<()> {
        let Some(mut inflight) = self.in_flight.take() else {
            return Ok(());
        };
        if !inflight.handle.is_finished() {
            self.in_flight = Some(inflight);
            return Ok(());
        }

        inflight.timer.abort();
        let outcome = match (&mut inflight.handle).await {
            Ok(result) => result,
            Err(e) => Err(PlayerError::FetchFailed {
                url: inflight.url.clone(),
                reason: format!("fetch task failed: {e}"),
            }),
        };

        if inflight.discarded {
            debug!(
                "{}: dropping stale result for segment {}",
                self.content_type, inflight.descriptor.index
            );
            return Ok(());
        }

        match outcome {
            Ok((data, fetch_seconds)) => {
                self.estimator.record_fetch(FetchSample {
                    segment_duration: inflight.descriptor.duration,
                    bitrate: inflight.bitrate as f64,
                    fetch_seconds,
                });
                let size = data.len();
                self.sink.append_media(MediaChunk {
                    data,
                    presentation_time: inflight.descriptor.presentation_time,
                    duration: inflight.descriptor.duration,
                })?;
                self.current_segment_index = inflight.descriptor.index + 1;
                debug!(
                    "{}: appended segment {} ({} bytes in {:.3}s, estimate {:.0} bps)",
                    self.content_type,
                    inflight.descriptor.index,
                    size,
                    fetch_seconds,
                    self.estimator.estimate_throughput()
                );
                (self.callback)(PlayerEvent::SegmentAppended {
                    content_type: self.content_type.clone(),
                    representation_id: inflight.representation_id.clone(),
                    segment_index: inflight.descriptor.index,
                    presentation_time: inflight.descriptor.presentation_time,
                    duration: inflight.descriptor.duration,
                    size,
                });
            }
            Err(PlayerError::FetchAborted) => {
                warn!(
                    "{}: segment {} fetch timed out after {:.1}s, penalizing throughput",
                    self.content_type, inflight.descriptor.index, inflight.timeout
                );
                (self.callback)(PlayerEvent::Warning(format!(
                    "{} segment {} timed out after {:.1}s",
                    self.content_type, inflight.descriptor.index, inflight.timeout
                )));
                self.apply_timeout_penalty(&inflight).await?;
            }
            Err(e) => {
                warn!("{}: segment fetch failed: {e}", self.content_type);
                (self.callback)(PlayerEvent::DownloadError {
                    url: inflight.url.clone(),
                    reason: e.to_string(),
                });
                // Cursor untouched: the next tick retries the same segment.
            }
        }
        Ok(())
    }

    /// A timed-out fetch is a bandwidth measurement, not a lost one. Fill
    /// the whole window with the throughput the timeout implies so the very
    /// next selection reacts, then switch down if the ladder allows it.
    async fn apply_timeout_penalty(&mut self, inflight: &InFlightFetch) -> PlayerResult<()> {
        let synthetic = FetchSample {
            segment_duration: inflight.descriptor.duration,
            bitrate: inflight.bitrate as f64,
            fetch_seconds: inflight.timeout / self.options.timeout_penalty,
        };
        for _ in 0..self.estimator.window_size() {
            self.estimator.record_fetch(synthetic);
        }

        let estimate = self.estimator.estimate_throughput();
        let target = self
            .representations
            .select_for_throughput(estimate)
            .id
            .clone();
        if target != self.representations.current().id {
            match self.switch_representation(&target).await {
                Ok(()) => {}
                Err(e @ PlayerError::AppendRejected(_)) => return Err(e),
                Err(e) => {
                    warn!(
                        "{}: downgrade to {} failed: {e}",
                        self.content_type, target
                    );
                }
            }
        }
        Ok(())
    }

    /// Swaps the active representation, keeping the segment cursor aligned
    /// on presentation time, and appends the new initialization segment.
    async fn switch_representation(&mut self, id: &str) -> PlayerResult<()> {
        let position = self.index.presentation_time_of(self.current_segment_index);
        let previous = self.representations.current().id.clone();
        if !self.representations.switch_to(id)? {
            return Ok(());
        }

        self.index = match SegmentIndex::for_representation(
            self.representations.current(),
            self.presentation_duration,
        ) {
            Ok(index) => index,
            Err(e) => {
                self.representations.switch_to(&previous)?;
                return Err(e);
            }
        };
        self.current_segment_index = self.index.segment_index_at(position);

        let initialization = self.representations.current().initialization.clone();
        match self
            .fetcher
            .fetch_init(&initialization, &self.stop_token)
            .await
        {
            Ok((data, _)) => self.sink.append_init(data)?,
            Err(e) => {
                // Without its init segment the new representation is not
                // playable; fall back to where we were.
                self.representations.switch_to(&previous)?;
                self.index = SegmentIndex::for_representation(
                    self.representations.current(),
                    self.presentation_duration,
                )?;
                self.current_segment_index = self.index.segment_index_at(position);
                return Err(e);
            }
        }

        debug!(
            "{}: switched representation {} -> {}",
            self.content_type, previous, id
        );
        (self.callback)(PlayerEvent::RepresentationSwitched {
            content_type: self.content_type.clone(),
            from: previous,
            to: id.to_string(),
        });
        Ok(())
    }

    async fn begin_fetch(&mut self) -> PlayerResult<()> {
        let estimate = self.estimator.estimate_throughput();
        let target = self
            .representations
            .select_for_throughput(estimate)
            .id
            .clone();
        if target != self.representations.current().id {
            match self.switch_representation(&target).await {
                Ok(()) => {}
                Err(e @ PlayerError::AppendRejected(_)) => return Err(e),
                Err(e) => {
                    // Keep fetching at the current quality; the switch is
                    // retried on a later tick.
                    warn!("{}: switch to {} failed: {e}", self.content_type, target);
                }
            }
        }

        let Some(descriptor) = self.index.descriptor(self.current_segment_index) else {
            return Ok(());
        };

        let timeout = self.options.min_fetch_timeout_secs.max(descriptor.duration);
        let token = self.stop_token.child_token();

        let timer_token = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs_f64(timeout)).await;
            timer_token.cancel();
        });

        let fetcher = self.fetcher.clone();
        let fetch_token = token.clone();
        let fetch_descriptor = descriptor.clone();
        let handle =
            tokio::spawn(async move { fetcher.fetch_media(&fetch_descriptor, &fetch_token).await });

        debug!(
            "{}: fetching segment {} at {} (timeout {:.1}s)",
            self.content_type,
            descriptor.index,
            self.representations.current().id,
            timeout
        );

        self.in_flight = Some(InFlightFetch {
            handle,
            timer,
            token,
            url: self.fetcher.resolve(&descriptor.url),
            representation_id: self.representations.current().id.clone(),
            bitrate: self.representations.current().bandwidth,
            timeout,
            descriptor,
            discarded: false,
        });
        Ok(())
    }
}

impl Drop for TrackBuffer {
    fn drop(&mut self) {
        if let Some(inflight) = &self.in_flight {
            inflight.timer.abort();
            inflight.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::mpd::Representation;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum Script {
        Reply { size: usize, seconds: f64 },
        Slow { seconds: f64 },
        Fail,
    }

    /// Transport with per-URL scripted outcomes. Reported fetch seconds come
    /// from the script, so estimator math stays exact under virtual time.
    struct ScriptedTransport {
        scripts: Mutex<HashMap<String, Script>>,
        log: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new() -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
                log: Mutex::new(Vec::new()),
            }
        }

        fn script(&self, url: &str, script: Script) {
            self.scripts.lock().unwrap().insert(url.to_string(), script);
        }

        fn requests(&self) -> usize {
            self.log.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn fetch(
            &self,
            url: &str,
            cancel: &CancellationToken,
        ) -> PlayerResult<(Bytes, f64)> {
            self.log.lock().unwrap().push(url.to_string());
            let action = match self.scripts.lock().unwrap().get(url) {
                Some(Script::Reply { size, seconds }) => Ok((*size, *seconds)),
                Some(Script::Slow { seconds }) => Err(Some(*seconds)),
                Some(Script::Fail) | None => Err(None),
            };
            match action {
                Ok((size, seconds)) => Ok((Bytes::from(vec![0u8; size]), seconds)),
                Err(Some(seconds)) => {
                    tokio::select! {
                        _ = cancel.cancelled() => Err(PlayerError::FetchAborted),
                        _ = tokio::time::sleep(Duration::from_secs_f64(seconds)) => {
                            Err(PlayerError::FetchFailed {
                                url: url.to_string(),
                                reason: "gave up".to_string(),
                            })
                        }
                    }
                }
                Err(None) => Err(PlayerError::FetchFailed {
                    url: url.to_string(),
                    reason: "not found".to_string(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct SinkState {
        inits: usize,
        media: Vec<(f64, f64, usize)>,
        end: Option<f64>,
        updating: bool,
        aborts: usize,
        removed: Vec<(f64, f64)>,
        reject: bool,
    }

    #[derive(Clone)]
    struct SharedSink(Arc<Mutex<SinkState>>);

    impl SharedSink {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(SinkState::default())))
        }
    }

    impl AppendSink for SharedSink {
        fn append_init(&mut self, _data: Bytes) -> PlayerResult<()> {
            let mut state = self.0.lock().unwrap();
            if state.reject {
                return Err(PlayerError::AppendRejected("sink closed".to_string()));
            }
            state.inits += 1;
            Ok(())
        }

        fn append_media(&mut self, chunk: MediaChunk) -> PlayerResult<()> {
            let mut state = self.0.lock().unwrap();
            if state.reject {
                return Err(PlayerError::AppendRejected("sink closed".to_string()));
            }
            let end = chunk.presentation_time + chunk.duration;
            state
                .media
                .push((chunk.presentation_time, chunk.duration, chunk.data.len()));
            state.end = Some(state.end.map_or(end, |e: f64| e.max(end)));
            Ok(())
        }

        fn updating(&self) -> bool {
            self.0.lock().unwrap().updating
        }

        fn buffered_end(&self) -> Option<f64> {
            self.0.lock().unwrap().end
        }

        fn abort(&mut self) {
            self.0.lock().unwrap().aborts += 1;
        }

        fn remove(&mut self, start: f64, end: f64) {
            let mut state = self.0.lock().unwrap();
            state.removed.push((start, end));
            state.end = None;
        }
    }

    fn rep(id: &str, bandwidth: u64) -> Representation {
        Representation {
            id: id.to_string(),
            bandwidth,
            initialization: format!("{id}/init.mp4"),
            media: format!("{id}/seg-$Number$.m4s"),
            segment_duration: 4.0,
            timescale: 1,
            start_number: 1,
            segments: vec![],
            has_template: true,
        }
    }

    fn adaptation(reps: Vec<Representation>) -> AdaptationSet {
        AdaptationSet {
            content_type: "video".to_string(),
            mime_type: "video/mp4".to_string(),
            representations: reps,
        }
    }

    struct Fixture {
        buffer: TrackBuffer,
        transport: Arc<ScriptedTransport>,
        sink: SharedSink,
        clock: Arc<ManualClock>,
    }

    fn fixture(reps: Vec<Representation>, options: PlayerOptions) -> Fixture {
        let transport = Arc::new(ScriptedTransport::new());
        let sink = SharedSink::new();
        let clock = Arc::new(ManualClock::new());
        let fetcher = SegmentFetcher::new(transport.clone(), "http://cdn.test");
        let buffer = TrackBuffer::new(
            &adaptation(reps),
            100.0,
            fetcher,
            Box::new(sink.clone()),
            clock.clone(),
            Arc::new(|_| {}),
            options,
            CancellationToken::new(),
        )
        .unwrap();
        Fixture {
            buffer,
            transport,
            sink,
            clock,
        }
    }

    /// Lets spawned fetch tasks and their timers run under virtual time.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn init_fetches_and_appends_the_init_segment() {
        let mut fx = fixture(vec![rep("video", 2_000_000)], PlayerOptions::default());
        fx.transport.script(
            "http://cdn.test/video/init.mp4",
            Script::Reply {
                size: 100,
                seconds: 0.05,
            },
        );
        fx.buffer.init().await.unwrap();
        assert_eq!(fx.sink.0.lock().unwrap().inits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn init_failure_is_fatal_to_the_track() {
        let mut fx = fixture(vec![rep("video", 2_000_000)], PlayerOptions::default());
        fx.transport
            .script("http://cdn.test/video/init.mp4", Script::Fail);
        assert!(matches!(
            fx.buffer.init().await,
            Err(PlayerError::FetchFailed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_segments_in_order_and_tracks_throughput() {
        let mut fx = fixture(vec![rep("video", 2_000_000)], PlayerOptions::default());
        fx.transport.script(
            "http://cdn.test/video/init.mp4",
            Script::Reply {
                size: 100,
                seconds: 0.05,
            },
        );
        for n in 1..=3 {
            fx.transport.script(
                &format!("http://cdn.test/video/seg-{n}.m4s"),
                // 4s segments fetched in 2s: effective 4 Mbps.
                Script::Reply {
                    size: 1_000_000,
                    seconds: 2.0,
                },
            );
        }
        fx.buffer.init().await.unwrap();

        for _ in 0..3 {
            fx.buffer.update().await.unwrap();
            assert!(fx.buffer.is_fetching());
            assert!(!fx.buffer.should_fetch_next_segment());
            settle().await;
            fx.buffer.update().await.unwrap();
        }

        let state = fx.sink.0.lock().unwrap();
        let times: Vec<f64> = state.media.iter().map(|m| m.0).collect();
        assert_eq!(times, vec![0.0, 4.0, 8.0]);
        drop(state);
        assert_eq!(fx.buffer.current_segment_index(), 4);
        let estimate = fx.buffer.estimated_throughput();
        assert!((estimate - 4_000_000.0).abs() < 1.0, "estimate {estimate}");
    }

    #[tokio::test(start_paused = true)]
    async fn stops_fetching_once_the_lookahead_is_covered() {
        let mut fx = fixture(vec![rep("video", 2_000_000)], PlayerOptions::default());
        fx.transport.script(
            "http://cdn.test/video/init.mp4",
            Script::Reply {
                size: 100,
                seconds: 0.05,
            },
        );
        for n in 1..=25 {
            fx.transport.script(
                &format!("http://cdn.test/video/seg-{n}.m4s"),
                Script::Reply {
                    size: 1_000_000,
                    seconds: 0.1,
                },
            );
        }
        fx.buffer.init().await.unwrap();

        for _ in 0..10 {
            fx.buffer.update().await.unwrap();
            settle().await;
        }
        fx.buffer.update().await.unwrap();

        // Playback is at 0 and the lookahead is 10s, so 12s of 4s segments
        // is enough: three appended, the fourth never requested.
        assert_eq!(fx.sink.0.lock().unwrap().media.len(), 3);
        assert!(!fx.buffer.should_fetch_next_segment());

        // Playback moving on reopens the window.
        fx.clock.set_time(4.0);
        assert!(fx.buffer.should_fetch_next_segment());
    }

    #[tokio::test(start_paused = true)]
    async fn sink_updating_blocks_fetches() {
        let fx = fixture(vec![rep("video", 2_000_000)], PlayerOptions::default());
        fx.sink.0.lock().unwrap().updating = true;
        assert!(!fx.buffer.should_fetch_next_segment());
        fx.sink.0.lock().unwrap().updating = false;
        assert!(fx.buffer.should_fetch_next_segment());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_downgrades_without_advancing_the_cursor() {
        let mut fx = fixture(
            vec![rep("low", 1_000_000), rep("high", 4_000_000)],
            PlayerOptions::default(),
        );
        for id in ["low", "high"] {
            fx.transport.script(
                &format!("http://cdn.test/{id}/init.mp4"),
                Script::Reply {
                    size: 100,
                    seconds: 0.05,
                },
            );
        }
        // The first media fetch at the optimistic high quality stalls.
        fx.transport.script(
            "http://cdn.test/high/seg-1.m4s",
            Script::Slow { seconds: 60.0 },
        );
        fx.transport.script(
            "http://cdn.test/low/seg-1.m4s",
            Script::Reply {
                size: 400_000,
                seconds: 1.0,
            },
        );
        fx.buffer.init().await.unwrap();
        assert_eq!(fx.buffer.current_representation_id(), "high");

        fx.buffer.update().await.unwrap();
        assert!(fx.buffer.is_fetching());
        // Virtual time runs past the 4s timeout; the timer cancels the fetch.
        tokio::time::sleep(Duration::from_secs(6)).await;
        fx.buffer.update().await.unwrap();

        // Window flooded with the penalized rate: 4s * 4Mbps / (4s / 0.5) = 2 Mbps,
        // so only the 1 Mbps representation qualifies.
        assert_eq!(fx.buffer.current_representation_id(), "low");
        let estimate = fx.buffer.estimated_throughput();
        assert!((estimate - 2_000_000.0).abs() < 1.0, "estimate {estimate}");
        assert_eq!(fx.buffer.current_segment_index(), 1);
        assert_eq!(fx.sink.0.lock().unwrap().inits, 2);

        // The retry fetches the same segment at the lower quality.
        fx.buffer.update().await.unwrap();
        settle().await;
        fx.buffer.update().await.unwrap();
        let state = fx.sink.0.lock().unwrap();
        assert_eq!(state.media.len(), 1);
        assert_eq!(state.media[0].0, 0.0);
        drop(state);
        assert_eq!(fx.buffer.current_segment_index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_is_retried_without_advancing() {
        let mut fx = fixture(vec![rep("video", 2_000_000)], PlayerOptions::default());
        fx.transport.script(
            "http://cdn.test/video/init.mp4",
            Script::Reply {
                size: 100,
                seconds: 0.05,
            },
        );
        fx.buffer.init().await.unwrap();

        // seg-1 is not scripted: the first attempt fails hard.
        fx.buffer.update().await.unwrap();
        settle().await;
        fx.buffer.update().await.unwrap();
        assert_eq!(fx.buffer.current_segment_index(), 1);
        assert!(fx.sink.0.lock().unwrap().media.is_empty());

        fx.transport.script(
            "http://cdn.test/video/seg-1.m4s",
            Script::Reply {
                size: 1_000_000,
                seconds: 1.0,
            },
        );
        fx.buffer.update().await.unwrap();
        settle().await;
        fx.buffer.update().await.unwrap();
        assert_eq!(fx.buffer.current_segment_index(), 2);
        assert_eq!(fx.sink.0.lock().unwrap().media.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_remaps_the_cursor_and_skips_that_ticks_fetch() {
        let mut fx = fixture(vec![rep("video", 2_000_000)], PlayerOptions::default());
        fx.transport.script(
            "http://cdn.test/video/init.mp4",
            Script::Reply {
                size: 100,
                seconds: 0.05,
            },
        );
        fx.buffer.init().await.unwrap();
        let before = fx.transport.requests();

        fx.buffer.seek(30.0);
        fx.buffer.update().await.unwrap();

        // Segment 8 covers 28..32s with 4s segments starting at number 1.
        assert_eq!(fx.buffer.current_segment_index(), 8);
        let state = fx.sink.0.lock().unwrap();
        assert_eq!(state.aborts, 1);
        assert_eq!(state.removed, vec![(0.0, 100.0)]);
        drop(state);
        // The seek consumed the tick: no fetch was started.
        assert_eq!(fx.transport.requests(), before);
        assert!(!fx.buffer.is_fetching());
    }

    #[tokio::test(start_paused = true)]
    async fn seek_discards_the_result_of_an_overlapping_fetch() {
        let mut fx = fixture(vec![rep("video", 2_000_000)], PlayerOptions::default());
        fx.transport.script(
            "http://cdn.test/video/init.mp4",
            Script::Reply {
                size: 100,
                seconds: 0.05,
            },
        );
        fx.transport.script(
            "http://cdn.test/video/seg-1.m4s",
            Script::Slow { seconds: 60.0 },
        );
        fx.transport.script(
            "http://cdn.test/video/seg-8.m4s",
            Script::Reply {
                size: 1_000_000,
                seconds: 1.0,
            },
        );
        fx.buffer.init().await.unwrap();

        fx.buffer.update().await.unwrap();
        assert!(fx.buffer.is_fetching());

        fx.buffer.seek(30.0);
        fx.buffer.update().await.unwrap();
        assert_eq!(fx.buffer.current_segment_index(), 8);

        // The cancelled fetch resolves but must neither append nor count as
        // a timeout penalty.
        settle().await;
        fx.buffer.update().await.unwrap();
        assert_eq!(fx.buffer.current_representation_id(), "video");
        assert!(fx.buffer.estimated_throughput().is_nan());

        settle().await;
        fx.buffer.update().await.unwrap();
        let state = fx.sink.0.lock().unwrap();
        assert_eq!(state.media.len(), 1);
        assert_eq!(state.media[0].0, 28.0);
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_end_after_the_last_segment() {
        let mut fx = fixture(vec![rep("video", 2_000_000)], PlayerOptions::default());
        fx.transport.script(
            "http://cdn.test/video/init.mp4",
            Script::Reply {
                size: 100,
                seconds: 0.05,
            },
        );
        fx.transport.script(
            "http://cdn.test/video/seg-25.m4s",
            Script::Reply {
                size: 1_000_000,
                seconds: 0.5,
            },
        );
        fx.buffer.init().await.unwrap();

        // Jump to the tail of the 100s presentation.
        fx.buffer.seek(99.0);
        fx.buffer.update().await.unwrap();
        assert_eq!(fx.buffer.current_segment_index(), 25);
        assert!(!fx.buffer.has_reached_end());

        fx.buffer.update().await.unwrap();
        settle().await;
        fx.buffer.update().await.unwrap();
        assert_eq!(fx.buffer.current_segment_index(), 26);
        assert!(fx.buffer.has_reached_end());
        assert!(!fx.buffer.should_fetch_next_segment());
    }

    #[tokio::test(start_paused = true)]
    async fn append_rejection_is_fatal() {
        let mut fx = fixture(vec![rep("video", 2_000_000)], PlayerOptions::default());
        fx.transport.script(
            "http://cdn.test/video/init.mp4",
            Script::Reply {
                size: 100,
                seconds: 0.05,
            },
        );
        fx.transport.script(
            "http://cdn.test/video/seg-1.m4s",
            Script::Reply {
                size: 1_000_000,
                seconds: 1.0,
            },
        );
        fx.buffer.init().await.unwrap();

        fx.buffer.update().await.unwrap();
        settle().await;
        fx.sink.0.lock().unwrap().reject = true;
        assert!(matches!(
            fx.buffer.update().await,
            Err(PlayerError::AppendRejected(_))
        ));
    }
}
