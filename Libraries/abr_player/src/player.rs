use crate::buffer::TrackBuffer;
use crate::clock::PlaybackClock;
use crate::error::{PlayerError, PlayerResult};
use crate::mpd::parser::parse_mpd;
use crate::mpd::{AdaptationSet, MpdMetadata};
use crate::options::PlayerOptions;
use crate::segment::fetcher::SegmentFetcher;
use crate::sink::AppendSink;
use crate::transport::Transport;
use crate::{EventCallback, PlayerEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct TrackHandle {
    seek_mailbox: Arc<Mutex<Option<f64>>>,
    exhausted: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Owns one buffering loop per track in the manifest and coordinates them
/// against the shared playback clock: seeks fan out to every track, and
/// end-of-stream is announced only when every track has run out of segments.
pub struct Player {
    metadata: MpdMetadata,
    base_url: String,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn PlaybackClock>,
    callback: EventCallback,
    options: PlayerOptions,
    stop_token: CancellationToken,
    tracks: Vec<TrackHandle>,
    watcher: Option<JoinHandle<()>>,
    ended: Arc<AtomicBool>,
    started: bool,
}

impl Player {
    /// Fetches and parses the manifest. Segment URLs resolve against the
    /// manifest location.
    pub async fn load(
        manifest_url: &str,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn PlaybackClock>,
        callback: EventCallback,
        options: PlayerOptions,
    ) -> PlayerResult<Self> {
        let stop_token = CancellationToken::new();
        let (data, fetch_seconds) = transport.fetch(manifest_url, &stop_token).await?;
        let text = String::from_utf8(data.to_vec())
            .map_err(|e| PlayerError::InvalidManifest(format!("manifest is not UTF-8: {e}")))?;
        let metadata = parse_mpd(&text)?;
        let base_url = manifest_url
            .rsplit_once('/')
            .map(|(base, _)| base.to_string())
            .unwrap_or_else(|| manifest_url.to_string());

        info!(
            "Loaded manifest from {} in {:.3}s: {} adaptation sets, {:.1}s presentation",
            manifest_url,
            fetch_seconds,
            metadata.adaptation_sets.len(),
            metadata.media_presentation_duration
        );

        Ok(Self {
            metadata,
            base_url,
            transport,
            clock,
            callback,
            options,
            stop_token,
            tracks: Vec::new(),
            watcher: None,
            ended: Arc::new(AtomicBool::new(false)),
            started: false,
        })
    }

    pub fn metadata(&self) -> &MpdMetadata {
        &self.metadata
    }

    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::Relaxed)
    }

    /// Builds one track buffer per adaptation set, appends every init
    /// segment, then spawns the buffering loops and the end-of-stream
    /// watcher. Any init failure aborts startup before a loop is spawned.
    pub async fn start<F>(&mut self, mut make_sink: F) -> PlayerResult<()>
    where
        F: FnMut(&AdaptationSet) -> Box<dyn AppendSink + Send>,
    {
        if self.started {
            warn!("start called twice, ignoring");
            return Ok(());
        }
        self.started = true;

        let mut buffers = Vec::new();
        for adaptation in &self.metadata.adaptation_sets {
            let sink = make_sink(adaptation);
            let fetcher = SegmentFetcher::new(self.transport.clone(), self.base_url.clone());
            let mut buffer = TrackBuffer::new(
                adaptation,
                self.metadata.media_presentation_duration,
                fetcher,
                sink,
                self.clock.clone(),
                self.callback.clone(),
                self.options.clone(),
                self.stop_token.clone(),
            )?;
            buffer.init().await?;
            info!(
                "Initialized {} track at {}",
                buffer.content_type(),
                buffer.current_representation_id()
            );
            buffers.push(buffer);
        }

        for buffer in buffers {
            let handle = self.spawn_track(buffer);
            self.tracks.push(handle);
        }
        self.watcher = Some(self.spawn_watcher());
        Ok(())
    }

    /// Requests a seek on every track. Applied by each buffering loop at the
    /// top of its next tick.
    pub fn seek(&self, target: f64) {
        info!("Seeking to {:.3}s", target);
        for track in &self.tracks {
            *track.seek_mailbox.lock().unwrap() = Some(target);
        }
    }

    /// Stops all buffering loops. In-flight fetches are cancelled through
    /// their child tokens.
    pub fn stop(&self) {
        info!("Stopping player");
        self.stop_token.cancel();
    }

    fn spawn_track(&self, mut buffer: TrackBuffer) -> TrackHandle {
        let content_type = buffer.content_type().to_string();
        let seek_mailbox: Arc<Mutex<Option<f64>>> = Arc::new(Mutex::new(None));
        let exhausted = Arc::new(AtomicBool::new(false));

        let token = self.stop_token.clone();
        let clock = self.clock.clone();
        let callback = self.callback.clone();
        let interval = self.options.update_interval;
        let mailbox = seek_mailbox.clone();
        let done = exhausted.clone();

        let task = tokio::spawn(async move {
            debug!("{content_type}: buffering loop started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                // Always drain the mailbox so the pending slot holds the
                // latest target, even across a pause.
                if let Some(target) = mailbox.lock().unwrap().take() {
                    buffer.seek(target);
                }

                if !clock.is_playing() {
                    continue;
                }

                if let Err(e) = buffer.update().await {
                    error!("{content_type}: buffering loop aborted: {e}");
                    (callback)(PlayerEvent::TrackFailed {
                        content_type: content_type.clone(),
                        reason: e.to_string(),
                    });
                    break;
                }

                done.store(buffer.has_reached_end(), Ordering::Relaxed);
            }
            debug!("{content_type}: buffering loop stopped");
        });

        TrackHandle {
            seek_mailbox,
            exhausted,
            task,
        }
    }

    /// Fans clock seek requests out to every track and latches end-of-stream
    /// once all tracks are exhausted at the same time.
    fn spawn_watcher(&self) -> JoinHandle<()> {
        let token = self.stop_token.clone();
        let clock = self.clock.clone();
        let callback = self.callback.clone();
        let interval = self.options.update_interval;
        let ended = self.ended.clone();
        let tracks: Vec<(Arc<Mutex<Option<f64>>>, Arc<AtomicBool>)> = self
            .tracks
            .iter()
            .map(|t| (t.seek_mailbox.clone(), t.exhausted.clone()))
            .collect();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }

                if let Some(target) = clock.take_seek_request() {
                    debug!("Clock requested seek to {:.3}s", target);
                    for (mailbox, _) in &tracks {
                        *mailbox.lock().unwrap() = Some(target);
                    }
                }

                if !ended.load(Ordering::Relaxed)
                    && tracks.iter().all(|(_, done)| done.load(Ordering::Relaxed))
                {
                    ended.store(true, Ordering::Relaxed);
                    info!("All tracks exhausted, end of stream");
                    (callback)(PlayerEvent::EndOfStream);
                }
            }
        })
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop_token.cancel();
        for track in &self.tracks {
            track.task.abort();
        }
        if let Some(watcher) = &self.watcher {
            watcher.abort();
        }
    }
}
