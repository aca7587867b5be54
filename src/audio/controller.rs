use flume::{Receiver, Sender};
use rand::{SeedableRng, rngs::StdRng};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audio::{
    cache::UrlCache,
    enums::{PlayMode, Quality},
    error::{AudioError, EngineError},
    queue::{Direction, InsertOutcome, QueueManager},
    state::{PlaybackSession, PlaybackStatus},
    stream_manager::{StreamManager, secure_url},
    traits::{AudioSink, SinkEvent},
};
use crate::config::AudioConfig;
use crate::event::events::Event;
use crate::http::{ApiError, CredentialProvider, MusicApi};
use crate::lyrics::{LyricSynchronizer, LyricTrack};
use crate::model::{Track, TrackId};

/// Result of a spawned resolution, tagged with the request token of the
/// `play()` call that issued it.
#[derive(Debug)]
pub enum Completion {
    StreamUrl {
        token: u64,
        track: Track,
        result: Result<Option<String>, ApiError>,
    },
    Lyrics {
        token: u64,
        track_id: TrackId,
        lyrics: LyricTrack,
    },
}

/// Drives the audio sink from the play queue.
///
/// Every `play()` stamps a new request token; resolutions that come back
/// under an older token are dropped, so a slow response for a track the user
/// already skipped can never replace the current source.
pub struct PlaybackController {
    api: Arc<dyn MusicApi>,
    sink: Box<dyn AudioSink>,
    queue: QueueManager,
    stream_manager: StreamManager,
    lyrics: LyricSynchronizer,
    session: PlaybackSession,
    quality: Quality,

    request_token: u64,
    pending: usize,
    // Generation of the source attached to the sink, if any.
    source_generation: Option<u64>,
    // Tracks that already failed in the current auto-skip chain. Kept until
    // the sink confirms a source is actually playing.
    skip_chain: HashSet<TrackId>,
    rng: StdRng,

    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
    event_tx: Sender<Event>,
}

impl PlaybackController {
    pub fn new(
        api: Arc<dyn MusicApi>,
        credentials: Arc<dyn CredentialProvider>,
        sink: Box<dyn AudioSink>,
        config: &AudioConfig,
        event_tx: Sender<Event>,
    ) -> Self {
        let url_cache = UrlCache::with_capacity(config.url_cache_capacity);
        let stream_manager = StreamManager::new(api.clone(), credentials, url_cache);
        let (completion_tx, completion_rx) = flume::unbounded();

        let volume = config.volume.clamp(0.0, 1.0);
        sink.set_volume(volume);

        Self {
            api,
            sink,
            queue: QueueManager::new(),
            stream_manager,
            lyrics: LyricSynchronizer::new(),
            session: PlaybackSession {
                volume,
                ..PlaybackSession::default()
            },
            quality: config.quality,
            request_token: 0,
            pending: 0,
            source_generation: None,
            skip_chain: HashSet::new(),
            rng: StdRng::from_os_rng(),
            completion_tx,
            completion_rx,
            event_tx,
        }
    }

    /// Replaces the random source used by random play mode.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    // --- queue ---------------------------------------------------------

    pub fn load(&mut self, tracks: Vec<Track>) {
        let len = tracks.len();
        self.queue.load(tracks);
        let _ = self.event_tx.send(Event::QueueLoaded(len));
    }

    pub fn insert_next(&mut self, tracks: Vec<Track>) -> InsertOutcome {
        let outcome = self.queue.insert_next(tracks);
        let _ = self.event_tx.send(match outcome {
            InsertOutcome::Added(n) => Event::TracksQueued(n),
            InsertOutcome::NothingToAdd => Event::NothingToQueue,
        });
        outcome
    }

    pub fn reorder(&mut self, ordering: Vec<Track>) {
        self.queue.reorder(ordering);
        let _ = self.event_tx.send(Event::QueueReordered);
    }

    // --- playback ------------------------------------------------------

    /// Entry point for every playback request. The track is queued next to
    /// the current one if it is not in the queue yet.
    pub fn play(&mut self, track: Track) {
        self.skip_chain.clear();
        if let Err(failed) = self.begin(track) {
            self.skip_unplayable(failed);
        }
    }

    pub fn play_index(&mut self, index: usize) {
        if let Some(track) = self.queue.get(index).cloned() {
            self.play(track);
        }
    }

    pub fn next(&mut self) {
        self.step(Direction::Forward);
    }

    pub fn previous(&mut self) {
        self.step(Direction::Backward);
    }

    fn step(&mut self, direction: Direction) {
        let Some(index) = self
            .queue
            .neighbour_index(direction, self.session.mode, &mut self.rng)
        else {
            return;
        };
        self.play_index(index);
    }

    pub fn pause(&mut self) {
        if self.session.status != PlaybackStatus::Playing || self.session.current_track.is_none() {
            return;
        }
        self.sink.pause();
        self.set_status(PlaybackStatus::Paused);
    }

    pub fn resume(&mut self) {
        if self.session.status != PlaybackStatus::Paused || self.session.current_track.is_none() {
            return;
        }
        match self.sink.play() {
            Ok(()) => self.set_status(PlaybackStatus::Playing),
            Err(e) => {
                warn!(error = %e, "resume_failed");
                self.fail(EngineError::Sink(e));
            }
        }
    }

    pub fn toggle_play_pause(&mut self) {
        match self.session.status {
            PlaybackStatus::Playing => self.pause(),
            PlaybackStatus::Paused => self.resume(),
            PlaybackStatus::Idle | PlaybackStatus::Loading => {}
        }
    }

    pub fn stop(&mut self) {
        self.request_token += 1;
        self.source_generation = None;
        self.sink.stop();
        self.session.current_track = None;
        self.session.progress_secs = 0.0;
        self.lyrics.reset();
        self.set_status(PlaybackStatus::Idle);
    }

    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        self.session.volume = volume;
        self.sink.set_volume(volume);
        let _ = self.event_tx.send(Event::VolumeChanged(volume));
    }

    pub fn seek(&mut self, position_secs: f64) {
        if self.session.current_track.is_none() || position_secs.is_nan() {
            return;
        }
        let position = self.clamp_position(position_secs);
        self.sink.seek(position);
        self.update_progress(position);
    }

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.session.mode = mode;
        let _ = self.event_tx.send(Event::PlayModeChanged(mode));
    }

    pub fn cycle_play_mode(&mut self) -> PlayMode {
        let mode = self.session.mode.cycle();
        self.set_play_mode(mode);
        mode
    }

    /// Switches the stream tier and re-resolves the active track.
    ///
    /// Cached URLs are keyed by track id only, so a track already in the
    /// cache keeps the URL of the tier it was first resolved at.
    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
        let _ = self.event_tx.send(Event::QualityChanged(quality));

        if self.session.status != PlaybackStatus::Idle
            && let Some(track) = self.session.current_track.clone()
        {
            self.play(track);
        }
    }

    // --- sink notifications --------------------------------------------

    /// Applies a notification from the sink. Notifications about any source
    /// other than the one currently attached are dropped.
    pub fn handle_sink_event(&mut self, event: SinkEvent) {
        let generation = event.generation();
        if self.source_generation != Some(generation) {
            debug!(generation, current = ?self.source_generation, "sink_event_stale");
            return;
        }

        match event {
            SinkEvent::LoadedMetadata { duration_secs, .. } => {
                self.confirm_playing();
                self.on_loaded_metadata(duration_secs);
            }
            SinkEvent::TimeUpdate { position_secs, .. } => {
                self.confirm_playing();
                self.on_time_update(position_secs);
            }
            SinkEvent::Ended { .. } => self.on_ended(),
            SinkEvent::Error { message, .. } => self.on_sink_error(message),
        }
    }

    // The attached source decoded, so the auto-skip chain is over.
    fn confirm_playing(&mut self) {
        if !self.skip_chain.is_empty() {
            debug!(tried = self.skip_chain.len(), "skip_chain_closed");
            self.skip_chain.clear();
        }
    }

    pub fn on_loaded_metadata(&mut self, duration_secs: f64) {
        if duration_secs.is_finite() && duration_secs > 0.0 {
            self.session.duration_secs = duration_secs;
        }
    }

    pub fn on_time_update(&mut self, position_secs: f64) {
        if self.session.current_track.is_none() || position_secs.is_nan() {
            return;
        }
        let position = self.clamp_position(position_secs);
        self.update_progress(position);
    }

    pub fn on_ended(&mut self) {
        if self.session.status != PlaybackStatus::Playing {
            return;
        }
        match (self.session.mode, self.session.current_track.clone()) {
            (PlayMode::Single, Some(track)) => self.play(track),
            _ => self.next(),
        }
    }

    fn on_sink_error(&mut self, message: String) {
        warn!(error = message.as_str(), "sink_error");
        if !matches!(
            self.session.status,
            PlaybackStatus::Loading | PlaybackStatus::Playing
        ) {
            return;
        }
        self.fail(EngineError::Sink(AudioError::StreamError(message)));
        if let Some(track) = self.session.current_track.clone() {
            self.skip_unplayable(track);
        }
    }

    // --- resolution completions ----------------------------------------

    /// A second handle on the completion channel, for event loops.
    pub fn completion_receiver(&self) -> Receiver<Completion> {
        self.completion_rx.clone()
    }

    /// Number of spawned resolutions whose completion has not been handled.
    pub fn pending_completions(&self) -> usize {
        self.pending
    }

    /// Waits for one completion and applies it. Returns false when nothing
    /// is outstanding.
    pub async fn process_next_completion(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        match self.completion_rx.recv_async().await {
            Ok(completion) => {
                self.handle_completion(completion);
                true
            }
            Err(_) => false,
        }
    }

    /// Applies completions until no spawned resolution is outstanding.
    pub async fn settle(&mut self) {
        while self.process_next_completion().await {}
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        self.pending = self.pending.saturating_sub(1);

        match completion {
            Completion::Lyrics {
                token,
                track_id,
                lyrics,
            } => {
                if token != self.request_token {
                    debug!(id = track_id, token, "lyrics_stale");
                    return;
                }
                self.lyrics.install(lyrics.clone());
                let _ = self.event_tx.send(Event::LyricsLoaded(track_id, lyrics));
                if let Some(index) = self.lyrics.update(self.session.progress_secs) {
                    let _ = self.event_tx.send(Event::LyricLineChanged(index));
                }
            }
            Completion::StreamUrl {
                token,
                track,
                result,
            } => {
                if token != self.request_token {
                    debug!(id = track.id, token, "stream_url_stale");
                    return;
                }
                match result {
                    Ok(Some(url)) => {
                        if let Err(failed) = self.attach(&track, &url) {
                            self.skip_unplayable(failed);
                        }
                    }
                    Ok(None) => {
                        info!(id = track.id, name = track.name.as_str(), "track_no_rights");
                        let _ = self.event_tx.send(Event::TrackUnavailable(track.clone()));
                        self.skip_unplayable(track);
                    }
                    Err(e) => {
                        warn!(id = track.id, error = %e, "stream_url_failed");
                        self.fail(e.into());
                        self.skip_unplayable(track);
                    }
                }
            }
        }
    }

    // --- internals -----------------------------------------------------

    /// Selects `track` and starts resolving it. `Err` carries the track back
    /// when it failed before anything was spawned.
    fn begin(&mut self, track: Track) -> Result<(), Track> {
        let index = self.queue.locate_or_insert(track);
        let Some(track) = self.queue.select(index).cloned() else {
            return Ok(());
        };

        self.request_token += 1;
        let token = self.request_token;
        self.source_generation = None;

        self.sink.pause();
        self.session.current_track = Some(track.clone());
        self.session.progress_secs = 0.0;
        self.session.duration_secs = track.duration_secs();
        self.set_status(PlaybackStatus::Loading);
        let _ = self.event_tx.send(Event::TrackSelected(track.clone()));

        self.lyrics.reset();
        self.spawn_lyrics(token, track.id);

        if let Some(url) = self.stream_manager.cached(track.id) {
            return self.attach(&track, &url);
        }
        self.spawn_stream_url(token, track);
        Ok(())
    }

    fn spawn_lyrics(&mut self, token: u64, track_id: TrackId) {
        let api = self.api.clone();
        let tx = self.completion_tx.clone();
        self.pending += 1;

        tokio::spawn(async move {
            let lyrics = LyricSynchronizer::fetch(api.as_ref(), track_id).await;
            let _ = tx.send(Completion::Lyrics {
                token,
                track_id,
                lyrics,
            });
        });
    }

    fn spawn_stream_url(&mut self, token: u64, track: Track) {
        let stream_manager = self.stream_manager.clone();
        let quality = self.quality;
        let tx = self.completion_tx.clone();
        self.pending += 1;

        tokio::spawn(async move {
            let result = stream_manager.resolve(track.id, quality).await;
            let _ = tx.send(Completion::StreamUrl {
                token,
                track,
                result,
            });
        });
    }

    fn attach(&mut self, track: &Track, url: &str) -> Result<(), Track> {
        let url = secure_url(url);
        let started = self.sink.set_source(&url).and_then(|generation| {
            self.source_generation = Some(generation);
            self.sink.play()
        });

        match started {
            Ok(()) => {
                info!(id = track.id, name = track.name.as_str(), "track_started");
                self.set_status(PlaybackStatus::Playing);
                let _ = self.event_tx.send(Event::TrackStarted(track.clone()));
                Ok(())
            }
            Err(e) => {
                warn!(id = track.id, error = %e, "sink_start_failed");
                self.fail(EngineError::Sink(e));
                Err(track.clone())
            }
        }
    }

    /// Advances past unplayable tracks. Each track is tried at most once per
    /// chain; landing on one already tried ends the session in `Idle`.
    ///
    /// The chain lives until the sink reports metadata or progress for an
    /// attached source, or until the next `play()`. A decoder failure
    /// reported after the source was attached therefore still counts
    /// against the same chain.
    ///
    /// In random mode the candidate is a fresh draw each step, so the chain
    /// ends at the first draw that repeats an already failed track, even if
    /// untried tracks remain in the queue.
    fn skip_unplayable(&mut self, failed: Track) {
        let mut failed = failed;
        loop {
            self.skip_chain.insert(failed.id);

            let candidate = self
                .queue
                .neighbour_index(Direction::Forward, self.session.mode, &mut self.rng)
                .and_then(|index| self.queue.get(index))
                .filter(|track| !self.skip_chain.contains(&track.id))
                .cloned();

            let Some(candidate) = candidate else {
                warn!(attempted = self.skip_chain.len(), "nothing_playable");
                self.skip_chain.clear();
                self.request_token += 1;
                self.source_generation = None;
                self.sink.stop();
                self.session.current_track = None;
                self.session.progress_secs = 0.0;
                self.set_status(PlaybackStatus::Idle);
                let _ = self.event_tx.send(Event::NothingPlayable);
                self.fail(EngineError::NothingPlayable);
                return;
            };

            debug!(from = failed.id, to = candidate.id, "auto_skip");
            match self.begin(candidate) {
                Ok(()) => return,
                Err(track) => failed = track,
            }
        }
    }

    fn clamp_position(&self, position_secs: f64) -> f64 {
        let position = position_secs.max(0.0);
        if self.session.duration_secs > 0.0 {
            position.min(self.session.duration_secs)
        } else {
            position
        }
    }

    fn update_progress(&mut self, position_secs: f64) {
        self.session.progress_secs = position_secs;
        let _ = self.event_tx.send(Event::PlaybackProgress {
            position_secs,
            duration_secs: self.session.duration_secs,
        });
        if let Some(index) = self.lyrics.update(position_secs) {
            let _ = self.event_tx.send(Event::LyricLineChanged(index));
        }
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        if self.session.status != status {
            self.session.status = status;
            let _ = self.event_tx.send(Event::StatusChanged(status));
        }
    }

    fn fail(&self, error: EngineError) {
        let _ = self.event_tx.send(Event::OperationFailed(error));
    }

    // --- accessors -----------------------------------------------------

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session.status
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.session.current_track.as_ref()
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    pub fn lyrics(&self) -> &LyricSynchronizer {
        &self.lyrics
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn url_cache(&self) -> &UrlCache {
        self.stream_manager.url_cache()
    }

    pub fn request_token(&self) -> u64 {
        self.request_token
    }
}
