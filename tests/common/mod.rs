#![allow(dead_code)]

use async_trait::async_trait;
use flume::Receiver;
use melodeck::{
    audio::{
        controller::PlaybackController,
        enums::Quality,
        error::AudioError,
        traits::AudioSink,
    },
    config::AudioConfig,
    event::events::Event,
    http::{ApiError, MusicApi, StaticCredentials, UrlResolution},
    model::{Album, Artist, Comment, CommentId, CommentPage, CommentQuery, CommentUser, Track, TrackId},
};
use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

pub fn track(id: TrackId) -> Track {
    Track {
        id,
        name: format!("Track {id}"),
        artists: vec![Artist {
            id: 100 + id,
            name: format!("Artist {id}"),
        }],
        album: Album::default(),
        duration_ms: 200_000,
    }
}

pub fn tracks(ids: &[TrackId]) -> Vec<Track> {
    ids.iter().copied().map(track).collect()
}

pub fn comment(id: CommentId, liked_count: u64) -> Comment {
    Comment {
        id,
        user: CommentUser::default(),
        content: format!("comment {id}"),
        time: 0,
        liked_count,
        liked: false,
    }
}

/// The URL the fake hands out unless told otherwise.
pub fn default_url(id: TrackId) -> String {
    format!("http://cdn.test/{id}.mp3")
}

pub fn secure(id: TrackId) -> String {
    format!("https://cdn.test/{id}.mp3")
}

#[derive(Default)]
struct ApiState {
    urls: HashMap<TrackId, Result<UrlResolution, ApiError>>,
    lyrics: HashMap<TrackId, String>,
    url_calls: HashMap<TrackId, usize>,
    lyric_calls: HashMap<TrackId, usize>,
    url_gates: HashMap<TrackId, Arc<Notify>>,
    lyric_gates: HashMap<TrackId, Arc<Notify>>,
    comment_pages: VecDeque<Result<CommentPage, ApiError>>,
    comment_queries: Vec<CommentQuery>,
    comment_like_result: Option<ApiError>,
    comment_likes: Vec<(TrackId, CommentId, bool)>,
    track_likes: Vec<(TrackId, bool)>,
    playlists: HashMap<i64, Vec<Track>>,
    catalog: HashMap<TrackId, Track>,
}

/// In-memory `MusicApi`. Every answer can be scripted per track, and calls
/// can be held back behind a gate to control completion order.
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<ApiState>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_url(&self, id: TrackId, resolution: UrlResolution) {
        self.state.lock().urls.insert(id, Ok(resolution));
    }

    pub fn no_rights(&self, ids: &[TrackId]) {
        for id in ids {
            self.set_url(*id, UrlResolution::NoRights);
        }
    }

    pub fn fail_url(&self, id: TrackId, error: ApiError) {
        self.state.lock().urls.insert(id, Err(error));
    }

    pub fn set_lyric(&self, id: TrackId, lrc: &str) {
        self.state.lock().lyrics.insert(id, lrc.to_string());
    }

    /// Holds `song_url(id)` until the returned handle is notified.
    pub fn gate_url(&self, id: TrackId) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().url_gates.insert(id, gate.clone());
        gate
    }

    pub fn gate_lyric(&self, id: TrackId) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().lyric_gates.insert(id, gate.clone());
        gate
    }

    pub fn url_calls(&self, id: TrackId) -> usize {
        self.state.lock().url_calls.get(&id).copied().unwrap_or(0)
    }

    pub fn lyric_calls(&self, id: TrackId) -> usize {
        self.state.lock().lyric_calls.get(&id).copied().unwrap_or(0)
    }

    pub fn push_comment_page(&self, page: Result<CommentPage, ApiError>) {
        self.state.lock().comment_pages.push_back(page);
    }

    pub fn comment_queries(&self) -> Vec<CommentQuery> {
        self.state.lock().comment_queries.clone()
    }

    pub fn fail_comment_likes(&self, error: ApiError) {
        self.state.lock().comment_like_result = Some(error);
    }

    pub fn comment_likes(&self) -> Vec<(TrackId, CommentId, bool)> {
        self.state.lock().comment_likes.clone()
    }

    pub fn track_likes(&self) -> Vec<(TrackId, bool)> {
        self.state.lock().track_likes.clone()
    }

    pub fn add_playlist(&self, id: i64, tracks: Vec<Track>) {
        let mut state = self.state.lock();
        for t in &tracks {
            state.catalog.insert(t.id, t.clone());
        }
        state.playlists.insert(id, tracks);
    }

    pub fn add_to_catalog(&self, tracks: Vec<Track>) {
        let mut state = self.state.lock();
        for t in tracks {
            state.catalog.insert(t.id, t);
        }
    }
}

#[async_trait]
impl MusicApi for FakeApi {
    async fn song_url(
        &self,
        track_id: TrackId,
        _quality: Quality,
        _credential: Option<&str>,
    ) -> Result<UrlResolution, ApiError> {
        let gate = {
            let mut state = self.state.lock();
            *state.url_calls.entry(track_id).or_default() += 1;
            state.url_gates.get(&track_id).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.state
            .lock()
            .urls
            .get(&track_id)
            .cloned()
            .unwrap_or_else(|| Ok(UrlResolution::Available(default_url(track_id))))
    }

    async fn lyric(&self, track_id: TrackId) -> Result<Option<String>, ApiError> {
        let gate = {
            let mut state = self.state.lock();
            *state.lyric_calls.entry(track_id).or_default() += 1;
            state.lyric_gates.get(&track_id).cloned()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.state.lock().lyrics.get(&track_id).cloned())
    }

    async fn comments(&self, query: &CommentQuery) -> Result<CommentPage, ApiError> {
        let mut state = self.state.lock();
        state.comment_queries.push(query.clone());
        state
            .comment_pages
            .pop_front()
            .unwrap_or_else(|| Ok(CommentPage::default()))
    }

    async fn like_comment(
        &self,
        track_id: TrackId,
        comment_id: CommentId,
        liked: bool,
        _credential: &str,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.comment_likes.push((track_id, comment_id, liked));
        match &state.comment_like_result {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn like_track(
        &self,
        track_id: TrackId,
        liked: bool,
        _credential: &str,
    ) -> Result<(), ApiError> {
        self.state.lock().track_likes.push((track_id, liked));
        Ok(())
    }

    async fn playlist_tracks(&self, playlist_id: i64) -> Result<Vec<Track>, ApiError> {
        self.state
            .lock()
            .playlists
            .get(&playlist_id)
            .cloned()
            .ok_or(ApiError::Application {
                code: 404,
                message: "playlist not found".to_string(),
            })
    }

    async fn song_details(&self, ids: &[TrackId]) -> Result<Vec<Track>, ApiError> {
        let state = self.state.lock();
        Ok(ids
            .iter()
            .filter_map(|id| state.catalog.get(id).cloned())
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct SinkLog {
    pub sources: Vec<String>,
    pub plays: usize,
    pub pauses: usize,
    pub stops: usize,
    pub seeks: Vec<f64>,
    pub volume: f32,
    pub fail_play: bool,
    pub generation: u64,
}

/// Records every call; clones share one log.
#[derive(Clone, Default)]
pub struct FakeSink {
    log: Arc<Mutex<SinkLog>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sources(&self) -> Vec<String> {
        self.log.lock().sources.clone()
    }

    pub fn last_source(&self) -> Option<String> {
        self.log.lock().sources.last().cloned()
    }

    pub fn pauses(&self) -> usize {
        self.log.lock().pauses
    }

    pub fn plays(&self) -> usize {
        self.log.lock().plays
    }

    pub fn stops(&self) -> usize {
        self.log.lock().stops
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.log.lock().seeks.clone()
    }

    pub fn volume(&self) -> f32 {
        self.log.lock().volume
    }

    /// Generation handed out by the most recent `set_source`.
    pub fn generation(&self) -> u64 {
        self.log.lock().generation
    }

    pub fn fail_play(&self, fail: bool) {
        self.log.lock().fail_play = fail;
    }
}

impl AudioSink for FakeSink {
    fn set_source(&self, url: &str) -> Result<u64, AudioError> {
        let mut log = self.log.lock();
        log.sources.push(url.to_string());
        log.generation += 1;
        Ok(log.generation)
    }

    fn play(&self) -> Result<(), AudioError> {
        let mut log = self.log.lock();
        if log.fail_play {
            return Err(AudioError::StreamError("autoplay blocked".to_string()));
        }
        log.plays += 1;
        Ok(())
    }

    fn pause(&self) {
        self.log.lock().pauses += 1;
    }

    fn stop(&self) {
        self.log.lock().stops += 1;
    }

    fn seek(&self, position_secs: f64) {
        self.log.lock().seeks.push(position_secs);
    }

    fn set_volume(&self, volume: f32) {
        self.log.lock().volume = volume;
    }

    fn current_time(&self) -> f64 {
        0.0
    }

    fn duration(&self) -> f64 {
        0.0
    }
}

pub struct Harness {
    pub controller: PlaybackController,
    pub api: Arc<FakeApi>,
    pub sink: FakeSink,
    pub events: Receiver<Event>,
}

impl Harness {
    pub fn new() -> Self {
        let api = FakeApi::new();
        let sink = FakeSink::new();
        let (event_tx, events) = flume::unbounded();
        let credentials = Arc::new(StaticCredentials::new(None));
        let controller = PlaybackController::new(
            api.clone(),
            credentials,
            Box::new(sink.clone()),
            &AudioConfig::default(),
            event_tx,
        )
        .with_rng(StdRng::seed_from_u64(7));

        Self {
            controller,
            api,
            sink,
            events,
        }
    }

    pub fn with_queue(ids: &[TrackId]) -> Self {
        let mut harness = Self::new();
        harness.controller.load(tracks(ids));
        harness.drain();
        harness
    }

    /// Everything emitted since the last drain.
    pub fn drain(&self) -> Vec<Event> {
        self.events.try_iter().collect()
    }

    pub fn current_id(&self) -> Option<TrackId> {
        self.controller.current_track().map(|t| t.id)
    }
}
