use crate::{
    audio::{
        commands::AudioCommand,
        controller::PlaybackController,
        error::EngineError,
        traits::{AudioSink, SinkEvent},
    },
    comments::{CommentPaginator, LikeRequest, PageRequest},
    config::Config,
    event::events::Event,
    http::{ApiError, CredentialProvider, MusicApi},
    model::{CommentPage, LIKED_SONGS_PLAYLIST_ID, Track, TrackId},
};
use flume::{Receiver, Sender};
use std::sync::Arc;
use tracing::{info, warn};

/// Results of network work spawned by the system itself.
#[derive(Debug)]
pub enum SystemTask {
    CommentPage(PageRequest, Result<CommentPage, ApiError>),
    CommentLike(LikeRequest, Result<(), ApiError>),
    TracksLoaded {
        result: Result<Vec<Track>, ApiError>,
        autoplay: bool,
    },
    TrackLike {
        track_id: TrackId,
        liked: bool,
        result: Result<(), ApiError>,
    },
}

/// The engine context handed to the presentation layer: one controller, one
/// sink, one comment thread.
pub struct AudioSystem {
    controller: PlaybackController,
    comments: CommentPaginator,
    api: Arc<dyn MusicApi>,
    credentials: Arc<dyn CredentialProvider>,
    event_tx: Sender<Event>,
    task_tx: Sender<SystemTask>,
    task_rx: Receiver<SystemTask>,
    pending_tasks: usize,
    liked_track_ids: Vec<TrackId>,
    volume_step: f32,
    seek_step_secs: f64,
}

impl AudioSystem {
    pub fn new(
        api: Arc<dyn MusicApi>,
        credentials: Arc<dyn CredentialProvider>,
        sink: Box<dyn AudioSink>,
        config: &Config,
        event_tx: Sender<Event>,
    ) -> Self {
        let controller = PlaybackController::new(
            api.clone(),
            credentials.clone(),
            sink,
            &config.audio,
            event_tx.clone(),
        );
        let comments = CommentPaginator::new(api.clone(), credentials.clone(), &config.comments);
        let (task_tx, task_rx) = flume::unbounded();

        Self {
            controller,
            comments,
            api,
            credentials,
            event_tx,
            task_tx,
            task_rx,
            pending_tasks: 0,
            liked_track_ids: Vec::new(),
            volume_step: config.audio.volume_step,
            seek_step_secs: config.audio.seek_step_secs,
        }
    }

    /// Runs the engine until `Shutdown` or until every command sender is
    /// gone. All state changes happen on this one task.
    pub async fn run(mut self, commands: Receiver<AudioCommand>, sink_events: Receiver<SinkEvent>) {
        let completions = self.controller.completion_receiver();
        let tasks = self.task_rx.clone();
        info!("audio_system_started");

        loop {
            tokio::select! {
                cmd = commands.recv_async() => match cmd {
                    Ok(AudioCommand::Shutdown) | Err(_) => break,
                    Ok(cmd) => self.handle_command(cmd),
                },
                Ok(event) = sink_events.recv_async() => self.controller.handle_sink_event(event),
                Ok(completion) = completions.recv_async() => self.controller.handle_completion(completion),
                Ok(task) = tasks.recv_async() => self.handle_task(task),
            }
            self.sync_comment_track();
        }

        self.controller.stop();
        info!("audio_system_stopped");
    }

    pub fn handle_command(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::PlayTrack(track) => self.controller.play(track),
            AudioCommand::PlayIndex(index) => self.controller.play_index(index),
            AudioCommand::Next => self.controller.next(),
            AudioCommand::Previous => self.controller.previous(),
            AudioCommand::Pause => self.controller.pause(),
            AudioCommand::Resume => self.controller.resume(),
            AudioCommand::TogglePlayPause => self.controller.toggle_play_pause(),
            AudioCommand::Stop => self.controller.stop(),
            AudioCommand::Seek(pos) => self.controller.seek(pos),
            AudioCommand::SeekForward => self.seek_by(self.seek_step_secs),
            AudioCommand::SeekBackward => self.seek_by(-self.seek_step_secs),
            AudioCommand::SetVolume(volume) => self.controller.set_volume(volume),
            AudioCommand::VolumeUp => self.volume_by(self.volume_step),
            AudioCommand::VolumeDown => self.volume_by(-self.volume_step),
            AudioCommand::SetPlayMode(mode) => self.controller.set_play_mode(mode),
            AudioCommand::CyclePlayMode => {
                self.controller.cycle_play_mode();
            }
            AudioCommand::SetQuality(quality) => self.controller.set_quality(quality),
            AudioCommand::LoadTracks(tracks) => self.controller.load(tracks),
            AudioCommand::InsertNext(tracks) => {
                self.controller.insert_next(tracks);
            }
            AudioCommand::Reorder(tracks) => self.controller.reorder(tracks),
            AudioCommand::OpenPlaylist { id, .. } if id == LIKED_SONGS_PLAYLIST_ID => {
                self.open_liked_tracks()
            }
            AudioCommand::OpenPlaylist { id, autoplay } => self.open_playlist(id, autoplay),
            AudioCommand::OpenLikedTracks => self.open_liked_tracks(),
            AudioCommand::FetchComments => self.fetch_comments(),
            AudioCommand::SetCommentSort(sort_type) => {
                self.sync_comment_track();
                self.comments.change_sort_type(sort_type);
                self.fetch_comments();
            }
            AudioCommand::LikeComment { comment_id, liked } => self.like_comment(comment_id, liked),
            AudioCommand::LikeTrack { track_id, liked } => self.like_track(track_id, liked),
            AudioCommand::SetLikedTracks(ids) => self.liked_track_ids = ids,
            AudioCommand::Shutdown => self.controller.stop(),
        }
        self.sync_comment_track();
    }

    pub fn handle_task(&mut self, task: SystemTask) {
        self.pending_tasks = self.pending_tasks.saturating_sub(1);
        match task {
            SystemTask::CommentPage(request, result) => {
                let track_id = request.query.track_id;
                match self.comments.apply_page(request, result) {
                    Ok(true) => {
                        let thread = self.comments.thread();
                        let _ = self.event_tx.send(Event::CommentsFetched {
                            track_id,
                            loaded: thread.comments.len(),
                            total: thread.total,
                            has_more: thread.has_more,
                        });
                    }
                    Ok(false) => {}
                    Err(e) => self.fail(e),
                }
            }
            SystemTask::CommentLike(request, result) => {
                match self.comments.apply_like(&request, result) {
                    Ok(_) => {
                        let _ = self.event_tx.send(Event::CommentLiked {
                            comment_id: request.comment_id,
                            liked: request.liked,
                        });
                    }
                    Err(e) => self.fail(e),
                }
            }
            SystemTask::TracksLoaded { result, autoplay } => match result {
                Ok(tracks) => {
                    let first = tracks.first().cloned();
                    self.controller.load(tracks);
                    if autoplay && let Some(track) = first {
                        self.controller.play(track);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "tracks_load_failed");
                    self.fail(e.into());
                }
            },
            SystemTask::TrackLike {
                track_id,
                liked,
                result,
            } => match result {
                Ok(()) => {
                    if liked {
                        if !self.liked_track_ids.contains(&track_id) {
                            self.liked_track_ids.push(track_id);
                        }
                    } else {
                        self.liked_track_ids.retain(|id| *id != track_id);
                    }
                    let _ = self.event_tx.send(Event::TrackLiked { track_id, liked });
                }
                Err(e) => {
                    warn!(id = track_id, error = %e, "track_like_failed");
                    self.fail(e.into());
                }
            },
        }
        self.sync_comment_track();
    }

    /// Keeps the comment thread scoped to the controller's current track.
    fn sync_comment_track(&mut self) {
        let current = self.controller.current_track().map(|t| t.id);
        if self.comments.set_track(current)
            && let Some(track_id) = current
        {
            let _ = self.event_tx.send(Event::CommentsReset(track_id));
        }
    }

    /// Runs `work` on the runtime and feeds its result back into the loop.
    fn spawn_task<F>(&mut self, work: F)
    where
        F: Future<Output = SystemTask> + Send + 'static,
    {
        let tx = self.task_tx.clone();
        self.pending_tasks += 1;
        tokio::spawn(async move {
            let _ = tx.send(work.await);
        });
    }

    fn open_playlist(&mut self, id: i64, autoplay: bool) {
        let api = self.api.clone();
        info!(id, "open_playlist");
        self.spawn_task(async move {
            let result = api.playlist_tracks(id).await;
            SystemTask::TracksLoaded { result, autoplay }
        });
    }

    fn open_liked_tracks(&mut self) {
        if self.liked_track_ids.is_empty() {
            return;
        }
        let api = self.api.clone();
        let ids = self.liked_track_ids.clone();
        self.spawn_task(async move {
            let result = api.song_details(&ids).await;
            SystemTask::TracksLoaded {
                result,
                autoplay: false,
            }
        });
    }

    fn fetch_comments(&mut self) {
        let Some(request) = self.comments.begin_fetch() else {
            return;
        };
        let api = self.api.clone();
        self.spawn_task(async move {
            let result = api.comments(&request.query).await;
            SystemTask::CommentPage(request, result)
        });
    }

    fn like_comment(&mut self, comment_id: u64, liked: bool) {
        let request = match self.comments.begin_like(comment_id, liked) {
            Ok(request) => request,
            Err(e) => return self.fail(e),
        };
        let api = self.api.clone();
        self.spawn_task(async move {
            let result = api
                .like_comment(request.track_id, request.comment_id, request.liked, &request.credential)
                .await;
            SystemTask::CommentLike(request, result)
        });
    }

    fn like_track(&mut self, track_id: TrackId, liked: bool) {
        let Some(credential) = self.credentials.session_token() else {
            return self.fail(EngineError::AuthRequired);
        };
        let api = self.api.clone();
        self.spawn_task(async move {
            let result = api.like_track(track_id, liked, &credential).await;
            SystemTask::TrackLike {
                track_id,
                liked,
                result,
            }
        });
    }

    fn seek_by(&mut self, delta_secs: f64) {
        let position = self.controller.session().progress_secs + delta_secs;
        self.controller.seek(position);
    }

    fn volume_by(&mut self, delta: f32) {
        let volume = self.controller.session().volume + delta;
        self.controller.set_volume(volume);
    }

    fn fail(&self, error: EngineError) {
        let _ = self.event_tx.send(Event::OperationFailed(error));
    }

    /// Applies every spawned result that is still outstanding.
    pub async fn settle(&mut self) {
        loop {
            self.controller.settle().await;
            self.sync_comment_track();
            if !self.process_next_task().await {
                break;
            }
        }
    }

    /// Waits for the next system task and applies it. Returns false when
    /// nothing is outstanding.
    pub async fn process_next_task(&mut self) -> bool {
        if self.pending_tasks == 0 {
            return false;
        }
        match self.task_rx.recv_async().await {
            Ok(task) => {
                self.handle_task(task);
                true
            }
            Err(_) => false,
        }
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController {
        &mut self.controller
    }

    pub fn comments(&self) -> &CommentPaginator {
        &self.comments
    }

    pub fn liked_track_ids(&self) -> &[TrackId] {
        &self.liked_track_ids
    }
}
