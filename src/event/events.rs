use crate::{
    audio::{enums::PlayMode, enums::Quality, error::EngineError, state::PlaybackStatus},
    lyrics::LyricTrack,
    model::{CommentId, Track, TrackId},
};

/// Notifications for the presentation layer. The engine never talks to the
/// user directly; everything it has to say goes through this channel.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum Event {
    // Playback
    StatusChanged(PlaybackStatus),
    TrackSelected(Track),
    TrackStarted(Track),
    TrackUnavailable(Track),
    NothingPlayable,
    PlaybackProgress { position_secs: f64, duration_secs: f64 },
    VolumeChanged(f32),
    PlayModeChanged(PlayMode),
    QualityChanged(Quality),

    // Lyrics
    LyricsLoaded(TrackId, LyricTrack),
    LyricLineChanged(Option<usize>),

    // Queue
    QueueLoaded(usize),
    QueueReordered,
    TracksQueued(usize),
    NothingToQueue,

    // Comments
    CommentsReset(TrackId),
    CommentsFetched {
        track_id: TrackId,
        loaded: usize,
        total: u64,
        has_more: bool,
    },
    CommentLiked { comment_id: CommentId, liked: bool },

    // Account
    TrackLiked { track_id: TrackId, liked: bool },

    // Errors
    OperationFailed(EngineError),
}
