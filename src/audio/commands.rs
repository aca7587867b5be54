use crate::{
    audio::enums::{PlayMode, Quality},
    model::{CommentId, CommentSortType, Track, TrackId},
};

#[derive(Debug, Clone)]
pub enum AudioCommand {
    // Playback
    PlayTrack(Track),
    PlayIndex(usize),
    Next,
    Previous,
    Pause,
    Resume,
    TogglePlayPause,
    Stop,
    Seek(f64),
    SeekForward,
    SeekBackward,
    SetVolume(f32),
    VolumeUp,
    VolumeDown,
    SetPlayMode(PlayMode),
    CyclePlayMode,
    SetQuality(Quality),

    // Queue
    LoadTracks(Vec<Track>),
    InsertNext(Vec<Track>),
    Reorder(Vec<Track>),
    OpenPlaylist { id: i64, autoplay: bool },
    OpenLikedTracks,

    // Comments
    FetchComments,
    SetCommentSort(CommentSortType),
    LikeComment { comment_id: CommentId, liked: bool },

    // Account
    LikeTrack { track_id: TrackId, liked: bool },
    SetLikedTracks(Vec<TrackId>),

    Shutdown,
}
