use crate::model::Track;

use super::enums::PlayMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub status: PlaybackStatus,
    pub mode: PlayMode,
    pub current_track: Option<Track>,
    pub progress_secs: f64,
    pub duration_secs: f64,
    pub volume: f32,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::Idle,
            mode: PlayMode::List,
            current_track: None,
            progress_secs: 0.0,
            duration_secs: 0.0,
            volume: 0.5,
        }
    }
}

impl PlaybackSession {
    pub fn progress_percent(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.progress_secs / self.duration_secs * 100.0
        } else {
            0.0
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}
