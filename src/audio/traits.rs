use crate::audio::error::AudioError;

/// The single audio output owned by a controller.
///
/// Mirrors a media element: a source is attached, then started. Progress and
/// completion are reported separately as [`SinkEvent`]s.
pub trait AudioSink: Send + Sync {
    /// Attaches `url` and returns its source generation. Every notification
    /// about this source carries the same generation.
    fn set_source(&self, url: &str) -> Result<u64, AudioError>;
    fn play(&self) -> Result<(), AudioError>;
    fn pause(&self);
    fn stop(&self);
    fn seek(&self, position_secs: f64);
    fn set_volume(&self, volume: f32);
    fn current_time(&self) -> f64;
    /// Duration of the attached source, 0 until known.
    fn duration(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    LoadedMetadata { generation: u64, duration_secs: f64 },
    TimeUpdate { generation: u64, position_secs: f64 },
    Ended { generation: u64 },
    Error { generation: u64, message: String },
}

impl SinkEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SinkEvent::LoadedMetadata { generation, .. }
            | SinkEvent::TimeUpdate { generation, .. }
            | SinkEvent::Ended { generation }
            | SinkEvent::Error { generation, .. } => *generation,
        }
    }
}
