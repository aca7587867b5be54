use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// State shared between the rodio sink handle, its loader threads and its
/// monitor thread.
#[derive(Default, Debug)]
pub struct TrackProgress {
    current_position_millis: AtomicU64,
    total_duration_millis: AtomicU64,
    generation: AtomicU64,
    loaded: AtomicBool,
    shutdown: AtomicBool,
}

impl TrackProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_position(&self, position: Duration) {
        self.current_position_millis
            .store(position.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn set_total_duration(&self, duration: Duration) {
        self.total_duration_millis
            .store(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// `(position, duration)` in seconds.
    pub fn get_progress(&self) -> (f64, f64) {
        (
            self.current_position_millis.load(Ordering::Relaxed) as f64 / 1000.0,
            self.total_duration_millis.load(Ordering::Relaxed) as f64 / 1000.0,
        )
    }

    pub fn get_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.get_generation() == generation
    }

    pub fn set_loaded(&self, loaded: bool) {
        self.loaded.store(loaded, Ordering::SeqCst);
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Clears the loaded flag if it was set. Returns whether it was.
    pub fn take_loaded(&self) -> bool {
        self.loaded.swap(false, Ordering::SeqCst)
    }

    /// Starts a new source generation. Loaders holding an older generation
    /// must not touch the sink.
    pub fn reset(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_loaded(false);
        self.set_current_position(Duration::ZERO);
        self.set_total_duration(Duration::ZERO);
        generation
    }

    pub fn shut_down(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
