use crate::model::{Track, TrackId};
use rand::Rng;

use super::enums::PlayMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Added(usize),
    NothingToAdd,
}

/// The ordered play queue and the current-track pointer.
///
/// `current_track_index` is always `None` or a valid index into `queue`.
#[derive(Debug, Default)]
pub struct QueueManager {
    queue: Vec<Track>,
    current_track_index: Option<usize>,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the queue wholesale without selecting a track.
    pub fn load(&mut self, tracks: Vec<Track>) {
        self.queue = tracks;
        self.current_track_index = None;
    }

    /// Splices the tracks not already queued right after the current track,
    /// or at the front when nothing is selected.
    pub fn insert_next(&mut self, tracks: Vec<Track>) -> InsertOutcome {
        let mut unique: Vec<Track> = Vec::with_capacity(tracks.len());
        for track in tracks {
            if !self.contains(track.id) && !unique.iter().any(|t| t.id == track.id) {
                unique.push(track);
            }
        }

        if unique.is_empty() {
            return InsertOutcome::NothingToAdd;
        }

        let added = unique.len();
        let at = self.insertion_point();
        self.queue.splice(at..at, unique);
        InsertOutcome::Added(added)
    }

    /// Replaces the queue order and re-locates the current track by id.
    pub fn reorder(&mut self, ordering: Vec<Track>) {
        let current_id = self.current().map(|t| t.id);
        self.queue = ordering;
        self.current_track_index = current_id.and_then(|id| self.position(id));
    }

    /// Returns the index of `track`, queueing it next to the current track
    /// first if needed.
    pub fn locate_or_insert(&mut self, track: Track) -> usize {
        if let Some(index) = self.position(track.id) {
            return index;
        }
        let at = self.insertion_point();
        self.queue.insert(at, track);
        at
    }

    pub fn select(&mut self, index: usize) -> Option<&Track> {
        if index >= self.queue.len() {
            return None;
        }
        self.current_track_index = Some(index);
        self.queue.get(index)
    }

    /// Index of the track that `next()`/`previous()` would move to.
    pub fn neighbour_index(
        &self,
        direction: Direction,
        mode: PlayMode,
        rng: &mut impl Rng,
    ) -> Option<usize> {
        let len = self.queue.len();
        if len == 0 {
            return None;
        }

        match mode {
            PlayMode::Single => self.current_track_index,
            // Repeats of the current index are allowed.
            PlayMode::Random => Some(rng.random_range(0..len)),
            PlayMode::List => Some(match (self.current_track_index, direction) {
                (Some(i), Direction::Forward) => (i + 1) % len,
                (Some(i), Direction::Backward) => (i + len - 1) % len,
                (None, Direction::Forward) => 0,
                (None, Direction::Backward) => len - 1,
            }),
        }
    }

    pub fn current(&self) -> Option<&Track> {
        self.current_track_index.and_then(|i| self.queue.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_track_index
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.queue.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.queue
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn contains(&self, id: TrackId) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.queue.iter().position(|t| t.id == id)
    }

    fn insertion_point(&self) -> usize {
        self.current_track_index.map_or(0, |i| i + 1)
    }
}
