//! Time-tagged (LRC) lyrics: parsing, loading and active-line tracking.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::http::MusicApi;
use crate::model::TrackId;

pub const PLACEHOLDER_TEXT: &str = "No lyrics available";

fn timestamp_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\[(\d{2}):(\d{2})\.(\d{2,3})\]").unwrap())
}

#[derive(Debug, Clone, PartialEq)]
pub struct LyricLine {
    pub time_secs: f64,
    pub text: String,
}

/// Parses LRC text into lines, in input order.
///
/// Only the first `[mm:ss.xx]` tag of a line counts. Lines without a tag, or
/// with nothing but whitespace after removing it, are dropped.
pub fn parse_lrc(raw: &str) -> Vec<LyricLine> {
    let regex = timestamp_regex();
    let mut lines = Vec::new();

    for line in raw.lines() {
        let Some(caps) = regex.captures(line) else {
            continue;
        };

        let minutes: u64 = caps[1].parse().unwrap_or(0);
        let seconds: u64 = caps[2].parse().unwrap_or(0);
        // "50" means 500 ms, "500" means 500 ms.
        let fraction = format!("{:0<3}", &caps[3]);
        let millis: u64 = fraction.parse().unwrap_or(0);

        let text = regex.replacen(line, 1, "");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }

        lines.push(LyricLine {
            time_secs: (minutes * 60 + seconds) as f64 + millis as f64 / 1000.0,
            text: text.to_string(),
        });
    }

    lines
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricTrack {
    lines: Vec<LyricLine>,
}

impl LyricTrack {
    /// Builds a track from parsed lines, stably ordering them by time.
    pub fn new(mut lines: Vec<LyricLine>) -> Self {
        let sorted = lines
            .windows(2)
            .all(|pair| pair[0].time_secs <= pair[1].time_secs);
        if !sorted {
            warn!(lines = lines.len(), "lyrics_out_of_order");
            lines.sort_by(|a, b| a.time_secs.total_cmp(&b.time_secs));
        }
        Self { lines }
    }

    pub fn parse(raw: &str) -> Self {
        Self::new(parse_lrc(raw))
    }

    pub fn placeholder() -> Self {
        Self {
            lines: vec![LyricLine {
                time_secs: 0.0,
                text: PLACEHOLDER_TEXT.to_string(),
            }],
        }
    }

    /// Greatest index whose timestamp is not after `current_secs`.
    pub fn active_line_index(&self, current_secs: f64) -> Option<usize> {
        self.lines
            .iter()
            .rposition(|line| line.time_secs <= current_secs)
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Holds the lyrics of the active track and the line matching playback
/// progress.
#[derive(Debug, Default)]
pub struct LyricSynchronizer {
    track: LyricTrack,
    active_line_index: Option<usize>,
}

impl LyricSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches and parses lyrics. Never fails: errors and empty results
    /// become the placeholder line.
    pub async fn fetch(api: &dyn MusicApi, track_id: TrackId) -> LyricTrack {
        match api.lyric(track_id).await {
            Ok(Some(raw)) => {
                let track = LyricTrack::parse(&raw);
                if track.is_empty() {
                    debug!(id = track_id, "lyrics_unparseable");
                    LyricTrack::placeholder()
                } else {
                    track
                }
            }
            Ok(None) => {
                debug!(id = track_id, "lyrics_missing");
                LyricTrack::placeholder()
            }
            Err(e) => {
                warn!(id = track_id, error = %e, "lyrics_fetch_failed");
                LyricTrack::placeholder()
            }
        }
    }

    pub async fn load(&mut self, api: &dyn MusicApi, track_id: TrackId) {
        let track = Self::fetch(api, track_id).await;
        self.install(track);
    }

    pub fn install(&mut self, track: LyricTrack) {
        self.track = track;
        self.active_line_index = None;
    }

    pub fn reset(&mut self) {
        self.install(LyricTrack::default());
    }

    /// Recomputes the active line; returns it when it changed.
    pub fn update(&mut self, current_secs: f64) -> Option<Option<usize>> {
        let index = self.track.active_line_index(current_secs);
        if index == self.active_line_index {
            return None;
        }
        self.active_line_index = index;
        Some(index)
    }

    pub fn active_line_index(&self) -> Option<usize> {
        self.active_line_index
    }

    pub fn active_line(&self) -> Option<&LyricLine> {
        self.active_line_index
            .and_then(|index| self.track.lines().get(index))
    }

    pub fn track(&self) -> &LyricTrack {
        &self.track
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "[00:01.50]Hello\n[00:03.00]World\nNotALine";

    #[test]
    fn test_parse_drops_untagged_lines() {
        let lines = parse_lrc(SAMPLE);
        assert_eq!(
            lines,
            vec![
                LyricLine {
                    time_secs: 1.5,
                    text: "Hello".into()
                },
                LyricLine {
                    time_secs: 3.0,
                    text: "World".into()
                },
            ]
        );
    }

    #[test]
    fn test_active_line_index() {
        let track = LyricTrack::parse(SAMPLE);
        assert_eq!(track.active_line_index(2.0), Some(0));
        assert_eq!(track.active_line_index(0.5), None);
        assert_eq!(track.active_line_index(3.0), Some(1));
        assert_eq!(track.active_line_index(999.0), Some(1));
    }

    #[test]
    fn test_parse_fraction_widths() {
        let lines = parse_lrc("[01:02.5]short\n[01:02.05]two\n[01:02.123]three");
        // A single fraction digit is not a recognised tag.
        assert_eq!(lines.len(), 2);
        assert!((lines[0].time_secs - 62.05).abs() < 1e-9);
        assert!((lines[1].time_secs - 62.123).abs() < 1e-9);
    }

    #[test]
    fn test_parse_drops_empty_text_and_metadata_tags() {
        let raw = "[ti:Title]\n[ar:Artist]\n[00:05.00]   \n[00:06.00] Line \r\n";
        let lines = parse_lrc(raw);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Line");
    }

    #[test]
    fn test_only_first_tag_is_honoured() {
        let lines = parse_lrc("[00:01.00][00:09.00]Duet");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].time_secs, 1.0);
        assert_eq!(lines[0].text, "[00:09.00]Duet");
    }

    #[test]
    fn test_parse_keeps_input_order() {
        let lines = parse_lrc("[00:09.00]late\n[00:01.00]early");
        assert_eq!(lines[0].text, "late");
        assert_eq!(lines[1].text, "early");
    }

    #[test]
    fn test_track_sorts_out_of_order_input() {
        let track = LyricTrack::parse("[00:09.00]late\n[00:01.00]early\n[00:01.00]same");
        let texts: Vec<&str> = track.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["early", "same", "late"]);
        assert_eq!(track.active_line_index(5.0), Some(1));
    }

    #[test]
    fn test_synchronizer_reports_changes_only() {
        let mut sync = LyricSynchronizer::new();
        sync.install(LyricTrack::parse(SAMPLE));

        assert_eq!(sync.update(0.2), None);
        assert_eq!(sync.update(1.6), Some(Some(0)));
        assert_eq!(sync.update(2.9), None);
        assert_eq!(sync.update(3.1), Some(Some(1)));
        assert_eq!(sync.active_line().map(|l| l.text.as_str()), Some("World"));
        assert_eq!(sync.update(0.0), Some(None));
    }

    #[test]
    fn test_placeholder_is_single_line_at_zero() {
        let track = LyricTrack::placeholder();
        assert_eq!(track.lines().len(), 1);
        assert_eq!(track.lines()[0].time_secs, 0.0);
        assert_eq!(track.active_line_index(0.0), Some(0));
    }
}
