use serde::{Deserialize, Serialize};

pub type TrackId = u64;
pub type CommentId = u64;

/// Virtual playlist id used for the user's liked tracks.
pub const LIKED_SONGS_PLAYLIST_ID: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default)]
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "picUrl", default)]
    pub cover_url: String,
}

/// A catalog track as returned by the track source endpoints.
///
/// Tracks are never mutated after they are fetched; the queue holds its own
/// copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    #[serde(rename = "ar", default)]
    pub artists: Vec<Artist>,
    #[serde(rename = "al", default)]
    pub album: Album,
    #[serde(rename = "dt", default)]
    pub duration_ms: u64,
}

impl Track {
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentUser {
    #[serde(rename = "userId", default)]
    pub user_id: u64,
    #[serde(default)]
    pub nickname: String,
    #[serde(rename = "avatarUrl", default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "commentId")]
    pub id: CommentId,
    #[serde(default)]
    pub user: CommentUser,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub time: i64,
    #[serde(rename = "likedCount", default)]
    pub liked_count: u64,
    #[serde(default)]
    pub liked: bool,
}

impl Comment {
    /// Flips the liked flag and adjusts the counter. Returns false if the
    /// comment is already in the requested state.
    pub fn apply_like(&mut self, liked: bool) -> bool {
        if self.liked == liked {
            return false;
        }
        self.liked = liked;
        if liked {
            self.liked_count = self.liked_count.saturating_add(1);
        } else {
            self.liked_count = self.liked_count.saturating_sub(1);
        }
        true
    }
}

/// Server-defined comment orderings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CommentSortType {
    #[default]
    Recommended,
    Hot,
    Latest,
}

impl CommentSortType {
    pub fn code(self) -> u8 {
        match self {
            Self::Recommended => 1,
            Self::Hot => 2,
            Self::Latest => 3,
        }
    }
}

impl std::str::FromStr for CommentSortType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recommended" | "1" => Ok(Self::Recommended),
            "hot" | "2" => Ok(Self::Hot),
            "latest" | "time" | "3" => Ok(Self::Latest),
            other => Err(format!("unknown comment sort type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentQuery {
    pub track_id: TrackId,
    pub sort_type: CommentSortType,
    pub page_size: u32,
    pub page_no: u32,
    pub cursor: Option<String>,
}

/// One page of the comment endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentPage {
    pub hot_comments: Option<Vec<Comment>>,
    pub comments: Vec<Comment>,
    pub total: u64,
    pub has_more: bool,
    pub cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_deserializes_from_api_shape() {
        let json = r#"{
            "id": 347230,
            "name": "Song",
            "ar": [{"id": 1, "name": "A"}, {"id": 2, "name": "B"}],
            "al": {"id": 9, "name": "Album", "picUrl": "http://p.example/1.jpg"},
            "dt": 215000
        }"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.id, 347230);
        assert_eq!(track.artists.len(), 2);
        assert_eq!(track.album.cover_url, "http://p.example/1.jpg");
        assert_eq!(track.duration_secs(), 215.0);
    }

    #[test]
    fn test_comment_like_adjusts_counter() {
        let mut comment = Comment {
            id: 1,
            user: CommentUser::default(),
            content: "nice".into(),
            time: 0,
            liked_count: 0,
            liked: false,
        };
        assert!(comment.apply_like(true));
        assert_eq!(comment.liked_count, 1);
        assert!(!comment.apply_like(true));
        assert_eq!(comment.liked_count, 1);
        assert!(comment.apply_like(false));
        assert_eq!(comment.liked_count, 0);
        assert!(comment.apply_like(true));
        assert!(comment.apply_like(false));
        assert!(!comment.apply_like(false));
        assert_eq!(comment.liked_count, 0);
    }

    #[test]
    fn test_sort_type_parsing() {
        assert_eq!("hot".parse::<CommentSortType>(), Ok(CommentSortType::Hot));
        assert_eq!("3".parse::<CommentSortType>(), Ok(CommentSortType::Latest));
        assert!("oldest".parse::<CommentSortType>().is_err());
    }
}
