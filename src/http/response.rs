//! Wire shapes of the REST endpoints, converted into typed results before
//! they leave the http module.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{ApiError, UrlResolution};
use crate::model::{Comment, CommentPage, Track};

/// NetEase answers 301 when the cookie is missing or expired.
const CODE_OK: i64 = 200;
const CODE_NEEDS_LOGIN: i64 = 301;

/// Rejects bodies whose application `code` is not 200.
pub fn check_code(body: &Value) -> Result<(), ApiError> {
    let Some(code) = body.get("code").and_then(Value::as_i64) else {
        return Ok(());
    };
    match code {
        CODE_OK => Ok(()),
        CODE_NEEDS_LOGIN => Err(ApiError::AuthRequired),
        code => {
            let message = body
                .get("message")
                .or_else(|| body.get("msg"))
                .and_then(Value::as_str)
                .unwrap_or("request rejected")
                .to_string();
            Err(ApiError::Application { code, message })
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SongUrlResponse {
    #[serde(default)]
    pub data: Vec<SongUrlData>,
}

#[derive(Debug, Deserialize)]
pub struct SongUrlData {
    pub id: u64,
    pub url: Option<String>,
}

impl SongUrlResponse {
    pub fn into_resolution(self) -> UrlResolution {
        match self.data.into_iter().next().and_then(|d| d.url) {
            Some(url) if !url.is_empty() => UrlResolution::Available(url),
            _ => UrlResolution::NoRights,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LyricResponse {
    pub lrc: Option<LyricBody>,
}

#[derive(Debug, Deserialize)]
pub struct LyricBody {
    pub lyric: Option<String>,
}

impl LyricResponse {
    pub fn into_text(self) -> Option<String> {
        self.lrc
            .and_then(|l| l.lyric)
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentResponse {
    pub data: CommentData,
}

#[derive(Debug, Deserialize)]
pub struct CommentData {
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(rename = "hotComments")]
    pub hot_comments: Option<Vec<Comment>>,
    #[serde(rename = "totalCount", default)]
    pub total_count: u64,
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
    #[serde(default, deserialize_with = "cursor_string")]
    pub cursor: Option<String>,
}

impl From<CommentData> for CommentPage {
    fn from(data: CommentData) -> Self {
        CommentPage {
            hot_comments: data.hot_comments,
            comments: data.comments,
            total: data.total_count,
            has_more: data.has_more,
            cursor: data.cursor,
        }
    }
}

/// The cursor is a string on some server versions and a number on others.
fn cursor_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Deserialize)]
pub struct SongsResponse {
    #[serde(default)]
    pub songs: Vec<Track>,
}
