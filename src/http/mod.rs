mod credentials;
mod error;
pub mod response;

pub use credentials::{CredentialProvider, StaticCredentials};
pub use error::ApiError;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::audio::enums::Quality;
use crate::config::ApiConfig;
use crate::model::{CommentId, CommentPage, CommentQuery, Track, TrackId};
use response::{CommentResponse, LyricResponse, SongUrlResponse, SongsResponse, check_code};

/// Outcome of asking for a playable URL. Missing rights is an ordinary
/// answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlResolution {
    Available(String),
    NoRights,
}

/// The REST collaborator the engine talks to.
#[async_trait]
pub trait MusicApi: Send + Sync {
    async fn song_url(
        &self,
        track_id: TrackId,
        quality: Quality,
        credential: Option<&str>,
    ) -> Result<UrlResolution, ApiError>;

    async fn lyric(&self, track_id: TrackId) -> Result<Option<String>, ApiError>;

    async fn comments(&self, query: &CommentQuery) -> Result<CommentPage, ApiError>;

    async fn like_comment(
        &self,
        track_id: TrackId,
        comment_id: CommentId,
        liked: bool,
        credential: &str,
    ) -> Result<(), ApiError>;

    async fn like_track(
        &self,
        track_id: TrackId,
        liked: bool,
        credential: &str,
    ) -> Result<(), ApiError>;

    async fn playlist_tracks(&self, playlist_id: i64) -> Result<Vec<Track>, ApiError>;

    async fn song_details(&self, ids: &[TrackId]) -> Result<Vec<Track>, ApiError>;
}

const PLAYLIST_TRACK_LIMIT: u32 = 500;

pub struct ApiService {
    client: Client,
    base_url: String,
    real_ip: Option<String>,
}

impl ApiService {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            real_ip: config.real_ip.clone(),
        })
    }

    /// Builds the request URL; every request carries `realIP` when configured.
    pub fn endpoint(&self, path: &str, mut params: Vec<(&str, String)>) -> Result<Url, ApiError> {
        if let Some(ip) = &self.real_ip {
            params.push(("realIP", ip.clone()));
        }
        Url::parse_with_params(&format!("{}{}", self.base_url, path), &params)
            .map_err(|e| ApiError::Network(format!("invalid endpoint {path}: {e}")))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path, params)?;
        debug!(path, "api_request");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Network(format!("HTTP error! status: {status}")));
        }

        let body: Value = response.json().await?;
        check_code(&body)?;
        Ok(serde_json::from_value(body)?)
    }
}

fn with_cookie<'a>(
    mut params: Vec<(&'a str, String)>,
    credential: Option<&str>,
) -> Vec<(&'a str, String)> {
    if let Some(cookie) = credential {
        params.push(("cookie", cookie.to_string()));
    }
    params
}

fn timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl MusicApi for ApiService {
    async fn song_url(
        &self,
        track_id: TrackId,
        quality: Quality,
        credential: Option<&str>,
    ) -> Result<UrlResolution, ApiError> {
        let params = with_cookie(
            vec![("id", track_id.to_string()), ("level", quality.to_string())],
            credential,
        );
        let body: SongUrlResponse = self.get("/song/url/v1", params).await?;
        Ok(body.into_resolution())
    }

    async fn lyric(&self, track_id: TrackId) -> Result<Option<String>, ApiError> {
        let body: LyricResponse = self.get("/lyric", vec![("id", track_id.to_string())]).await?;
        Ok(body.into_text())
    }

    async fn comments(&self, query: &CommentQuery) -> Result<CommentPage, ApiError> {
        let mut params = vec![
            ("type", "0".to_string()),
            ("id", query.track_id.to_string()),
            ("sortType", query.sort_type.code().to_string()),
            ("pageSize", query.page_size.to_string()),
            ("pageNo", query.page_no.to_string()),
        ];
        if let Some(cursor) = &query.cursor {
            params.push(("cursor", cursor.clone()));
        }
        let body: CommentResponse = self.get("/comment/new", params).await?;
        Ok(body.data.into())
    }

    async fn like_comment(
        &self,
        track_id: TrackId,
        comment_id: CommentId,
        liked: bool,
        credential: &str,
    ) -> Result<(), ApiError> {
        let params = with_cookie(
            vec![
                ("id", track_id.to_string()),
                ("cid", comment_id.to_string()),
                ("t", if liked { "1" } else { "0" }.to_string()),
                ("type", "0".to_string()),
                ("timestamp", timestamp()),
            ],
            Some(credential),
        );
        let _: Value = self.get("/comment/like", params).await?;
        Ok(())
    }

    async fn like_track(
        &self,
        track_id: TrackId,
        liked: bool,
        credential: &str,
    ) -> Result<(), ApiError> {
        let params = with_cookie(
            vec![
                ("id", track_id.to_string()),
                ("like", liked.to_string()),
                ("timestamp", timestamp()),
            ],
            Some(credential),
        );
        let _: Value = self.get("/like", params).await?;
        Ok(())
    }

    async fn playlist_tracks(&self, playlist_id: i64) -> Result<Vec<Track>, ApiError> {
        let body: SongsResponse = self
            .get(
                "/playlist/track/all",
                vec![
                    ("id", playlist_id.to_string()),
                    ("limit", PLAYLIST_TRACK_LIMIT.to_string()),
                ],
            )
            .await?;
        Ok(body.songs)
    }

    async fn song_details(&self, ids: &[TrackId]) -> Result<Vec<Track>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let body: SongsResponse = self.get("/song/detail", vec![("ids", ids)]).await?;
        Ok(body.songs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(real_ip: Option<&str>) -> ApiService {
        let config = ApiConfig {
            base_url: "https://api.example.com/".into(),
            real_ip: real_ip.map(str::to_string),
            ..ApiConfig::default()
        };
        ApiService::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_appends_real_ip_and_encodes() {
        let api = service(Some("114.114.114.114"));
        let url = api
            .endpoint(
                "/song/url/v1",
                with_cookie(vec![("id", "1".into())], Some("MUSIC_U=a b;")),
            )
            .unwrap();
        assert_eq!(url.path(), "/song/url/v1");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            query,
            vec![
                ("id".to_string(), "1".to_string()),
                ("cookie".to_string(), "MUSIC_U=a b;".to_string()),
                ("realIP".to_string(), "114.114.114.114".to_string()),
            ]
        );
    }

    #[test]
    fn test_endpoint_without_real_ip() {
        let api = service(None);
        let url = api.endpoint("/lyric", vec![("id", "7".into())]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/lyric?id=7");
    }
}
