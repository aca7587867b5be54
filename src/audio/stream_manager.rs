use crate::audio::{cache::UrlCache, enums::Quality};
use crate::http::{ApiError, CredentialProvider, MusicApi, UrlResolution};
use crate::model::TrackId;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

/// Resolves playable stream URLs, going through the URL cache first.
#[derive(Clone)]
pub struct StreamManager {
    api: Arc<dyn MusicApi>,
    credentials: Arc<dyn CredentialProvider>,
    url_cache: UrlCache,
}

impl StreamManager {
    pub fn new(
        api: Arc<dyn MusicApi>,
        credentials: Arc<dyn CredentialProvider>,
        url_cache: UrlCache,
    ) -> Self {
        Self {
            api,
            credentials,
            url_cache,
        }
    }

    pub fn cached(&self, track_id: TrackId) -> Option<String> {
        let url = self.url_cache.get(track_id);
        if url.is_some() {
            info!(id = track_id, "stream_manager_cache_hit");
        }
        url
    }

    /// `Ok(None)` means the server has no playable URL for this account.
    pub async fn resolve(
        &self,
        track_id: TrackId,
        quality: Quality,
    ) -> Result<Option<String>, ApiError> {
        let start = Instant::now();
        let api = self.api.clone();
        let credential = self.credentials.session_token();

        let url = self
            .url_cache
            .get_or_resolve(track_id, || async move {
                info!(id = track_id, quality = quality.as_str(), "stream_manager_cache_miss");
                api.song_url(track_id, quality, credential.as_deref())
                    .await
                    .map(|resolution| match resolution {
                        UrlResolution::Available(url) => Some(url),
                        UrlResolution::NoRights => None,
                    })
            })
            .await?;

        info!(
            id = track_id,
            available = url.is_some(),
            elapsed_ms = start.elapsed().as_millis(),
            "stream_manager_url_resolved"
        );
        Ok(url)
    }

    pub fn url_cache(&self) -> &UrlCache {
        &self.url_cache
    }
}

/// Forces the secure scheme on resolved URLs.
pub fn secure_url(url: &str) -> String {
    match url.strip_prefix("http:") {
        Some(rest) => format!("https:{rest}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_url() {
        assert_eq!(secure_url("http://m7.music.126.net/a.mp3"), "https://m7.music.126.net/a.mp3");
        assert_eq!(secure_url("https://already/secure"), "https://already/secure");
        assert_eq!(secure_url("blob:local"), "blob:local");
    }
}
