//! Cursor-paginated comment thread of the active track.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::audio::error::EngineError;
use crate::config::CommentConfig;
use crate::http::{ApiError, CredentialProvider, MusicApi};
use crate::model::{Comment, CommentId, CommentPage, CommentQuery, CommentSortType, TrackId};

/// Comments of one track. Replaced wholesale when the track or the sort
/// order changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentThread {
    pub track_id: Option<TrackId>,
    pub sort_type: CommentSortType,
    pub hot_comments: Vec<Comment>,
    pub comments: Vec<Comment>,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub total: u64,
}

impl CommentThread {
    fn new(track_id: Option<TrackId>, sort_type: CommentSortType) -> Self {
        Self {
            track_id,
            sort_type,
            hot_comments: Vec::new(),
            comments: Vec::new(),
            cursor: None,
            has_more: true,
            total: 0,
        }
    }
}

/// An issued page fetch. Handed back to [`CommentPaginator::apply_page`]
/// together with the endpoint's answer.
#[derive(Debug, Clone)]
pub struct PageRequest {
    generation: u64,
    first_page: bool,
    pub query: CommentQuery,
}

#[derive(Debug, Clone)]
pub struct LikeRequest {
    generation: u64,
    pub track_id: TrackId,
    pub comment_id: CommentId,
    pub liked: bool,
    pub credential: String,
}

pub struct CommentPaginator {
    api: Arc<dyn MusicApi>,
    credentials: Arc<dyn CredentialProvider>,
    thread: CommentThread,
    page_size: u32,
    page_no: u32,
    generation: u64,
    in_flight: bool,
}

impl CommentPaginator {
    pub fn new(
        api: Arc<dyn MusicApi>,
        credentials: Arc<dyn CredentialProvider>,
        config: &CommentConfig,
    ) -> Self {
        Self {
            api,
            credentials,
            thread: CommentThread::new(None, config.sort_type),
            page_size: config.page_size.max(1),
            page_no: 1,
            generation: 0,
            in_flight: false,
        }
    }

    /// Scopes the paginator to `track_id`. Returns true if the thread was
    /// reset.
    pub fn set_track(&mut self, track_id: Option<TrackId>) -> bool {
        if self.thread.track_id == track_id {
            return false;
        }
        self.reset(track_id, self.thread.sort_type);
        true
    }

    fn reset(&mut self, track_id: Option<TrackId>, sort_type: CommentSortType) {
        self.generation += 1;
        self.in_flight = false;
        self.page_no = 1;
        self.thread = CommentThread::new(track_id, sort_type);
    }

    /// Marks a fetch as in flight and returns its query, or `None` when a
    /// fetch is already running, there is nothing more, or no track is set.
    pub fn begin_fetch(&mut self) -> Option<PageRequest> {
        if self.in_flight || !self.thread.has_more {
            return None;
        }
        let track_id = self.thread.track_id?;

        self.in_flight = true;
        Some(PageRequest {
            generation: self.generation,
            first_page: self.page_no == 1,
            query: CommentQuery {
                track_id,
                sort_type: self.thread.sort_type,
                page_size: self.page_size,
                page_no: self.page_no,
                cursor: self.thread.cursor.clone(),
            },
        })
    }

    /// Applies a page. Returns `Ok(false)` when the request belongs to a
    /// thread that has since been reset.
    pub fn apply_page(
        &mut self,
        request: PageRequest,
        result: Result<CommentPage, ApiError>,
    ) -> Result<bool, EngineError> {
        if request.generation != self.generation {
            debug!(id = request.query.track_id, "comments_stale_page");
            return Ok(false);
        }
        self.in_flight = false;

        let page = result.map_err(|e| {
            warn!(id = request.query.track_id, error = %e, "comments_fetch_failed");
            EngineError::from(e)
        })?;

        if request.first_page {
            self.thread.hot_comments = page.hot_comments.unwrap_or_default();
        }
        self.thread.comments.extend(page.comments);
        self.thread.total = page.total;
        self.thread.has_more = page.has_more;
        self.thread.cursor = page.cursor;
        self.page_no += 1;
        Ok(true)
    }

    pub async fn fetch_next_page(&mut self) -> Result<bool, EngineError> {
        let Some(request) = self.begin_fetch() else {
            return Ok(false);
        };
        let result = self.api.comments(&request.query).await;
        self.apply_page(request, result)
    }

    /// Switches ordering: full reset, then the first page of the new order.
    pub async fn set_sort_type(&mut self, sort_type: CommentSortType) -> Result<bool, EngineError> {
        self.change_sort_type(sort_type);
        self.fetch_next_page().await
    }

    pub fn change_sort_type(&mut self, sort_type: CommentSortType) {
        self.reset(self.thread.track_id, sort_type);
    }

    /// Checks the preconditions of a like mutation.
    pub fn begin_like(&self, comment_id: CommentId, liked: bool) -> Result<LikeRequest, EngineError> {
        let Some(credential) = self.credentials.session_token() else {
            return Err(EngineError::AuthRequired);
        };
        let Some(track_id) = self.thread.track_id else {
            return Err(EngineError::NoActiveTrack);
        };
        Ok(LikeRequest {
            generation: self.generation,
            track_id,
            comment_id,
            liked,
            credential,
        })
    }

    /// Mutates the matching comment in both lists after a successful call.
    ///
    /// Optimistic: the server's code 200 is taken at face value and there is
    /// no rollback path.
    pub fn apply_like(
        &mut self,
        request: &LikeRequest,
        result: Result<(), ApiError>,
    ) -> Result<bool, EngineError> {
        result.map_err(|e| {
            warn!(cid = request.comment_id, error = %e, "comment_like_failed");
            EngineError::from(e)
        })?;
        if request.generation != self.generation {
            return Ok(false);
        }

        let mut changed = false;
        for comment in self
            .thread
            .hot_comments
            .iter_mut()
            .chain(self.thread.comments.iter_mut())
            .filter(|c| c.id == request.comment_id)
        {
            changed |= comment.apply_like(request.liked);
        }
        Ok(changed)
    }

    pub async fn like(&mut self, comment_id: CommentId, liked: bool) -> Result<bool, EngineError> {
        let request = self.begin_like(comment_id, liked)?;
        let result = self
            .api
            .like_comment(request.track_id, comment_id, liked, &request.credential)
            .await;
        self.apply_like(&request, result)
    }

    pub fn thread(&self) -> &CommentThread {
        &self.thread
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight
    }

    pub fn api(&self) -> Arc<dyn MusicApi> {
        self.api.clone()
    }
}
