//! In-memory stand-in for the Data API used by the unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::{VideoItem, VideoPage, YouTubeApi};
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{ChannelId, ChannelMetadata};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Handle(String),
    Search(String),
    Channel(String),
    Page(Option<String>),
    Details(Vec<String>),
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub handles: HashMap<String, Vec<ChannelId>>,
    pub searches: HashMap<String, Vec<ChannelId>>,
    pub channels: HashMap<String, ChannelMetadata>,
    /// Page `n` answers the token `page-n`; page 0 answers the first request.
    pub pages: Vec<AnalysisResult<VideoPage>>,
    pub videos: HashMap<String, VideoItem>,
    /// Fails the n-th details request (0-based) with the given error.
    pub details_failure: Option<(usize, AnalysisError)>,
    pub calls: Mutex<Vec<Call>>,
}

pub(crate) fn page_token(index: usize) -> String {
    format!("page-{index}")
}

impl FakeApi {
    /// `pages` pages of `per_page` unique ids each, linked by tokens.
    pub fn with_pages(pages: usize, per_page: usize) -> Self {
        let pages = (0..pages)
            .map(|page| {
                Ok(VideoPage {
                    video_ids: (0..per_page).map(|i| format!("v{page:02}-{i:02}")).collect(),
                    next_page_token: (page + 1 < pages).then(|| page_token(page + 1)),
                })
            })
            .collect();
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn add_video(&mut self, id: &str, duration: &str, views: u64) {
        self.videos.insert(
            id.to_string(),
            VideoItem {
                video_id: id.to_string(),
                title: format!("title {id}"),
                duration: Some(duration.to_string()),
                view_count: views,
            },
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn detail_batches(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Details(ids) => Some(ids.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl YouTubeApi for FakeApi {
    async fn channel_ids_for_handle(&self, handle: &str) -> AnalysisResult<Vec<ChannelId>> {
        self.calls.lock().push(Call::Handle(handle.to_string()));
        Ok(self.handles.get(handle).cloned().unwrap_or_default())
    }

    async fn search_channels(&self, query: &str) -> AnalysisResult<Vec<ChannelId>> {
        self.calls.lock().push(Call::Search(query.to_string()));
        Ok(self.searches.get(query).cloned().unwrap_or_default())
    }

    async fn channel_details(&self, id: &ChannelId) -> AnalysisResult<Option<ChannelMetadata>> {
        self.calls.lock().push(Call::Channel(id.to_string()));
        Ok(self.channels.get(id.as_str()).cloned())
    }

    async fn search_channel_videos(
        &self,
        _id: &ChannelId,
        _page_size: u32,
        page_token: Option<&str>,
    ) -> AnalysisResult<VideoPage> {
        self.calls
            .lock()
            .push(Call::Page(page_token.map(str::to_string)));
        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| AnalysisError::ApiError(format!("bad page token {token}")))?,
        };
        self.pages
            .get(index)
            .cloned()
            .unwrap_or_else(|| Ok(VideoPage::default()))
    }

    async fn video_details(&self, ids: &[String]) -> AnalysisResult<Vec<VideoItem>> {
        let batch = {
            let mut calls = self.calls.lock();
            calls.push(Call::Details(ids.to_vec()));
            calls
                .iter()
                .filter(|call| matches!(call, Call::Details(_)))
                .count()
                - 1
        };
        if let Some((failing, err)) = &self.details_failure
            && *failing == batch
        {
            return Err(err.clone());
        }
        Ok(ids
            .iter()
            .map(|id| {
                self.videos.get(id).cloned().unwrap_or_else(|| VideoItem {
                    video_id: id.clone(),
                    title: format!("title {id}"),
                    duration: Some("PT30S".to_string()),
                    view_count: 0,
                })
            })
            .collect())
    }
}
