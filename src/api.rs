//! Boundary to the YouTube Data API v3.
//!
//! [`YouTubeApi`] is the seam the pipeline talks to; [`HttpYouTubeApi`] is the
//! real implementation. Responses are decoded from JSON into the small subset
//! of fields the analysis needs.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::AnalyzerSettings;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{ChannelId, ChannelMetadata};
use crate::security::redact_api_key;

const USER_AGENT: &str = concat!("viral-shorts-tools/", env!("CARGO_PKG_VERSION"));

/// One page of a channel's uploads, most viewed first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoPage {
    pub video_ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Video record as the service returns it, before durations are parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoItem {
    pub video_id: String,
    pub title: String,
    pub duration: Option<String>,
    pub view_count: u64,
}

#[async_trait]
pub trait YouTubeApi: Send + Sync {
    /// `channels?forHandle=`; empty when the handle is unknown.
    async fn channel_ids_for_handle(&self, handle: &str) -> AnalysisResult<Vec<ChannelId>>;

    /// `search?type=channel&q=`, in relevance order.
    async fn search_channels(&self, query: &str) -> AnalysisResult<Vec<ChannelId>>;

    async fn channel_details(&self, id: &ChannelId) -> AnalysisResult<Option<ChannelMetadata>>;

    async fn search_channel_videos(
        &self,
        id: &ChannelId,
        page_size: u32,
        page_token: Option<&str>,
    ) -> AnalysisResult<VideoPage>;

    /// `videos?id=a,b,c`; at most 50 ids per call.
    async fn video_details(&self, ids: &[String]) -> AnalysisResult<Vec<VideoItem>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelIdItem {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelSearchItem {
    #[serde(default)]
    id: SearchResultId,
    #[serde(default)]
    snippet: SearchSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultId {
    channel_id: Option<String>,
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoSearchItem {
    #[serde(default)]
    id: SearchResultId,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    snippet: TitleSnippet,
    #[serde(default)]
    statistics: ChannelStatistics,
}

#[derive(Debug, Deserialize)]
struct TitleSnippet {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    subscriber_count: Option<Count>,
    video_count: Option<Count>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    snippet: TitleSnippet,
    #[serde(default)]
    content_details: ContentDetails,
    #[serde(default)]
    statistics: VideoStatistics,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<Count>,
}

/// Counters arrive as decimal strings (`"1234"`), occasionally as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Text(String),
    Number(u64),
}

impl Count {
    fn value(&self) -> u64 {
        match self {
            Count::Text(text) => text.trim().parse().unwrap_or(0),
            Count::Number(number) => *number,
        }
    }
}

fn count_or_zero(count: Option<&Count>) -> u64 {
    count.map(Count::value).unwrap_or(0)
}

/// Turns a response body into `T`, surfacing the service's `error` object as
/// [`AnalysisError::ApiError`].
pub(crate) fn decode_response<T: DeserializeOwned>(body: Value) -> AnalysisResult<T> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| error.as_str().map(str::to_string))
            .unwrap_or_else(|| error.to_string());
        return Err(AnalysisError::ApiError(message));
    }
    serde_json::from_value(body).map_err(|err| AnalysisError::InvalidResponse(err.to_string()))
}

fn channel_ids_from(body: Value) -> AnalysisResult<Vec<ChannelId>> {
    let list: ListResponse<ChannelIdItem> = decode_response(body)?;
    Ok(list.items.into_iter().map(|item| ChannelId::new(item.id)).collect())
}

fn search_channels_from(body: Value) -> AnalysisResult<Vec<ChannelId>> {
    let list: ListResponse<ChannelSearchItem> = decode_response(body)?;
    Ok(list
        .items
        .into_iter()
        .filter_map(|item| item.snippet.channel_id.or(item.id.channel_id))
        .map(ChannelId::new)
        .collect())
}

fn channel_metadata_from(body: Value) -> AnalysisResult<Option<ChannelMetadata>> {
    let list: ListResponse<ChannelItem> = decode_response(body)?;
    Ok(list.items.into_iter().next().map(|item| ChannelMetadata {
        title: item.snippet.title,
        subscriber_count: count_or_zero(item.statistics.subscriber_count.as_ref()),
        video_count: count_or_zero(item.statistics.video_count.as_ref()),
    }))
}

fn video_page_from(body: Value) -> AnalysisResult<VideoPage> {
    let list: ListResponse<VideoSearchItem> = decode_response(body)?;
    Ok(VideoPage {
        video_ids: list
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .collect(),
        next_page_token: list.next_page_token.filter(|token| !token.is_empty()),
    })
}

fn video_items_from(body: Value) -> AnalysisResult<Vec<VideoItem>> {
    let list: ListResponse<VideoResource> = decode_response(body)?;
    Ok(list
        .items
        .into_iter()
        .map(|item| VideoItem {
            video_id: item.id,
            title: item.snippet.title,
            duration: item.content_details.duration,
            view_count: count_or_zero(item.statistics.view_count.as_ref()),
        })
        .collect())
}

/// Blocking `ureq` client driven from the async pipeline through Tokio's
/// blocking pool.
#[derive(Clone)]
pub struct HttpYouTubeApi {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl HttpYouTubeApi {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_settings(settings: &AnalyzerSettings) -> Self {
        Self::new(
            &settings.api_base,
            &settings.api_key,
            settings.request_timeout,
        )
    }

    async fn get(&self, endpoint: &str, params: Vec<(&'static str, String)>) -> AnalysisResult<Value> {
        let url = format!("{}/{endpoint}", self.base_url);
        let agent = self.agent.clone();
        let api_key = self.api_key.clone();
        debug!(%endpoint, ?params, "GET");
        tokio::task::spawn_blocking(move || fetch_json(&agent, &url, &params, &api_key))
            .await
            .map_err(|err| AnalysisError::NetworkFailure(format!("request task failed: {err}")))?
    }
}

fn fetch_json(
    agent: &ureq::Agent,
    url: &str,
    params: &[(&'static str, String)],
    api_key: &str,
) -> AnalysisResult<Value> {
    let mut request = agent.get(url);
    for (name, value) in params {
        request = request.query(name, value);
    }
    request = request.query("key", api_key);

    match request.call() {
        Ok(response) => response
            .into_json::<Value>()
            .map_err(|err| AnalysisError::InvalidResponse(redact_api_key(&err.to_string(), api_key))),
        Err(ureq::Error::Status(code, response)) => match response.into_json::<Value>() {
            // The service explains 4xx/5xx in an `error` object; let the
            // decoder surface that message.
            Ok(body) if body.get("error").is_some() => Ok(body),
            _ => Err(AnalysisError::ApiError(format!("HTTP status {code}"))),
        },
        Err(ureq::Error::Transport(transport)) => Err(AnalysisError::NetworkFailure(
            redact_api_key(&transport.to_string(), api_key),
        )),
    }
}

#[async_trait]
impl YouTubeApi for HttpYouTubeApi {
    async fn channel_ids_for_handle(&self, handle: &str) -> AnalysisResult<Vec<ChannelId>> {
        let body = self
            .get(
                "channels",
                vec![("part", "id".to_string()), ("forHandle", handle.to_string())],
            )
            .await?;
        channel_ids_from(body)
    }

    async fn search_channels(&self, query: &str) -> AnalysisResult<Vec<ChannelId>> {
        let body = self
            .get(
                "search",
                vec![
                    ("part", "snippet".to_string()),
                    ("type", "channel".to_string()),
                    ("q", query.to_string()),
                ],
            )
            .await?;
        search_channels_from(body)
    }

    async fn channel_details(&self, id: &ChannelId) -> AnalysisResult<Option<ChannelMetadata>> {
        let body = self
            .get(
                "channels",
                vec![
                    ("part", "snippet,statistics".to_string()),
                    ("id", id.to_string()),
                ],
            )
            .await?;
        channel_metadata_from(body)
    }

    async fn search_channel_videos(
        &self,
        id: &ChannelId,
        page_size: u32,
        page_token: Option<&str>,
    ) -> AnalysisResult<VideoPage> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("channelId", id.to_string()),
            ("type", "video".to_string()),
            ("maxResults", page_size.to_string()),
            ("order", "viewCount".to_string()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        let body = self.get("search", params).await?;
        video_page_from(body)
    }

    async fn video_details(&self, ids: &[String]) -> AnalysisResult<Vec<VideoItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = self
            .get(
                "videos",
                vec![
                    ("part", "snippet,statistics,contentDetails".to_string()),
                    ("id", ids.join(",")),
                ],
            )
            .await?;
        video_items_from(body)
    }
}
