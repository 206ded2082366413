//! Records produced while analysing a channel.
//!
//! Everything here lives for the duration of one run and is handed to the
//! caller once filtering is done.

use std::fmt;
use std::ops::Deref;

use serde::Serialize;

/// Public `@name` of a channel as it appears in its URL, without the `@`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelHandle(String);

impl ChannelHandle {
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Opaque identifier the service assigns to a channel (`UC...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMetadata {
    pub title: String,
    pub subscriber_count: u64,
    pub video_count: u64,
}

/// Minimal entry collected while paging through a channel's uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStub {
    pub video_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    pub video_id: String,
    pub title: String,
    pub duration_seconds: u64,
    pub view_count: u64,
}

/// A [`VideoDetail`] that passed the viral filter. Only the filter builds
/// these, so holding one means the duration and view bounds were checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ViralShort(VideoDetail);

impl ViralShort {
    pub(crate) fn new(detail: VideoDetail) -> Self {
        Self(detail)
    }
}

impl Deref for ViralShort {
    type Target = VideoDetail;

    fn deref(&self) -> &VideoDetail {
        &self.0
    }
}

/// Everything a finished run hands to the presentation side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub handle: ChannelHandle,
    pub channel_id: ChannelId,
    pub channel: ChannelMetadata,
    pub videos_analyzed: usize,
    pub shorts: Vec<ViralShort>,
}
