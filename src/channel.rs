use tracing::debug;

use crate::api::YouTubeApi;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{ChannelId, ChannelMetadata};

/// Title and counters of a resolved channel, fetched once per run.
pub async fn fetch_channel_metadata(
    api: &dyn YouTubeApi,
    id: &ChannelId,
) -> AnalysisResult<ChannelMetadata> {
    let metadata = api
        .channel_details(id)
        .await?
        .ok_or_else(|| AnalysisError::ChannelNotFound(id.to_string()))?;
    debug!(
        %id,
        title = %metadata.title,
        subscribers = metadata.subscriber_count,
        videos = metadata.video_count,
        "channel metadata"
    );
    Ok(metadata)
}
