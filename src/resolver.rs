use tracing::debug;

use crate::api::YouTubeApi;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{ChannelHandle, ChannelId};

/// Pulls the handle out of URLs such as `https://www.youtube.com/@name/shorts`.
///
/// A handle runs from an `@` up to the next `/`, `?` or `#`. Empty candidates
/// (`/@/`) are skipped in favour of a later `@`.
pub fn extract_handle(url: &str) -> Option<ChannelHandle> {
    url.trim().split('@').skip(1).find_map(|after_marker| {
        let end = after_marker
            .find(['/', '?', '#'])
            .unwrap_or(after_marker.len());
        let handle = after_marker[..end].trim();
        (!handle.is_empty()).then(|| ChannelHandle::new(handle))
    })
}

/// Looks the handle up directly and falls back to a channel search when the
/// service does not know it as a handle (older custom URLs).
pub async fn resolve_channel_id(
    api: &dyn YouTubeApi,
    handle: &ChannelHandle,
) -> AnalysisResult<ChannelId> {
    let direct = api.channel_ids_for_handle(handle.as_str()).await?;
    if let Some(id) = direct.into_iter().next() {
        debug!(%handle, %id, "resolved by handle");
        return Ok(id);
    }

    debug!(%handle, "handle lookup empty, searching");
    let matches = api.search_channels(handle.as_str()).await?;
    matches
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::ChannelNotFound(handle.to_string()))
}
