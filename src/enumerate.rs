//! Walks a channel's uploads, most viewed first, through the search endpoint.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::api::YouTubeApi;
use crate::config::FetchLimits;
use crate::error::AnalysisResult;
use crate::models::{ChannelId, VideoStub};
use crate::pacing::PacingPolicy;
use crate::progress::ProgressSink;

/// Upper bound on uploads inspected per run.
pub const MAX_ENUMERATED_VIDEOS: usize = 200;
/// Largest `maxResults` the search endpoint honours.
pub const SEARCH_PAGE_SIZE: u32 = 50;

/// Share of the overall progress bar owned by enumeration.
const PROGRESS_SPAN: usize = 30;

/// Collects up to `limits.max_videos` stubs, keeping the service's order.
///
/// Stops when the service has no further page, when a page comes back empty,
/// or once the cap is reached. Errors from any page abort the walk.
pub async fn enumerate_videos(
    api: &dyn YouTubeApi,
    channel_id: &ChannelId,
    limits: &FetchLimits,
    policy: &PacingPolicy,
    progress: &mut dyn ProgressSink,
) -> AnalysisResult<Vec<VideoStub>> {
    let limits = limits.clamped();
    let cap = limits.max_videos;
    let mut stubs: Vec<VideoStub> = Vec::new();
    let mut seen = HashSet::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    progress.report(0, "Fetching video list...");

    while stubs.len() < cap {
        let token = page_token.take();
        let page = policy
            .run("search", || {
                api.search_channel_videos(channel_id, limits.page_size, token.as_deref())
            })
            .await?;
        pages += 1;

        if page.video_ids.is_empty() {
            debug!(%channel_id, pages, "empty page, stopping");
            break;
        }

        for video_id in page.video_ids {
            if stubs.len() >= cap {
                break;
            }
            if seen.insert(video_id.clone()) {
                stubs.push(VideoStub { video_id });
            }
        }

        let percent = (stubs.len() * PROGRESS_SPAN / cap).min(PROGRESS_SPAN) as u8;
        progress.report(percent, &format!("Videos fetched: {}", stubs.len()));

        match page.next_page_token {
            Some(next) if stubs.len() < cap => page_token = Some(next),
            _ => break,
        }
        policy.pause().await;
    }

    info!(%channel_id, pages, videos = stubs.len(), "enumeration finished");
    Ok(stubs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::VideoPage;
    use crate::error::AnalysisError;
    use crate::progress::{Callback, NoProgress};
    use crate::testing::{Call, FakeApi, page_token};

    fn channel() -> ChannelId {
        ChannelId::new("UC_test")
    }

    async fn enumerate(api: &FakeApi, limits: FetchLimits) -> AnalysisResult<Vec<VideoStub>> {
        enumerate_videos(
            api,
            &channel(),
            &limits,
            &PacingPolicy::immediate(),
            &mut NoProgress,
        )
        .await
    }

    #[tokio::test]
    async fn stops_at_cap_even_when_more_pages_exist() {
        let api = FakeApi::with_pages(10, 50);
        let stubs = enumerate(&api, FetchLimits::default()).await.unwrap();
        assert_eq!(stubs.len(), 200);
        assert_eq!(
            api.calls()
                .iter()
                .filter(|call| matches!(call, Call::Page(_)))
                .count(),
            4
        );
        assert_eq!(stubs[0].video_id, "v00-00");
        assert_eq!(stubs[199].video_id, "v03-49");
    }

    #[tokio::test]
    async fn configured_cap_above_limit_still_stops_at_200() {
        let api = FakeApi::with_pages(10, 50);
        let limits = FetchLimits {
            max_videos: 500,
            ..FetchLimits::default()
        };
        let stubs = enumerate(&api, limits).await.unwrap();
        assert_eq!(stubs.len(), MAX_ENUMERATED_VIDEOS);
        assert_eq!(api.calls().len(), 4);
    }

    #[tokio::test]
    async fn truncates_last_page_to_cap() {
        let api = FakeApi::with_pages(3, 50);
        let limits = FetchLimits {
            max_videos: 70,
            ..FetchLimits::default()
        };
        let stubs = enumerate(&api, limits).await.unwrap();
        assert_eq!(stubs.len(), 70);
        assert_eq!(stubs.last().unwrap().video_id, "v01-19");
    }

    #[tokio::test]
    async fn follows_tokens_until_last_page() {
        let api = FakeApi::with_pages(3, 10);
        let stubs = enumerate(&api, FetchLimits::default()).await.unwrap();
        assert_eq!(stubs.len(), 30);
        assert_eq!(
            api.calls(),
            vec![
                Call::Page(None),
                Call::Page(Some(page_token(1))),
                Call::Page(Some(page_token(2))),
            ]
        );
    }

    #[tokio::test]
    async fn empty_page_ends_without_error() {
        let mut api = FakeApi::with_pages(3, 5);
        api.pages[1] = Ok(VideoPage {
            video_ids: Vec::new(),
            next_page_token: Some(page_token(2)),
        });
        let stubs = enumerate(&api, FetchLimits::default()).await.unwrap();
        assert_eq!(stubs.len(), 5);
    }

    #[tokio::test]
    async fn api_error_on_any_page_aborts() {
        let mut api = FakeApi::with_pages(3, 5);
        api.pages[2] = Err(AnalysisError::ApiError("quotaExceeded".into()));
        let err = enumerate(&api, FetchLimits::default()).await.unwrap_err();
        assert_eq!(err, AnalysisError::ApiError("quotaExceeded".into()));
    }

    #[tokio::test]
    async fn duplicate_ids_across_pages_are_collected_once() {
        let mut api = FakeApi::with_pages(2, 3);
        api.pages[1] = Ok(VideoPage {
            video_ids: vec!["v00-02".into(), "fresh".into()],
            next_page_token: None,
        });
        let stubs = enumerate(&api, FetchLimits::default()).await.unwrap();
        let ids: Vec<_> = stubs.iter().map(|s| s.video_id.as_str()).collect();
        assert_eq!(ids, vec!["v00-00", "v00-01", "v00-02", "fresh"]);
    }

    #[tokio::test]
    async fn zero_cap_makes_no_requests() {
        let api = FakeApi::with_pages(2, 5);
        let limits = FetchLimits {
            max_videos: 0,
            ..FetchLimits::default()
        };
        assert!(enumerate(&api, limits).await.unwrap().is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn progress_grows_to_thirty_percent() {
        let api = FakeApi::with_pages(10, 50);
        let mut reports = Vec::new();
        let mut sink = Callback(|p: u8, s: &str| reports.push((p, s.to_string())));
        enumerate_videos(
            &api,
            &channel(),
            &FetchLimits::default(),
            &PacingPolicy::immediate(),
            &mut sink,
        )
        .await
        .unwrap();
        let percents: Vec<u8> = reports.iter().map(|(p, _)| *p).collect();
        assert_eq!(percents, vec![0, 7, 15, 22, 30]);
        assert_eq!(reports.last().unwrap().1, "Videos fetched: 200");
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_between_pages() {
        let api = FakeApi::with_pages(3, 10);
        let start = tokio::time::Instant::now();
        enumerate_videos(
            &api,
            &channel(),
            &FetchLimits::default(),
            &PacingPolicy::default(),
            &mut NoProgress,
        )
        .await
        .unwrap();
        assert!(start.elapsed() >= std::time::Duration::from_millis(200));
    }
}
