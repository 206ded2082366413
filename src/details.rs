//! Duration and view statistics for enumerated videos, fetched in batches.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::api::{VideoItem, YouTubeApi};
use crate::config::FetchLimits;
use crate::error::AnalysisResult;
use crate::models::{VideoDetail, VideoStub};
use crate::pacing::PacingPolicy;
use crate::progress::ProgressSink;

/// Most ids the videos endpoint accepts in one call.
pub const DETAILS_BATCH_SIZE: usize = 50;

const PROGRESS_START: usize = 30;
const PROGRESS_SPAN: usize = 40;

const SECONDS_PER_WEEK: u64 = 7 * 86_400;
const SECONDS_PER_DAY: u64 = 86_400;

/// Fetches details for `stubs` in chunks of `limits.batch_size`.
///
/// Results are concatenated in chunk order. Records for ids that were not
/// asked for, or that already appeared, are dropped.
pub async fn fetch_video_details(
    api: &dyn YouTubeApi,
    stubs: &[VideoStub],
    limits: &FetchLimits,
    policy: &PacingPolicy,
    progress: &mut dyn ProgressSink,
) -> AnalysisResult<Vec<VideoDetail>> {
    let batch_size = limits.clamped().batch_size;
    let total = stubs.len();
    let mut details = Vec::with_capacity(total);
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let batches = total.div_ceil(batch_size);

    for (index, chunk) in stubs.chunks(batch_size).enumerate() {
        let ids: Vec<String> = chunk.iter().map(|stub| stub.video_id.clone()).collect();
        let items = policy.run("videos", || api.video_details(&ids)).await?;

        let requested: HashSet<&str> = ids.iter().map(String::as_str).collect();
        for item in items {
            if !requested.contains(item.video_id.as_str()) {
                warn!(video_id = %item.video_id, "details returned for an id that was not requested");
                continue;
            }
            if !seen.insert(item.video_id.clone()) {
                continue;
            }
            details.push(into_detail(item));
        }

        let done = (index * batch_size + chunk.len()).min(total);
        let percent = PROGRESS_START + done * PROGRESS_SPAN / total;
        progress.report(
            percent as u8,
            &format!("Analyzing details: {done}/{total}"),
        );

        if index + 1 < batches {
            policy.pause().await;
        }
    }

    debug!(requested = total, received = details.len(), "details fetched");
    Ok(details)
}

fn into_detail(item: VideoItem) -> VideoDetail {
    let duration_seconds = match item.duration.as_deref() {
        Some(raw) => parse_duration(raw),
        None => 0,
    };
    VideoDetail {
        video_id: item.video_id,
        title: item.title,
        duration_seconds,
        view_count: item.view_count,
    }
}

/// Lenient ISO-8601 duration parser: anything malformed counts as zero.
pub fn parse_duration(value: &str) -> u64 {
    try_parse_duration(value).unwrap_or_else(|| {
        warn!(duration = value, "malformed duration, treating as 0s");
        0
    })
}

/// Parses `PnWnDTnHnMnS` style durations into seconds.
///
/// Every component is optional, but present ones must appear in order and
/// carry whole numbers. `PT` alone is zero.
pub fn try_parse_duration(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (rest, None),
    };
    let mut total = sum_components(date, &[('W', SECONDS_PER_WEEK), ('D', SECONDS_PER_DAY)])?;
    if let Some(time) = time {
        let seconds = sum_components(time, &[('H', 3_600), ('M', 60), ('S', 1)])?;
        total = total.checked_add(seconds)?;
    }
    Some(total)
}

fn sum_components(part: &str, units: &[(char, u64)]) -> Option<u64> {
    let mut total: u64 = 0;
    let mut digits_start = None;
    let mut next_unit = 0;

    for (offset, ch) in part.char_indices() {
        if ch.is_ascii_digit() {
            digits_start.get_or_insert(offset);
            continue;
        }
        let start = digits_start.take()?;
        let position = units[next_unit..].iter().position(|(unit, _)| *unit == ch)? + next_unit;
        let amount: u64 = part[start..offset].parse().ok()?;
        total = total.checked_add(amount.checked_mul(units[position].1)?)?;
        next_unit = position + 1;
    }

    if digits_start.is_some() {
        return None;
    }
    Some(total)
}
