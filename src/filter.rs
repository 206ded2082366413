use std::cmp::Reverse;

use crate::models::{VideoDetail, ViralShort};

/// Default view cutoff for the viral list.
pub const VIRAL_MIN_VIEWS: u64 = 1_000_000;
/// Longest video still counted as a short.
pub const SHORT_MAX_SECONDS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViralCriteria {
    pub min_views: u64,
    pub max_duration_secs: u64,
}

impl Default for ViralCriteria {
    fn default() -> Self {
        Self {
            min_views: VIRAL_MIN_VIEWS,
            max_duration_secs: SHORT_MAX_SECONDS,
        }
    }
}

impl ViralCriteria {
    pub fn matches(&self, detail: &VideoDetail) -> bool {
        detail.duration_seconds <= self.max_duration_secs && detail.view_count >= self.min_views
    }
}

/// Keeps the shorts that crossed the view threshold, most viewed first.
/// Equal view counts keep their input order.
pub fn filter_viral_shorts(
    details: impl IntoIterator<Item = VideoDetail>,
    criteria: &ViralCriteria,
) -> Vec<ViralShort> {
    let mut shorts: Vec<ViralShort> = details
        .into_iter()
        .filter(|detail| criteria.matches(detail))
        .map(ViralShort::new)
        .collect();
    shorts.sort_by_key(|short| Reverse(short.view_count));
    shorts
}

pub fn filter_viral_shorts_default(
    details: impl IntoIterator<Item = VideoDetail>,
) -> Vec<ViralShort> {
    filter_viral_shorts(details, &ViralCriteria::default())
}
