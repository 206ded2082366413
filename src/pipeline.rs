//! Runs one channel analysis end to end.
//!
//! Stages execute strictly one after another:
//! `Idle → ResolvingChannel → FetchingMetadata → EnumeratingVideos →
//! FetchingDetails → Filtering → Done`. The first error moves the run to
//! `Failed` and is returned together with the stage it happened in.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::api::YouTubeApi;
use crate::channel::fetch_channel_metadata;
use crate::config::{AnalyzerSettings, FetchLimits};
use crate::details::fetch_video_details;
use crate::enumerate::enumerate_videos;
use crate::error::{AnalysisError, AnalysisResult};
use crate::filter::{ViralCriteria, filter_viral_shorts};
use crate::models::AnalysisReport;
use crate::pacing::PacingPolicy;
use crate::progress::{Monotonic, ProgressSink};
use crate::resolver::{extract_handle, resolve_channel_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ResolvingChannel,
    FetchingMetadata,
    EnumeratingVideos,
    FetchingDetails,
    Filtering,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::ResolvingChannel => "resolving channel",
            Stage::FetchingMetadata => "fetching channel metadata",
            Stage::EnumeratingVideos => "enumerating videos",
            Stage::FetchingDetails => "fetching video details",
            Stage::Filtering => "filtering",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error that ended a run and where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error} (while {stage})")]
pub struct RunFailure {
    pub stage: Stage,
    #[source]
    pub error: AnalysisError,
}

pub struct Analyzer<'a> {
    api: &'a dyn YouTubeApi,
    limits: FetchLimits,
    pacing: PacingPolicy,
    criteria: ViralCriteria,
    stage: Stage,
}

impl<'a> Analyzer<'a> {
    pub fn new(api: &'a dyn YouTubeApi) -> Self {
        Self {
            api,
            limits: FetchLimits::default(),
            pacing: PacingPolicy::default(),
            criteria: ViralCriteria::default(),
            stage: Stage::Idle,
        }
    }

    pub fn from_settings(api: &'a dyn YouTubeApi, settings: &AnalyzerSettings) -> Self {
        Self::new(api)
            .with_limits(settings.limits)
            .with_pacing(settings.pacing.clone())
            .with_criteria(settings.criteria)
    }

    pub fn with_limits(mut self, limits: FetchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_criteria(mut self, criteria: ViralCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Analyses the channel behind `url`. Every call starts a fresh run.
    pub async fn run(
        &mut self,
        url: &str,
        progress: &mut dyn ProgressSink,
    ) -> Result<AnalysisReport, RunFailure> {
        self.stage = Stage::Idle;
        let mut progress = Monotonic::new(progress);
        match self.run_stages(url, &mut progress).await {
            Ok(report) => {
                self.enter(Stage::Done);
                progress.report(100, "Analysis complete");
                Ok(report)
            }
            Err(error) => {
                let failure = RunFailure {
                    stage: self.stage,
                    error,
                };
                self.enter(Stage::Failed);
                Err(failure)
            }
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = %self.stage, to = %stage, "stage change");
        self.stage = stage;
    }

    async fn run_stages(
        &mut self,
        url: &str,
        progress: &mut dyn ProgressSink,
    ) -> AnalysisResult<AnalysisReport> {
        self.enter(Stage::ResolvingChannel);
        let handle = extract_handle(url)
            .ok_or_else(|| AnalysisError::InvalidUrl(url.trim().to_string()))?;
        progress.report(5, "Looking up channel...");
        let channel_id = resolve_channel_id(self.api, &handle).await?;

        self.enter(Stage::FetchingMetadata);
        progress.report(10, "Fetching channel information...");
        let channel = fetch_channel_metadata(self.api, &channel_id).await?;

        self.enter(Stage::EnumeratingVideos);
        let stubs = enumerate_videos(
            self.api,
            &channel_id,
            &self.limits,
            &self.pacing,
            progress,
        )
        .await?;

        self.enter(Stage::FetchingDetails);
        let details =
            fetch_video_details(self.api, &stubs, &self.limits, &self.pacing, progress).await?;

        self.enter(Stage::Filtering);
        progress.report(80, "Filtering viral shorts...");
        let shorts = filter_viral_shorts(details, &self.criteria);

        info!(
            %handle,
            %channel_id,
            analyzed = stubs.len(),
            viral = shorts.len(),
            "channel analysed"
        );
        Ok(AnalysisReport {
            handle,
            channel_id,
            channel,
            videos_analyzed: stubs.len(),
            shorts,
        })
    }
}

/// One-shot helper: builds an [`Analyzer`] from `settings` and runs it.
pub async fn analyze_channel(
    api: &dyn YouTubeApi,
    settings: &AnalyzerSettings,
    url: &str,
    progress: &mut dyn ProgressSink,
) -> Result<AnalysisReport, RunFailure> {
    Analyzer::from_settings(api, settings).run(url, progress).await
}
