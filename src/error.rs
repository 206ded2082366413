use thiserror::Error;

/// Failures a run can end with. The first one raised aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("invalid channel URL: {0} (expected https://www.youtube.com/@handle)")]
    InvalidUrl(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl AnalysisError {
    /// Transport failures are the only kind a pacing policy may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, AnalysisError::NetworkFailure(_))
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
