#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::details::DETAILS_BATCH_SIZE;
use crate::enumerate::{MAX_ENUMERATED_VIDEOS, SEARCH_PAGE_SIZE};
use crate::filter::{SHORT_MAX_SECONDS, VIRAL_MIN_VIEWS, ViralCriteria};
use crate::pacing::{Backoff, DEFAULT_MAX_ATTEMPTS, PacingPolicy};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_SHORTS_HOST: &str = "www.youtube.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 100;
pub const API_KEY_VAR: &str = "YOUTUBE_API_KEY";

/// Page and batch sizes the Data API accepts at most.
const SERVICE_MAX_PAGE: usize = 50;

/// Caps applied while walking a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_videos: usize,
    pub page_size: u32,
    pub batch_size: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_videos: MAX_ENUMERATED_VIDEOS,
            page_size: SEARCH_PAGE_SIZE,
            batch_size: DETAILS_BATCH_SIZE,
        }
    }
}

impl FetchLimits {
    /// Keeps page and batch sizes inside what the service accepts. The video
    /// cap can be lowered but never raised above [`MAX_ENUMERATED_VIDEOS`].
    pub fn clamped(self) -> Self {
        Self {
            max_videos: self.max_videos.min(MAX_ENUMERATED_VIDEOS),
            page_size: self.page_size.clamp(1, SERVICE_MAX_PAGE as u32),
            batch_size: self.batch_size.clamp(1, SERVICE_MAX_PAGE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub api_key: String,
    pub api_base: String,
    pub shorts_host: String,
    pub request_timeout: Duration,
    pub pacing: PacingPolicy,
    pub limits: FetchLimits,
    pub criteria: ViralCriteria,
}

/// Values given on the command line; they win over env and `.env`.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub api_key: Option<String>,
    pub max_videos: Option<usize>,
    pub min_views: Option<u64>,
    pub max_duration_secs: Option<u64>,
    pub delay_ms: Option<u64>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_settings(overrides: SettingsOverrides) -> Result<AnalyzerSettings> {
    let env_path = overrides
        .env_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(&env_path)?;
    build_settings_with_overrides(&file_vars, env_var_string, overrides)
}

#[cfg(test)]
fn build_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<AnalyzerSettings> {
    build_settings_with_overrides(file_vars, env_lookup, SettingsOverrides::default())
}

fn build_settings_with_overrides(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: SettingsOverrides,
) -> Result<AnalyzerSettings> {
    let api_key = overrides
        .api_key
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| lookup_value(API_KEY_VAR, file_vars, &env_lookup))
        .ok_or_else(|| anyhow!("{API_KEY_VAR} not set"))?;
    let api_base = lookup_value("YOUTUBE_API_BASE", file_vars, &env_lookup)
        .map(|value| value.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let shorts_host = lookup_value("SHORTS_URL_HOST", file_vars, &env_lookup)
        .unwrap_or_else(|| DEFAULT_SHORTS_HOST.to_string());

    let request_timeout = Duration::from_secs(
        lookup_parsed("REQUEST_TIMEOUT_SECS", file_vars, &env_lookup)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
    );
    let delay_ms = overrides
        .delay_ms
        .or_else(|| lookup_parsed("REQUEST_DELAY_MS", file_vars, &env_lookup))
        .unwrap_or(DEFAULT_REQUEST_DELAY_MS);
    let max_attempts = lookup_parsed::<u32>("REQUEST_MAX_ATTEMPTS", file_vars, &env_lookup)
        .filter(|attempts| *attempts > 0)
        .unwrap_or(DEFAULT_MAX_ATTEMPTS);
    let pacing = PacingPolicy {
        delay: Duration::from_millis(delay_ms),
        backoff: if max_attempts > 1 {
            Backoff::Exponential {
                max: request_timeout,
            }
        } else {
            Backoff::Fixed
        },
        max_attempts,
    };

    let limits = FetchLimits {
        max_videos: overrides
            .max_videos
            .or_else(|| lookup_parsed("MAX_VIDEOS", file_vars, &env_lookup))
            .unwrap_or(MAX_ENUMERATED_VIDEOS),
        ..FetchLimits::default()
    }
    .clamped();
    let criteria = ViralCriteria {
        min_views: overrides
            .min_views
            .or_else(|| lookup_parsed("MIN_VIEWS", file_vars, &env_lookup))
            .unwrap_or(VIRAL_MIN_VIEWS),
        max_duration_secs: overrides
            .max_duration_secs
            .or_else(|| lookup_parsed("MAX_SHORT_SECONDS", file_vars, &env_lookup))
            .unwrap_or(SHORT_MAX_SECONDS),
    };

    Ok(AnalyzerSettings {
        api_key,
        api_base,
        shorts_host,
        request_timeout,
        pacing,
        limits,
        criteria,
    })
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key)
        .or_else(|| file_vars.get(key).cloned())
        .filter(|value| !value.trim().is_empty())
}

fn lookup_parsed<T: std::str::FromStr>(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<T> {
    lookup_value(key, file_vars, env_lookup).and_then(|value| value.trim().parse::<T>().ok())
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}

/// Updates or appends a single env var inside the target file while preserving
/// unrelated lines and comments. Used to remember the API key between runs.
pub fn upsert_env_value(path: &Path, key: &str, value: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("Creating {}", parent.display()))?;
    }

    let raw = fs::read_to_string(path).unwrap_or_default();
    let mut lines = Vec::new();
    let mut updated = false;
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");

    for line in raw.lines() {
        let trimmed = line.trim_start();
        let indent_len = line.len() - trimmed.len();
        let indent = &line[..indent_len];
        let (prefix, rest) = if let Some(stripped) = trimmed.strip_prefix("export ") {
            ("export ", stripped)
        } else {
            ("", trimmed)
        };
        let Some((candidate, _)) = rest.split_once('=') else {
            lines.push(line.to_string());
            continue;
        };
        if candidate.trim() == key {
            lines.push(format!("{indent}{prefix}{key}=\"{escaped}\""));
            updated = true;
        } else {
            lines.push(line.to_string());
        }
    }

    if !updated {
        lines.push(format!("{key}=\"{escaped}\""));
    }

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, lines.join("\n") + "\n")?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
