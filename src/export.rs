//! Plain-text export of a finished run plus the small formatting helpers the
//! CLI prints with.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::config::DEFAULT_SHORTS_HOST;
use crate::filter::VIRAL_MIN_VIEWS;
use crate::models::ViralShort;

pub const DEFAULT_EXPORT_FILE: &str = "youtube.txt";

/// Header and URL settings for [`render_shorts_list`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub host: String,
    pub min_views: u64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_SHORTS_HOST.to_string(),
            min_views: VIRAL_MIN_VIEWS,
        }
    }
}

pub fn shorts_url(host: &str, video_id: &str) -> String {
    format!("https://{host}/shorts/{video_id}")
}

/// `2024-05-01T12-30-05`: ISO-8601 with `-` instead of `:` so the stamp is
/// safe inside file names.
pub fn export_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// Renders the comment header followed by one shorts URL per line.
pub fn render_shorts_list(
    shorts: &[ViralShort],
    channel_title: &str,
    generated_at: DateTime<Utc>,
    options: &ExportOptions,
) -> String {
    let threshold = threshold_label(options.min_views);
    let mut out = format!(
        "# Viral YouTube Shorts ({threshold}+ views)\n# Channel: {channel_title}\n# Generated: {}\n# Total: {} videos\n\n",
        export_timestamp(generated_at),
        shorts.len()
    );
    let urls: Vec<String> = shorts
        .iter()
        .map(|short| shorts_url(&options.host, &short.video_id))
        .collect();
    out.push_str(&urls.join("\n"));
    out
}

/// Writes the export next to a temporary file and renames it into place.
pub fn write_shorts_list(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("Creating {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents).with_context(|| format!("Writing {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("Finalizing {}", path.display()))?;
    Ok(())
}

/// Exact short form of a view threshold: `1M`, `1.5M`, `250K`, and the plain
/// number when no exact short form exists.
fn threshold_label(value: u64) -> String {
    if value >= 1_000_000 && value % 100_000 == 0 {
        short_form(value / 100_000, 'M')
    } else if (1_000..1_000_000).contains(&value) && value % 100 == 0 {
        short_form(value / 100, 'K')
    } else {
        value.to_string()
    }
}

fn short_form(tenths: u64, unit: char) -> String {
    match tenths % 10 {
        0 => format!("{}{unit}", tenths / 10),
        rest => format!("{}.{rest}{unit}", tenths / 10),
    }
}

/// Compact counter used for views and subscribers: `1.2M`, `3.4K`, `999`.
pub fn format_count(value: u64) -> String {
    if value >= 1_000_000 {
        format!("{:.1}M", value as f64 / 1_000_000.0)
    } else if value >= 1_000 {
        format!("{:.1}K", value as f64 / 1_000.0)
    } else {
        value.to_string()
    }
}
