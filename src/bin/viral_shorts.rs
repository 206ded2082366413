#![forbid(unsafe_code)]

//! Command-line front end: analyses one channel, prints its viral shorts and
//! writes the shareable URL list.

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use std::env;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use viral_shorts_tools::api::HttpYouTubeApi;
use viral_shorts_tools::config::{
    API_KEY_VAR, DEFAULT_ENV_PATH, SettingsOverrides, resolve_settings, upsert_env_value,
};
use viral_shorts_tools::export::{
    DEFAULT_EXPORT_FILE, ExportOptions, format_count, render_shorts_list, shorts_url,
    write_shorts_list,
};
use viral_shorts_tools::models::AnalysisReport;
use viral_shorts_tools::pipeline::analyze_channel;
use viral_shorts_tools::progress::{ConsoleProgress, Fanout, ProgressWriter};
use viral_shorts_tools::security::{ensure_api_key, redact_api_key};

const USAGE: &str = "Usage: viral_shorts [--env-file <path>] [--api-key <key>] [--save-key] [--output <path>] [--no-export]\n                    [--progress-file <path>] [--max-videos <n>] [--min-views <n>] [--max-duration <secs>]\n                    [--delay-ms <ms>] <channel_url>";

#[derive(Debug, Clone)]
struct CliArgs {
    channel_url: String,
    overrides: SettingsOverrides,
    output: PathBuf,
    progress_file: Option<PathBuf>,
    export: bool,
    save_key: bool,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        Self::from_iter(env::args().skip(1))
    }

    #[cfg(test)]
    fn from_slice(values: &[&str]) -> Result<Self> {
        Self::from_iter(values.iter().map(|value| value.to_string()))
    }

    fn from_iter<I>(iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut overrides = SettingsOverrides::default();
        let mut channel_url: Option<String> = None;
        let mut output: Option<PathBuf> = None;
        let mut progress_file: Option<PathBuf> = None;
        let mut export = true;
        let mut save_key = false;
        let mut args = iter.into_iter();

        while let Some(arg) = args.next() {
            if arg == "--" {
                for value in args {
                    Self::set_channel(&mut channel_url, value)?;
                }
                break;
            }

            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
                _ => (arg.clone(), None),
            };

            match flag.as_str() {
                "--no-export" => export = false,
                "--save-key" => save_key = true,
                "--help" | "-h" => bail!("{USAGE}"),
                "--env-file" | "--api-key" | "--output" | "--progress-file" | "--max-videos"
                | "--min-views" | "--max-duration" | "--delay-ms" => {
                    let value = match inline {
                        Some(value) => value,
                        None => args
                            .next()
                            .ok_or_else(|| anyhow!("{flag} requires a value"))?,
                    };
                    match flag.as_str() {
                        "--env-file" => overrides.env_path = Some(PathBuf::from(value)),
                        "--api-key" => overrides.api_key = Some(value),
                        "--output" => output = Some(PathBuf::from(value)),
                        "--progress-file" => progress_file = Some(PathBuf::from(value)),
                        "--max-videos" => {
                            overrides.max_videos = Some(Self::parse_number(&flag, &value)?)
                        }
                        "--min-views" => {
                            overrides.min_views = Some(Self::parse_number(&flag, &value)?)
                        }
                        "--max-duration" => {
                            overrides.max_duration_secs = Some(Self::parse_number(&flag, &value)?)
                        }
                        _ => overrides.delay_ms = Some(Self::parse_number(&flag, &value)?),
                    }
                }
                _ if arg.starts_with('-') => {
                    bail!("unknown argument: {arg}");
                }
                _ => {
                    Self::set_channel(&mut channel_url, arg)?;
                }
            }
        }

        let Some(channel_url) = channel_url else {
            bail!("{USAGE}");
        };

        Ok(Self {
            channel_url,
            overrides,
            output: output.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE)),
            progress_file,
            export,
            save_key,
        })
    }

    fn set_channel(target: &mut Option<String>, value: String) -> Result<()> {
        if target.is_some() {
            bail!("channel URL specified multiple times");
        }
        *target = Some(value);
        Ok(())
    }

    fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
        value
            .trim()
            .parse()
            .map_err(|_| anyhow!("{flag} expects a whole number, got {value:?}"))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Human readable summary printed once the run finished.
fn render_report(report: &AnalysisReport, host: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Channel: {}", report.channel.title);
    let _ = writeln!(
        out,
        "Subscribers: {}",
        format_count(report.channel.subscriber_count)
    );
    let _ = writeln!(
        out,
        "Total videos: {}",
        format_count(report.channel.video_count)
    );
    let _ = writeln!(out, "Videos analyzed: {}", report.videos_analyzed);
    let _ = writeln!(out, "Viral shorts: {}", report.shorts.len());
    let _ = writeln!(out);

    if report.shorts.is_empty() {
        let _ = writeln!(out, "No viral shorts found.");
        return out;
    }

    for (index, short) in report.shorts.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. [{} views] {}",
            index + 1,
            format_count(short.view_count),
            short.title
        );
        let _ = writeln!(out, "   {}", shorts_url(host, &short.video_id));
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let CliArgs {
        channel_url,
        overrides,
        output,
        progress_file,
        export,
        save_key,
    } = CliArgs::parse()?;

    let env_path = overrides
        .env_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_PATH));
    let settings = resolve_settings(overrides).context("loading configuration")?;
    ensure_api_key(&settings.api_key)?;

    if save_key {
        upsert_env_value(&env_path, API_KEY_VAR, &settings.api_key)
            .with_context(|| format!("saving API key to {}", env_path.display()))?;
        println!("Saved {API_KEY_VAR} to {}", env_path.display());
    }

    println!("===================================");
    println!("YouTube Viral Shorts Finder");
    println!("===================================");
    println!("Channel: {channel_url}");
    println!(
        "Criteria: <= {}s, >= {} views",
        settings.criteria.max_duration_secs,
        format_count(settings.criteria.min_views)
    );
    println!("Max videos: {}", settings.limits.max_videos);
    println!();

    let api = HttpYouTubeApi::from_settings(&settings);
    let mut progress = Fanout::new().with(ConsoleProgress);
    if let Some(path) = progress_file {
        progress = progress.with(ProgressWriter::new(path));
    }

    let started = Instant::now();
    let report = analyze_channel(&api, &settings, &channel_url, &mut progress)
        .await
        .map_err(|failure| anyhow!(redact_api_key(&failure.to_string(), &settings.api_key)))?;
    let elapsed = started.elapsed().as_secs();

    println!();
    print!("{}", render_report(&report, &settings.shorts_host));
    println!();
    println!("Finished in {elapsed}s");

    if export && !report.shorts.is_empty() {
        let options = ExportOptions {
            host: settings.shorts_host.clone(),
            min_views: settings.criteria.min_views,
        };
        let contents =
            render_shorts_list(&report.shorts, &report.channel.title, Utc::now(), &options);
        write_shorts_list(&output, &contents)?;
        println!("URL list written to {}", output.display());
    }

    Ok(())
}
