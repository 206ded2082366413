//! Progress reporting for a run.
//!
//! The pipeline only ever talks to a [`ProgressSink`]; whoever renders the
//! progress (terminal, a JSON file polled by another process, a test) plugs in
//! behind it.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

pub trait ProgressSink {
    /// `percent` is in 0..=100; `status` is a short human readable line.
    fn report(&mut self, percent: u8, status: &str);
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn report(&mut self, percent: u8, status: &str) {
        (**self).report(percent, status);
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Box<S> {
    fn report(&mut self, percent: u8, status: &str) {
        (**self).report(percent, status);
    }
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8, _status: &str) {}
}

/// Prints `[ 42%] status` lines to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn report(&mut self, percent: u8, status: &str) {
        eprintln!("[{percent:>3}%] {status}");
    }
}

/// Adapts a closure into a sink.
pub struct Callback<F>(pub F);

impl<F: FnMut(u8, &str)> ProgressSink for Callback<F> {
    fn report(&mut self, percent: u8, status: &str) {
        (self.0)(percent, status);
    }
}

/// Forwards to several sinks in order.
#[derive(Default)]
pub struct Fanout<'a> {
    sinks: Vec<Box<dyn ProgressSink + 'a>>,
}

impl<'a> Fanout<'a> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with(mut self, sink: impl ProgressSink + 'a) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl ProgressSink for Fanout<'_> {
    fn report(&mut self, percent: u8, status: &str) {
        for sink in &mut self.sinks {
            sink.report(percent, status);
        }
    }
}

/// Clamps to 100 and never lets the percentage go backwards.
pub struct Monotonic<S> {
    inner: S,
    last: u8,
}

impl<S: ProgressSink> Monotonic<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, last: 0 }
    }

    pub fn last(&self) -> u8 {
        self.last
    }
}

impl<S: ProgressSink> ProgressSink for Monotonic<S> {
    fn report(&mut self, percent: u8, status: &str) {
        self.last = percent.min(100).max(self.last);
        self.inner.report(self.last, status);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressReport {
    progress: u8,
    message: String,
}

/// Writes the latest report as `{"progress":n,"message":"..."}` so another
/// process can poll it. The file is replaced atomically on every update.
#[derive(Clone)]
pub struct ProgressWriter {
    path: PathBuf,
}

impl ProgressWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn write(&self, progress: u8, message: &str) {
        let report = ProgressReport {
            progress: progress.min(100),
            message: message.to_string(),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(err) = fs::create_dir_all(parent)
        {
            warn!("could not create progress dir: {err}");
            return;
        }

        let tmp_path = self.path.with_extension("tmp");
        match serde_json::to_vec(&report) {
            Ok(payload) => {
                if let Err(err) = fs::write(&tmp_path, payload) {
                    warn!("could not write progress file: {err}");
                    return;
                }
                if let Err(err) = fs::rename(&tmp_path, &self.path) {
                    warn!("could not finalize progress file: {err}");
                }
            }
            Err(err) => {
                warn!("could not serialize progress report: {err}");
            }
        }
    }
}

impl ProgressSink for ProgressWriter {
    fn report(&mut self, percent: u8, status: &str) {
        self.write(percent, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn monotonic_never_decreases_and_clamps() {
        let mut seen = Vec::new();
        {
            let mut progress = Monotonic::new(Callback(|p: u8, _s: &str| seen.push(p)));
            progress.report(10, "a");
            progress.report(0, "b");
            progress.report(35, "c");
            progress.report(250, "d");
            assert_eq!(progress.last(), 100);
        }
        assert_eq!(seen, vec![10, 10, 35, 100]);
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let mut first = Vec::new();
        let mut second = Vec::new();
        {
            let mut fanout = Fanout::new()
                .with(Callback(|p: u8, s: &str| first.push((p, s.to_string()))))
                .with(Callback(|p: u8, _s: &str| second.push(p)));
            fanout.report(42, "half way");
        }
        assert_eq!(first, vec![(42, "half way".to_string())]);
        assert_eq!(second, vec![42]);
    }

    #[test]
    fn progress_writer_replaces_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs").join("progress.json");
        let mut writer = ProgressWriter::new(path.clone());
        writer.report(30, "Videos fetched: 50");
        writer.report(120, "Analysis complete");

        let raw = fs::read_to_string(&path).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["progress"], 100);
        assert_eq!(value["message"], "Analysis complete");
        assert!(!path.with_extension("tmp").exists());
    }
}
