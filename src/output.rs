//! Output directory management: file naming and the TTL sweep.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};

use chrono::Local;
use regex::Regex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Longest stem kept from caption text.
pub const MAX_STEM_CHARS: usize = 116;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Reduce caption text to a filename stem.
///
/// Characters outside `[A-Za-z0-9 _.-]` are dropped, whitespace runs
/// collapse to one space and the result is capped at [`MAX_STEM_CHARS`].
/// Degenerate input gives `video`. Applying it twice changes nothing.
pub fn sanitize_stem(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| {
            c.is_whitespace() || c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
        })
        .collect();
    let collapsed = WHITESPACE.replace_all(kept.trim(), " ");
    let truncated: String = collapsed.chars().take(MAX_STEM_CHARS).collect();
    let stem = truncated.trim_end();
    if stem.is_empty() {
        "video".to_string()
    } else {
        stem.to_string()
    }
}

/// `.mp4` filename for caption text: [`sanitize_stem`] plus the extension.
pub fn safe_filename(text: &str) -> String {
    format!("{}.mp4", sanitize_stem(text))
}

/// `dir/name`, or `dir/<stem>_<YYYYmmdd_HHMMSS>.mp4` when that already exists.
pub fn unique_output_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let stem = Path::new(name)
        .file_stem()
        .map_or_else(|| "video".to_string(), |s| s.to_string_lossy().to_string());
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let renamed = dir.join(format!("{stem}_{stamp}.mp4"));
    debug!(from = %candidate.display(), to = %renamed.display(), "Output name taken");
    renamed
}

fn is_sweepable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp4") || e.eq_ignore_ascii_case("png"))
}

/// Delete `*.mp4` and `*.png` in `dir` last modified more than `ttl` ago.
///
/// Files that vanish mid-sweep are not errors. A missing directory sweeps
/// nothing. Returns the number of files removed.
pub fn sweep_once(dir: &Path, ttl: Duration) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || !is_sweepable(&path) {
            continue;
        }
        let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read modification time");
                continue;
            }
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= ttl {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), age_secs = age.as_secs(), "Swept");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete expired output"),
        }
    }
    Ok(removed)
}

/// Periodic [`sweep_once`] over an output directory.
#[derive(Debug, Clone)]
pub struct OutputSweeper {
    dir: PathBuf,
    ttl: Duration,
    interval: Duration,
}

impl OutputSweeper {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            interval,
        }
    }

    /// Start sweeping on the current runtime. The first pass runs
    /// immediately; the task lives until [`SweepHandle::stop`].
    pub fn spawn(self) -> SweepHandle {
        let (tx, mut rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            info!(
                dir = %self.dir.display(),
                ttl_secs = self.ttl.as_secs(),
                "Output sweeper started"
            );
            let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let dir = self.dir.clone();
                        let ttl = self.ttl;
                        match tokio::task::spawn_blocking(move || sweep_once(&dir, ttl)).await {
                            Ok(Ok(0)) => {}
                            Ok(Ok(n)) => info!(removed = n, "Swept expired outputs"),
                            Ok(Err(e)) => warn!(error = %e, "Sweep failed"),
                            Err(e) => warn!(error = %e, "Sweep task panicked"),
                        }
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Output sweeper stopped");
        });
        SweepHandle { shutdown: tx, task }
    }
}

/// Owner of a running sweeper.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Signal the sweeper and wait for it to finish its current pass.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Sweeper ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
