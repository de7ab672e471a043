//! Application configuration loaded from `~/.config/shortsmith/config.toml`.
//!
//! Every field has a default, so a missing file (or an empty one) yields a
//! working setup rooted at the current directory. `TTL_SECONDS` and
//! `CLEAN_INTERVAL` from the environment override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::caption::CaptionStyle;
use crate::compose::EncoderPreference;

/// HTTP client settings for link resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// TCP/TLS connect timeout.
    pub connect_timeout_secs: u64,
    /// Maximum idle time between two body reads.
    pub read_timeout_secs: u64,
    /// Hard ceiling for a whole request, body included.
    pub request_timeout_secs: u64,
    /// User-Agent sent to storage providers.
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 60,
            request_timeout_secs: 30 * 60,
            user_agent: crate::http_client::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where finished videos (and transient caption PNGs) are written.
    pub output_dir: PathBuf,
    /// Brand logo composited onto every video.
    pub logo_path: PathBuf,
    /// Directory searched for the bundled caption font.
    pub fonts_dir: PathBuf,
    /// Explicit font file, tried before anything in `fonts_dir`.
    pub font_path: Option<PathBuf>,
    /// Parent of the per-download temp directories (system temp dir if unset).
    pub download_dir: Option<PathBuf>,
    /// Age after which the sweeper deletes outputs.
    pub ttl_seconds: u64,
    /// Pause between sweeps.
    pub clean_interval_seconds: u64,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// `auto`, `hardware` (NVENC) or `software` (libx264).
    pub encoder: EncoderPreference,
    /// Keep going after a failed item instead of aborting the batch.
    pub continue_on_error: bool,
    pub caption: CaptionStyle,
    pub http: HttpConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            logo_path: PathBuf::from("assets").join("logo.png"),
            fonts_dir: PathBuf::from("assets").join("fonts"),
            font_path: None,
            download_dir: None,
            ttl_seconds: 3600,
            clean_interval_seconds: 600,
            ffmpeg_path: find_binary("ffmpeg"),
            ffprobe_path: find_binary("ffprobe"),
            encoder: EncoderPreference::Auto,
            continue_on_error: false,
            caption: CaptionStyle::default(),
            http: HttpConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(config_path, Path::to_path_buf);
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("invalid TOML in {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `TTL_SECONDS` / `CLEAN_INTERVAL` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ttl) = parse_env_secs(&lookup, "TTL_SECONDS") {
            self.ttl_seconds = ttl;
        }
        if let Some(interval) = parse_env_secs(&lookup, "CLEAN_INTERVAL") {
            self.clean_interval_seconds = interval;
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn clean_interval(&self) -> Duration {
        Duration::from_secs(self.clean_interval_seconds)
    }
}

fn parse_env_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(secs) => Some(secs),
        Err(_) => {
            warn!(key, value = %raw, "ignoring non-integer environment override");
            None
        }
    }
}

fn find_binary(name: &str) -> String {
    which::which(name).map_or_else(|_| name.to_string(), |p| p.to_string_lossy().to_string())
}

/// Return the path to the default config file.
fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shortsmith")
        .join("config.toml")
}
