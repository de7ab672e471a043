//! ffmpeg invocation for a planned composition
//!
//! Builds the full command line (inputs, filter graph, codec flags) for one
//! render item and runs it to completion. The hardware encoder probe runs
//! at most once per [`Compositor`].

use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;

use serde::Deserialize;

use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::graph::{build_filter_graph, OUTPUT_LABEL};
use super::layout::{LayoutMode, LayoutPlan, ACCENT_COLOR};
use crate::error::EncodeError;

/// Lines of ffmpeg stderr kept in [`EncodeError::Failed`].
const STDERR_TAIL_LINES: usize = 20;

/// Which video encoder to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderPreference {
    /// NVENC when ffmpeg advertises it, libx264 otherwise.
    #[default]
    Auto,
    /// Always NVENC.
    Hardware,
    /// Always libx264.
    Software,
}

impl FromStr for EncoderPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "hardware" | "nvenc" => Ok(Self::Hardware),
            "software" | "x264" => Ok(Self::Software),
            other => Err(format!(
                "unknown encoder '{other}' (expected auto, hardware or software)"
            )),
        }
    }
}

/// Resolved video encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEncoder {
    Nvenc,
    X264,
}

impl VideoEncoder {
    /// Codec flags for this encoder in the given layout mode.
    pub fn args(self, mode: LayoutMode) -> Vec<String> {
        let preset = match mode {
            LayoutMode::Full => "p4",
            LayoutMode::Mid => "p3",
        };
        let args = match self {
            Self::Nvenc => vec![
                "-c:v", "h264_nvenc", "-preset", preset, "-rc", "vbr", "-cq", "19", "-b:v", "0",
                "-pix_fmt", "yuv420p",
            ],
            Self::X264 => vec![
                "-c:v", "libx264", "-preset", "veryfast", "-crf", "18", "-pix_fmt", "yuv420p",
            ],
        };
        args.into_iter().map(ToString::to_string).collect()
    }
}

/// Configuration for the compositor
#[derive(Debug, Clone)]
pub struct CompositorConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    pub encoder: EncoderPreference,
    /// AAC bitrate (e.g., "160k")
    pub audio_bitrate: String,
    pub filter_threads: u32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: which::which("ffmpeg").map_or_else(
                |_| "ffmpeg".to_string(),
                |p| p.to_string_lossy().to_string(),
            ),
            encoder: EncoderPreference::Auto,
            audio_bitrate: "160k".to_string(),
            filter_threads: 4,
        }
    }
}

impl CompositorConfig {
    #[must_use]
    pub fn with_ffmpeg(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    #[must_use]
    pub fn with_encoder(mut self, encoder: EncoderPreference) -> Self {
        self.encoder = encoder;
        self
    }
}

/// Everything one encode needs.
#[derive(Debug, Clone, Copy)]
pub struct EncodeJob<'a> {
    pub plan: &'a LayoutPlan,
    pub fps: u32,
    pub video: &'a Path,
    pub caption_png: &'a Path,
    pub logo: &'a Path,
    pub output: &'a Path,
}

/// ffmpeg-based compositor
pub struct Compositor {
    config: CompositorConfig,
    nvenc: OnceCell<bool>,
}

impl Compositor {
    #[must_use]
    pub fn with_config(config: CompositorConfig) -> Self {
        Self {
            config,
            nvenc: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    /// Whether ffmpeg lists `h264_nvenc`. Cached after the first call; any
    /// probe failure counts as "no".
    pub async fn has_nvenc(&self) -> bool {
        *self
            .nvenc
            .get_or_init(|| async {
                let output = Command::new(&self.config.ffmpeg_path)
                    .args(["-hide_banner", "-encoders"])
                    .stdin(Stdio::null())
                    .output()
                    .await;
                match output {
                    Ok(out) => {
                        let found = String::from_utf8_lossy(&out.stdout).contains("h264_nvenc")
                            || String::from_utf8_lossy(&out.stderr).contains("h264_nvenc");
                        info!(nvenc = found, "Probed ffmpeg encoders");
                        found
                    }
                    Err(e) => {
                        warn!(error = %e, "Encoder probe failed, using software encoding");
                        false
                    }
                }
            })
            .await
    }

    pub async fn select_encoder(&self) -> VideoEncoder {
        match self.config.encoder {
            EncoderPreference::Hardware => VideoEncoder::Nvenc,
            EncoderPreference::Software => VideoEncoder::X264,
            EncoderPreference::Auto if self.has_nvenc().await => VideoEncoder::Nvenc,
            EncoderPreference::Auto => VideoEncoder::X264,
        }
    }

    /// Build ffmpeg arguments
    pub fn build_args(&self, job: &EncodeJob<'_>, encoder: VideoEncoder) -> Vec<String> {
        let plan = job.plan;
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "warning", "-y"]
            .iter()
            .map(ToString::to_string)
            .collect();

        // Canvas fill at the source frame rate
        args.extend(["-f".to_string(), "lavfi".to_string(), "-i".to_string()]);
        args.push(format!(
            "color={ACCENT_COLOR}:size={}x{}:rate={}",
            plan.canvas.width, plan.canvas.height, job.fps
        ));

        args.push("-i".to_string());
        args.push(job.video.to_string_lossy().to_string());

        args.extend(["-loop".to_string(), "1".to_string(), "-i".to_string()]);
        args.push(job.caption_png.to_string_lossy().to_string());

        args.push("-i".to_string());
        args.push(job.logo.to_string_lossy().to_string());

        args.push("-filter_complex".to_string());
        args.push(build_filter_graph(plan));
        args.extend([
            "-map".to_string(),
            format!("[{OUTPUT_LABEL}]"),
            "-map".to_string(),
            "1:a?".to_string(),
            "-shortest".to_string(),
        ]);

        args.extend(encoder.args(plan.mode));

        args.extend([
            "-threads".to_string(),
            "0".to_string(),
            "-filter_complex_threads".to_string(),
            self.config.filter_threads.to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            self.config.audio_bitrate.clone(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]);

        args.push(job.output.to_string_lossy().to_string());
        args
    }

    /// Run ffmpeg for `job`, writing `job.output`.
    #[instrument(skip(self, job), fields(mode = %job.plan.mode, output = %job.output.display()))]
    pub async fn encode(&self, job: &EncodeJob<'_>) -> Result<(), EncodeError> {
        let encoder = self.select_encoder().await;
        let args = self.build_args(job, encoder);
        debug!("ffmpeg args: {:?}", args);

        let output = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(EncodeError::Spawn)?;

        if !output.status.success() {
            let stderr_tail = stderr_tail(&output.stderr, STDERR_TAIL_LINES);
            warn!(status = ?output.status.code(), "ffmpeg failed");
            return Err(EncodeError::Failed {
                status: output.status.code(),
                stderr_tail,
            });
        }

        info!(?encoder, "Composited video to {:?}", job.output);
        Ok(())
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::with_config(CompositorConfig::default())
    }
}

fn stderr_tail(stderr: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}
