//! Video stream inspection via ffprobe.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ProbeError;

/// Frame rate used when the stream does not report a usable one.
pub const DEFAULT_FPS: u32 = 25;
pub const MIN_FPS: u32 = 10;
pub const MAX_FPS: u32 = 60;

/// Dimensions and clamped integer frame rate of a video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Derive an integer FPS from an ffprobe `r_frame_rate` fraction such as
/// `"30000/1001"`.
///
/// A zero denominator or anything unparsable yields [`DEFAULT_FPS`]; the
/// result is always clamped to `[MIN_FPS, MAX_FPS]`.
pub fn derive_fps(r_frame_rate: Option<&str>) -> u32 {
    let Some(raw) = r_frame_rate else {
        return DEFAULT_FPS;
    };
    let parsed = match raw.trim().split_once('/') {
        Some((num, den)) => num
            .trim()
            .parse::<f64>()
            .ok()
            .zip(den.trim().parse::<f64>().ok()),
        None => raw.trim().parse::<f64>().ok().map(|n| (n, 1.0)),
    };
    let fps = match parsed {
        Some((_, den)) if den == 0.0 => DEFAULT_FPS,
        Some((num, den)) if (num / den).is_finite() => {
            (num / den).round_ties_even().max(1.0) as u32
        }
        _ => {
            debug!(raw, "unparsable frame rate");
            DEFAULT_FPS
        }
    };
    fps.clamp(MIN_FPS, MAX_FPS)
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

/// Parse ffprobe's JSON (`-show_streams`) into [`VideoMetadata`].
pub fn parse_probe_json(json: &[u8], path: &Path) -> Result<VideoMetadata, ProbeError> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;
    let stream = probe
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ProbeError::NoVideoStream(path.to_path_buf()))?;

    Ok(VideoMetadata {
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps: derive_fps(stream.r_frame_rate.as_deref()),
    })
}

/// Runs ffprobe against local files.
#[derive(Debug, Clone)]
pub struct Prober {
    ffprobe_path: String,
}

impl Prober {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Inspect `path`. Never cached; every item is probed afresh.
    pub async fn probe(&self, path: &Path) -> Result<VideoMetadata, ProbeError> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(path)
            .output()
            .await
            .map_err(ProbeError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(path = %path.display(), %stderr, "ffprobe failed");
            return Err(ProbeError::Failed {
                status: output.status.code(),
                stderr,
            });
        }

        let meta = parse_probe_json(&output.stdout, path)?;
        debug!(?meta, path = %path.display(), "Probed video");
        Ok(meta)
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}
