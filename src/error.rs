//! Error taxonomy for the render pipeline.
//!
//! Each stage owns one error type; [`RenderError`] wraps them so a batch can
//! surface a single failure to its caller.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while resolving or downloading a remote video.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("{provider}: could not extract {what} from share page")]
    MissingTokens {
        provider: &'static str,
        what: &'static str,
    },

    #[error("{provider}: {url} still served an HTML page instead of the file")]
    UnexpectedHtml { provider: &'static str, url: String },

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure running or parsing the video inspection utility.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to run ffprobe: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffprobe exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },

    #[error("invalid ffprobe output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no video stream in {0}")]
    NoVideoStream(PathBuf),
}

/// Canvas geometry cannot hold the requested composition.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error(
        "not enough space for video in full mode: {available}px available, {minimum}px required"
    )]
    InsufficientSpace { available: i64, minimum: i64 },

    #[error("{layer} position does not fit the canvas coordinate range")]
    OutOfRange { layer: &'static str },

    #[error("video has zero size ({width}x{height})")]
    EmptyVideo { width: u32, height: u32 },
}

/// The external encoder failed.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("failed to run ffmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffmpeg exited with status {status:?}: {stderr_tail}")]
    Failed {
        status: Option<i32>,
        stderr_tail: String,
    },
}

/// Failure producing a caption artifact or measuring an overlay image.
#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("cannot load font {name}: {reason}")]
    Font { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure that aborts a render item.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Caption(#[from] CaptionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_error_mentions_available_space() {
        let err = LayoutError::InsufficientSpace {
            available: 4,
            minimum: 10,
        };
        assert!(err.to_string().contains("4px available"));
    }

    #[test]
    fn render_error_is_transparent_over_stage_errors() {
        let err: RenderError = EncodeError::Failed {
            status: Some(1),
            stderr_tail: "boom".into(),
        }
        .into();
        assert_eq!(err.to_string(), "ffmpeg exited with status Some(1): boom");
    }
}
