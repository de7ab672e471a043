//! Batch rendering: one output video per valid item, processed in order.
//!
//! Items without a usable source are skipped. By default the first failing
//! item aborts the batch; with `continue_on_error` failures are collected
//! and the remaining items still run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::caption::CaptionRenderer;
use crate::compose::{
    logo_dimensions, plan, Compositor, CompositorConfig, EncodeJob, LayoutMode, Size, CANVAS,
};
use crate::config::AppConfig;
use crate::error::{DownloadError, RenderError, Result};
use crate::http_client::DownloadClient;
use crate::output::{safe_filename, unique_output_path};
use crate::probe::Prober;
use crate::resolve::{is_url, LinkResolver, VideoSource};

pub const NOTICE_COMPLETE: &str = "Render complete!";
pub const NOTICE_EMPTY: &str =
    "Please add at least one valid item (upload a file or provide a link).";

/// Where an item's video comes from, as handed over by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    /// A file already on disk.
    Upload(PathBuf),
    /// A share link; non-URL text is treated as a local path.
    Link(String),
}

impl ItemSource {
    /// `None` for an empty upload path or a blank link.
    pub fn to_video_source(&self) -> Option<VideoSource> {
        match self {
            Self::Upload(path) if path.as_os_str().is_empty() => None,
            Self::Upload(path) => Some(VideoSource::Local(path.clone())),
            Self::Link(link) if link.trim().is_empty() => None,
            Self::Link(link) => Some(VideoSource::classify(link)),
        }
    }
}

/// One caption + video pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderItem {
    #[serde(default)]
    pub caption: String,
    pub source: Option<ItemSource>,
}

impl RenderItem {
    pub fn new(caption: impl Into<String>, source: Option<ItemSource>) -> Self {
        Self {
            caption: caption.into(),
            source,
        }
    }

    /// Build from the `upload`/`link` pair a form submits. A non-empty upload
    /// wins over the link.
    pub fn from_fields(
        caption: impl Into<String>,
        upload: Option<PathBuf>,
        link: Option<String>,
    ) -> Self {
        let source = match (upload, link) {
            (Some(path), _) if !path.as_os_str().is_empty() => Some(ItemSource::Upload(path)),
            (_, Some(link)) if !link.trim().is_empty() => {
                if is_url(&link) {
                    Some(ItemSource::Link(link))
                } else {
                    Some(ItemSource::Upload(PathBuf::from(link.trim())))
                }
            }
            _ => None,
        };
        Self::new(caption, source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub mode: LayoutMode,
    #[serde(default)]
    pub items: Vec<RenderItem>,
}

/// Batch description read from a TOML manifest.
///
/// ```toml
/// mode = "mid"
///
/// [[items]]
/// caption = "Launch day"
/// link = "https://drive.google.com/file/d/abc/view"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub mode: LayoutMode,
    #[serde(default)]
    pub items: Vec<ManifestItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestItem {
    #[serde(default)]
    pub caption: String,
    pub upload: Option<PathBuf>,
    pub link: Option<String>,
}

impl Manifest {
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn into_request(self) -> RenderRequest {
        RenderRequest {
            mode: self.mode,
            items: self
                .items
                .into_iter()
                .map(|i| RenderItem::from_fields(i.caption, i.upload, i.link))
                .collect(),
        }
    }
}

/// A failed item, kept when the batch continues past errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub index: usize,
    pub caption: String,
    pub error: String,
}

/// Result of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Output filenames, in item order.
    pub produced: Vec<String>,
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.produced.is_empty()
    }

    /// User-facing status line.
    pub fn notice(&self) -> &'static str {
        if self.produced.is_empty() {
            NOTICE_EMPTY
        } else {
            NOTICE_COMPLETE
        }
    }
}

/// Caption PNG on disk for the lifetime of one item.
struct CaptionFile(PathBuf);

impl CaptionFile {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for CaptionFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => debug!(path = %self.0.display(), "Caption artifact removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.0.display(), error = %e, "Failed to remove caption artifact");
            }
        }
    }
}

/// Runs render requests end to end.
pub struct BatchRenderer {
    resolver: LinkResolver,
    prober: Prober,
    captions: CaptionRenderer,
    compositor: Compositor,
    output_dir: PathBuf,
    logo_path: PathBuf,
    continue_on_error: bool,
}

impl BatchRenderer {
    pub fn new(
        resolver: LinkResolver,
        prober: Prober,
        captions: CaptionRenderer,
        compositor: Compositor,
        output_dir: impl Into<PathBuf>,
        logo_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            prober,
            captions,
            compositor,
            output_dir: output_dir.into(),
            logo_path: logo_path.into(),
            continue_on_error: false,
        }
    }

    /// Wire every stage from configuration.
    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, DownloadError> {
        let client = DownloadClient::with_config(&config.http)?;
        let captions = CaptionRenderer::from_fonts(
            config.caption.clone(),
            config.font_path.as_deref(),
            &config.fonts_dir,
        );
        let compositor = Compositor::with_config(
            CompositorConfig::default()
                .with_ffmpeg(config.ffmpeg_path.clone())
                .with_encoder(config.encoder),
        );
        let mut resolver = LinkResolver::new(client);
        if let Some(root) = &config.download_dir {
            resolver = resolver.with_temp_root(root);
        }
        Ok(Self::new(
            resolver,
            Prober::new(config.ffprobe_path.clone()),
            captions,
            compositor,
            &config.output_dir,
            &config.logo_path,
        )
        .continue_on_error(config.continue_on_error))
    }

    #[must_use]
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render every item of `request`, in order.
    #[instrument(skip(self, request), fields(mode = %request.mode, items = request.items.len()))]
    pub async fn run(&self, request: &RenderRequest) -> Result<BatchOutcome> {
        std::fs::create_dir_all(&self.output_dir)?;
        let mut outcome = BatchOutcome::default();

        for (index, item) in request.items.iter().enumerate() {
            let Some(source) = item.source.as_ref().and_then(ItemSource::to_video_source) else {
                debug!(index, "Skipping item without a source");
                outcome.skipped += 1;
                continue;
            };

            match self.render_item(request.mode, &item.caption, &source).await {
                Ok(name) => outcome.produced.push(name),
                Err(e) if self.continue_on_error => {
                    warn!(index, error = %e, "Item failed, continuing");
                    outcome.failures.push(ItemFailure {
                        index,
                        caption: item.caption.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    error!(index, error = %e, "Item failed, aborting batch");
                    return Err(e);
                }
            }
        }

        info!(
            produced = outcome.produced.len(),
            skipped = outcome.skipped,
            failed = outcome.failures.len(),
            "Batch finished"
        );
        Ok(outcome)
    }

    /// Acquire, caption, plan and encode one item. Returns the output
    /// filename (relative to the output directory).
    pub async fn render_item(
        &self,
        mode: LayoutMode,
        caption: &str,
        source: &VideoSource,
    ) -> Result<String> {
        // A download (and its temp dir) lives until this function returns
        let downloaded;
        let video_path: &Path = match source {
            VideoSource::Local(path) => path,
            VideoSource::Remote { url, .. } => {
                downloaded = self.resolver.resolve(url).await?;
                downloaded.path()
            }
        };

        let artifact = self.captions.render(caption);
        let caption_file = CaptionFile(
            self.output_dir
                .join(format!("caption_{}.png", uuid::Uuid::new_v4().simple())),
        );
        artifact.save_png(caption_file.path())?;

        let meta = self.prober.probe(video_path).await?;
        let (cap_w, cap_h) = artifact.dimensions();
        let logo = logo_dimensions(&self.logo_path)?;
        let layout = plan(
            mode,
            Size::new(meta.width, meta.height),
            Size::new(cap_w, cap_h),
            logo,
            CANVAS,
        )?;

        let output = unique_output_path(&self.output_dir, &safe_filename(caption));
        let job = EncodeJob {
            plan: &layout,
            fps: meta.fps,
            video: video_path,
            caption_png: caption_file.path(),
            logo: &self.logo_path,
            output: &output,
        };
        self.compositor.encode(&job).await?;

        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| RenderError::Io(std::io::Error::other("output path has no file name")))?;
        info!(output = %name, fps = meta.fps, "Item rendered");
        Ok(name)
    }
}
