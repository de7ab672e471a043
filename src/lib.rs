//! `Shortsmith` - branded vertical shorts from a video and a caption
//!
//! # Features
//!
//! - **Link resolution**: Google Drive and OneDrive share links, or any direct URL
//! - **Captions**: word-wrapped text rendered into a rounded white box
//! - **Layouts**: `full` (video stacked under the caption) or `mid` (overlaid)
//! - **Encoding**: ffmpeg with NVENC when available, libx264 otherwise
//!
//! # Example
//!
//! ```rust,no_run
//! use shortsmith::{AppConfig, BatchRenderer, ItemSource, LayoutMode, RenderItem, RenderRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let renderer = BatchRenderer::from_config(&config)?;
//!     let request = RenderRequest {
//!         mode: LayoutMode::Full,
//!         items: vec![RenderItem::new(
//!             "Three things to know",
//!             Some(ItemSource::Link("https://drive.google.com/file/d/abc/view".into())),
//!         )],
//!     };
//!     let outcome = renderer.run(&request).await?;
//!     println!("{}: {:?}", outcome.notice(), outcome.produced);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod caption;
pub mod compose;
pub mod config;
pub mod error;
pub mod http_client;
pub mod output;
pub mod probe;
pub mod resolve;

pub use batch::{
    BatchOutcome, BatchRenderer, ItemFailure, ItemSource, Manifest, RenderItem, RenderRequest,
};
pub use caption::{CaptionArtifact, CaptionRenderer, CaptionStyle};
pub use compose::{Compositor, CompositorConfig, EncoderPreference, LayoutMode, LayoutPlan, Size};
pub use config::AppConfig;
pub use error::{CaptionError, DownloadError, EncodeError, LayoutError, ProbeError, RenderError};
pub use http_client::DownloadClient;
pub use output::{safe_filename, sanitize_stem, sweep_once, OutputSweeper, SweepHandle};
pub use probe::{derive_fps, Prober, VideoMetadata};
pub use resolve::{LinkResolver, Provider, ProviderResolver, VideoSource};

/// Version of shortsmith
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
