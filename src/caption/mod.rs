//! Caption image rendering for shortsmith
//!
//! Captions are rasterized up front into a standalone RGBA image (a white
//! rounded box with centered black text) which the compositor overlays as
//! its own layer.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use shortsmith::caption::{CaptionRenderer, CaptionStyle};
//!
//! let fonts = Path::new("assets/fonts");
//! let renderer = CaptionRenderer::from_fonts(CaptionStyle::default(), None, fonts);
//! let artifact = renderer.render("Three things to know about today's launch");
//! artifact.save_png(Path::new("caption.png")).unwrap();
//! ```

pub mod bitmap;
pub mod font;
pub mod measure;
pub mod render;

use serde::{Deserialize, Serialize};

pub use bitmap::BitmapFace;
pub use font::{font_candidates, load_face, GlyphFace, TrueTypeFace, VerticalMetrics};
pub use measure::{layout_caption, line_height, wrap_text, CaptionLayout};
pub use render::{render_caption, CaptionArtifact, CaptionRenderer};

/// Caption box geometry and typography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionStyle {
    /// Maximum measured width of a wrapped line, in pixels.
    pub max_width: u32,
    pub font_size: f32,
    /// Line advance as a multiple of the font's ascent + descent.
    pub line_height: f32,
    pub padding_x: u32,
    pub padding_y: u32,
    pub corner_radius: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            max_width: 1000,
            font_size: 52.0,
            line_height: 1.35,
            padding_x: 18,
            padding_y: 10,
            corner_radius: 8,
        }
    }
}
