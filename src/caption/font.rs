//! Glyph faces and the font fallback chain.
//!
//! A [`GlyphFace`] is a font at a fixed pixel size: it measures strings,
//! reports vertical metrics when it has them, and draws text onto an RGBA
//! canvas. Faces are resolved from the configured font file, then the
//! bundled Poppins SemiBold, then common platform fonts, and finally the
//! built-in [`BitmapFace`].

use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};
use image::{Rgba, RgbaImage};
use tracing::{debug, info, warn};

use super::bitmap::BitmapFace;
use crate::error::CaptionError;

/// Ascent above and descent below the baseline, both positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMetrics {
    pub ascent: f32,
    pub descent: f32,
}

pub trait GlyphFace: Send + Sync {
    /// Human-readable face name for logs.
    fn name(&self) -> &str;

    /// Pixel size the face was loaded at.
    fn size(&self) -> f32;

    /// Advance width of `text` in whole pixels (truncated).
    fn measure(&self, text: &str) -> u32;

    /// `None` when the face carries no usable line metrics.
    fn vertical_metrics(&self) -> Option<VerticalMetrics>;

    /// Draw `text` with its top-left corner (top of the ascent) at `x, y`.
    fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>);
}

/// A TrueType/OpenType font rasterized with fontdue.
pub struct TrueTypeFace {
    font: Font,
    size: f32,
    name: String,
}

impl TrueTypeFace {
    pub fn from_bytes(bytes: &[u8], size: f32, name: &str) -> Result<Self, CaptionError> {
        let settings = FontSettings {
            scale: size,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(bytes, settings).map_err(|reason| CaptionError::Font {
            name: name.to_string(),
            reason: reason.to_string(),
        })?;
        Ok(Self {
            font,
            size,
            name: name.to_string(),
        })
    }

    pub fn from_file(path: &Path, size: f32) -> Result<Self, CaptionError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, size, &path.display().to_string())
    }

    fn ascent_px(&self) -> i32 {
        self.vertical_metrics().map_or(self.size, |m| m.ascent).round() as i32
    }
}

impl GlyphFace for TrueTypeFace {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> f32 {
        self.size
    }

    fn measure(&self, text: &str) -> u32 {
        let mut width = 0.0f32;
        let mut prev = None;
        for ch in text.chars() {
            if let Some(p) = prev {
                width += self.font.horizontal_kern(p, ch, self.size).unwrap_or(0.0);
            }
            width += self.font.metrics(ch, self.size).advance_width;
            prev = Some(ch);
        }
        width.max(0.0) as u32
    }

    fn vertical_metrics(&self) -> Option<VerticalMetrics> {
        self.font
            .horizontal_line_metrics(self.size)
            .filter(|m| m.ascent > 0.0)
            .map(|m| VerticalMetrics {
                ascent: m.ascent,
                descent: -m.descent,
            })
    }

    fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
        let baseline = y + self.ascent_px();
        let mut pen = x as f32;
        let mut prev = None;
        for ch in text.chars() {
            if let Some(p) = prev {
                pen += self.font.horizontal_kern(p, ch, self.size).unwrap_or(0.0);
            }
            let (metrics, coverage) = self.font.rasterize(ch, self.size);
            let left = pen.round() as i32 + metrics.xmin;
            let top = baseline - (metrics.height as i32 + metrics.ymin);
            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let alpha = coverage[gy * metrics.width + gx];
                    if alpha > 0 {
                        blend(canvas, left + gx as i32, top + gy as i32, color, alpha);
                    }
                }
            }
            pen += metrics.advance_width;
            prev = Some(ch);
        }
    }
}

/// Source-over blend of `color` at `coverage` into one canvas pixel.
/// Out-of-bounds coordinates are ignored.
pub(crate) fn blend(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: u8) {
    if x < 0 || y < 0 || x >= canvas.width() as i32 || y >= canvas.height() as i32 {
        return;
    }
    let alpha = u32::from(color[3]) * u32::from(coverage) / 255;
    if alpha == 0 {
        return;
    }
    let dst = canvas.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        dst[c] = ((u32::from(color[c]) * alpha + u32::from(dst[c]) * (255 - alpha)) / 255) as u8;
    }
    dst[3] = (alpha + u32::from(dst[3]) * (255 - alpha) / 255) as u8;
}

const BUNDLED_FONTS: [&str; 2] = ["Poppins-SemiBold.ttf", "Poppins-SemiBold.otf"];

const PLATFORM_FONTS: [&str; 8] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial.ttf",
    r"C:\Windows\Fonts\arialbd.ttf",
    r"C:\Windows\Fonts\arial.ttf",
];

/// Ordered list of font files to try.
pub fn font_candidates(font_path: Option<&Path>, fonts_dir: &Path) -> Vec<PathBuf> {
    font_path
        .map(Path::to_path_buf)
        .into_iter()
        .chain(BUNDLED_FONTS.iter().map(|f| fonts_dir.join(f)))
        .chain(PLATFORM_FONTS.iter().map(PathBuf::from))
        .collect()
}

/// Load the first usable face from the fallback chain.
pub fn load_face(font_path: Option<&Path>, fonts_dir: &Path, size: f32) -> Box<dyn GlyphFace> {
    for candidate in font_candidates(font_path, fonts_dir) {
        if !candidate.is_file() {
            continue;
        }
        match TrueTypeFace::from_file(&candidate, size) {
            Ok(face) => {
                info!(font = %candidate.display(), size, "Caption font loaded");
                return Box::new(face);
            }
            Err(e) => warn!(font = %candidate.display(), error = %e, "Skipping unreadable font"),
        }
    }
    debug!("no TrueType font found");
    warn!("Falling back to the built-in bitmap face for captions");
    Box::new(BitmapFace::new(size))
}
