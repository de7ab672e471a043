//! Caption artifact rendering: black wrapped text centered in a white
//! rounded box on a transparent canvas.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};
use tracing::debug;

use super::font::{load_face, GlyphFace};
use super::measure::{layout_caption, CaptionLayout};
use super::CaptionStyle;
use crate::error::CaptionError;

const BOX_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TEXT_FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A rendered caption image, consumed once by the compositor.
#[derive(Debug, Clone)]
pub struct CaptionArtifact {
    pixels: RgbaImage,
    layout: CaptionLayout,
}

impl CaptionArtifact {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn lines(&self) -> &[String] {
        &self.layout.lines
    }

    pub fn layout(&self) -> &CaptionLayout {
        &self.layout
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Encode as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>, CaptionError> {
        let mut out = Cursor::new(Vec::new());
        self.pixels.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    /// Write as a PNG file.
    pub fn save_png(&self, path: &Path) -> Result<(), CaptionError> {
        std::fs::write(path, self.to_png()?)?;
        Ok(())
    }
}

/// Render `text` with an already-loaded face.
pub fn render_caption(text: &str, face: &dyn GlyphFace, style: &CaptionStyle) -> CaptionArtifact {
    let layout = layout_caption(text, face, style.max_width, style.line_height);
    let width = layout.text_width() + style.padding_x * 2;
    let height = layout.text_height() + style.padding_y * 2;

    let mut pixels = RgbaImage::new(width, height);
    fill_rounded_rect(&mut pixels, style.corner_radius, BOX_FILL);

    let mut y = style.padding_y as i32;
    for (line, line_width) in layout.lines.iter().zip(&layout.line_widths) {
        let x = (i64::from(width) - i64::from(*line_width)).div_euclid(2) as i32;
        face.draw(&mut pixels, x, y, line, TEXT_FILL);
        y += layout.line_height as i32;
    }

    debug!(
        width,
        height,
        lines = layout.lines.len(),
        face = face.name(),
        "Caption rendered"
    );
    CaptionArtifact { pixels, layout }
}

/// Fill the whole canvas with a rounded rectangle. The radius is clamped to
/// half the shorter side.
fn fill_rounded_rect(canvas: &mut RgbaImage, radius: u32, color: Rgba<u8>) {
    let (w, h) = canvas.dimensions();
    let r = radius.min(w / 2).min(h / 2) as f32;
    let (wf, hf) = (w as f32, h as f32);
    for (x, y, px) in canvas.enumerate_pixels_mut() {
        let cx = x as f32 + 0.5;
        let cy = y as f32 + 0.5;
        let nx = cx.clamp(r, wf - r);
        let ny = cy.clamp(r, hf - r);
        if (cx - nx).powi(2) + (cy - ny).powi(2) <= r * r {
            *px = color;
        }
    }
}

/// Caption renderer holding a face loaded at the style's font size.
pub struct CaptionRenderer {
    face: Box<dyn GlyphFace>,
    style: CaptionStyle,
}

impl CaptionRenderer {
    pub fn new(face: Box<dyn GlyphFace>, style: CaptionStyle) -> Self {
        Self { face, style }
    }

    /// Resolve a face through the font fallback chain.
    pub fn from_fonts(style: CaptionStyle, font_path: Option<&Path>, fonts_dir: &Path) -> Self {
        let face = load_face(font_path, fonts_dir, style.font_size);
        Self::new(face, style)
    }

    pub fn style(&self) -> &CaptionStyle {
        &self.style
    }

    pub fn face(&self) -> &dyn GlyphFace {
        self.face.as_ref()
    }

    pub fn render(&self, text: &str) -> CaptionArtifact {
        render_caption(text, self.face.as_ref(), &self.style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::bitmap::BitmapFace;
    use crate::caption::font::TrueTypeFace;

    fn renderer() -> CaptionRenderer {
        CaptionRenderer::new(Box::new(BitmapFace::new(52.0)), CaptionStyle::default())
    }

    #[test]
    fn rendering_is_deterministic() {
        let r = renderer();
        let a = r.render("Breaking: markets rally for a third day");
        let b = r.render("Breaking: markets rally for a third day");
        assert_eq!(a.dimensions(), b.dimensions());
        assert_eq!(a.pixels().as_raw(), b.pixels().as_raw());
    }

    #[test]
    fn box_size_is_text_plus_padding() {
        let r = renderer();
        let artifact = r.render("Hi");
        let layout = artifact.layout();
        // 2 chars at scale 7: 2*42-7
        assert_eq!(layout.text_width(), 77);
        assert_eq!(artifact.width(), 77 + 36);
        assert_eq!(artifact.height(), 70 + 20);
    }

    #[test]
    fn empty_text_still_yields_padded_box() {
        let artifact = renderer().render("");
        assert_eq!(artifact.lines(), &[String::new()]);
        assert_eq!(artifact.dimensions(), (36, 90));
    }

    #[test]
    fn long_text_wraps_within_max_width() {
        let r = renderer();
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let artifact = r.render(text);
        assert!(artifact.lines().len() > 1);
        assert!(artifact.width() <= r.style().max_width + 2 * r.style().padding_x);
    }

    #[test]
    fn corners_are_transparent_and_center_is_white() {
        let artifact = renderer().render("   ");
        let (w, h) = artifact.dimensions();
        assert_eq!(artifact.pixels().get_pixel(0, 0).0[3], 0);
        assert_eq!(artifact.pixels().get_pixel(w - 1, h - 1).0[3], 0);
        assert_eq!(artifact.pixels().get_pixel(w / 2, h / 2).0, [255, 255, 255, 255]);
    }

    #[test]
    fn text_pixels_are_black() {
        let artifact = renderer().render("HI");
        assert!(artifact.pixels().pixels().any(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn png_round_trips_dimensions() {
        let artifact = renderer().render("PNG");
        let bytes = artifact.to_png().unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), artifact.dimensions());
    }

    fn dejavu_renderer() -> CaptionRenderer {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fonts/DejaVuSans-Bold.ttf");
        let face = TrueTypeFace::from_file(Path::new(path), 52.0).unwrap();
        CaptionRenderer::new(Box::new(face), CaptionStyle::default())
    }

    #[test]
    fn truetype_caption_wraps_and_sizes_box() {
        let r = dejavu_renderer();
        let style = r.style().clone();
        let text = "Breaking: city council approves the new riverside park after a long \
                    public debate that lasted well into the night";
        let artifact = r.render(text);
        let layout = artifact.layout();
        assert!(layout.lines.len() > 1);
        for (line, width) in layout.lines.iter().zip(&layout.line_widths) {
            if line.contains(' ') {
                assert!(*width <= style.max_width, "{line:?} is {width}px");
            }
            assert_eq!(*width, r.face().measure(line));
        }
        assert_eq!(layout.lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));

        let m = r.face().vertical_metrics().unwrap();
        let expected = ((m.ascent.round() + m.descent.round()) * style.line_height) as u32;
        assert_eq!(layout.line_height, expected);
        assert_eq!(
            artifact.height(),
            expected * layout.lines.len() as u32 + 2 * style.padding_y
        );
        assert_eq!(artifact.width(), layout.text_width() + 2 * style.padding_x);
    }

    #[test]
    fn truetype_ink_respects_vertical_padding() {
        let r = dejavu_renderer();
        let padding = r.style().padding_y;
        let artifact = r.render("Quickly judge jumpy pygmy quails by their glyphs");
        let h = artifact.height();
        let ink_rows: Vec<u32> = artifact
            .pixels()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] == 255 && p.0[0] < 128)
            .map(|(_, y, _)| y)
            .collect();
        assert!(!ink_rows.is_empty());
        assert!(ink_rows.iter().all(|&y| y >= padding && y < h - padding));

        let again = r.render("Quickly judge jumpy pygmy quails by their glyphs");
        assert_eq!(artifact.pixels().as_raw(), again.pixels().as_raw());
    }

    #[test]
    fn zero_radius_fills_corners() {
        let style = CaptionStyle {
            corner_radius: 0,
            ..CaptionStyle::default()
        };
        let r = CaptionRenderer::new(Box::new(BitmapFace::new(52.0)), style);
        let artifact = r.render("");
        assert_eq!(artifact.pixels().get_pixel(0, 0).0, [255, 255, 255, 255]);
    }
}
