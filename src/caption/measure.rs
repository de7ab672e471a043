//! Greedy word wrapping and line geometry.

use super::font::GlyphFace;

/// Wrapped caption lines and their measured geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionLayout {
    pub lines: Vec<String>,
    /// Measured width of each line, same order as `lines`.
    pub line_widths: Vec<u32>,
    pub line_height: u32,
}

impl CaptionLayout {
    /// Width of the widest line.
    pub fn text_width(&self) -> u32 {
        self.line_widths.iter().copied().max().unwrap_or(0)
    }

    pub fn text_height(&self) -> u32 {
        self.line_height * self.lines.len() as u32
    }
}

/// Pack whitespace-separated words into lines no wider than `max_width`.
///
/// A word that is wider than `max_width` on its own gets a line to itself
/// and is never broken. Empty input yields one empty line.
pub fn wrap_text(text: &str, face: &dyn GlyphFace, max_width: u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if face.measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Per-line advance: `(ascent + descent) × multiplier`, or
/// `size × multiplier` for faces without metrics. Never below one pixel.
pub fn line_height(face: &dyn GlyphFace, multiplier: f32) -> u32 {
    let base = face
        .vertical_metrics()
        .map_or(face.size(), |m| m.ascent.round() + m.descent.round());
    ((base * multiplier) as u32).max(1)
}

/// Wrap and measure `text` in one pass.
pub fn layout_caption(
    text: &str,
    face: &dyn GlyphFace,
    max_width: u32,
    line_height_multiplier: f32,
) -> CaptionLayout {
    let lines = wrap_text(text, face, max_width);
    let line_widths = lines.iter().map(|l| face.measure(l)).collect();
    CaptionLayout {
        lines,
        line_widths,
        line_height: line_height(face, line_height_multiplier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::bitmap::BitmapFace;

    // scale 1: every char is 6px wide, minus 1px for the trailing gap
    fn face() -> BitmapFace {
        BitmapFace::new(8.0)
    }

    #[test]
    fn irregular_whitespace_is_normalized() {
        let lines = wrap_text("Hello   World", &face(), 1000);
        assert_eq!(lines, vec!["Hello World"]);
        let lines = wrap_text(" Hello\r\n\tWorld ", &face(), 40);
        assert_eq!(lines, vec!["Hello", "World"]);
    }

    #[test]
    fn empty_text_yields_one_empty_line() {
        assert_eq!(wrap_text("", &face(), 100), vec![String::new()]);
        assert_eq!(wrap_text("   \n ", &face(), 100), vec![String::new()]);
    }

    #[test]
    fn greedy_packing() {
        // "aa bb" = 5 chars = 29px, "aa bb cc" = 47px
        let lines = wrap_text("aa bb cc dd", &face(), 30);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
    }

    #[test]
    fn overlong_word_gets_its_own_line() {
        let lines = wrap_text("a supercalifragilistic b", &face(), 30);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn no_line_exceeds_width_unless_single_word() {
        let f = face();
        let text = "the quick brown fox jumps over the lazy dog antidisestablishmentarianism ok";
        for max in [10, 30, 50, 90, 200] {
            for line in wrap_text(text, &f, max) {
                assert!(
                    f.measure(&line) <= max || !line.contains(' '),
                    "line {line:?} too wide for {max}"
                );
            }
        }
    }

    #[test]
    fn line_height_falls_back_to_font_size() {
        let f = BitmapFace::new(52.0);
        assert_eq!(line_height(&f, 1.35), 70);
        assert_eq!(line_height(&f, 0.0), 1);
    }

    #[test]
    fn layout_reports_widest_line() {
        let layout = layout_caption("aa bbbb", &face(), 20, 1.0);
        assert_eq!(layout.lines, vec!["aa", "bbbb"]);
        assert_eq!(layout.line_widths, vec![11, 23]);
        assert_eq!(layout.text_width(), 23);
        assert_eq!(layout.text_height(), 16);
    }
}
