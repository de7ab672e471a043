//! Canvas layout planning for the two composition modes.
//!
//! All coordinates are relative to the fixed 1080×1920 canvas. Placements
//! may be negative or extend past the canvas edges (an oversized Mid-mode
//! source is cropped by the overlay step, which is accepted).

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CaptionError, LayoutError};

/// Output canvas.
pub const CANVAS: Size = Size::new(1080, 1920);
/// Background fill behind the Full-mode layout.
pub const ACCENT_COLOR: &str = "0x00BCD5";
/// Display width of the logo; height follows the image aspect ratio.
pub const LOGO_WIDTH: u32 = 120;
/// Full mode: logo offset from the top-left corner.
pub const LOGO_MARGIN: i64 = 40;
/// Full mode: lowest caption top edge.
pub const CAPTION_MIN_Y: i64 = 80;
/// Full mode: gap between logo bottom and caption top.
pub const CAPTION_LOGO_GAP: i64 = 20;
/// Full mode: gap between caption bottom and video top.
pub const VIDEO_CAPTION_GAP: i64 = 40;
/// Full mode: smallest usable video area height.
pub const MIN_VIDEO_SPACE: i64 = 10;
/// Mid mode: logo top relative to the video's top edge.
pub const MID_LOGO_OFFSET: i64 = 60;
/// Mid mode: caption top relative to the video's top edge.
pub const MID_CAPTION_OFFSET: i64 = 235;

/// Composition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Video scaled below the caption on an accent background.
    #[default]
    Full,
    /// Video at native size, centered, with caption and logo over it.
    Mid,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Mid => "mid",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "mid" => Ok(Self::Mid),
            other => Err(format!("unknown layout mode '{other}' (expected full or mid)")),
        }
    }
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn w(self) -> i64 {
        i64::from(self.width)
    }

    fn h(self) -> i64 {
        i64::from(self.height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = String;

    /// Parses `WIDTHxHEIGHT`, e.g. `1920x1080`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
        let width = w.trim().parse().map_err(|_| format!("invalid width '{w}'"))?;
        let height = h.trim().parse().map_err(|_| format!("invalid height '{h}'"))?;
        Ok(Self { width, height })
    }
}

/// Top-left corner of a layer on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
}

impl Placement {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Narrow planner coordinates, which are computed in `i64`.
    fn checked(x: i64, y: i64, layer: &'static str) -> Result<Self, LayoutError> {
        match (i32::try_from(x), i32::try_from(y)) {
            (Ok(x), Ok(y)) => Ok(Self { x, y }),
            _ => Err(LayoutError::OutOfRange { layer }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Background,
    Video,
    Caption,
    Logo,
}

/// One entry of the stacking order, bottom first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layer {
    pub kind: LayerKind,
    pub at: Placement,
    pub size: Size,
}

/// Where every layer goes, plus the order they are stacked in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutPlan {
    pub mode: LayoutMode,
    pub canvas: Size,
    pub video: Placement,
    /// Size the video is drawn at (native size in Mid mode).
    pub scaled_video: Size,
    pub caption: Placement,
    pub caption_size: Size,
    pub logo: Placement,
    pub logo_size: Size,
}

impl LayoutPlan {
    /// Layers in stacking order: background, video, caption, logo for Full;
    /// video, logo, caption for Mid (the video itself is the base).
    pub fn layers(&self) -> Vec<Layer> {
        let video = Layer {
            kind: LayerKind::Video,
            at: self.video,
            size: self.scaled_video,
        };
        let caption = Layer {
            kind: LayerKind::Caption,
            at: self.caption,
            size: self.caption_size,
        };
        let logo = Layer {
            kind: LayerKind::Logo,
            at: self.logo,
            size: self.logo_size,
        };
        match self.mode {
            LayoutMode::Full => {
                let background = Layer {
                    kind: LayerKind::Background,
                    at: Placement::default(),
                    size: self.canvas,
                };
                vec![background, video, caption, logo]
            }
            LayoutMode::Mid => vec![video, logo, caption],
        }
    }
}

/// Aspect-preserving logo height at [`LOGO_WIDTH`]; 0 for a zero-width logo.
pub fn logo_display_height(logo: Size) -> u32 {
    if logo.width == 0 {
        return 0;
    }
    (f64::from(LOGO_WIDTH) * f64::from(logo.height) / f64::from(logo.width)).round() as u32
}

/// Read the logo's pixel size from its image header.
pub fn logo_dimensions(path: &Path) -> Result<Size, CaptionError> {
    let (width, height) = image::image_dimensions(path)?;
    Ok(Size::new(width, height))
}

/// Plan a layout in either mode.
pub fn plan(
    mode: LayoutMode,
    video: Size,
    caption: Size,
    logo: Size,
    canvas: Size,
) -> Result<LayoutPlan, LayoutError> {
    match mode {
        LayoutMode::Full => plan_full(video, caption, logo, canvas),
        LayoutMode::Mid => plan_mid(video, caption, logo, canvas),
    }
}

fn ensure_video(video: Size) -> Result<(), LayoutError> {
    if video.width == 0 || video.height == 0 {
        return Err(LayoutError::EmptyVideo {
            width: video.width,
            height: video.height,
        });
    }
    Ok(())
}

/// Largest size that fits `video` into `bounds` without upscaling.
fn fit_within(video: Size, bounds: Size) -> Size {
    if video.width <= bounds.width && video.height <= bounds.height {
        return video;
    }
    let (w, h) = (u64::from(video.width), u64::from(video.height));
    let (bw, bh) = (u64::from(bounds.width), u64::from(bounds.height));
    // bw/w <= bh/h: width is the binding side
    let (sw, sh) = if bw * h <= bh * w {
        (bw, h * bw / w)
    } else {
        (w * bh / h, bh)
    };
    Size::new((sw as u32).max(1), (sh as u32).max(1))
}

/// Logo top-left, caption centered beneath it, video scaled into the
/// remaining space.
pub fn plan_full(
    video: Size,
    caption: Size,
    logo: Size,
    canvas: Size,
) -> Result<LayoutPlan, LayoutError> {
    ensure_video(video)?;
    let logo_size = Size::new(LOGO_WIDTH, logo_display_height(logo));

    let caption_y = CAPTION_MIN_Y.max(LOGO_MARGIN + logo_size.h() + CAPTION_LOGO_GAP);
    let caption_x = (canvas.w() - caption.w()).div_euclid(2);

    let video_top = caption_y + caption.h() + VIDEO_CAPTION_GAP;
    let available = canvas.h() - video_top;
    if available < MIN_VIDEO_SPACE {
        return Err(LayoutError::InsufficientSpace {
            available,
            minimum: MIN_VIDEO_SPACE,
        });
    }

    // available <= canvas height here
    let available_h =
        u32::try_from(available).map_err(|_| LayoutError::OutOfRange { layer: "video" })?;
    let scaled_video = fit_within(video, Size::new(canvas.width, available_h));
    let video_x = (canvas.w() - scaled_video.w()).div_euclid(2);

    Ok(LayoutPlan {
        mode: LayoutMode::Full,
        canvas,
        video: Placement::checked(video_x, video_top, "video")?,
        scaled_video,
        caption: Placement::checked(caption_x, caption_y, "caption")?,
        caption_size: caption,
        logo: Placement::checked(LOGO_MARGIN, LOGO_MARGIN, "logo")?,
        logo_size,
    })
}

/// Video at native size in the middle of the canvas; logo and caption
/// centered over it at fixed offsets from its top edge.
pub fn plan_mid(
    video: Size,
    caption: Size,
    logo: Size,
    canvas: Size,
) -> Result<LayoutPlan, LayoutError> {
    ensure_video(video)?;
    let logo_size = Size::new(LOGO_WIDTH, logo_display_height(logo));

    let vid_x = (canvas.w() - video.w()).div_euclid(2);
    let vid_y = (canvas.h() - video.h()).div_euclid(2);

    Ok(LayoutPlan {
        mode: LayoutMode::Mid,
        canvas,
        video: Placement::checked(vid_x, vid_y, "video")?,
        scaled_video: video,
        caption: Placement::checked(
            vid_x + (video.w() - caption.w()).div_euclid(2),
            vid_y + MID_CAPTION_OFFSET,
            "caption",
        )?,
        caption_size: caption,
        logo: Placement::checked(
            vid_x + (video.w() - logo_size.w()).div_euclid(2),
            vid_y + MID_LOGO_OFFSET,
            "logo",
        )?,
        logo_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGO: Size = Size::new(600, 300);

    #[test]
    fn logo_height_preserves_aspect() {
        assert_eq!(logo_display_height(Size::new(600, 300)), 60);
        assert_eq!(logo_display_height(Size::new(120, 120)), 120);
        assert_eq!(logo_display_height(Size::new(7, 3)), 51);
        assert_eq!(logo_display_height(Size::new(0, 50)), 0);
    }

    #[test]
    fn full_places_logo_then_caption_then_video() {
        let plan = plan_full(Size::new(1920, 1080), Size::new(500, 90), LOGO, CANVAS).unwrap();
        assert_eq!(plan.logo, Placement::new(40, 40));
        assert_eq!(plan.logo_size, Size::new(120, 60));
        // 40 + 60 + 20 = 120 > 80
        assert_eq!(plan.caption, Placement::new(290, 120));
        assert_eq!(plan.video.y, 120 + 90 + 40);
        // width-bound: 1920x1080 -> 1080x607
        assert_eq!(plan.scaled_video, Size::new(1080, 607));
        assert_eq!(plan.video.x, 0);
    }

    #[test]
    fn full_caption_never_above_min_y() {
        let plan =
            plan_full(Size::new(100, 100), Size::new(100, 50), Size::new(120, 1), CANVAS).unwrap();
        assert_eq!(i64::from(plan.caption.y), CAPTION_MIN_Y);
    }

    #[test]
    fn full_never_upscales() {
        let plan = plan_full(Size::new(320, 240), Size::new(200, 90), LOGO, CANVAS).unwrap();
        assert_eq!(plan.scaled_video, Size::new(320, 240));
        assert_eq!(plan.video.x, (1080 - 320) / 2);
    }

    #[test]
    fn full_height_bound_video() {
        let plan = plan_full(Size::new(1080, 1920), Size::new(900, 200), LOGO, CANVAS).unwrap();
        let available = 1920 - (120 + 200 + 40);
        assert_eq!(plan.scaled_video.height, available as u32);
        assert!(plan.scaled_video.width < 1080);
        assert_eq!(i64::from(plan.video.x), (1080 - plan.scaled_video.w()).div_euclid(2));
    }

    #[test]
    fn full_fails_below_min_space() {
        // caption_y = 120, video_top = 120 + cap + 40; available = 1760 - cap
        let err = plan_full(Size::new(100, 100), Size::new(500, 1751), LOGO, CANVAS).unwrap_err();
        assert_eq!(
            err,
            LayoutError::InsufficientSpace {
                available: 9,
                minimum: 10
            }
        );
        let ok = plan_full(Size::new(100, 100), Size::new(500, 1750), LOGO, CANVAS).unwrap();
        assert_eq!(ok.scaled_video, Size::new(10, 10));
    }

    #[test]
    fn full_space_invariant_holds() {
        for cap_h in (0..1900).step_by(37) {
            for (vw, vh) in [(1920, 1080), (1080, 1920), (4000, 10), (10, 4000), (1, 1)] {
                let caption = Size::new(700, cap_h);
                let available = 1920 - (120 + i64::from(cap_h) + 40);
                match plan_full(Size::new(vw, vh), caption, LOGO, CANVAS) {
                    Ok(plan) => {
                        assert!(available >= MIN_VIDEO_SPACE);
                        assert!(plan.scaled_video.h() <= available);
                        assert!(plan.scaled_video.width <= CANVAS.width);
                        assert!(plan.scaled_video.width >= 1 && plan.scaled_video.height >= 1);
                    }
                    Err(LayoutError::InsufficientSpace { available: a, .. }) => {
                        assert_eq!(a, available);
                        assert!(available < MIN_VIDEO_SPACE);
                    }
                    Err(other) => panic!("unexpected {other:?}"),
                }
            }
        }
    }

    #[test]
    fn mid_centers_native_video() {
        let plan = plan_mid(Size::new(720, 1280), Size::new(400, 90), LOGO, CANVAS).unwrap();
        assert_eq!(plan.scaled_video, Size::new(720, 1280));
        assert_eq!(plan.video, Placement::new(180, 320));
        assert_eq!(plan.logo, Placement::new(180 + 300, 320 + 60));
        assert_eq!(plan.caption, Placement::new(180 + 160, 320 + 235));
    }

    #[test]
    fn full_huge_caption_is_insufficient_space() {
        let caption = Size::new(500, 3_000_000_000);
        let err = plan_full(Size::new(640, 360), caption, LOGO, CANVAS).unwrap_err();
        assert_eq!(
            err,
            LayoutError::InsufficientSpace {
                available: 1920 - (120 + 3_000_000_000 + 40),
                minimum: 10
            }
        );
    }

    #[test]
    fn full_coordinates_past_i32_are_rejected() {
        let tall = Size::new(1080, u32::MAX);
        let caption = Size::new(500, 3_000_000_000);
        let err = plan_full(Size::new(640, 360), caption, LOGO, tall).unwrap_err();
        assert_eq!(err, LayoutError::OutOfRange { layer: "video" });
    }

    #[test]
    fn mid_handles_videos_wider_than_i32() {
        let caption = Size::new(400, 90);
        let plan = plan_mid(Size::new(2_147_483_648, 100), caption, LOGO, CANVAS).unwrap();
        assert_eq!(plan.video, Placement::new(-1_073_741_284, 910));
        assert_eq!(plan.caption.x, 340);

        let widest = plan_mid(Size::new(u32::MAX, u32::MAX), caption, LOGO, CANVAS).unwrap();
        assert_eq!(widest.video.x, -2_147_483_108);
        assert_eq!(widest.video.y, -2_147_482_688);
    }

    #[test]
    fn mid_oversized_video_goes_negative() {
        let plan = plan_mid(Size::new(1921, 2001), Size::new(400, 90), LOGO, CANVAS).unwrap();
        assert_eq!(plan.video, Placement::new(-421, -41));
        assert_eq!(plan.scaled_video, Size::new(1921, 2001));
    }

    #[test]
    fn zero_sized_video_is_rejected() {
        for mode in [LayoutMode::Full, LayoutMode::Mid] {
            let err = plan(mode, Size::new(0, 720), Size::new(10, 10), LOGO, CANVAS).unwrap_err();
            assert!(matches!(err, LayoutError::EmptyVideo { .. }));
        }
    }

    #[test]
    fn layer_order_per_mode() {
        let kinds = |mode| {
            plan(mode, Size::new(640, 360), Size::new(300, 90), LOGO, CANVAS)
                .unwrap()
                .layers()
                .iter()
                .map(|l| l.kind)
                .collect::<Vec<_>>()
        };
        assert_eq!(
            kinds(LayoutMode::Full),
            vec![LayerKind::Background, LayerKind::Video, LayerKind::Caption, LayerKind::Logo]
        );
        assert_eq!(
            kinds(LayoutMode::Mid),
            vec![LayerKind::Video, LayerKind::Logo, LayerKind::Caption]
        );
    }

    #[test]
    fn parse_mode_and_size() {
        assert_eq!("FULL".parse::<LayoutMode>().unwrap(), LayoutMode::Full);
        assert_eq!("mid".parse::<LayoutMode>().unwrap(), LayoutMode::Mid);
        assert!("wide".parse::<LayoutMode>().is_err());
        assert_eq!("1920x1080".parse::<Size>().unwrap(), Size::new(1920, 1080));
        assert!("1920".parse::<Size>().is_err());
        assert!("ax1".parse::<Size>().is_err());
    }

    #[test]
    fn logo_dimensions_reads_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        image::RgbaImage::new(30, 12).save(&path).unwrap();
        assert_eq!(logo_dimensions(&path).unwrap(), Size::new(30, 12));
        assert!(logo_dimensions(&dir.path().join("missing.png")).is_err());
    }
}
