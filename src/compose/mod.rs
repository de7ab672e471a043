//! Layout planning and ffmpeg composition
//!
//! A [`LayoutPlan`] places the video, caption and logo on the 1080×1920
//! canvas; [`build_filter_graph`] turns it into an ffmpeg filter graph and
//! the [`Compositor`] runs the encode.

pub mod compositor;
pub mod graph;
pub mod layout;

pub use compositor::{Compositor, CompositorConfig, EncodeJob, EncoderPreference, VideoEncoder};
pub use graph::{build_filter_graph, OUTPUT_LABEL};
pub use layout::{
    logo_dimensions, logo_display_height, plan, plan_full, plan_mid, Layer, LayerKind,
    LayoutMode, LayoutPlan, Placement, Size, ACCENT_COLOR, CANVAS, LOGO_WIDTH,
};
