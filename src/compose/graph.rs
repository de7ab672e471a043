//! ffmpeg `-filter_complex` generation from a [`LayoutPlan`].
//!
//! Input order is fixed: the canvas fill, the source video, the looped
//! caption PNG and the logo. The canvas fill is always the base stream, so a
//! plan's background layer contributes no filter of its own.

use super::layout::{LayerKind, LayoutPlan};

pub const BACKGROUND_INPUT: usize = 0;
pub const VIDEO_INPUT: usize = 1;
pub const CAPTION_INPUT: usize = 2;
pub const LOGO_INPUT: usize = 3;

/// Label of the final composited stream.
pub const OUTPUT_LABEL: &str = "vout";

/// Build the filter graph that stacks the plan's layers in order.
pub fn build_filter_graph(plan: &LayoutPlan) -> String {
    let mut chains = vec![
        format!(
            "[{VIDEO_INPUT}:v]scale={}:{}[vid]",
            plan.scaled_video.width, plan.scaled_video.height
        ),
        format!("[{LOGO_INPUT}:v]scale={}:{}[logo]", plan.logo_size.width, logo_height_arg(plan)),
    ];

    let layers: Vec<_> = plan
        .layers()
        .into_iter()
        .filter(|l| l.kind != LayerKind::Background)
        .collect();

    let mut base = format!("{BACKGROUND_INPUT}:v");
    for (i, layer) in layers.iter().enumerate() {
        let out = if i + 1 == layers.len() {
            OUTPUT_LABEL.to_string()
        } else {
            format!("l{i}")
        };
        let (stream, alpha) = match layer.kind {
            LayerKind::Video => ("vid".to_string(), false),
            LayerKind::Caption => (format!("{CAPTION_INPUT}:v"), true),
            LayerKind::Logo => ("logo".to_string(), true),
            LayerKind::Background => continue,
        };
        let format = if alpha { ":format=auto" } else { "" };
        chains.push(format!(
            "[{base}][{stream}]overlay=x={}:y={}{format}[{out}]",
            layer.at.x, layer.at.y
        ));
        base = out;
    }

    chains.join(";")
}

// scale=W:0 would keep the source height, -1 keeps the aspect ratio instead
fn logo_height_arg(plan: &LayoutPlan) -> String {
    match plan.logo_size.height {
        0 => "-1".to_string(),
        h => h.to_string(),
    }
}
