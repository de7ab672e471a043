use anyhow::{Context, Result};
use serde_json::json;

use shortsmith::compose::{build_filter_graph, logo_dimensions, plan, CANVAS};
use shortsmith::{AppConfig, LayoutMode, Size};

pub fn cmd_plan(
    config: &AppConfig,
    mode: LayoutMode,
    video: Size,
    caption: Size,
    logo: Option<Size>,
) -> Result<()> {
    let logo = match logo {
        Some(size) => size,
        None => logo_dimensions(&config.logo_path)
            .with_context(|| {
                format!("cannot read logo {} (pass --logo WxH)", config.logo_path.display())
            })?,
    };

    let layout = plan(mode, video, caption, logo, CANVAS)?;
    let report = json!({
        "plan": layout,
        "layers": layout.layers(),
        "filter_graph": build_filter_graph(&layout),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
