use std::path::Path;

use anyhow::Result;

use shortsmith::{AppConfig, CaptionRenderer};

pub fn cmd_caption(config: &AppConfig, text: &str, output: &Path) -> Result<()> {
    let renderer = CaptionRenderer::from_fonts(
        config.caption.clone(),
        config.font_path.as_deref(),
        &config.fonts_dir,
    );
    let artifact = renderer.render(text);
    artifact.save_png(output)?;

    eprintln!(
        "🖼️  {}x{} caption, {} line(s), font: {}",
        artifact.width(),
        artifact.height(),
        artifact.lines().len(),
        renderer.face().name()
    );
    println!("{}", output.display());
    Ok(())
}
