use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use shortsmith::{AppConfig, BatchRenderer, LayoutMode, Manifest, RenderItem, RenderRequest};

/// Split `SOURCE::CAPTION`. A missing separator means an empty caption.
fn parse_item(arg: &str) -> RenderItem {
    let (source, caption) = arg.split_once("::").unwrap_or((arg, ""));
    RenderItem::from_fields(caption.trim(), None, Some(source.trim().to_string()))
}

fn build_request(
    mode: Option<LayoutMode>,
    items: &[String],
    manifest: Option<&Path>,
) -> Result<RenderRequest> {
    let mut request = match manifest {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read manifest {}", path.display()))?;
            Manifest::from_toml(&content)
                .with_context(|| format!("invalid manifest {}", path.display()))?
                .into_request()
        }
        None => RenderRequest {
            mode: LayoutMode::default(),
            items: items.iter().map(|s| parse_item(s)).collect(),
        },
    };
    if let Some(mode) = mode {
        request.mode = mode;
    }
    Ok(request)
}

pub async fn cmd_render(
    config: &AppConfig,
    mode: Option<LayoutMode>,
    items: &[String],
    manifest: Option<&Path>,
) -> Result<()> {
    let request = build_request(mode, items, manifest)?;
    eprintln!("🎬 Rendering {} item(s) in {} mode", request.items.len(), request.mode);

    let renderer = BatchRenderer::from_config(config)?;
    let outcome = renderer.run(&request).await?;

    for name in &outcome.produced {
        println!("{}", PathBuf::from(renderer.output_dir()).join(name).display());
    }
    for failure in &outcome.failures {
        eprintln!("❌ Item {} ({:?}): {}", failure.index + 1, failure.caption, failure.error);
    }
    if outcome.skipped > 0 {
        eprintln!("⏭️  Skipped {} item(s) without a source", outcome.skipped);
    }
    eprintln!("{}", outcome.notice());

    if !outcome.failures.is_empty() {
        bail!("{} item(s) failed", outcome.failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shortsmith::ItemSource;

    #[test]
    fn parse_item_with_link() {
        let item = parse_item("https://drive.google.com/file/d/ABC/view::Big news");
        assert_eq!(item.caption, "Big news");
        assert_eq!(
            item.source,
            Some(ItemSource::Link("https://drive.google.com/file/d/ABC/view".into()))
        );
    }

    #[test]
    fn parse_item_with_path_and_no_caption() {
        let item = parse_item("clips/a.mp4");
        assert_eq!(item.caption, "");
        assert_eq!(item.source, Some(ItemSource::Upload(PathBuf::from("clips/a.mp4"))));
    }

    #[test]
    fn parse_item_blank_source() {
        assert_eq!(parse_item("::caption only").source, None);
    }

    #[test]
    fn mode_flag_overrides_default() {
        let items = ["a.mp4::x".to_string()];
        let request = build_request(Some(LayoutMode::Mid), &items, None).unwrap();
        assert_eq!(request.mode, LayoutMode::Mid);
        assert_eq!(request.items.len(), 1);
    }
}
