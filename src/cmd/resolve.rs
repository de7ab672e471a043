use std::path::Path;

use anyhow::Result;

use shortsmith::{AppConfig, DownloadClient, LinkResolver};

pub async fn cmd_resolve(config: &AppConfig, url: &str, output: &Path) -> Result<()> {
    let resolver = LinkResolver::new(DownloadClient::with_config(&config.http)?);
    let provider = resolver.classify(url);
    eprintln!("🔗 Provider: {provider}");

    let bytes = resolver.resolve_to(url, output).await?;
    eprintln!("💾 Saved {bytes} bytes");
    println!("{}", output.display());
    Ok(())
}
