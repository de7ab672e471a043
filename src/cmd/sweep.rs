use anyhow::Result;

use shortsmith::{sweep_once, AppConfig, OutputSweeper};

pub async fn cmd_sweep(config: &AppConfig, watch: bool) -> Result<()> {
    if !watch {
        let removed = sweep_once(&config.output_dir, config.ttl())?;
        println!("🧹 Removed {removed} expired file(s) from {}", config.output_dir.display());
        return Ok(());
    }

    eprintln!(
        "🧹 Sweeping {} every {}s (TTL {}s), Ctrl-C to stop",
        config.output_dir.display(),
        config.clean_interval_seconds,
        config.ttl_seconds
    );
    let handle =
        OutputSweeper::new(&config.output_dir, config.ttl(), config.clean_interval()).spawn();
    tokio::signal::ctrl_c().await?;
    handle.stop().await;
    Ok(())
}
