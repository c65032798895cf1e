//! Deployment self-check: config parses, cache root is writable, FFmpeg exists.

use rsend_render::RenderConfig;
use rsend_storage::{CacheStore, LocalCacheStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = RenderConfig::from_env()?;
    println!(
        "rsend-selfcheck: cache_root={} max_age={}s",
        config.cache_root.display(),
        config.max_age.as_secs()
    );

    ensure_cache_root(&config).await?;
    ensure_ffmpeg()?;

    println!("rsend-selfcheck: ok");
    Ok(())
}

async fn ensure_cache_root(config: &RenderConfig) -> anyhow::Result<()> {
    let store = LocalCacheStore::init(&config.cache_root).await?;
    let staged = store.stage("check").await?;
    tokio::fs::write(staged.path(), b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("cache root is not writable: {}", e))?;
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let path = rsend_media::check_ffmpeg()
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    println!("rsend-selfcheck: ffmpeg at {}", path.display());
    Ok(())
}
