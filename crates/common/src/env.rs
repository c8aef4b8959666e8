//! Startup checks for the data directory.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Create `data_dir` if missing and return the path of the document store file inside it.
pub async fn ensure_data_dir(data_dir: &str) -> anyhow::Result<PathBuf> {
    let dir = Path::new(data_dir);
    if tokio::fs::metadata(dir).await.is_err() {
        warn!(%data_dir, "data directory not found; creating it");
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {data_dir}: {e}"))?;
    let store = dir.join("store.json");
    info!(path = %store.display(), "using document store");
    Ok(store)
}
