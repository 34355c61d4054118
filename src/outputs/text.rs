use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write a plain-text file, creating its parent directory first.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_text(path: &Path, contents: &str) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create directory");
            return Err(e.into());
        }
    }
    fs::write(path, contents).await?;
    info!(chars = contents.chars().count(), "Wrote text file");
    Ok(())
}
