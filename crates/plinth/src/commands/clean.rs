//! Remove the output directory.

use std::path::Path;

use anyhow::Result;

/// Delete the output directory. A directory that is already gone counts
/// as cleaned.
pub async fn run(output: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(output).await {
        Ok(()) => {
            tracing::info!("Removed {}", output.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::anyhow!(
            "Failed to remove {}: {}",
            output.display(),
            e
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn removes_the_directory() {
        let temp = tempdir().unwrap();
        let out = temp.path().join("dist");
        std::fs::create_dir_all(out.join("css")).unwrap();
        std::fs::write(out.join("css/main.css"), "body{}").unwrap();

        run(&out).await.unwrap();

        assert!(!out.exists());
    }

    #[tokio::test]
    async fn absent_directory_is_already_clean() {
        let temp = tempdir().unwrap();
        run(&temp.path().join("never-built")).await.unwrap();
    }
}
