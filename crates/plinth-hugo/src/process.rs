//! Subprocess runner for the hugo executable.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

/// Errors from launching or running hugo.
#[derive(Debug, thiserror::Error)]
pub enum HugoError {
    #[error("Failed to launch {0}: {1}")]
    Launch(String, String),

    #[error("Hugo build failed with exit code {0}")]
    Failed(i32),

    #[error("Hugo was terminated by a signal")]
    Killed,
}

/// Run hugo to completion with inherited standard streams.
///
/// Resolves once the process exits; a non-zero exit status becomes an
/// error carrying the code. Callers decide how to surface the failure.
pub async fn run_hugo(bin: &Path, args: &[String]) -> Result<(), HugoError> {
    tracing::debug!("Running {} {}", bin.display(), args.join(" "));

    let status = Command::new(bin)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| HugoError::Launch(bin.display().to_string(), e.to_string()))?;

    if status.success() {
        return Ok(());
    }

    match status.code() {
        Some(code) => Err(HugoError::Failed(code)),
        None => Err(HugoError::Killed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_resolves_ok() {
        let result = run_hugo(Path::new("sh"), &["-c".into(), "exit 0".into()]).await;
        assert!(result.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_carries_the_code() {
        let result = run_hugo(Path::new("sh"), &["-c".into(), "exit 3".into()]).await;
        match result {
            Err(HugoError::Failed(3)) => {}
            other => panic!("expected Failed(3), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_error() {
        let result = run_hugo(Path::new("./bin/definitely-not-hugo"), &[]).await;
        match result {
            Err(HugoError::Launch(bin, _)) => assert!(bin.contains("definitely-not-hugo")),
            other => panic!("expected Launch error, got {:?}", other),
        }
    }
}
