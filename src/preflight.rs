//! Preflight environment check: both external tools must answer a version
//! probe before any testing starts. A missing tool is the one fatal error
//! class in the whole program.

use thiserror::Error;
use tracing::info;

use crate::config::Settings;

#[derive(Debug, Error)]
pub enum PreflightError {
    #[error("{tool} not found or not responding ({hint})")]
    MissingTool { tool: String, hint: &'static str },
}

/// Verify the Mullvad CLI and speedtest-cli are installed and responding.
pub async fn check(settings: &Settings) -> Result<(), PreflightError> {
    probe(
        &settings.mullvad_bin,
        &["version"],
        "download from https://mullvad.net/download",
    )
    .await?;
    probe(
        &settings.speedtest_bin,
        &["--version"],
        "install with `pip install speedtest-cli`",
    )
    .await?;
    Ok(())
}

async fn probe(bin: &str, args: &[&str], hint: &'static str) -> Result<(), PreflightError> {
    match tokio::process::Command::new(bin).args(args).output().await {
        Ok(output) if output.status.success() => {
            info!(tool = %bin, "detected");
            Ok(())
        }
        _ => Err(PreflightError::MissingTool {
            tool: bin.to_string(),
            hint,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_reports_tool_and_hint() {
        let settings = Settings {
            mullvad_bin: "/nonexistent/mullvad-cli-for-test".to_string(),
            ..Settings::default()
        };
        let err = check(&settings).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/nonexistent/mullvad-cli-for-test"));
        assert!(message.contains("mullvad.net/download"));
    }
}
