//! Measurement runner: one `speedtest-cli --simple` invocation under a hard
//! timeout, parsed into ping/download/upload.
//!
//! Every failure mode collapses to the same outcome. Whether the tool timed
//! out, crashed, or printed something unparseable, the caller only learns
//! "no measurement" and skips the relay; the cause is logged here at debug.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// The three metrics one speed test yields. All non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedMetrics {
    pub ping_ms: f64,
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

/// Uniform measurement failure, deliberately cause-free.
#[derive(Debug, Error)]
#[error("speed test produced no measurement")]
pub struct NoMeasurement;

/// Seam for the measurement tool so the orchestrator can be exercised
/// without network access.
#[async_trait]
pub trait Measurer: Send + Sync {
    async fn measure(&self) -> Result<SpeedMetrics, NoMeasurement>;
}

/// Runs the real speedtest-cli binary.
pub struct SpeedtestCli {
    bin: String,
    timeout: Duration,
}

impl SpeedtestCli {
    pub fn new(bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Measurer for SpeedtestCli {
    async fn measure(&self) -> Result<SpeedMetrics, NoMeasurement> {
        let mut command = tokio::process::Command::new(&self.bin);
        command.arg("--simple").kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!(bin = %self.bin, error = %e, "speed test failed to spawn");
                return Err(NoMeasurement);
            }
            Err(_) => {
                debug!(timeout_secs = self.timeout.as_secs(), "speed test timed out");
                return Err(NoMeasurement);
            }
        };

        if !output.status.success() {
            debug!(
                code = output.status.code().unwrap_or(-1),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "speed test exited non-zero"
            );
            return Err(NoMeasurement);
        }

        parse_simple_output(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            debug!("speed test output missing one or more metrics");
            NoMeasurement
        })
    }
}

/// Parse `speedtest-cli --simple` output:
///
/// ```text
/// Ping: 23.512 ms
/// Download: 87.33 Mbit/s
/// Upload: 41.02 Mbit/s
/// ```
///
/// All three labeled lines must be present and numeric.
pub fn parse_simple_output(text: &str) -> Option<SpeedMetrics> {
    let mut ping = None;
    let mut download = None;
    let mut upload = None;

    for line in text.lines() {
        let Some((label, rest)) = line.split_once(':') else {
            continue;
        };
        let value = rest.trim().split_whitespace().next();
        match label.trim() {
            "Ping" => ping = value.and_then(|v| v.parse().ok()),
            "Download" => download = value.and_then(|v| v.parse().ok()),
            "Upload" => upload = value.and_then(|v| v.parse().ok()),
            _ => {}
        }
    }

    match (ping, download, upload) {
        (Some(ping_ms), Some(download_mbps), Some(upload_mbps)) => Some(SpeedMetrics {
            ping_ms,
            download_mbps,
            upload_mbps,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_complete_output() {
        let text = "Ping: 23.512 ms\nDownload: 87.33 Mbit/s\nUpload: 41.02 Mbit/s\n";
        let metrics = parse_simple_output(text).unwrap();
        assert_eq!(metrics.ping_ms, 23.512);
        assert_eq!(metrics.download_mbps, 87.33);
        assert_eq!(metrics.upload_mbps, 41.02);
    }

    #[test]
    fn test_parse_tolerates_extra_lines() {
        let text = "Retrieving speedtest.net configuration...\n\
                    Ping: 10.0 ms\n\
                    Download: 50.5 Mbit/s\n\
                    Upload: 20.25 Mbit/s\n\
                    Share results: http://example.invalid\n";
        assert!(parse_simple_output(text).is_some());
    }

    #[test]
    fn test_parse_missing_metric_is_no_measurement() {
        let text = "Ping: 23.512 ms\nDownload: 87.33 Mbit/s\n";
        assert!(parse_simple_output(text).is_none());
    }

    #[test]
    fn test_parse_non_numeric_value_is_no_measurement() {
        let text = "Ping: fast ms\nDownload: 87.33 Mbit/s\nUpload: 41.02 Mbit/s\n";
        assert!(parse_simple_output(text).is_none());
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_simple_output("").is_none());
    }
}
