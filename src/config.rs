//! Runtime settings: external binary names, settle intervals, and the
//! measurement timeout. Loaded from an optional TOML file, defaulting to
//! the values the Mullvad client needs to stabilize between commands.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Mullvad CLI binary.
    pub mullvad_bin: String,

    /// speedtest-cli binary.
    pub speedtest_bin: String,

    /// Settle time after issuing a disconnect.
    pub disconnect_settle_secs: u64,

    /// Settle time after issuing a connect, before verifying status.
    pub connect_settle_secs: u64,

    /// Settle time after switching tunnel protocol.
    pub protocol_settle_secs: u64,

    /// Hard wall-clock limit for one speed test run.
    pub measure_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mullvad_bin: "mullvad".to_string(),
            speedtest_bin: "speedtest-cli".to_string(),
            disconnect_settle_secs: 1,
            connect_settle_secs: 5,
            protocol_settle_secs: 2,
            measure_timeout_secs: 60,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.display().to_string(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: p.display().to_string(),
                    source,
                })
            }
            None => Ok(Self::default()),
        }
    }

    pub fn disconnect_settle(&self) -> Duration {
        Duration::from_secs(self.disconnect_settle_secs)
    }

    pub fn connect_settle(&self) -> Duration {
        Duration::from_secs(self.connect_settle_secs)
    }

    pub fn protocol_settle(&self) -> Duration {
        Duration::from_secs(self.protocol_settle_secs)
    }

    pub fn measure_timeout(&self) -> Duration {
        Duration::from_secs(self.measure_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.mullvad_bin, "mullvad");
        assert_eq!(settings.speedtest_bin, "speedtest-cli");
        assert_eq!(settings.connect_settle(), Duration::from_secs(5));
        assert_eq!(settings.measure_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_without_path_uses_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.disconnect_settle_secs, 1);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "measure_timeout_secs = 120").unwrap();
        writeln!(file, "speedtest_bin = \"/usr/local/bin/speedtest-cli\"").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.measure_timeout_secs, 120);
        assert_eq!(settings.speedtest_bin, "/usr/local/bin/speedtest-cli");
        assert_eq!(settings.mullvad_bin, "mullvad");
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/relaybench.toml")));
        assert!(matches!(err, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "measure_timeout_secs = \"not a number\"").unwrap();

        let err = Settings::load(Some(file.path()));
        assert!(matches!(err, Err(ConfigError::Parse { .. })));
    }
}
