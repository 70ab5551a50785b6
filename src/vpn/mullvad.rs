//! Mullvad CLI implementation of the VPN control surface.

use async_trait::async_trait;
use tracing::debug;

use super::{ProtocolPreference, VpnControl, VpnError};

/// Drives the `mullvad` binary via subprocess calls. Stateless: the daemon
/// owns all tunnel state, this is just the command channel to it.
pub struct MullvadCli {
    bin: String,
}

impl MullvadCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<String, VpnError> {
        let command = format!("{} {}", self.bin, args.join(" "));
        debug!(%command, "running mullvad command");

        let output = tokio::process::Command::new(&self.bin)
            .args(args)
            .output()
            .await
            .map_err(|source| VpnError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(VpnError::CommandFailed {
                command,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VpnControl for MullvadCli {
    async fn relay_list(&self) -> Result<String, VpnError> {
        self.run(&["relay", "list"]).await
    }

    async fn status(&self) -> Result<String, VpnError> {
        self.run(&["status"]).await
    }

    async fn disconnect(&self) -> Result<(), VpnError> {
        self.run(&["disconnect"]).await.map(drop)
    }

    async fn set_tunnel_protocol(&self, preference: ProtocolPreference) -> Result<(), VpnError> {
        self.run(&["relay", "set", "tunnel-protocol", preference.cli_token()])
            .await
            .map(drop)
    }

    async fn set_location(
        &self,
        country: &str,
        city: &str,
        hostname: &str,
    ) -> Result<(), VpnError> {
        self.run(&["relay", "set", "location", country, city, hostname])
            .await
            .map(drop)
    }

    async fn connect(&self) -> Result<(), VpnError> {
        self.run(&["connect"]).await.map(drop)
    }
}
