//! Per-relay connection controller.
//!
//! One connection attempt walks a fixed sequence against the VPN client:
//! disconnect, settle, pin the relay location, connect, settle, verify via
//! status. Disconnect and location-set results are deliberately ignored
//! (the daemon treats both as idempotent hints); connect failure and a
//! status without an active tunnel end the attempt.

use tokio::time::sleep;
use tracing::{debug, warn};

use super::VpnControl;
use crate::config::Settings;

/// Where a connection attempt currently is. Terminal states are
/// `Connected` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Idle,
    Disconnecting,
    Configured,
    Connecting,
    Verifying,
    Connected,
    Failed,
}

/// Drives one relay connection attempt at a time. Holds no state between
/// attempts beyond the last terminal position.
pub struct ConnectionController<'a> {
    vpn: &'a dyn VpnControl,
    settings: &'a Settings,
    state: ConnectState,
}

impl<'a> ConnectionController<'a> {
    pub fn new(vpn: &'a dyn VpnControl, settings: &'a Settings) -> Self {
        Self {
            vpn,
            settings,
            state: ConnectState::Idle,
        }
    }

    pub fn state(&self) -> ConnectState {
        self.state
    }

    /// Attempt to bring the tunnel up on the given relay. Returns true when
    /// the client reports an active connection afterwards. No retries: the
    /// caller decides whether to move on.
    pub async fn connect_to(&mut self, hostname: &str) -> bool {
        self.state = ConnectState::Idle;

        // Hostname convention: <country-code>-<city-code>-<server-id>...
        let parts: Vec<&str> = hostname.split('-').collect();
        if parts.len() < 3 {
            warn!(server = %hostname, "hostname does not follow cc-city-server convention");
            self.state = ConnectState::Failed;
            return false;
        }
        let (country_code, city_code) = (parts[0], parts[1]);

        self.state = ConnectState::Disconnecting;
        if let Err(e) = self.vpn.disconnect().await {
            debug!(error = %e, "disconnect before reconnect failed (ignored)");
        }
        sleep(self.settings.disconnect_settle()).await;

        if let Err(e) = self.vpn.set_location(country_code, city_code, hostname).await {
            debug!(error = %e, "location pin failed (ignored)");
        }
        self.state = ConnectState::Configured;

        self.state = ConnectState::Connecting;
        if let Err(e) = self.vpn.connect().await {
            warn!(server = %hostname, error = %e, "connect command failed");
            self.state = ConnectState::Failed;
            return false;
        }
        sleep(self.settings.connect_settle()).await;

        self.state = ConnectState::Verifying;
        match self.vpn.status().await {
            Ok(status) if status.contains("Connected") => {
                self.state = ConnectState::Connected;
                true
            }
            Ok(status) => {
                warn!(server = %hostname, status = %status.trim(), "tunnel did not come up");
                self.state = ConnectState::Failed;
                false
            }
            Err(e) => {
                warn!(server = %hostname, error = %e, "status check failed");
                self.state = ConnectState::Failed;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vpn::{ProtocolPreference, VpnError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn fast_settings() -> Settings {
        Settings {
            disconnect_settle_secs: 0,
            connect_settle_secs: 0,
            protocol_settle_secs: 0,
            ..Settings::default()
        }
    }

    /// Scripted control surface: records calls, answers connect and status
    /// from a fixed script.
    struct ScriptedVpn {
        calls: Mutex<Vec<String>>,
        connect_ok: bool,
        status: &'static str,
    }

    impl ScriptedVpn {
        fn new(connect_ok: bool, status: &'static str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                connect_ok,
                status,
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VpnControl for ScriptedVpn {
        async fn relay_list(&self) -> Result<String, VpnError> {
            self.record("relay_list");
            Ok(String::new())
        }

        async fn status(&self) -> Result<String, VpnError> {
            self.record("status");
            Ok(self.status.to_string())
        }

        async fn disconnect(&self) -> Result<(), VpnError> {
            self.record("disconnect");
            Ok(())
        }

        async fn set_tunnel_protocol(
            &self,
            preference: ProtocolPreference,
        ) -> Result<(), VpnError> {
            self.record(format!("set_tunnel_protocol {}", preference.cli_token()));
            Ok(())
        }

        async fn set_location(
            &self,
            country: &str,
            city: &str,
            hostname: &str,
        ) -> Result<(), VpnError> {
            self.record(format!("set_location {} {} {}", country, city, hostname));
            Ok(())
        }

        async fn connect(&self) -> Result<(), VpnError> {
            self.record("connect");
            if self.connect_ok {
                Ok(())
            } else {
                Err(VpnError::CommandFailed {
                    command: "mullvad connect".to_string(),
                    code: 1,
                    stderr: "no relay".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_short_hostname_fails_without_side_effects() {
        let vpn = ScriptedVpn::new(true, "Connected");
        let settings = fast_settings();
        let mut controller = ConnectionController::new(&vpn, &settings);

        assert!(!controller.connect_to("se-mma").await);
        assert_eq!(controller.state(), ConnectState::Failed);
        assert!(vpn.calls().is_empty());
    }

    #[tokio::test]
    async fn test_successful_attempt_walks_full_sequence() {
        let vpn = ScriptedVpn::new(true, "Connected to se-mma-wg-001");
        let settings = fast_settings();
        let mut controller = ConnectionController::new(&vpn, &settings);

        assert!(controller.connect_to("se-mma-wg-001").await);
        assert_eq!(controller.state(), ConnectState::Connected);
        assert_eq!(
            vpn.calls(),
            vec![
                "disconnect",
                "set_location se mma se-mma-wg-001",
                "connect",
                "status",
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_failure_is_terminal() {
        let vpn = ScriptedVpn::new(false, "Disconnected");
        let settings = fast_settings();
        let mut controller = ConnectionController::new(&vpn, &settings);

        assert!(!controller.connect_to("se-mma-wg-001").await);
        assert_eq!(controller.state(), ConnectState::Failed);
        // No status check once connect itself failed.
        assert!(!vpn.calls().contains(&"status".to_string()));
    }

    #[tokio::test]
    async fn test_status_without_connected_marker_fails() {
        let vpn = ScriptedVpn::new(true, "Disconnected");
        let settings = fast_settings();
        let mut controller = ConnectionController::new(&vpn, &settings);

        assert!(!controller.connect_to("se-mma-wg-001").await);
        assert_eq!(controller.state(), ConnectState::Failed);
    }
}
