//! VPN client control surface: the command vocabulary the relay tests drive,
//! behind a trait so the connection controller and orchestrator are testable
//! without a live Mullvad daemon.

use async_trait::async_trait;
use thiserror::Error;

use crate::relay::TunnelProtocol;

pub mod connection;
pub mod mullvad;

#[derive(Debug, Error)]
pub enum VpnError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Tunnel protocol preference on the client. Unlike a relay's protocol this
/// includes the neutral `Any`, which is what cleanup restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolPreference {
    WireGuard,
    OpenVpn,
    Any,
}

impl ProtocolPreference {
    /// Token the `relay set tunnel-protocol` command expects.
    pub fn cli_token(&self) -> &'static str {
        match self {
            ProtocolPreference::WireGuard => "wireguard",
            ProtocolPreference::OpenVpn => "openvpn",
            ProtocolPreference::Any => "any",
        }
    }
}

impl From<TunnelProtocol> for ProtocolPreference {
    fn from(protocol: TunnelProtocol) -> Self {
        match protocol {
            TunnelProtocol::WireGuard => ProtocolPreference::WireGuard,
            TunnelProtocol::OpenVpn => ProtocolPreference::OpenVpn,
        }
    }
}

/// The control commands the VPN client exposes. Each reports success or
/// failure via process exit status; which failures matter is the caller's
/// decision (disconnect and location-set are best-effort by design,
/// connect and the status check are not).
#[async_trait]
pub trait VpnControl: Send + Sync {
    /// Hierarchical relay listing text.
    async fn relay_list(&self) -> Result<String, VpnError>;

    /// Current connection status text.
    async fn status(&self) -> Result<String, VpnError>;

    async fn disconnect(&self) -> Result<(), VpnError>;

    async fn set_tunnel_protocol(&self, preference: ProtocolPreference) -> Result<(), VpnError>;

    /// Pin the active relay location to country-code/city-code/hostname.
    async fn set_location(&self, country: &str, city: &str, hostname: &str)
        -> Result<(), VpnError>;

    async fn connect(&self) -> Result<(), VpnError>;
}

/// Extract the currently connected relay hostname from status text, if any.
///
/// Recognizes both `Connected to <host> ...` and a `Relay: <host>` line,
/// whichever the installed client version prints.
pub fn connected_relay(status: &str) -> Option<String> {
    if let Some((_, rest)) = status.split_once("Connected to") {
        if let Some(host) = rest.split_whitespace().next() {
            return Some(host.to_string());
        }
    }

    for line in status.lines() {
        if let Some((_, rest)) = line.split_once("Relay:") {
            if let Some(host) = rest.split_whitespace().next() {
                return Some(host.to_string());
            }
        }
    }

    None
}
