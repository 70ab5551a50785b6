//! Relay data model: tunnel protocols and the relay records parsed from the
//! Mullvad relay listing.

use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod filter;

/// Tunnel protocol a relay speaks. Mullvad runs exactly one of the two per
/// server, and the client can only keep one tunnel up at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TunnelProtocol {
    WireGuard,
    #[serde(rename = "OpenVPN")]
    OpenVpn,
}

impl TunnelProtocol {
    /// Classify a relay hostname by Mullvad's naming convention: WireGuard
    /// servers carry a `wg` marker (e.g. `se-mma-wg-001`), everything else
    /// is OpenVPN. Applied once at parse time. A change to the relay naming
    /// scheme would misclassify silently.
    pub fn classify(hostname: &str) -> Self {
        if hostname.contains("wg") {
            TunnelProtocol::WireGuard
        } else {
            TunnelProtocol::OpenVpn
        }
    }

    /// Token the `mullvad relay set tunnel-protocol` command expects.
    pub fn cli_token(&self) -> &'static str {
        match self {
            TunnelProtocol::WireGuard => "wireguard",
            TunnelProtocol::OpenVpn => "openvpn",
        }
    }
}

impl std::fmt::Display for TunnelProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TunnelProtocol::WireGuard => write!(f, "WireGuard"),
            TunnelProtocol::OpenVpn => write!(f, "OpenVPN"),
        }
    }
}

impl std::str::FromStr for TunnelProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wireguard" | "wg" => Ok(TunnelProtocol::WireGuard),
            "openvpn" | "ovpn" => Ok(TunnelProtocol::OpenVpn),
            other => Err(format!(
                "unknown protocol {:?} (expected wireguard or openvpn)",
                other
            )),
        }
    }
}

/// One VPN server endpoint from the relay catalog. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relay {
    pub country: String,
    pub city: String,
    pub hostname: String,
    pub protocol: TunnelProtocol,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_wireguard_marker() {
        assert_eq!(
            TunnelProtocol::classify("se-mma-wg-001"),
            TunnelProtocol::WireGuard
        );
        assert_eq!(
            TunnelProtocol::classify("us-nyc-ovpn-501"),
            TunnelProtocol::OpenVpn
        );
    }

    #[test]
    fn test_display_and_cli_token() {
        assert_eq!(TunnelProtocol::WireGuard.to_string(), "WireGuard");
        assert_eq!(TunnelProtocol::OpenVpn.to_string(), "OpenVPN");
        assert_eq!(TunnelProtocol::WireGuard.cli_token(), "wireguard");
        assert_eq!(TunnelProtocol::OpenVpn.cli_token(), "openvpn");
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "WireGuard".parse::<TunnelProtocol>().unwrap(),
            TunnelProtocol::WireGuard
        );
        assert_eq!(
            "openvpn".parse::<TunnelProtocol>().unwrap(),
            TunnelProtocol::OpenVpn
        );
        assert!("pptp".parse::<TunnelProtocol>().is_err());
    }
}
