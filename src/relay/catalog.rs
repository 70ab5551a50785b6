//! Relay catalog: parse `mullvad relay list` output into a flat relay list.
//!
//! The listing is a three-level hierarchy by tab indentation:
//!
//! ```text
//! Sweden (se)
//! 	Malmo (mma) @ 55.60°N, 13.00°E
//! 		se-mma-wg-001 (185.213.154.68) - WireGuard, hosted by 31173
//! ```
//!
//! Depth 0 is a country, depth 1 a city, depth 2 a server hostname. Every
//! well-formed line carries a parenthesized annotation; lines without one
//! are descriptive noise and skipped.

use tracing::warn;

use super::{Relay, TunnelProtocol};
use crate::vpn::VpnControl;

/// Parse the raw relay listing into relay records, in listing order.
///
/// Server lines seen before any country or city line are dropped: without
/// both ancestors established there is nothing to attribute them to.
pub fn parse_relay_list(text: &str) -> Vec<Relay> {
    let mut relays = Vec::new();
    let mut current_country: Option<String> = None;
    let mut current_city: Option<String> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let depth = line.len() - line.trim_start_matches('\t').len();
        let stripped = line.trim();

        // Every country/city/server line carries a "(...)" annotation.
        let Some((name, _)) = stripped.split_once('(') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        match depth {
            0 => {
                current_country = Some(name.to_string());
                current_city = None;
            }
            1 => current_city = Some(name.to_string()),
            2 => {
                if let (Some(country), Some(city)) = (&current_country, &current_city) {
                    relays.push(Relay {
                        country: country.clone(),
                        city: city.clone(),
                        hostname: name.to_string(),
                        protocol: TunnelProtocol::classify(name),
                    });
                }
            }
            _ => {}
        }
    }

    relays
}

/// The relay catalog for one process run. Loaded once from the VPN client's
/// listing command and never invalidated; a fresh catalog needs a fresh
/// process.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    relays: Vec<Relay>,
}

impl Catalog {
    /// Load the catalog through the VPN control surface. A failed listing
    /// command yields an empty catalog: callers treat "no servers" as a
    /// normal condition, not an error.
    pub async fn load(vpn: &dyn VpnControl) -> Self {
        match vpn.relay_list().await {
            Ok(listing) => {
                let relays = parse_relay_list(&listing);
                Self { relays }
            }
            Err(e) => {
                warn!(error = %e, "relay listing unavailable, catalog is empty");
                Self::default()
            }
        }
    }

    /// Build a catalog from already-parsed relays.
    pub fn from_relays(relays: Vec<Relay>) -> Self {
        Self { relays }
    }

    pub fn relays(&self) -> &[Relay] {
        &self.relays
    }

    pub fn len(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }
}
