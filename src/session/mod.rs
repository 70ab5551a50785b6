//! Test orchestrator: drives connect+measure cycles over a selected relay
//! set, one protocol group at a time, and always returns the VPN client to
//! a neutral state afterwards.
//!
//! The tunnel is the single shared mutable resource on the machine; only
//! one can be active, so relays are tested strictly in sequence. The test
//! loop runs in a race against a shutdown future (Ctrl-C in production) and
//! cleanup runs after the race on every path: completion, error, or
//! interruption mid-connect or mid-measurement.

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::relay::{Relay, TunnelProtocol};
use crate::speedtest::Measurer;
use crate::vpn::connection::ConnectionController;
use crate::vpn::{connected_relay, ProtocolPreference, VpnControl};

/// One successful relay measurement. Append-only during a session, never
/// mutated after creation. Serialized field names are the export contract.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub server: String,
    pub country: String,
    pub city: String,
    #[serde(rename = "provider")]
    pub protocol: TunnelProtocol,
    #[serde(rename = "ping")]
    pub ping_ms: f64,
    #[serde(rename = "download")]
    pub download_mbps: f64,
    #[serde(rename = "upload")]
    pub upload_mbps: f64,
    pub timestamp: DateTime<Local>,
}

/// How a session run ended. Either way, cleanup has already run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Interrupted,
}

/// One orchestration run over a chosen relay subset.
pub struct TestSession<'a> {
    vpn: &'a dyn VpnControl,
    measurer: &'a dyn Measurer,
    settings: &'a Settings,
    relays: Vec<Relay>,
    tested: HashSet<String>,
    results: Vec<TestResult>,
    original_relay: Option<String>,
}

impl<'a> TestSession<'a> {
    pub fn new(
        vpn: &'a dyn VpnControl,
        measurer: &'a dyn Measurer,
        settings: &'a Settings,
        relays: Vec<Relay>,
    ) -> Self {
        Self {
            vpn,
            measurer,
            settings,
            relays,
            tested: HashSet::new(),
            results: Vec::new(),
            original_relay: None,
        }
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<TestResult> {
        self.results
    }

    /// Relay the client was connected to before the session started, if any.
    pub fn original_relay(&self) -> Option<&str> {
        self.original_relay.as_deref()
    }

    /// Run the session, stopping early on Ctrl-C. Cleanup runs regardless.
    pub async fn run(&mut self) -> SessionOutcome {
        self.run_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Run the session, racing the test loop against the given shutdown
    /// future. When shutdown wins, results collected so far are kept.
    /// Cleanup (protocol reset + disconnect) runs exactly once on every
    /// path out.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown: impl Future<Output = ()>,
    ) -> SessionOutcome {
        self.original_relay = match self.vpn.status().await {
            Ok(status) => connected_relay(&status),
            Err(_) => None,
        };
        if let Some(host) = &self.original_relay {
            info!(server = %host, "currently connected relay noted");
        }

        tokio::pin!(shutdown);
        let outcome = {
            let test_loop = self.test_all();
            tokio::pin!(test_loop);
            tokio::select! {
                _ = &mut test_loop => SessionOutcome::Completed,
                _ = &mut shutdown => {
                    warn!("interrupted, abandoning remaining relays");
                    SessionOutcome::Interrupted
                }
            }
        };

        self.cleanup().await;
        outcome
    }

    /// Reset the tunnel protocol to automatic and disconnect. Best-effort:
    /// there is no recovery beyond logging if either command fails.
    pub async fn cleanup(&self) {
        info!("cleaning up: protocol reset and disconnect");
        if let Err(e) = self.vpn.set_tunnel_protocol(ProtocolPreference::Any).await {
            warn!(error = %e, "protocol reset failed");
        }
        if let Err(e) = self.vpn.disconnect().await {
            warn!(error = %e, "disconnect failed");
        }
    }

    async fn test_all(&mut self) {
        let wireguard: Vec<Relay> = self
            .relays
            .iter()
            .filter(|r| r.protocol == TunnelProtocol::WireGuard)
            .cloned()
            .collect();
        let openvpn: Vec<Relay> = self
            .relays
            .iter()
            .filter(|r| r.protocol == TunnelProtocol::OpenVpn)
            .cloned()
            .collect();
        let total = wireguard.len() + openvpn.len();

        if total == 0 {
            warn!("no relays to test");
            return;
        }
        info!(
            total,
            wireguard = wireguard.len(),
            openvpn = openvpn.len(),
            "starting relay tests"
        );

        let mut position = 0usize;
        let mut active: Option<TunnelProtocol> = None;

        if !wireguard.is_empty() {
            self.switch_protocol(TunnelProtocol::WireGuard).await;
            active = Some(TunnelProtocol::WireGuard);
            for relay in &wireguard {
                position += 1;
                self.test_one(relay, position, total).await;
            }
        }

        if !openvpn.is_empty() {
            if active != Some(TunnelProtocol::OpenVpn) {
                self.switch_protocol(TunnelProtocol::OpenVpn).await;
            }
            for relay in &openvpn {
                position += 1;
                self.test_one(relay, position, total).await;
            }
        }

        info!(results = self.results.len(), "relay tests complete");
    }

    async fn switch_protocol(&self, protocol: TunnelProtocol) {
        info!(protocol = %protocol, "switching tunnel protocol");
        if let Err(e) = self.vpn.set_tunnel_protocol(protocol.into()).await {
            debug!(error = %e, "protocol switch failed (ignored)");
        }
        sleep(self.settings.protocol_settle()).await;
    }

    async fn test_one(&mut self, relay: &Relay, position: usize, total: usize) {
        if self.tested.contains(&relay.hostname) {
            return;
        }
        info!(
            server = %relay.hostname,
            protocol = %relay.protocol,
            "[{}/{}] testing relay",
            position,
            total
        );

        let mut controller = ConnectionController::new(self.vpn, self.settings);
        if !controller.connect_to(&relay.hostname).await {
            warn!(server = %relay.hostname, "connect failed, skipping relay");
            return;
        }

        match self.measurer.measure().await {
            Ok(metrics) => {
                info!(
                    server = %relay.hostname,
                    download = metrics.download_mbps,
                    upload = metrics.upload_mbps,
                    ping = metrics.ping_ms,
                    "measurement complete"
                );
                self.results.push(TestResult {
                    server: relay.hostname.clone(),
                    country: relay.country.clone(),
                    city: relay.city.clone(),
                    protocol: relay.protocol,
                    ping_ms: metrics.ping_ms,
                    download_mbps: metrics.download_mbps,
                    upload_mbps: metrics.upload_mbps,
                    timestamp: Local::now(),
                });
                self.tested.insert(relay.hostname.clone());
            }
            Err(_) => {
                warn!(server = %relay.hostname, "no measurement, skipping relay");
            }
        }
    }
}
