//! relaybench -- benchmark download/upload/ping across Mullvad VPN relays.
//!
//! This crate provides the core library for relay catalog parsing,
//! filtering and selection, tunnel connection control, speed measurement,
//! session orchestration, and result reporting.
//!
//! Two external tools are driven as black boxes: the `mullvad` CLI for
//! relay listing and tunnel control, and `speedtest-cli` for the actual
//! measurement. Only one tunnel can be active system-wide, so relays are
//! tested strictly in sequence, and every session ends by resetting the
//! client to a neutral state no matter how the run went.

pub mod config;
pub mod interactive;
pub mod preflight;
pub mod relay;
pub mod report;
pub mod session;
pub mod speedtest;
pub mod vpn;
