//! Result ranking, the terminal report table, and JSON export.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::session::TestResult;

/// Results sorted descending by download speed. The sort is stable, so
/// equal speeds keep their measurement order. The input is never mutated.
pub fn ranked(results: &[TestResult]) -> Vec<TestResult> {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| {
        b.download_mbps
            .partial_cmp(&a.download_mbps)
            .unwrap_or(Ordering::Equal)
    });
    sorted
}

/// The fastest relay by download speed, if any results exist.
pub fn fastest(results: &[TestResult]) -> Option<TestResult> {
    ranked(results).into_iter().next()
}

/// Print the ranked result table and the fastest-relay banner. A no-op
/// with zero results.
pub fn print_table(results: &[TestResult]) {
    if results.is_empty() {
        return;
    }

    let sorted = ranked(results);
    let rule = "=".repeat(110);

    println!("{}", rule);
    println!(
        "{}",
        "SPEED TEST RESULTS (sorted by download speed)".bold()
    );
    println!("{}", rule);
    println!(
        "{:<6} {:<20} {:<25} {:<12} {:<15} {:<15} {:<10}",
        "Rank", "Server", "Location", "Protocol", "Download", "Upload", "Ping"
    );
    println!("{}", "-".repeat(110));

    for (rank, result) in sorted.iter().enumerate() {
        let location = format!("{}, {}", result.city, result.country);
        println!(
            "{:<6} {:<20} {:<25} {:<12} {:>8.2} Mbps   {:>8.2} Mbps   {:>6.2} ms",
            rank + 1,
            result.server,
            location,
            result.protocol.to_string(),
            result.download_mbps,
            result.upload_mbps,
            result.ping_ms
        );
    }

    println!("{}", rule);

    if let Some(best) = sorted.first() {
        println!("{}", "FASTEST RELAY".green().bold());
        println!("  Server:   {}", best.server.cyan());
        println!("  Location: {} - {}", best.country, best.city);
        println!("  Protocol: {}", best.protocol);
        println!(
            "  Download: {:.2} Mbps | Upload: {:.2} Mbps | Ping: {:.2} ms",
            best.download_mbps, best.upload_mbps, best.ping_ms
        );
        println!("{}", rule);
    }
}

/// Write the results as pretty-printed JSON. Field names are the export
/// contract: server, country, city, provider, ping, download, upload,
/// timestamp.
pub fn save_json(results: &[TestResult], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write results to {}", path.display()))?;
    println!("{} {}", "Saved results to".green(), path.display());
    Ok(())
}
