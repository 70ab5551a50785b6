//! Interactive selection flow: country, city, protocol, and server choice
//! via terminal prompts. Produces a test plan; running it is the caller's
//! job.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local};
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};

use crate::relay::catalog::Catalog;
use crate::relay::filter::{cities, countries, country_server_count, filter, parse_selection};
use crate::relay::{Relay, TunnelProtocol};

/// What the user chose to run: the relay list and an optional JSON export
/// target.
#[derive(Debug)]
pub struct TestPlan {
    pub relays: Vec<Relay>,
    pub output: Option<PathBuf>,
}

/// Walk the full selection flow. Returns None when the user backs out at
/// the top level. Esc steps one level back.
pub fn choose_plan(catalog: &Catalog) -> Result<Option<TestPlan>> {
    if catalog.is_empty() {
        println!("{}", "No servers available.".red());
        return Ok(None);
    }

    loop {
        let Some(country) = choose_country(catalog)? else {
            return Ok(None);
        };
        let Some(city) = choose_city(catalog, &country)? else {
            continue;
        };
        let Some(protocol) = choose_protocol()? else {
            continue;
        };

        let available = filter(catalog, Some(country.as_str()), Some(city.as_str()), protocol);
        if available.is_empty() {
            println!("{}", "No servers match that selection.".red());
            continue;
        }

        let Some(relays) = choose_servers(available)? else {
            continue;
        };
        let output = choose_output(&country, &city)?;

        print_summary(&country, &city, protocol, &relays, output.as_deref());
        let start = Confirm::new()
            .with_prompt("Start test?")
            .default(true)
            .interact()?;
        if !start {
            continue;
        }

        return Ok(Some(TestPlan { relays, output }));
    }
}

fn choose_country(catalog: &Catalog) -> Result<Option<String>> {
    let names = countries(catalog);
    let labels: Vec<String> = names
        .iter()
        .map(|c| format!("{} ({} servers)", c, country_server_count(catalog, c)))
        .collect();

    let picked = Select::new()
        .with_prompt("Select country (Esc to quit)")
        .items(&labels)
        .default(0)
        .interact_opt()?;

    Ok(picked.map(|i| names[i].clone()))
}

fn choose_city(catalog: &Catalog, country: &str) -> Result<Option<String>> {
    let city_counts = cities(catalog, country);
    let labels: Vec<String> = city_counts
        .iter()
        .map(|(city, n)| format!("{} ({} servers)", city, n))
        .collect();

    let picked = Select::new()
        .with_prompt(format!("Select city in {} (Esc to go back)", country))
        .items(&labels)
        .default(0)
        .interact_opt()?;

    Ok(picked.map(|i| city_counts[i].0.clone()))
}

/// None = back; Some(None) = both protocols; Some(Some(p)) = one protocol.
#[allow(clippy::option_option)]
fn choose_protocol() -> Result<Option<Option<TunnelProtocol>>> {
    let picked = Select::new()
        .with_prompt("Tunnel protocol")
        .items(&[
            "Both WireGuard and OpenVPN",
            "WireGuard only",
            "OpenVPN only",
        ])
        .default(0)
        .interact_opt()?;

    Ok(picked.map(|i| match i {
        1 => Some(TunnelProtocol::WireGuard),
        2 => Some(TunnelProtocol::OpenVpn),
        _ => None,
    }))
}

fn choose_servers(available: Vec<Relay>) -> Result<Option<Vec<Relay>>> {
    let picked = Select::new()
        .with_prompt("Server selection")
        .items(&[
            "First N servers (quick)",
            "Choose specific servers",
            "All available servers",
        ])
        .default(0)
        .interact_opt()?;

    match picked {
        Some(0) => {
            let limit: usize = Input::new()
                .with_prompt(format!("Number of servers (available: {})", available.len()))
                .default(10)
                .interact_text()?;
            let mut relays = available;
            relays.truncate(limit.max(1));
            Ok(Some(relays))
        }
        Some(1) => {
            for (i, relay) in available.iter().enumerate() {
                println!("  {:3}. {:<25} ({})", i + 1, relay.hostname, relay.protocol);
            }
            println!("Format: single `5`, list `1,3,5`, range `1-5`, mix `1,3,5-8`, or `all`");
            loop {
                let expression: String = Input::new()
                    .with_prompt("Select server(s)")
                    .interact_text()?;
                let indices = parse_selection(&expression, available.len());
                if indices.is_empty() {
                    println!("{}", "Invalid selection".red());
                    continue;
                }
                let relays = indices
                    .into_iter()
                    .map(|i| available[i].clone())
                    .collect::<Vec<_>>();
                println!("{}", format!("Selected {} server(s)", relays.len()).green());
                return Ok(Some(relays));
            }
        }
        Some(_) => Ok(Some(available)),
        None => Ok(None),
    }
}

fn choose_output(country: &str, city: &str) -> Result<Option<PathBuf>> {
    let save = Confirm::new()
        .with_prompt("Save results to a JSON file?")
        .default(false)
        .interact()?;
    if !save {
        return Ok(None);
    }

    let filename: String = Input::new()
        .with_prompt("Filename")
        .default(default_output_name(country, city, Local::now()))
        .interact_text()?;
    Ok(Some(PathBuf::from(filename)))
}

fn print_summary(
    country: &str,
    city: &str,
    protocol: Option<TunnelProtocol>,
    relays: &[Relay],
    output: Option<&std::path::Path>,
) {
    println!("{}", "Test summary:".bold());
    println!("  Location: {} - {}", country.cyan(), city.cyan());
    let protocol_text = match protocol {
        Some(p) => p.to_string(),
        None => "both".to_string(),
    };
    println!("  Protocol: {}", protocol_text.cyan());
    println!("  Servers:  {}", relays.len().to_string().cyan());
    if let Some(path) = output {
        println!("  Output:   {}", path.display().to_string().cyan());
    }
}

/// Timestamped default export filename.
pub fn default_output_name(country: &str, city: &str, now: DateTime<Local>) -> String {
    format!(
        "relaybench_{}_{}_{}.json",
        country.replace(' ', "_"),
        city.replace(' ', "_").replace(',', ""),
        now.format("%Y%m%d_%H%M%S")
    )
}
