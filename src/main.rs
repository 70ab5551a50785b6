use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use relaybench::config::Settings;
use relaybench::relay::catalog::Catalog;
use relaybench::relay::filter::{self, parse_selection};
use relaybench::relay::{Relay, TunnelProtocol};
use relaybench::session::TestSession;
use relaybench::speedtest::SpeedtestCli;
use relaybench::vpn::mullvad::MullvadCli;
use relaybench::{interactive, preflight, report};

#[derive(Parser)]
#[command(
    name = "relaybench",
    about = "Benchmark download/upload/ping across Mullvad VPN relays",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Test relays matching the given filters and rank the results
    Test {
        /// Country to test (substring match)
        #[arg(long)]
        country: String,

        /// City filter (substring match)
        #[arg(long)]
        city: Option<String>,

        /// Protocol filter: wireguard or openvpn
        #[arg(long)]
        protocol: Option<String>,

        /// Test only the first N matching relays
        #[arg(long)]
        limit: Option<usize>,

        /// Explicit selection over the matching list, e.g. "1,3,5-8" or "all"
        #[arg(long)]
        servers: Option<String>,

        /// Write results to this JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List matching relays grouped by location
    List {
        /// Country filter (substring match)
        #[arg(long)]
        country: Option<String>,

        /// City filter (substring match)
        #[arg(long)]
        city: Option<String>,

        /// Protocol filter: wireguard or openvpn
        #[arg(long)]
        protocol: Option<String>,
    },

    /// List countries with server counts
    Countries,

    /// Pick country, city, and servers interactively (default)
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Test {
            country,
            city,
            protocol,
            limit,
            servers,
            output,
        } => {
            preflight::check(&settings).await?;
            let vpn = MullvadCli::new(&settings.mullvad_bin);
            let catalog = Catalog::load(&vpn).await;
            let protocol = parse_protocol(protocol.as_deref())?;

            let mut relays =
                filter::filter(&catalog, Some(country.as_str()), city.as_deref(), protocol);
            if relays.is_empty() {
                bail!("no relays match the given filters");
            }

            if let Some(expression) = servers {
                let indices = parse_selection(&expression, relays.len());
                if indices.is_empty() {
                    bail!("--servers selected nothing from {} relays", relays.len());
                }
                relays = indices.into_iter().map(|i| relays[i].clone()).collect();
            } else if let Some(limit) = limit {
                relays.truncate(limit.max(1));
            }

            println!(
                "{}",
                format!("Testing {} relay(s)", relays.len()).bold()
            );
            run_tests(&settings, relays, output.as_deref()).await?;
        }

        Commands::List {
            country,
            city,
            protocol,
        } => {
            preflight::check(&settings).await?;
            let vpn = MullvadCli::new(&settings.mullvad_bin);
            let catalog = Catalog::load(&vpn).await;
            let protocol = parse_protocol(protocol.as_deref())?;

            let relays =
                filter::filter(&catalog, country.as_deref(), city.as_deref(), protocol);
            if relays.is_empty() {
                println!("{}", "No servers found".red());
                return Ok(());
            }

            let mut current = String::new();
            for relay in &relays {
                let location = format!("{} - {}", relay.country, relay.city);
                if location != current {
                    println!("\n{}", location.bold());
                    current = location;
                }
                println!("  {:<25} ({})", relay.hostname, relay.protocol);
            }
        }

        Commands::Countries => {
            preflight::check(&settings).await?;
            let vpn = MullvadCli::new(&settings.mullvad_bin);
            let catalog = Catalog::load(&vpn).await;

            for country in filter::countries(&catalog) {
                let count = filter::country_server_count(&catalog, &country);
                println!("{:<30} {:>4} servers", country, count);
            }
        }

        Commands::Interactive => {
            preflight::check(&settings).await?;
            let vpn = MullvadCli::new(&settings.mullvad_bin);

            println!("{}", "Loading servers...".cyan());
            let catalog = Catalog::load(&vpn).await;
            println!("{}", format!("{} servers loaded", catalog.len()).green());

            loop {
                let Some(plan) = interactive::choose_plan(&catalog)? else {
                    break;
                };
                run_tests(&settings, plan.relays, plan.output.as_deref()).await?;

                let again = dialoguer::Confirm::new()
                    .with_prompt("Test another location?")
                    .default(false)
                    .interact()?;
                if !again {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Run one test session over the chosen relays, then report and optionally
/// export. Cleanup is the session's own responsibility and happens even if
/// the run is interrupted.
async fn run_tests(settings: &Settings, relays: Vec<Relay>, output: Option<&Path>) -> Result<()> {
    let vpn = MullvadCli::new(&settings.mullvad_bin);
    let measurer = SpeedtestCli::new(&settings.speedtest_bin, settings.measure_timeout());

    let mut session = TestSession::new(&vpn, &measurer, settings, relays);
    session.run().await;

    report::print_table(session.results());
    if let Some(path) = output {
        report::save_json(session.results(), path)?;
    }
    Ok(())
}

fn parse_protocol(arg: Option<&str>) -> Result<Option<TunnelProtocol>> {
    match arg {
        Some(s) => {
            let protocol = s.parse::<TunnelProtocol>().map_err(|e| anyhow::anyhow!(e))?;
            Ok(Some(protocol))
        }
        None => Ok(None),
    }
}
