//! flatwatch CLI
//!
//! Runs a crawl by default; `validate` and `status` help with setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use flatwatch::{
    error::{AppError, Result},
    models::Config,
    pipeline::Orchestrator,
    services::TextClassifier,
    sites,
    storage::{LocalLedger, ResultLedger},
};

/// flatwatch - furnished flat watcher
#[derive(Parser, Debug)]
#[command(
    name = "flatwatch",
    version,
    about = "Polls rental listing sites for furnished flats"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "flatwatch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the enabled sites (default)
    Crawl {
        /// Only crawl this site (repeatable)
        #[arg(long = "site")]
        sites: Vec<String>,

        /// Classify without writing the ledger or opening offers
        #[arg(long)]
        dry_run: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration, patterns and selectors
    Validate,

    /// Show how many offers each site's ledger holds
    Status,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();

    let command = cli.command.unwrap_or(Command::Crawl {
        sites: Vec::new(),
        dry_run: false,
        json: false,
    });

    match command {
        Command::Crawl {
            sites: only,
            dry_run,
            json,
        } => {
            if dry_run {
                config.debug = true;
            }

            let orchestrator = Orchestrator::from_config(&config, &only)?;
            let summary = orchestrator.run().await;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }

            log::info!(
                "Run complete: {} accepted, {} rejected, {} faults, {} failed sites",
                summary.accepted_count(),
                summary.rejected_count(),
                summary.fault_count(),
                summary.failures.len()
            );

            if !summary.failures.is_empty() && summary.sites.is_empty() {
                return Err(AppError::config("Every site failed"));
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            TextClassifier::new(&config.rules)?;
            log::info!("✓ Exclusion rules compile");

            for site in &config.sites {
                sites::from_config(site, &config.search)?;
                log::info!(
                    "✓ {} ({}, {} pages, {} workers)",
                    site.name,
                    if site.enabled { "enabled" } else { "disabled" },
                    site.max_pages,
                    site.workers
                );
            }

            log::info!("All validations passed!");
        }

        Command::Status => {
            let ledger = LocalLedger::new(&config.storage.ledger_dir);
            log::info!("Ledger directory: {}", ledger.root_dir().display());

            for site in &config.sites {
                let snapshot = ledger.load_snapshot(&site.name).await?;
                log::info!(
                    "{}: {} accepted, {} rejected",
                    site.name,
                    snapshot.accepted.len(),
                    snapshot.rejected.len()
                );
            }
        }
    }

    Ok(())
}
