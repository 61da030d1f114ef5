//! bookoff-shops - find which Bookoff shops stock an ISBN/JAN
//!
//! Prints the shops and prices as JSON on stdout; diagnostics go to stderr.

use anyhow::Result;
use bookoff_shops::commands::LookupCommand;
use bookoff_shops::config::{Config, OutputFormat};
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "bookoff-shops",
    version,
    about = "Find which Bookoff shops stock an ISBN/JAN, and at what price",
    long_about = "Searches the Bookoff online store for an ISBN/JAN, opens the item's store \
                  availability list and prints one {isbn, shop, price} record per shop."
)]
struct Cli {
    /// ISBN or JAN; separators and other non-digits are ignored
    identifier: String,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Chrome/Chromium executable
    #[arg(long, env = "BOOKOFF_CHROME")]
    chrome: Option<PathBuf>,

    /// Delay before every browser action in milliseconds
    #[arg(long)]
    slow_mo: Option<u64>,

    /// Exit with an error when the lookup fails instead of printing an empty list
    #[arg(long)]
    strict: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref())?.with_env();

    if let Some(format) = cli.format {
        config.format = format;
    }
    if cli.headful {
        config.headless = false;
    }
    if let Some(chrome) = cli.chrome {
        config.chrome_path = Some(chrome);
    }
    if let Some(slow_mo) = cli.slow_mo {
        config.slow_mo_ms = slow_mo;
    }

    let cmd = LookupCommand::new(config).strict(cli.strict);
    let output = cmd.execute(&cli.identifier).await?;
    println!("{}", output);

    Ok(())
}
