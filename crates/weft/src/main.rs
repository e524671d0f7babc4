//! weft CLI - Content assembly for static sites.
//!
//! Provides commands for:
//! - `tree`: Print every rendered node of each site
//! - `sections`: Print section statistics and the main section
//! - `check`: Build every site and report the result

mod commands;
mod error;
mod output;
mod site;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use output::Output;
use site::SiteArgs;

/// weft - Content assembly for static sites.
#[derive(Parser)]
#[command(name = "weft", version, about)]
struct Cli {
    #[command(flatten)]
    site: SiteArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every rendered section and page in key order.
    Tree,
    /// Print per-section page counts and the main section.
    Sections,
    /// Build every site and report success or the first failure.
    Check,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.site.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Tree => commands::tree::execute(&cli.site, &output),
        Commands::Sections => commands::sections::execute(&cli.site, &output),
        Commands::Check => commands::check::execute(&cli.site, &output),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
