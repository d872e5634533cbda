// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! hostfetch CLI - run a single fetch job from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Fetch with the job's settings in checking mode
//! hostfetch fetch job.json
//!
//! # Discovery, aborted after 30 seconds
//! hostfetch fetch job.json --mode discovery --timeout 30
//!
//! # JSON output
//! hostfetch fetch job.json --format json --pretty
//!
//! # Inspect the SNMP caches of a host
//! hostfetch cache switch-07 --base /var/lib/hostfetch
//! ```

mod commands;
mod job;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{cache, fetch};

// ============================================================================
// CLI Definition
// ============================================================================

/// hostfetch CLI - fetch raw monitoring data from one host.
#[derive(Parser)]
#[command(name = "hostfetch")]
#[command(about = "Fetch raw monitoring data from hosts and SNMP devices")]
#[command(long_about = r#"
hostfetch runs one fetch job against one data source and prints the raw
payload it produced.

Data sources:
  • SNMP devices (snmp, stored walks built in)
  • TCP agents (tcp)
  • Data-source programs (program)
  • Piggybacked hosts (piggyback)

Examples:
  hostfetch fetch job.json                   # Checking mode
  hostfetch fetch job.json --mode discovery  # Discovery
  hostfetch fetch job.json --timeout 30      # Cancel after 30s
  hostfetch cache switch-07                  # Show SNMP caches
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a fetch job described by a JSON file.
    Fetch(fetch::FetchArgs),

    /// List the walk and section caches of an SNMP host.
    Cache(cache::CacheArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// Invalid job or I/O error.
    Error = 1,
    /// The fetcher reported a fault.
    FetchFault = 2,
    /// The fetch was cancelled.
    Cancelled = 3,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    // Targets match by prefix, so this covers every hostfetch_* crate.
    let default_filter = if verbose {
        "hostfetch=debug"
    } else {
        "hostfetch=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Fetch(args) => fetch::run(args, &cli).await,
        Commands::Cache(args) => cache::run(args, &cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch_args() {
        let cli = Cli::try_parse_from([
            "hostfetch",
            "fetch",
            "job.json",
            "--mode",
            "discovery",
            "--timeout",
            "30",
            "-f",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.mode, hostfetch_core::Mode::Discovery);
        assert_eq!(args.timeout, Some(30));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result = Cli::try_parse_from(["hostfetch", "fetch", "job.json", "--mode", "often"]);
        assert!(result.is_err());
    }
}
