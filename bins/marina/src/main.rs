//! Marina CLI - command-line client for the boat-rental marketplace
//!
//! Thin front end over `marina-api-client`: every command goes through the
//! same retrying, token-refreshing access layer an application would use.

use clap::{Parser, Subcommand};
use marina_api_client::{ApiError, ClientConfig, ErrorKind, MarinaClient};
use marina_core::error::exit_codes;
use marina_telemetry::TelemetryConfig;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod output;

use commands::{auth, boats, bookings, request};
use output::OutputFormat;

/// Command-line client for the Marina boat-rental marketplace
#[derive(Parser)]
#[command(name = "marina")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        /// Account email
        email: String,

        /// Password
        #[arg(short, long, env = "MARINA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the session and forget stored tokens
    Logout,

    /// Show the logged-in user
    Whoami,

    /// GET any API path and print the body
    Get {
        /// Path relative to the API base URL
        path: String,
    },

    /// Download a file from any API path
    Download {
        /// Path relative to the API base URL
        path: String,

        /// Output file (defaults to the server-provided name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Browse boat listings
    Boats {
        #[command(subcommand)]
        action: BoatsAction,
    },

    /// Manage bookings
    Bookings {
        #[command(subcommand)]
        action: BookingsAction,
    },
}

#[derive(Subcommand)]
enum BoatsAction {
    /// Search listings
    List {
        /// Marina or city
        #[arg(short, long)]
        location: Option<String>,

        /// Minimum guest capacity
        #[arg(short, long)]
        capacity: Option<u32>,

        /// Page number
        #[arg(short, long)]
        page: Option<u32>,
    },

    /// Show one listing
    Get {
        /// Listing ID
        id: String,
    },
}

#[derive(Subcommand)]
enum BookingsAction {
    /// List your bookings
    List {
        /// Filter by status (pending, confirmed, cancelled)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Download a booking invoice
    Invoice {
        /// Booking ID
        id: String,

        /// Output file (defaults to the server-provided name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = run(cli).await;
    if verbose {
        output::print_metrics();
    }

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            match e.downcast_ref::<ApiError>() {
                Some(api_error) => {
                    for field in api_error.field_errors() {
                        eprintln!("  {} {}", "•".red(), field);
                    }
                    ExitCode::from(exit_code_for(api_error))
                }
                None => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig::from_env()?;

    let telemetry = if cli.verbose {
        TelemetryConfig::verbose()
    } else {
        TelemetryConfig::default().with_enabled(config.logging)
    };
    marina_telemetry::init_with_config(&telemetry.with_json(cli.format == OutputFormat::Json))?;

    let client = MarinaClient::with_config(config)?;
    let format = cli.format;

    match cli.command {
        Commands::Login { email, password } => auth::login(&client, &email, &password, format).await,
        Commands::Logout => auth::logout(&client, format).await,
        Commands::Whoami => auth::whoami(&client, format).await,
        Commands::Get { path } => request::get(&client, &path, format).await,
        Commands::Download { path, output } => {
            request::download(&client, &path, output.as_deref(), format).await
        }
        Commands::Boats { action } => match action {
            BoatsAction::List { location, capacity, page } => {
                boats::list(&client, location, capacity, page, format).await
            }
            BoatsAction::Get { id } => boats::get(&client, &id, format).await,
        },
        Commands::Bookings { action } => match action {
            BookingsAction::List { status } => bookings::list(&client, status, format).await,
            BookingsAction::Invoice { id, output } => {
                bookings::invoice(&client, &id, output.as_deref(), format).await
            }
        },
    }
}

fn exit_code_for(error: &ApiError) -> u8 {
    match error {
        ApiError::Config(_) => exit_codes::CONFIG_ERROR,
        _ => match error.kind() {
            ErrorKind::Auth => exit_codes::AUTH_ERROR,
            ErrorKind::Network => exit_codes::NETWORK_ERROR,
            ErrorKind::Timeout => exit_codes::TIMEOUT,
            _ => exit_codes::FAILURE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::time::Duration;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&ApiError::auth("expired")), exit_codes::AUTH_ERROR);
        assert_eq!(exit_code_for(&ApiError::Network("refused".into())), exit_codes::NETWORK_ERROR);
        assert_eq!(exit_code_for(&ApiError::Timeout(Duration::from_secs(1))), exit_codes::TIMEOUT);
        assert_eq!(exit_code_for(&ApiError::config("bad url")), exit_codes::CONFIG_ERROR);
        assert_eq!(exit_code_for(&ApiError::http(404, "missing")), exit_codes::FAILURE);
    }
}
