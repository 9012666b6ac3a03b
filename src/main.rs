//! Recruit Bridge - HTTP front end for an out-of-process recruitment worker.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recruit_bridge::commands::{self, AppError};

#[derive(Parser)]
#[command(
    name = "recruit-bridge",
    about = "HTTP front end for the recruitment reporting worker",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the admin and client API.
    Serve {
        /// Override the configured port.
        #[arg(short, long)]
        port: Option<u16>,
        /// Skip running `init_db` on startup.
        #[arg(long)]
        skip_init: bool,
    },
    /// Run a single worker command and print its result.
    Invoke {
        /// Worker command name, e.g. `generate_report`.
        command: String,
        /// Extra arguments passed after the command.
        args: Vec<String>,
    },
    /// Print all stored settings.
    Settings,
    /// Print recent system log entries.
    Logs {
        /// Number of entries to show.
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<bool, AppError> {
    let config = commands::load_config(cli.config)?;

    match cli.command {
        Commands::Serve { port, skip_init } => {
            commands::serve(config, port, skip_init).await?;
            Ok(true)
        }
        Commands::Invoke { command, args } => commands::invoke(&config.worker, command, args).await,
        Commands::Settings => {
            commands::show_settings(&config).await?;
            Ok(true)
        }
        Commands::Logs { limit } => {
            commands::show_logs(&config, limit).await?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "recruit-bridge failed");
            eprintln!("error: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
