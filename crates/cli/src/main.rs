mod config_commands;
mod event_commands;
mod registry;
mod start_commands;

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use {
    clap::{Parser, Subcommand},
    reshare_config::ReshareConfig,
    tracing::{error, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "reshare", about = "reshare: mirror community events to your channels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./reshare.toml, then the user config dir).
    #[arg(long, global = true, env = "RESHARE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the next waiting event to every active channel.
    Start,
    /// Store events from a JSON file, skipping ones already known.
    Ingest {
        /// JSON array of events.
        file: PathBuf,
    },
    /// List events with their publication status.
    Inspect(event_commands::InspectArgs),
    /// List publications with a given status.
    Publications(event_commands::PublicationsArgs),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ReshareConfig> {
    match path {
        Some(path) => Ok(reshare_config::load_config(path)?),
        None => Ok(reshare_config::discover_and_load()),
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Start => start_commands::run(&load_config(config_path)?).await,
        Commands::Ingest { file } => event_commands::ingest(&load_config(config_path)?, &file).await,
        Commands::Inspect(args) => event_commands::inspect(&load_config(config_path)?, args).await,
        Commands::Publications(args) => {
            event_commands::publications(&load_config(config_path)?, args).await
        },
        Commands::Config { action } => config_commands::handle_config(action, config_path),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);
    info!(version = env!("CARGO_PKG_VERSION"), "reshare starting");

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}
