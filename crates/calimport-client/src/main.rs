//! calimport CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calimport_client::cli::{Cli, Command, ConfigAction, RunArgs};
use calimport_client::commands;
use calimport_client::config::ClientConfig;
use calimport_client::error::{ClientError, ClientResult};
use calimport_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize tracing
    let mut tracing_config = if cli.debug || config.debug {
        TracingConfig::debug()
    } else {
        TracingConfig::default()
    };
    if let Some(format) = cli.log_format {
        tracing_config = tracing_config.with_format(format);
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> ClientResult<ClientConfig> {
    let loaded = match cli.config {
        Some(ref path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    };
    loaded.map_err(ClientError::Config)
}

async fn run(cli: Cli, config: ClientConfig) -> ClientResult<()> {
    let config_path = cli.config.unwrap_or_else(ClientConfig::default_path);

    match cli.command {
        Some(Command::Run(args)) => commands::run::run(args, &config).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        None => commands::run::run(RunArgs::default(), &config).await,
    }
}
