//! Spaces - Gameplan workspace browser
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use spaces::cli::{Cli, Commands};
use spaces::config::{Config, ConfigManager};
use spaces::error::SpacesResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> SpacesResult<()> {
    let cli = Cli::parse();

    // Completions never need configuration
    if let Commands::Completions(args) = cli.command {
        return spaces::cli::commands::completions(args);
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;
    if let Some(url) = cli.url {
        config.server.url = Some(url);
    }

    init_logging(cli.verbose, &config);
    debug!("Loaded config from {}", config_manager.path().display());

    match cli.command {
        Commands::Completions(_) => unreachable!("Completions handled above"),
        Commands::List(args) => spaces::cli::commands::list(args, &config).await,
        Commands::Show(args) => spaces::cli::commands::show(args, &config).await,
        Commands::Unread(args) => spaces::cli::commands::unread(args, &config).await,
        Commands::Status => spaces::cli::commands::status(&config).await,
        Commands::Config(args) => {
            spaces::cli::commands::config(args, &config_manager, &config).await
        }
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let level = verbose.max(u8::from(config.general.verbose));
    let filter = match level {
        0 => EnvFilter::new("spaces=warn"),
        1 => EnvFilter::new("spaces=info"),
        _ => EnvFilter::new("spaces=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
