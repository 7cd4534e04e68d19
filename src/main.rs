//! TracMath CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracmath::cli::{Cli, Commands};
use tracmath::config::ConfigManager;
use tracmath::error::TracMathResult;
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

async fn run() -> TracMathResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // The log format lives in the config file, so peek at it before logging starts
    let json_logs = config_manager
        .load_from_file(config_manager.path())
        .await
        .map(|c| c.general.log_format == "json")
        .unwrap_or(false);
    init_logging(cli.verbose, json_logs);

    let config = config_manager.load().await?;

    match cli.command {
        Commands::Render(args) => tracmath::cli::commands::render(args, &config).await,
        Commands::Serve(args) => tracmath::cli::commands::serve(args, &config).await,
        Commands::Fetch(args) => tracmath::cli::commands::fetch(args, &config).await,
        Commands::Status => tracmath::cli::commands::status(&config).await,
        Commands::Config(args) => {
            tracmath::cli::commands::config(args, &config, &config_manager).await
        }
        Commands::Cache(args) => tracmath::cli::commands::cache(args, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` takes precedence
fn init_logging(verbose: u8, json: bool) {
    let default = match verbose {
        0 => "tracmath=warn",
        1 => "tracmath=info",
        _ => "tracmath=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}
