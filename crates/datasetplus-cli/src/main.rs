mod args;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let filter = match cli.verbose {
        0 => "datasetplus=info,datasetplus_core=info,datasetplus_hub=info",
        1 => "datasetplus=debug,datasetplus_core=debug,datasetplus_hub=debug",
        2 => "datasetplus=trace,datasetplus_core=trace,datasetplus_hub=trace",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Download { repo_id, options } => {
            commands::download::run(&repo_id, &options, config_path)
        }
        Commands::Info {
            parquet,
            audio_column,
            json,
        } => commands::info::run(&parquet, audio_column, json, config_path),
        Commands::Extract { parquet, options } => {
            commands::extract::run(&parquet, &options, config_path)
        }
        Commands::Process {
            repo_id,
            download,
            parquet,
            limit,
            id_column,
        } => commands::process::run(&repo_id, &download, &parquet, limit, id_column, config_path),
        Commands::Config => commands::config::run(config_path),
    }
}
