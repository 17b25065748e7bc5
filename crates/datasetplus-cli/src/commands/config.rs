use anyhow::{Context, Result};
use std::path::Path;

use datasetplus_core::config::Config;

pub fn run(config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load(config_path)?;
    if config.hub.token.is_some() {
        config.hub.token = Some("(set)".to_string());
    }

    println!("datasetplus configuration\n");
    println!(
        "{}",
        toml::to_string_pretty(&config).context("Failed to render configuration")?
    );

    // Show config file locations
    println!("Config file locations (in priority order):");
    println!("  1. Environment variables (DATASETPLUS_*, HF_TOKEN, HF_ENDPOINT)");
    if let Some(p) = config_path {
        println!("  2. {} (specified)", p.display());
    }
    if let Some(p) = Config::default_path() {
        println!("  3. {}", p.display());
    }

    Ok(())
}
