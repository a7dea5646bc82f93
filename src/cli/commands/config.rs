//! Configuration management commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::cli::output::{OutputFormat, print_formatted, print_success};
use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration (API key masked)
    Show,

    /// Get a specific config value
    Get {
        /// Config key (e.g., "api.language", "display.sort")
        key: String,
    },

    /// Set a config value
    Set {
        /// Config key (e.g., "api.language", "display.sort")
        key: String,

        /// Value to set
        value: String,
    },

    /// Show config file path
    Path,
}

#[derive(Serialize)]
struct ConfigPathResult {
    path: String,
    exists: bool,
}

pub async fn run(command: ConfigCommands, format: OutputFormat, quiet: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => show(format),
        ConfigCommands::Get { key } => get(&key, format),
        ConfigCommands::Set { key, value } => set(&key, &value, quiet),
        ConfigCommands::Path => path(format),
    }
}

fn show(format: OutputFormat) -> Result<()> {
    let config = masked(Config::load()?);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => println!("{}", toml::to_string_pretty(&config)?),
    }

    Ok(())
}

fn masked(mut config: Config) -> Config {
    if !config.api.api_key.is_empty() {
        config.api.api_key = "<set>".to_string();
    }
    config
}

fn get(key: &str, format: OutputFormat) -> Result<()> {
    let value = Config::load()?.get_value(key)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&value)?),
        OutputFormat::Text => println!("{}", value),
    }

    Ok(())
}

fn set(key: &str, value: &str, quiet: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.set_value(key, value)?;
    config.save()?;

    let shown = if key == "api.api_key" { "<set>" } else { value };
    print_success(&format!("Set {} = {}", key, shown), quiet);
    Ok(())
}

fn path(format: OutputFormat) -> Result<()> {
    let path = Config::config_path()?;

    let result = ConfigPathResult {
        path: path.to_string_lossy().to_string(),
        exists: path.exists(),
    };

    print_formatted(&result, format, |r| {
        format!("{}{}", r.path, if r.exists { "" } else { " (not found)" })
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_masks_api_key() {
        let mut config = Config::default();
        config.api.api_key = "secret".into();
        assert_eq!(masked(config).api.api_key, "<set>");
        assert_eq!(masked(Config::default()).api.api_key, "");
    }
}
