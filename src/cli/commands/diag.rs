//! Diagnostic and debugging commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use crate::app::App;
use crate::cli::output::{OutputFormat, print_formatted, print_success};
use crate::cli::shell;
use crate::config::Config;
use crate::db::Database;

#[derive(Subcommand, Debug)]
pub enum DiagCommands {
    /// Show all data paths (config, database, shell history)
    Paths,

    /// Verify configuration, cache and catalog reachability
    Check,

    /// Drop cached titles (favorites are kept)
    ClearCache,
}

#[derive(Serialize)]
struct PathsResult {
    config_file: String,
    database: String,
    shell_history: String,
}

#[derive(Serialize)]
struct CheckResult {
    config_exists: bool,
    database_accessible: bool,
    cached_titles: usize,
    favorites: usize,
    api_key_set: bool,
    catalog_reachable: bool,
}

pub async fn run(command: DiagCommands, format: OutputFormat, quiet: bool) -> Result<()> {
    match command {
        DiagCommands::Paths => paths(format),
        DiagCommands::Check => check(format).await,
        DiagCommands::ClearCache => clear_cache(quiet),
    }
}

fn display_path(path: Result<std::path::PathBuf>) -> String {
    path.map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "<error>".to_string())
}

fn paths(format: OutputFormat) -> Result<()> {
    let result = PathsResult {
        config_file: display_path(Config::config_path()),
        database: display_path(Database::db_path().map_err(Into::into)),
        shell_history: display_path(shell::history_path()),
    };

    print_formatted(&result, format, |r| {
        [
            format!("Config file:    {}", r.config_file),
            format!("Database:       {}", r.database),
            format!("Shell history:  {}", r.shell_history),
        ]
        .join("\n")
    });

    Ok(())
}

async fn check(format: OutputFormat) -> Result<()> {
    let config_exists = Config::config_path().is_ok_and(|p| p.exists());
    let config = Config::load().unwrap_or_default();
    let api_key_set = !config.api.api_key.is_empty();

    let db = Database::open().ok();
    let database_accessible = db.is_some();
    let cached_titles = db.as_ref().and_then(|d| d.count().ok()).unwrap_or(0);
    let favorites = db
        .as_ref()
        .and_then(|d| d.favorite_ids().ok())
        .map(|ids| ids.len())
        .unwrap_or(0);

    let catalog_reachable = match db.map(|d| App::with_parts(config, d, false)) {
        Some(Ok(app)) => app.connectivity.is_online().await,
        Some(Err(e)) => {
            tracing::warn!("Cannot build catalog client: {:#}", e);
            false
        }
        None => false,
    };

    let result = CheckResult {
        config_exists,
        database_accessible,
        cached_titles,
        favorites,
        api_key_set,
        catalog_reachable,
    };

    print_formatted(&result, format, |r| {
        let mut lines = Vec::new();

        print_status_line(&mut lines, r.config_exists, "Config file exists");
        print_status_line(
            &mut lines,
            r.database_accessible,
            &format!(
                "Database accessible ({} cached titles, {} favorites)",
                r.cached_titles, r.favorites
            ),
        );
        print_status_line(&mut lines, r.api_key_set, "API key configured");
        print_status_line(&mut lines, r.catalog_reachable, "Catalog reachable");

        lines.join("\n")
    });

    Ok(())
}

fn print_status_line(lines: &mut Vec<String>, ok: bool, message: &str) {
    if ok {
        lines.push(format!("[OK] {}", message));
    } else {
        lines.push(format!("[  ] {}", message));
    }
}

fn clear_cache(quiet: bool) -> Result<()> {
    let db = Database::open()?;
    let count = db.clear()?;

    print_success(&format!("Cleared {} cached titles", count), quiet);

    Ok(())
}
