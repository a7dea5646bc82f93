//! CLI module for moviebox
//!
//! Provides command-line access to the list and favorites screens, plus
//! configuration and diagnostics.

mod commands;
mod output;
pub mod shell;

use clap::{Parser, Subcommand};

pub use output::{OutputFormat, print_error};

/// moviebox - TMDB browser with an offline cache
#[derive(Parser, Debug)]
#[command(name = "moviebox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[command(flatten)]
    pub output: OutputOptions,

    /// Never touch the network; read the local cache only
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output formatting options
#[derive(Parser, Debug, Clone)]
pub struct OutputOptions {
    /// Output in JSON format (for machine parsing)
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl OutputOptions {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the catalog, page by page
    Browse(commands::browse::BrowseArgs),

    /// Search the catalog (filters the cache when offline)
    Search(commands::browse::SearchArgs),

    /// List favorites from the local cache
    Favorites,

    /// Mark or unmark a cached title as favorite
    Favorite {
        /// Catalog id
        id: i64,

        /// Remove the favorite mark instead of setting it
        #[arg(long)]
        off: bool,
    },

    /// Interactive browsing session
    Shell,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },

    /// Diagnostics and debugging
    Diag {
        #[command(subcommand)]
        command: commands::diag::DiagCommands,
    },
}

/// Run the CLI with parsed arguments
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.output.format();
    let quiet = cli.output.quiet;
    let offline = cli.offline;

    match cli.command {
        Commands::Browse(args) => commands::browse::browse(args, offline, format).await,
        Commands::Search(args) => commands::browse::search(args, offline, format).await,
        Commands::Favorites => commands::favorites::list(format).await,
        Commands::Favorite { id, off } => commands::favorites::set(id, !off, quiet).await,
        Commands::Shell => shell::run(offline).await,
        Commands::Config { command } => commands::config::run(command, format, quiet).await,
        Commands::Diag { command } => commands::diag::run(command, format, quiet).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_browse() {
        let cli = Cli::try_parse_from([
            "moviebox", "browse", "--query", "batman", "--pages", "2", "--sort", "date", "--json",
        ])
        .unwrap();
        assert!(cli.output.json);
        match cli.command {
            Commands::Browse(args) => {
                assert_eq!(args.query.as_deref(), Some("batman"));
                assert_eq!(args.pages, 2);
                assert_eq!(args.sort, Some(crate::screens::SortMode::Date));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_favorite_off() {
        let cli = Cli::try_parse_from(["moviebox", "--offline", "favorite", "42", "--off"]).unwrap();
        assert!(cli.offline);
        assert!(matches!(cli.command, Commands::Favorite { id: 42, off: true }));
    }

    #[test]
    fn test_rejects_bad_sort() {
        assert!(Cli::try_parse_from(["moviebox", "browse", "--sort", "rating"]).is_err());
    }
}
