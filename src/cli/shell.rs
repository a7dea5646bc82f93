//! Interactive shell mode
//!
//! Keeps one list screen alive for the whole session, so paging, searching,
//! sorting and favorites behave like the app's main screen. Provides command
//! history and tab completion.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Config, Editor, Helper};

use super::commands::browse;
use super::output::{format_movie_details, format_movie_table, print_error, print_notices};
use crate::app::App;
use crate::screens::{DetailsScreen, MoviesScreen, SortMode};

/// Command completer for the shell
#[derive(Default)]
struct ShellCompleter {
    commands: Vec<(&'static str, Vec<&'static str>)>,
}

impl ShellCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                ("list", vec![]),
                ("search", vec![]),
                ("more", vec![]),
                ("sort", vec!["none", "alpha", "date"]),
                ("show", vec![]),
                ("fav", vec![]),
                ("favorites", vec![]),
                ("help", vec![]),
                ("exit", vec![]),
                ("quit", vec![]),
            ],
        }
    }

    fn pairs<'a>(items: impl Iterator<Item = &'a &'static str>) -> Vec<Pair> {
        items
            .map(|item| Pair {
                display: item.to_string(),
                replacement: item.to_string(),
            })
            .collect()
    }
}

impl Completer for ShellCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        let words: Vec<&str> = line.split_whitespace().collect();
        let start = line.rfind(' ').map(|i| i + 1).unwrap_or(0);

        match words.as_slice() {
            [] => Ok((0, Self::pairs(self.commands.iter().map(|(cmd, _)| cmd)))),
            [cmd] if line.ends_with(' ') => {
                let subs = self
                    .commands
                    .iter()
                    .find(|(c, _)| c == cmd)
                    .map(|(_, subs)| Self::pairs(subs.iter()))
                    .unwrap_or_default();
                Ok((pos, subs))
            }
            [prefix] => Ok((
                start,
                Self::pairs(
                    self.commands
                        .iter()
                        .map(|(cmd, _)| cmd)
                        .filter(|cmd| cmd.starts_with(prefix)),
                ),
            )),
            [cmd, prefix] if !line.ends_with(' ') => {
                let subs = self
                    .commands
                    .iter()
                    .find(|(c, _)| c == cmd)
                    .map(|(_, subs)| Self::pairs(subs.iter().filter(|s| s.starts_with(prefix))))
                    .unwrap_or_default();
                Ok((start, subs))
            }
            _ => Ok((pos, vec![])),
        }
    }
}

impl Hinter for ShellCompleter {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ShellCompleter {}
impl Validator for ShellCompleter {}
impl Helper for ShellCompleter {}

/// Parse a command line into arguments, handling quotes
fn parse_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = ' ';

    for c in line.chars() {
        match c {
            '"' | '\'' if !in_quotes => {
                in_quotes = true;
                quote_char = c;
            }
            c if c == quote_char && in_quotes => {
                in_quotes = false;
            }
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current);
    }

    args
}

#[derive(Debug, PartialEq)]
enum ShellCommand {
    List,
    Search(String),
    More,
    Sort(SortMode),
    Show(i64),
    Favorite(i64),
    Favorites,
    Help,
    Exit,
}

fn parse_command(args: &[String]) -> Result<Option<ShellCommand>, String> {
    let Some((cmd, rest)) = args.split_first() else {
        return Ok(None);
    };

    let id = |rest: &[String]| -> Result<i64, String> {
        match rest {
            [id] => id.parse().map_err(|_| format!("Not a title id: {}", id)),
            _ => Err(format!("Usage: {} <id>", cmd)),
        }
    };

    let command = match cmd.as_str() {
        "list" | "ls" => ShellCommand::List,
        // Empty search text lists everything again
        "search" => ShellCommand::Search(rest.join(" ")),
        "more" => ShellCommand::More,
        "sort" => match rest {
            [mode] => ShellCommand::Sort(mode.parse::<SortMode>().map_err(|e| e.to_string())?),
            _ => return Err("Usage: sort <none|alpha|date>".to_string()),
        },
        "show" => ShellCommand::Show(id(rest)?),
        "fav" => ShellCommand::Favorite(id(rest)?),
        "favorites" => ShellCommand::Favorites,
        "help" => ShellCommand::Help,
        "exit" | "quit" => ShellCommand::Exit,
        other => return Err(format!("Unknown command: {} (try 'help')", other)),
    };

    Ok(Some(command))
}

/// One interactive session over a single list screen
struct Session {
    app: App,
    screen: MoviesScreen,
    wait: Duration,
}

impl Session {
    async fn start(offline: bool) -> Result<Self> {
        let app = App::init(offline)?;
        let wait = app.config.api.timeout() + Duration::from_secs(5);
        let mut screen = app.movies_screen();

        let events = browse::load(&mut screen, None, 1, wait).await?;
        print_notices(&events);

        let session = Self { app, screen, wait };
        session.print_list();
        Ok(session)
    }

    fn print_list(&self) {
        let mode = if self.screen.is_offline() { "offline" } else { "online" };
        println!(
            "{} titles ({}, page {}, sort {})",
            self.screen.visible().len(),
            mode,
            self.app.view_model.page(),
            self.screen.sort()
        );
        println!("{}", format_movie_table(self.screen.visible()));
    }

    /// Returns Ok(false) when the session should end.
    async fn execute(&mut self, command: ShellCommand) -> Result<bool> {
        match command {
            ShellCommand::List => self.print_list(),
            ShellCommand::Search(text) => {
                let events = self.screen.on_search(&text).await;
                print_notices(&events);
                if !self.screen.is_offline() {
                    print_notices(&browse::settle(&mut self.screen, self.wait).await?);
                }
                self.print_list();
            }
            ShellCommand::More => {
                if self.screen.on_scroll_to_bottom().await.is_none() {
                    println!("Paging is unavailable offline.");
                } else {
                    let before = self.screen.items().len();
                    print_notices(&browse::settle(&mut self.screen, self.wait).await?);
                    if self.screen.items().len() == before {
                        println!("No more results.");
                    } else {
                        self.print_list();
                    }
                }
            }
            ShellCommand::Sort(mode) => {
                print_notices(&self.screen.set_sort(mode));
                self.print_list();
            }
            ShellCommand::Show(id) => {
                let details = self.details(id)?;
                println!("{}", format_movie_details(details.movie()));
            }
            ShellCommand::Favorite(id) => {
                let mut details = self.details(id)?;
                details
                    .toggle_favorite(&self.app.view_model)
                    .await
                    .context("Failed to save favorite")?;
                let favorite = details.movie().is_favorite;
                let name = details.movie().name.clone();
                print_notices(&self.screen.on_details_result(&details.close()?)?);
                println!(
                    "{} \"{}\"",
                    if favorite { "Marked as favorite:" } else { "Unmarked:" },
                    name
                );
            }
            ShellCommand::Favorites => {
                let mut favorites = self.app.favorites_screen();
                favorites.on_create();
                let events = tokio::time::timeout(self.wait, favorites.settle())
                    .await
                    .context("Timed out reading favorites")?;
                print_notices(&events);
                println!("{}", format_movie_table(&favorites.visible()));
            }
            ShellCommand::Help => print_help(),
            ShellCommand::Exit => return Ok(false),
        }
        Ok(true)
    }

    fn details(&self, id: i64) -> Result<DetailsScreen> {
        let payload = self
            .screen
            .open_details(id)
            .with_context(|| format!("Title {} is not in the list", id))?;
        Ok(DetailsScreen::open(&payload)?)
    }
}

fn print_help() {
    println!(
        r#"moviebox Interactive Shell

Commands:
  list                     Show the current list
  search [text]            Search the catalog (empty text lists everything)
  more                     Load the next page
  sort <none|alpha|date>   Change the sort order
  show <id>                Show details for a title
  fav <id>                 Toggle the favorite mark on a title
  favorites                List favorites from the local cache

  help                     Show this help
  exit, quit               Exit the shell
"#
    );
}

/// Get the history file path
pub fn history_path() -> Result<PathBuf> {
    directories::ProjectDirs::from("com", "moviebox", "Moviebox")
        .map(|dirs| dirs.data_dir().join("shell_history"))
        .context("Could not determine data directory")
}

/// Run the interactive shell
pub async fn run(offline: bool) -> Result<()> {
    println!("moviebox Interactive Shell v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for available commands, 'exit' to quit.\n");

    let mut session = Session::start(offline).await?;

    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(ShellCompleter::new()));

    if let Ok(path) = history_path() {
        let _ = rl.load_history(&path);
    }

    loop {
        match rl.readline("moviebox> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                let command = match parse_command(&parse_args(line)) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(message) => {
                        println!("{}", message);
                        continue;
                    }
                };

                match session.execute(command).await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e) => print_error(&format!("{:#}", e)),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("exit");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    session.screen.flush().await;

    if let Ok(path) = history_path() {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = rl.save_history(&path);
    }

    Ok(())
}
