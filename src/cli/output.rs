//! Output formatting utilities for CLI

use serde::Serialize;

use crate::models::Movie;
use crate::screens::ScreenEvent;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Print a serializable value as JSON or use custom text formatter
pub fn print_formatted<T, F>(value: &T, format: OutputFormat, text_formatter: F)
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Text => println!("{}", text_formatter(value)),
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(value) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message (suppressed in quiet mode)
pub fn print_success(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", message);
    }
}

/// Print an error message (never suppressed)
pub fn print_error(message: &str) {
    eprintln!("Error: {}", message);
}

/// Print user-facing notices from screen events; the rest only goes to the log
pub fn print_notices(events: &[ScreenEvent]) {
    for event in events {
        match event {
            ScreenEvent::Notice(message) => print_error(message),
            ScreenEvent::Loading(showing) => tracing::trace!("Loading indicator: {}", showing),
            ScreenEvent::Rendered(count) => tracing::debug!("Rendered {} titles", count),
        }
    }
}

/// One table row per title
pub fn format_movie_table(movies: &[Movie]) -> String {
    if movies.is_empty() {
        return "No titles.".to_string();
    }

    let mut lines = vec![
        format!("{:>8}  {:<40} {:>10} {:>6}  {}", "ID", "NAME", "AIRED", "SCORE", "FAV"),
        "-".repeat(76),
    ];
    for movie in movies {
        lines.push(format!(
            "{:>8}  {:<40} {:>10} {:>6.1}  {}",
            movie.id,
            truncate(&movie.name, 40),
            movie.first_air_date,
            movie.vote_average,
            if movie.is_favorite { "*" } else { "" }
        ));
    }
    lines.join("\n")
}

/// Multi-line description of a single title
pub fn format_movie_details(movie: &Movie) -> String {
    let mut lines = vec![match movie.year() {
        Some(year) => format!("{} [{}] (id {})", movie.name, year, movie.id),
        None => format!("{} (id {})", movie.name, movie.id),
    }];
    if movie.original_name != movie.name && !movie.original_name.is_empty() {
        lines.push(format!("Original:   {} [{}]", movie.original_name, movie.original_language));
    }
    if !movie.first_air_date.is_empty() {
        lines.push(format!("First aired: {}", movie.first_air_date));
    }
    lines.push(format!(
        "Rating:     {:.1} ({} votes), popularity {:.1}",
        movie.vote_average, movie.vote_count, movie.popularity
    ));
    if let Some(url) = movie.poster_url() {
        lines.push(format!("Poster:     {}", url));
    }
    lines.push(format!("Favorite:   {}", if movie.is_favorite { "yes" } else { "no" }));
    if !movie.overview.is_empty() {
        lines.push(String::new());
        lines.push(movie.overview.clone());
    }
    lines.join("\n")
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max.saturating_sub(3)).collect();
        short.push_str("...");
        short
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long title indeed", 10), "a very ...");
        assert_eq!(truncate("日本語のタイトルです", 5), "日本...");
    }

    #[test]
    fn test_movie_details() {
        let text = format_movie_details(&Movie {
            id: 10,
            name: "Batman".into(),
            original_name: "Batman: TAS".into(),
            first_air_date: "1992-09-05".into(),
            poster_path: "/p.jpg".into(),
            overview: "Gotham at night.".into(),
            ..Default::default()
        });
        assert!(text.starts_with("Batman [1992] (id 10)"));
        assert!(text.contains("https://image.tmdb.org/t/p/w500/p.jpg"));
        assert!(text.contains("Favorite:   no"));
        assert!(text.ends_with("Gotham at night."));
    }

    #[test]
    fn test_movie_table() {
        assert_eq!(format_movie_table(&[]), "No titles.");

        let table = format_movie_table(&[Movie {
            id: 10,
            name: "Batman".into(),
            first_air_date: "1992-09-05".into(),
            vote_average: 8.4,
            is_favorite: true,
            ..Default::default()
        }]);
        let row = table.lines().nth(2).unwrap();
        assert!(row.contains("Batman"));
        assert!(row.contains("1992-09-05"));
        assert!(row.contains("8.4"));
        assert!(row.ends_with('*'));
    }
}
