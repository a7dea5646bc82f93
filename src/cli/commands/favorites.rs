//! Favorites commands

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::app::App;
use crate::cli::commands::browse;
use crate::cli::output::{
    OutputFormat, format_movie_table, print_formatted, print_notices, print_success,
};
use crate::models::Movie;
use crate::screens::{DetailsScreen, FavoritesScreen};

/// Favorites never need the network, so the cache is read with a short bound
const LOCAL_WAIT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct FavoritesResult {
    favorites: Vec<Movie>,
}

pub async fn list(format: OutputFormat) -> Result<()> {
    let app = App::init(true)?;
    let screen = load_favorites(&app).await?;

    let result = FavoritesResult {
        favorites: screen.visible(),
    };
    print_formatted(&result, format, |r| {
        format!("Favorites ({})\n\n{}", r.favorites.len(), format_movie_table(&r.favorites))
    });
    Ok(())
}

/// Set the favorite flag through a detail round trip.
///
/// Marking starts from the cached list; unmarking starts from the favorites
/// list, which drops the title once it comes back unmarked.
pub async fn set(id: i64, favorite: bool, quiet: bool) -> Result<()> {
    let app = App::init(true)?;

    if favorite {
        let mut screen = app.movies_screen();
        browse::load(&mut screen, None, 1, LOCAL_WAIT).await?;
        let payload = screen.open_details(id).with_context(|| {
            format!("Title {} is not in the local cache; browse or search for it first", id)
        })?;
        let Some(details) = toggle_to(&payload, true, &app, quiet).await? else {
            return Ok(());
        };
        print_notices(&screen.on_details_result(&details.close()?)?);
    } else {
        let mut screen = load_favorites(&app).await?;
        let payload = screen
            .open_details(id)
            .with_context(|| format!("Title {} is not a favorite", id))?;
        let Some(details) = toggle_to(&payload, false, &app, quiet).await? else {
            return Ok(());
        };
        print_notices(&screen.on_details_result(&details.close()?)?);
        tracing::debug!("{} favorites left", screen.visible().len());
    }
    Ok(())
}

/// Open the detail screen and persist the wanted flag.
/// Returns `None` when the title already has it.
async fn toggle_to(
    payload: &str,
    favorite: bool,
    app: &App,
    quiet: bool,
) -> Result<Option<DetailsScreen>> {
    let mut details = DetailsScreen::open(payload)?;
    let (id, name) = (details.movie().id, details.movie().name.clone());

    if details.movie().is_favorite == favorite {
        print_success(&unchanged_message(&name, favorite), quiet);
        return Ok(None);
    }

    details
        .set_favorite(favorite, &app.view_model)
        .await
        .context("Failed to save favorite")?;

    print_success(
        &format!(
            "{} \"{}\" ({})",
            if favorite { "Added to favorites:" } else { "Removed from favorites:" },
            name,
            id
        ),
        quiet,
    );
    Ok(Some(details))
}

fn unchanged_message(name: &str, favorite: bool) -> String {
    if favorite {
        format!("\"{}\" is already a favorite", name)
    } else {
        format!("\"{}\" is not a favorite", name)
    }
}

async fn load_favorites(app: &App) -> Result<FavoritesScreen> {
    let mut screen = app.favorites_screen();
    screen.on_create();
    let events = tokio::time::timeout(LOCAL_WAIT, screen.settle())
        .await
        .context("Timed out reading the local cache")?;
    print_notices(&events);
    Ok(screen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_message_follows_flag() {
        assert_eq!(unchanged_message("Batman", true), "\"Batman\" is already a favorite");
        assert_eq!(unchanged_message("Batman", false), "\"Batman\" is not a favorite");
    }
}
