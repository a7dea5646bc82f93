//! Catalog browsing commands

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::app::App;
use crate::cli::output::{OutputFormat, format_movie_table, print_formatted, print_notices};
use crate::models::Movie;
use crate::screens::{MoviesScreen, ScreenEvent, SortMode};

#[derive(Args, Debug)]
pub struct BrowseArgs {
    /// Search text (empty lists everything)
    #[arg(long)]
    pub query: Option<String>,

    /// Number of pages to load
    #[arg(long, default_value = "1")]
    pub pages: u32,

    /// Sort order: none, alpha or date
    #[arg(long)]
    pub sort: Option<SortMode>,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to search for
    pub text: String,

    /// Number of pages to load
    #[arg(long, default_value = "1")]
    pub pages: u32,

    /// Sort order: none, alpha or date
    #[arg(long)]
    pub sort: Option<SortMode>,
}

#[derive(Serialize)]
struct BrowseResult {
    query: String,
    page: u32,
    offline: bool,
    sort: SortMode,
    movies: Vec<Movie>,
}

pub async fn browse(args: BrowseArgs, offline: bool, format: OutputFormat) -> Result<()> {
    run(args.query, args.pages, args.sort, offline, format).await
}

pub async fn search(args: SearchArgs, offline: bool, format: OutputFormat) -> Result<()> {
    run(Some(args.text), args.pages, args.sort, offline, format).await
}

async fn run(
    query: Option<String>,
    pages: u32,
    sort: Option<SortMode>,
    offline: bool,
    format: OutputFormat,
) -> Result<()> {
    let app = App::init(offline)?;
    let wait = app.config.api.timeout() + Duration::from_secs(5);
    let mut screen = app.movies_screen();

    let events = load(&mut screen, query.as_deref(), pages, wait).await?;
    print_notices(&events);
    if screen.is_offline() && screen.items().is_empty() {
        tracing::warn!("The local cache is empty; browse once while online to fill it");
    }
    if let Some(sort) = sort {
        screen.set_sort(sort);
    }
    screen.flush().await;

    let result = BrowseResult {
        query: screen.search_text().to_string(),
        page: app.view_model.page(),
        offline: screen.is_offline(),
        sort: screen.sort(),
        movies: screen.visible().to_vec(),
    };

    print_formatted(&result, format, |r| {
        let mut header = if r.offline {
            format!("Cached titles ({} shown, offline)", r.movies.len())
        } else {
            format!("Catalog titles ({} shown, through page {})", r.movies.len(), r.page)
        };
        if !r.query.is_empty() {
            header.push_str(&format!(" matching \"{}\"", r.query));
        }
        format!("{}\n\n{}", header, format_movie_table(&r.movies))
    });

    Ok(())
}

/// Drive the list screen: initial load or search, then extra pages.
///
/// With a query the default listing is skipped while online; offline the
/// cache is loaded first so the search can filter it. Stops paging early
/// when a page adds nothing.
pub(crate) async fn load(
    screen: &mut MoviesScreen,
    query: Option<&str>,
    pages: u32,
    wait: Duration,
) -> Result<Vec<ScreenEvent>> {
    let mut events = Vec::new();

    match query.filter(|q| !q.trim().is_empty()) {
        Some(query) => {
            events.extend(screen.on_search(query).await);
            if screen.is_offline() {
                screen.on_create().await;
                events.extend(settle(screen, wait).await?);
                events.extend(screen.on_search(query).await);
            } else {
                events.extend(settle(screen, wait).await?);
            }
        }
        None => {
            screen.on_create().await;
            events.extend(settle(screen, wait).await?);
        }
    }

    for _ in 1..pages {
        let before = screen.items().len();
        if screen.on_scroll_to_bottom().await.is_none() {
            break;
        }
        events.extend(settle(screen, wait).await?);
        if screen.items().len() == before {
            tracing::debug!("No more results after page {}", screen.view_model().page());
            break;
        }
    }

    Ok(events)
}

pub(crate) async fn settle(screen: &mut MoviesScreen, wait: Duration) -> Result<Vec<ScreenEvent>> {
    tokio::time::timeout(wait, screen.settle())
        .await
        .context("Timed out waiting for results")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::FixedConnectivity;
    use crate::repository::tests::{FakeCatalog, movie, repository};
    use crate::screens::DEFAULT_QUERY;
    use crate::viewmodel::{FetchSettings, MoviesViewModel};
    use std::sync::Arc;

    const WAIT: Duration = Duration::from_secs(5);

    fn screen(catalog: Arc<FakeCatalog>, online: bool) -> MoviesScreen {
        let vm = MoviesViewModel::new(repository(catalog), FetchSettings::default());
        MoviesScreen::new(vm, Arc::new(FixedConnectivity(online)), SortMode::None)
    }

    fn ids(movies: &[Movie]) -> Vec<i64> {
        movies.iter().map(|m| m.id).collect()
    }

    #[tokio::test]
    async fn test_query_online_skips_default_listing() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Ok(vec![movie(10, "Batman")]));
        let mut screen = screen(catalog.clone(), true);

        load(&mut screen, Some("batman"), 1, WAIT).await.unwrap();

        let calls = catalog.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["query"], "batman");
        assert_eq!(ids(screen.visible()), vec![10]);
    }

    #[tokio::test]
    async fn test_no_query_lists_default() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Ok(vec![movie(1, "One")]));
        let mut screen = screen(catalog.clone(), true);

        load(&mut screen, Some("  "), 1, WAIT).await.unwrap();

        assert_eq!(catalog.calls().len(), 1);
        assert_eq!(catalog.calls()[0]["query"], DEFAULT_QUERY);
        assert_eq!(ids(screen.visible()), vec![1]);
    }

    #[tokio::test]
    async fn test_query_offline_filters_cache() {
        let catalog = Arc::new(FakeCatalog::default());
        let mut screen = screen(catalog.clone(), false);
        screen
            .view_model()
            .insert_movies_to_local_database(vec![
                movie(1, "Batman"),
                movie(2, "Superman"),
                movie(3, "The Batman"),
            ])
            .await
            .unwrap();

        load(&mut screen, Some("batman"), 2, WAIT).await.unwrap();

        assert!(screen.is_offline());
        assert!(catalog.calls().is_empty());
        assert_eq!(ids(screen.visible()), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_extra_pages_stop_when_empty() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Ok(vec![movie(1, "One")]));
        catalog.push(Ok(vec![movie(2, "Two")]));
        catalog.push(Ok(Vec::new()));
        let mut screen = screen(catalog.clone(), true);

        load(&mut screen, None, 5, WAIT).await.unwrap();

        assert_eq!(catalog.calls().len(), 3);
        assert_eq!(ids(screen.visible()), vec![1, 2]);
        assert_eq!(screen.view_model().page(), 2);
    }
}
