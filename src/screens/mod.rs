//! Screen controllers
//!
//! Each screen owns a working set of records, follows the view model's state
//! and reports what changed as `ScreenEvent`s for the front end to render.

mod details;
mod favorites;
mod movies;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Movie;

pub use details::DetailsScreen;
pub use favorites::FavoritesScreen;
pub use movies::MoviesScreen;

/// Query sent when the search box is empty
pub const DEFAULT_QUERY: &str = "all";

/// What a screen wants its front end to do after handling input or state
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenEvent {
    /// Show or hide the loading indicator
    Loading(bool),
    /// The visible list changed; carries the new item count
    Rendered(usize),
    /// Transient message for the user
    Notice(String),
}

/// Client-side ordering of the visible list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortMode {
    /// Arrival order
    #[default]
    #[serde(rename = "none")]
    None,
    /// By name
    #[serde(rename = "alpha")]
    Alphabetical,
    /// By air date string
    #[serde(rename = "date")]
    Date,
}

#[derive(Error, Debug)]
#[error("Unknown sort mode '{0}' (expected none, alpha or date)")]
pub struct ParseSortModeError(String);

impl FromStr for SortMode {
    type Err = ParseSortModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(SortMode::None),
            "alpha" | "alphabetical" | "name" => Ok(SortMode::Alphabetical),
            "date" => Ok(SortMode::Date),
            _ => Err(ParseSortModeError(s.to_string())),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortMode::None => "none",
            SortMode::Alphabetical => "alpha",
            SortMode::Date => "date",
        })
    }
}

impl SortMode {
    /// Sort `movies` in place. Stable, so ties keep arrival order.
    pub fn apply(&self, movies: &mut [Movie]) {
        match self {
            SortMode::None => {}
            SortMode::Alphabetical => movies.sort_by(|a, b| a.name.cmp(&b.name)),
            // ISO dates order correctly as strings; empty dates sort first
            SortMode::Date => movies.sort_by(|a, b| a.first_air_date.cmp(&b.first_air_date)),
        }
    }
}

/// Screen-local records keyed by id, in arrival order.
///
/// Holds at most one entry per id; re-adding an id replaces the data in place.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    order: Vec<i64>,
    by_id: HashMap<i64, Movie>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Movie> {
        self.by_id.get(&id)
    }

    /// Insert or replace by id. Returns true if the id was new.
    pub fn upsert(&mut self, movie: Movie) -> bool {
        let id = movie.id;
        let is_new = self.by_id.insert(id, movie).is_none();
        if is_new {
            self.order.push(id);
        }
        is_new
    }

    /// Upsert every record; returns how many ids were new
    pub fn merge(&mut self, movies: impl IntoIterator<Item = Movie>) -> usize {
        let mut added = 0;
        for movie in movies {
            if self.upsert(movie) {
                added += 1;
            }
        }
        added
    }

    /// Replace an existing entry; records with unknown ids are ignored
    pub fn replace(&mut self, movie: Movie) -> bool {
        match self.by_id.get_mut(&movie.id) {
            Some(slot) => {
                *slot = movie;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: i64) -> Option<Movie> {
        let movie = self.by_id.remove(&id)?;
        self.order.retain(|&o| o != id);
        Some(movie)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.by_id.clear();
    }

    /// Records in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &Movie> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn to_vec(&self) -> Vec<Movie> {
        self.iter().cloned().collect()
    }

    pub fn sorted(&self, mode: SortMode) -> Vec<Movie> {
        let mut movies = self.to_vec();
        mode.apply(&mut movies);
        movies
    }

    /// Records whose name contains `text`, ignoring case
    pub fn filter_by_name(&self, text: &str) -> Vec<Movie> {
        let needle = text.to_lowercase();
        self.iter()
            .filter(|m| m.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64, name: &str, date: &str) -> Movie {
        Movie {
            id,
            name: name.to_string(),
            first_air_date: date.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_one_entry_per_id() {
        let mut set = WorkingSet::new();
        set.merge(vec![movie(1, "A", ""), movie(2, "B", "")]);

        // Same id, different value: replaced rather than duplicated
        let newer = Movie {
            popularity: 42.0,
            ..movie(1, "A", "")
        };
        assert_eq!(set.merge(vec![newer.clone()]), 0);

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1), Some(&newer));
        assert_eq!(set.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_replace_and_remove() {
        let mut set = WorkingSet::new();
        set.merge(vec![movie(1, "A", ""), movie(2, "B", ""), movie(3, "C", "")]);

        assert!(!set.replace(movie(9, "Z", "")));
        assert!(set.replace(movie(2, "Bee", "")));
        assert_eq!(set.get(2).unwrap().name, "Bee");

        assert_eq!(set.remove(2).unwrap().name, "Bee");
        assert!(set.remove(2).is_none());
        assert_eq!(set.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 3]);

        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_sorted() {
        let mut set = WorkingSet::new();
        set.merge(vec![
            movie(1, "Zorro", "2010-01-01"),
            movie(2, "Arrow", "2012-10-10"),
            movie(3, "Merlin", "2008-09-20"),
        ]);

        let ids = |v: Vec<Movie>| v.into_iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(set.sorted(SortMode::None)), vec![1, 2, 3]);
        assert_eq!(ids(set.sorted(SortMode::Alphabetical)), vec![2, 3, 1]);
        assert_eq!(ids(set.sorted(SortMode::Date)), vec![3, 1, 2]);
    }

    #[test]
    fn test_filter_by_name_ignores_case() {
        let mut set = WorkingSet::new();
        set.merge(vec![
            movie(1, "Batman", ""),
            movie(2, "The BATMAN Adventures", ""),
            movie(3, "Superman", ""),
        ]);

        let found = set.filter_by_name("batman");
        assert_eq!(found.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(set.filter_by_name("").len(), 3);
    }

    #[test]
    fn test_sort_mode_parse_and_display() {
        assert_eq!("alpha".parse::<SortMode>().unwrap(), SortMode::Alphabetical);
        assert_eq!("Date".parse::<SortMode>().unwrap(), SortMode::Date);
        assert_eq!("none".parse::<SortMode>().unwrap(), SortMode::None);
        assert!("rating".parse::<SortMode>().is_err());
        assert_eq!(SortMode::Alphabetical.to_string(), "alpha");
    }
}
