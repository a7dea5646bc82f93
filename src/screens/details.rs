//! Detail screen round trip.
//!
//! A screen hands one record over as JSON, the detail screen may toggle its
//! favorite flag (persisting it), and the record goes back as JSON.

use tokio::task::JoinHandle;

use crate::models::Movie;
use crate::viewmodel::MoviesViewModel;

pub fn encode(movie: &Movie) -> Result<String, serde_json::Error> {
    serde_json::to_string(movie)
}

pub fn decode(payload: &str) -> Result<Movie, serde_json::Error> {
    serde_json::from_str(payload)
}

/// Detail screen for a single record
#[derive(Debug, Clone)]
pub struct DetailsScreen {
    movie: Movie,
}

impl DetailsScreen {
    /// Open from a serialized record
    pub fn open(payload: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            movie: decode(payload)?,
        })
    }

    pub fn movie(&self) -> &Movie {
        &self.movie
    }

    /// Flip the favorite flag and persist the record in the background
    pub fn toggle_favorite(&mut self, view_model: &MoviesViewModel) -> JoinHandle<()> {
        self.set_favorite(!self.movie.is_favorite, view_model)
    }

    pub fn set_favorite(&mut self, favorite: bool, view_model: &MoviesViewModel) -> JoinHandle<()> {
        self.movie.is_favorite = favorite;
        tracing::info!(
            "{} \"{}\" ({})",
            if favorite { "Favorited" } else { "Unfavorited" },
            self.movie.name,
            self.movie.id
        );
        view_model.update_movie(self.movie.clone())
    }

    /// Serialized record to return to the calling screen
    pub fn close(self) -> Result<String, serde_json::Error> {
        encode(&self.movie)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::tests::{FakeCatalog, movie, repository};
    use crate::viewmodel::FetchSettings;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_toggle_persists_and_returns_record() {
        let repo = repository(Arc::new(FakeCatalog::default()));
        let store = repo.store().clone();
        let vm = MoviesViewModel::new(repo, FetchSettings::default());

        let payload = encode(&movie(10, "Batman")).unwrap();
        let mut details = DetailsScreen::open(&payload).unwrap();
        assert!(!details.movie().is_favorite);

        details.toggle_favorite(&vm).await.unwrap();
        let returned = decode(&details.close().unwrap()).unwrap();
        assert!(returned.is_favorite);
        assert_eq!(returned.id, 10);

        let stored = store.get_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_favorite);
    }

    #[test]
    fn test_open_rejects_garbage() {
        assert!(DetailsScreen::open("not json").is_err());
    }
}
