//! Repository combining the remote catalog and the local cache.
//!
//! Fetches are exposed as one-shot streams: each yields exactly one
//! `RepoEvent` and ends. Writes are spawned and not reported back; the
//! returned `JoinHandle` may be awaited or dropped.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::task::JoinHandle;

use crate::db::LocalStore;
use crate::models::{Movie, RepoEvent};
use crate::tmdb::{ApiError, CatalogClient, QueryParams};

/// Source of remote catalog pages
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, params: &QueryParams) -> Result<Vec<Movie>, ApiError>;
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn fetch(&self, params: &QueryParams) -> Result<Vec<Movie>, ApiError> {
        CatalogClient::fetch(self, params).await
    }
}

/// One-shot stream of repository results
pub type RepoStream = BoxStream<'static, RepoEvent<Vec<Movie>>>;

/// Catalog repository
#[derive(Clone)]
pub struct MovieRepository {
    remote: Arc<dyn CatalogSource>,
    store: LocalStore,
}

impl MovieRepository {
    pub fn new(remote: Arc<dyn CatalogSource>, store: LocalStore) -> Self {
        Self { remote, store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Fetch one remote page.
    ///
    /// Records arrive from the API with the favorite flag cleared; flags
    /// stored locally are applied before the page is yielded.
    pub fn fetch_movies(&self, params: QueryParams) -> RepoStream {
        let remote = Arc::clone(&self.remote);
        let store = self.store.clone();

        stream::once(async move {
            match remote.fetch(&params).await {
                Ok(mut movies) => {
                    apply_favorites(&store, &mut movies).await;
                    RepoEvent::Success(Some(movies))
                }
                Err(e) => RepoEvent::Error(e),
            }
        })
        .boxed()
    }

    /// Read every cached record. Store failures yield an empty list.
    pub fn fetch_movies_from_local_database(&self) -> RepoStream {
        let store = self.store.clone();

        stream::once(async move {
            let movies = match store.get_all().await {
                Ok(movies) => movies,
                Err(e) => {
                    tracing::error!("Failed to read local database: {}", e);
                    Vec::new()
                }
            };
            tracing::debug!("Read {} records from local database", movies.len());
            RepoEvent::Success(Some(movies))
        })
        .boxed()
    }

    /// Cache records in the background
    pub fn insert_movies_to_local_database(&self, movies: Vec<Movie>) -> JoinHandle<()> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let count = movies.len();
            match store.insert_all(movies).await {
                Ok(()) => tracing::debug!("Cached {} records", count),
                Err(e) => tracing::error!("Failed to cache {} records: {}", count, e),
            }
        })
    }

    /// Persist one record (including its favorite flag) in the background
    pub fn update_movie(&self, movie: Movie) -> JoinHandle<()> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let id = movie.id;
            match store.update_one(movie).await {
                Ok(()) => tracing::debug!("Updated record {}", id),
                Err(e) => tracing::error!("Failed to update record {}: {}", id, e),
            }
        })
    }
}

async fn apply_favorites(store: &LocalStore, movies: &mut [Movie]) {
    match store.favorite_ids().await {
        Ok(ids) => {
            for movie in movies.iter_mut() {
                movie.is_favorite = ids.contains(&movie.id);
            }
        }
        Err(e) => tracing::warn!("Could not load favorites: {}", e),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::Database;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted catalog: pops one response per call and records the params it saw.
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        responses: Mutex<VecDeque<(Duration, Result<Vec<Movie>, ApiError>)>>,
        pub(crate) calls: Mutex<Vec<QueryParams>>,
    }

    impl FakeCatalog {
        pub(crate) fn push(&self, result: Result<Vec<Movie>, ApiError>) {
            self.push_delayed(Duration::ZERO, result);
        }

        pub(crate) fn push_delayed(&self, delay: Duration, result: Result<Vec<Movie>, ApiError>) {
            self.responses.lock().unwrap().push_back((delay, result));
        }

        pub(crate) fn calls(&self) -> Vec<QueryParams> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogSource for FakeCatalog {
        async fn fetch(&self, params: &QueryParams) -> Result<Vec<Movie>, ApiError> {
            self.calls.lock().unwrap().push(params.clone());
            let next = self.responses.lock().unwrap().pop_front();
            let (delay, result) = next.unwrap_or((Duration::ZERO, Ok(Vec::new())));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }

    pub(crate) fn movie(id: i64, name: &str) -> Movie {
        Movie {
            id,
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn repository(catalog: Arc<FakeCatalog>) -> MovieRepository {
        MovieRepository::new(catalog, LocalStore::new(Database::open_in_memory().unwrap()))
    }

    async fn single(stream: RepoStream) -> Vec<RepoEvent<Vec<Movie>>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_fetch_movies_yields_one_success() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Ok(vec![movie(10, "Batman"), movie(20, "Batman Beyond")]));
        let repo = repository(catalog.clone());

        let events = single(repo.fetch_movies(QueryParams::new())).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            RepoEvent::Success(Some(movies)) => assert_eq!(movies.len(), 2),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(catalog.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_movies_yields_one_error() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Err(ApiError::new("Request timed out")));
        let repo = repository(catalog);

        let events = single(repo.fetch_movies(QueryParams::new())).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            RepoEvent::Error(e) => assert_eq!(e.message, "Request timed out"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_movies_applies_stored_favorites() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Ok(vec![movie(10, "Batman"), movie(20, "Superman")]));
        let repo = repository(catalog);

        repo.update_movie(Movie {
            is_favorite: true,
            ..movie(10, "Batman")
        })
        .await
        .unwrap();

        let events = single(repo.fetch_movies(QueryParams::new())).await;
        let RepoEvent::Success(Some(movies)) = &events[0] else {
            panic!("expected success");
        };
        assert!(movies[0].is_favorite);
        assert!(!movies[1].is_favorite);
    }

    #[tokio::test]
    async fn test_local_fetch_after_insert() {
        let repo = repository(Arc::new(FakeCatalog::default()));
        repo.insert_movies_to_local_database(vec![movie(1, "One"), movie(2, "Two")])
            .await
            .unwrap();

        let events = single(repo.fetch_movies_from_local_database()).await;
        assert_eq!(events.len(), 1);
        let RepoEvent::Success(Some(movies)) = &events[0] else {
            panic!("expected success");
        };
        assert_eq!(movies.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);
    }
}
