//! View model coordinating the repository and the screens.
//!
//! Owns the page cursor and publishes a `ViewState` through a watch channel.
//! Every fetch gets a fresh `RequestId`; screens use it to ignore results of
//! requests they have since superseded. Fetches are never cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ApiConfig;
use crate::models::{Movie, RepoEvent, RequestId, UiEvent, ViewState};
use crate::repository::{MovieRepository, RepoStream};
use crate::tmdb::QueryParams;

/// Fixed parameters sent with every remote fetch
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub api_key: String,
    pub language: String,
    pub include_adult: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: "en-US".to_string(),
            include_adult: false,
        }
    }
}

impl From<&ApiConfig> for FetchSettings {
    fn from(api: &ApiConfig) -> Self {
        Self {
            api_key: api.api_key.clone(),
            language: api.language.clone(),
            include_adult: api.include_adult,
        }
    }
}

impl FetchSettings {
    /// Query parameters for one page of `query`
    pub fn params(&self, page: u32, query: &str) -> QueryParams {
        let mut params = QueryParams::new();
        params.insert("api_key".into(), self.api_key.clone());
        params.insert("language".into(), self.language.clone());
        params.insert("page".into(), page.to_string());
        params.insert("query".into(), query.to_string());
        params.insert("include_adult".into(), self.include_adult.to_string());
        params
    }
}

struct Inner {
    repository: MovieRepository,
    settings: FetchSettings,
    page: AtomicU32,
    last_request: AtomicU64,
    state: watch::Sender<ViewState>,
}

/// Shared view model; clones refer to the same state
#[derive(Clone)]
pub struct MoviesViewModel {
    inner: Arc<Inner>,
}

impl MoviesViewModel {
    pub fn new(repository: MovieRepository, settings: FetchSettings) -> Self {
        let (state, _) = watch::channel(ViewState::Idle);
        Self {
            inner: Arc::new(Inner {
                repository,
                settings,
                page: AtomicU32::new(1),
                last_request: AtomicU64::new(0),
                state,
            }),
        }
    }

    /// Current page cursor (1-based)
    pub fn page(&self) -> u32 {
        self.inner.page.load(Ordering::SeqCst)
    }

    pub fn set_page(&self, page: u32) {
        self.inner.page.store(page.max(1), Ordering::SeqCst);
    }

    /// Advance the cursor and return the new page
    pub fn next_page(&self) -> u32 {
        self.inner.page.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset_page(&self) {
        self.set_page(1);
    }

    /// Most recently published state
    #[cfg(test)]
    pub fn state(&self) -> ViewState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes. The current state is replayed: the first
    /// `changed()` on the returned receiver resolves immediately.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        let mut rx = self.inner.state.subscribe();
        rx.mark_changed();
        rx
    }

    fn next_request(&self) -> RequestId {
        RequestId(self.inner.last_request.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn publish(&self, request: RequestId, event: UiEvent<Vec<Movie>>) {
        self.inner.state.send_modify(|state| {
            let next = state.apply(request, event);
            tracing::trace!("View state {:?} -> {:?}", state.request(), next.request());
            *state = next;
        });
    }

    /// Undo the cursor advance for an empty page, unless someone moved it since
    fn roll_back_page(&self, fetched_page: u32) {
        if fetched_page > 1 {
            let rolled = self.inner.page.compare_exchange(
                fetched_page,
                fetched_page - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
            if rolled.is_ok() {
                tracing::debug!("Page {} was empty, cursor back to {}", fetched_page, fetched_page - 1);
            }
        }
    }

    /// Fetch the current page of `query` from the remote catalog
    pub fn fetch_movies(&self, query: &str) -> RequestId {
        let request = self.next_request();
        let page = self.page();
        let params = self.inner.settings.params(page, query);
        tracing::info!("Fetching \"{}\" page {} ({})", query, page, request);

        let results = self.inner.repository.fetch_movies(params);
        self.run(request, results, Some(page));
        request
    }

    /// Load everything from the local cache
    pub fn fetch_movies_from_local_database(&self) -> RequestId {
        let request = self.next_request();
        tracing::info!("Loading cached records ({})", request);

        let results = self.inner.repository.fetch_movies_from_local_database();
        self.run(request, results, None);
        request
    }

    fn run(&self, request: RequestId, mut results: RepoStream, page: Option<u32>) {
        self.publish(request, UiEvent::Loading { showing: true });

        let this = self.clone();
        tokio::spawn(async move {
            while let Some(result) = results.next().await {
                this.publish(request, UiEvent::Loading { showing: false });

                match result {
                    RepoEvent::Success(data) => {
                        let empty = data.as_ref().is_none_or(|d| d.is_empty());
                        if let (Some(page), true) = (page, empty) {
                            this.roll_back_page(page);
                        }
                        this.publish(request, UiEvent::Success(data));
                    }
                    RepoEvent::Error(e) => {
                        tracing::warn!("Fetch {} failed (status {:?}): {}", request, e.status, e);
                        this.publish(
                            request,
                            UiEvent::Error {
                                message: e.message,
                                field: None,
                            },
                        );
                    }
                }
            }
        });
    }

    /// Persist one record in the background
    pub fn update_movie(&self, movie: Movie) -> JoinHandle<()> {
        self.inner.repository.update_movie(movie)
    }

    /// Cache records in the background
    pub fn insert_movies_to_local_database(&self, movies: Vec<Movie>) -> JoinHandle<()> {
        self.inner.repository.insert_movies_to_local_database(movies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Settled;
    use crate::repository::tests::{FakeCatalog, movie, repository};
    use crate::tmdb::ApiError;
    use std::time::Duration;

    fn view_model(catalog: Arc<FakeCatalog>) -> MoviesViewModel {
        let settings = FetchSettings {
            api_key: "secret".into(),
            ..Default::default()
        };
        MoviesViewModel::new(repository(catalog), settings)
    }

    async fn wait_settled(rx: &mut watch::Receiver<ViewState>, request: RequestId) -> Option<ViewState> {
        let state = rx
            .wait_for(|state| matches!(state, ViewState::Settled { request: r, .. } if *r == request))
            .await
            .ok()?;
        Some(state.clone())
    }

    async fn settle(vm: &MoviesViewModel, request: RequestId) -> ViewState {
        let mut rx = vm.subscribe();
        tokio::time::timeout(Duration::from_secs(5), wait_settled(&mut rx, request))
            .await
            .expect("request did not settle")
            .expect("view model dropped")
    }

    #[test]
    fn test_params() {
        let params = FetchSettings::default().params(3, "batman");
        assert_eq!(params["page"], "3");
        assert_eq!(params["query"], "batman");
        assert_eq!(params["language"], "en-US");
        assert_eq!(params["include_adult"], "false");
        assert!(params.contains_key("api_key"));
    }

    #[tokio::test]
    async fn test_fetch_publishes_loading_then_success() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push_delayed(Duration::from_millis(50), Ok(vec![movie(10, "Batman")]));
        let vm = view_model(catalog.clone());

        let request = vm.fetch_movies("batman");
        assert_eq!(vm.state(), ViewState::Loading { request });

        let state = settle(&vm, request).await;
        assert_eq!(
            state,
            ViewState::Settled {
                request,
                outcome: Settled::Success(Some(vec![movie(10, "Batman")])),
            }
        );

        let calls = catalog.calls();
        assert_eq!(calls[0]["query"], "batman");
        assert_eq!(calls[0]["page"], "1");
        assert_eq!(calls[0]["api_key"], "secret");
    }

    #[tokio::test]
    async fn test_fetch_error_carries_message() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Err(ApiError::new("Invalid API key")));
        let vm = view_model(catalog);

        let request = vm.fetch_movies("all");
        match settle(&vm, request).await {
            ViewState::Settled {
                outcome: Settled::Error { message, field },
                ..
            } => {
                assert_eq!(message, "Invalid API key");
                assert_eq!(field, None);
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_page_rolls_cursor_back() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Ok(Vec::new()));
        let vm = view_model(catalog);

        vm.set_page(3);
        let request = vm.fetch_movies("all");
        settle(&vm, request).await;
        assert_eq!(vm.page(), 2);
    }

    #[tokio::test]
    async fn test_empty_first_page_keeps_cursor() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Ok(Vec::new()));
        let vm = view_model(catalog);

        let request = vm.fetch_movies("nothing matches");
        settle(&vm, request).await;
        assert_eq!(vm.page(), 1);
    }

    #[tokio::test]
    async fn test_non_empty_page_keeps_cursor() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Ok(vec![movie(1, "One")]));
        let vm = view_model(catalog);

        vm.set_page(2);
        let request = vm.fetch_movies("all");
        settle(&vm, request).await;
        assert_eq!(vm.page(), 2);
    }

    #[tokio::test]
    async fn test_request_ids_increase() {
        let vm = view_model(Arc::new(FakeCatalog::default()));
        let first = vm.fetch_movies("a");
        let second = vm.fetch_movies_from_local_database();
        assert!(second > first);
        assert_ne!(first, RequestId::NONE);
    }

    #[tokio::test]
    async fn test_subscribe_replays_current_state() {
        let catalog = Arc::new(FakeCatalog::default());
        catalog.push(Ok(vec![movie(1, "One")]));
        let vm = view_model(catalog);

        let request = vm.fetch_movies("all");
        settle(&vm, request).await;

        // A subscriber attaching after the fact still sees the settled state
        let mut late = vm.subscribe();
        tokio::time::timeout(Duration::from_secs(1), late.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(late.borrow_and_update().request(), request);
    }

    #[tokio::test]
    async fn test_local_fetch_reads_cache() {
        let vm = view_model(Arc::new(FakeCatalog::default()));
        vm.insert_movies_to_local_database(vec![movie(1, "One"), movie(2, "Two")])
            .await
            .unwrap();

        let request = vm.fetch_movies_from_local_database();
        match settle(&vm, request).await {
            ViewState::Settled {
                outcome: Settled::Success(Some(movies)),
                ..
            } => assert_eq!(movies.len(), 2),
            other => panic!("unexpected state: {:?}", other),
        }
    }
}
