//! Main list screen: paged, searchable, sortable, online or from cache

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::{Movie, RequestId, UiEvent, ViewState};
use crate::network::Connectivity;
use crate::screens::{DEFAULT_QUERY, ScreenEvent, SortMode, WorkingSet, details};
use crate::viewmodel::MoviesViewModel;

/// List screen controller
pub struct MoviesScreen {
    view_model: MoviesViewModel,
    connectivity: Arc<dyn Connectivity>,
    states: watch::Receiver<ViewState>,
    items: WorkingSet,
    visible: Vec<Movie>,
    sort: SortMode,
    search: String,
    /// Latest request this screen issued; older results are ignored
    latest: Option<RequestId>,
    /// Last of this screen's requests that has settled
    settled: Option<RequestId>,
    /// Whether the last trigger found the network unreachable
    offline: bool,
    persist_task: Option<JoinHandle<()>>,
}

impl MoviesScreen {
    pub fn new(view_model: MoviesViewModel, connectivity: Arc<dyn Connectivity>, sort: SortMode) -> Self {
        let states = view_model.subscribe();
        Self {
            view_model,
            connectivity,
            states,
            items: WorkingSet::new(),
            visible: Vec::new(),
            sort,
            search: String::new(),
            latest: None,
            settled: None,
            offline: false,
            persist_task: None,
        }
    }

    /// Currently rendered list
    pub fn visible(&self) -> &[Movie] {
        &self.visible
    }

    pub fn items(&self) -> &WorkingSet {
        &self.items
    }

    pub fn sort(&self) -> SortMode {
        self.sort
    }

    pub fn search_text(&self) -> &str {
        &self.search
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn view_model(&self) -> &MoviesViewModel {
        &self.view_model
    }

    fn current_query(&self) -> &str {
        if self.search.is_empty() {
            DEFAULT_QUERY
        } else {
            &self.search
        }
    }

    /// Initial load: remote first page when online, otherwise the cache
    pub async fn on_create(&mut self) -> RequestId {
        self.offline = !self.connectivity.is_online().await;
        let request = if !self.offline {
            self.view_model.fetch_movies(DEFAULT_QUERY)
        } else {
            tracing::info!("Offline, showing cached records");
            self.view_model.fetch_movies_from_local_database()
        };
        self.latest = Some(request);
        request
    }

    /// Load the next page of the current query. Does nothing offline.
    pub async fn on_scroll_to_bottom(&mut self) -> Option<RequestId> {
        self.offline = !self.connectivity.is_online().await;
        if self.offline {
            return None;
        }
        self.view_model.next_page();
        let request = self.view_model.fetch_movies(self.current_query());
        self.latest = Some(request);
        Some(request)
    }

    /// Search text changed.
    ///
    /// Online this restarts paging with a fresh remote query. Offline the
    /// cached working set is filtered by name instead.
    pub async fn on_search(&mut self, text: &str) -> Vec<ScreenEvent> {
        self.search = text.trim().to_string();

        self.offline = !self.connectivity.is_online().await;
        if !self.offline {
            self.view_model.reset_page();
            self.items.clear();
            let request = self.view_model.fetch_movies(self.current_query());
            self.latest = Some(request);
            Vec::new()
        } else {
            self.render()
        }
    }

    /// Change sort mode and re-render
    pub fn set_sort(&mut self, sort: SortMode) -> Vec<ScreenEvent> {
        self.sort = sort;
        self.render()
    }

    fn render(&mut self) -> Vec<ScreenEvent> {
        // Remote results already match the query; only the cache is filtered locally
        self.visible = if self.offline && !self.search.is_empty() {
            let mut found = self.items.filter_by_name(&self.search);
            self.sort.apply(&mut found);
            found
        } else {
            self.items.sorted(self.sort)
        };
        vec![ScreenEvent::Rendered(self.visible.len())]
    }

    /// Handle a published view state
    pub fn on_state(&mut self, state: &ViewState) -> Vec<ScreenEvent> {
        let request = state.request();
        if self.latest != Some(request) {
            if request != RequestId::NONE {
                tracing::debug!("Ignoring state for superseded request {}", request);
            }
            return Vec::new();
        }
        if matches!(state, ViewState::Settled { .. }) {
            self.settled = Some(request);
        }

        let mut events = Vec::new();
        for event in state.events() {
            match event {
                UiEvent::Loading { showing } => events.push(ScreenEvent::Loading(showing)),
                UiEvent::Success(Some(movies)) => {
                    let received = movies.len();
                    let added = self.items.merge(movies);
                    tracing::debug!("Merged {} records ({} new)", received, added);
                    self.persist_task = Some(
                        self.view_model
                            .insert_movies_to_local_database(self.items.to_vec()),
                    );
                    events.extend(self.render());
                }
                UiEvent::Success(None) => {}
                UiEvent::Error { message, .. } => events.push(ScreenEvent::Notice(message)),
            }
        }
        events
    }

    /// Wait for the next state change and handle it.
    /// Returns `None` once the view model is gone.
    pub async fn next_update(&mut self) -> Option<Vec<ScreenEvent>> {
        self.states.changed().await.ok()?;
        let state = self.states.borrow_and_update().clone();
        Some(self.on_state(&state))
    }

    /// Handle states until this screen's latest request settles; returns every event produced
    pub async fn settle(&mut self) -> Vec<ScreenEvent> {
        let Some(latest) = self.latest else {
            return Vec::new();
        };
        let mut events = Vec::new();
        while self.settled != Some(latest) {
            match self.next_update().await {
                Some(batch) => events.extend(batch),
                None => break,
            }
        }
        events
    }

    /// Wait for the last background write of the working set
    pub async fn flush(&mut self) {
        if let Some(task) = self.persist_task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Persist task failed: {}", e);
            }
        }
    }

    /// Serialized record to hand to the detail screen
    pub fn open_details(&self, id: i64) -> Option<String> {
        let movie = self.items.get(id)?;
        details::encode(movie).ok()
    }

    /// Record came back from the detail screen.
    ///
    /// Only a changed favorite flag is applied; the entry is replaced by id
    /// and the list re-rendered.
    pub fn on_details_result(&mut self, payload: &str) -> Result<Vec<ScreenEvent>, serde_json::Error> {
        let updated = details::decode(payload)?;
        let changed = self
            .items
            .get(updated.id)
            .is_some_and(|current| current.is_favorite != updated.is_favorite);
        if !changed {
            return Ok(Vec::new());
        }
        self.items.replace(updated);
        Ok(self.render())
    }
}
