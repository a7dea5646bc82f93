//! Favorites screen: cached records marked as favorite

use tokio::sync::watch;

use crate::models::{Movie, RequestId, UiEvent, ViewState};
use crate::screens::{ScreenEvent, WorkingSet, details};
use crate::viewmodel::MoviesViewModel;

/// Favorites screen controller
pub struct FavoritesScreen {
    view_model: MoviesViewModel,
    states: watch::Receiver<ViewState>,
    items: WorkingSet,
    latest: Option<RequestId>,
    settled: Option<RequestId>,
}

impl FavoritesScreen {
    pub fn new(view_model: MoviesViewModel) -> Self {
        let states = view_model.subscribe();
        Self {
            view_model,
            states,
            items: WorkingSet::new(),
            latest: None,
            settled: None,
        }
    }

    /// Favorites in cache order
    pub fn visible(&self) -> Vec<Movie> {
        self.items.to_vec()
    }

    /// Always reads the local cache; the network is never used here
    pub fn on_create(&mut self) -> RequestId {
        let request = self.view_model.fetch_movies_from_local_database();
        self.latest = Some(request);
        request
    }

    pub fn on_state(&mut self, state: &ViewState) -> Vec<ScreenEvent> {
        let request = state.request();
        if self.latest != Some(request) {
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
                    self.items.clear();
                    self.items
                        .merge(movies.into_iter().filter(|m| m.is_favorite));
                    events.push(ScreenEvent::Rendered(self.items.len()));
                }
                UiEvent::Success(None) => {}
                UiEvent::Error { message, .. } => events.push(ScreenEvent::Notice(message)),
            }
        }
        events
    }

    pub async fn next_update(&mut self) -> Option<Vec<ScreenEvent>> {
        self.states.changed().await.ok()?;
        let state = self.states.borrow_and_update().clone();
        Some(self.on_state(&state))
    }

    /// Handle states until the load settles
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

    pub fn open_details(&self, id: i64) -> Option<String> {
        details::encode(self.items.get(id)?).ok()
    }

    /// A record came back from the detail screen. Un-favorited records leave
    /// the list; anything else is ignored here.
    pub fn on_details_result(&mut self, payload: &str) -> Result<Vec<ScreenEvent>, serde_json::Error> {
        let updated = details::decode(payload)?;
        if updated.is_favorite || self.items.remove(updated.id).is_none() {
            return Ok(Vec::new());
        }
        Ok(vec![ScreenEvent::Rendered(self.items.len())])
    }
}
