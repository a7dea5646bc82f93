//! Core data types shared by the client, store, view model and screens.
//!
//! - `Movie`: a catalog record as returned by TMDB or read from the cache
//! - `RepoEvent`: the single result produced by a repository call
//! - `UiEvent`: what the view model reports to screens
//! - `ViewState`: the request-tagged lifecycle state screens subscribe to

use serde::{Deserialize, Deserializer, Serialize};

use crate::tmdb::ApiError;

/// A movie or TV show entry.
///
/// Identity is `id`. Everything except `is_favorite` is owned by the remote
/// catalog and may be replaced on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(default = "default_id")]
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub adult: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub backdrop_path: String,
    /// Air date as sent by the API (`YYYY-MM-DD`), compared as a string
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_air_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_language: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub popularity: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub poster_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_count: i64,
    /// Locally owned, never sent by the API
    #[serde(rename = "isFavorite", default)]
    pub is_favorite: bool,
}

fn default_id() -> i64 {
    -1
}

/// TMDB sends `null` for missing images and dates; treat it like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Default for Movie {
    fn default() -> Self {
        Self {
            id: default_id(),
            adult: false,
            backdrop_path: String::new(),
            first_air_date: String::new(),
            name: String::new(),
            original_language: String::new(),
            original_name: String::new(),
            overview: String::new(),
            popularity: 0.0,
            poster_path: String::new(),
            vote_average: 0.0,
            vote_count: 0,
            is_favorite: false,
        }
    }
}

impl Movie {
    /// Year portion of the air date, if there is one
    pub fn year(&self) -> Option<&str> {
        self.first_air_date.get(..4).filter(|y| y.chars().all(|c| c.is_ascii_digit()))
    }

    /// Full poster URL on the TMDB image CDN
    pub fn poster_url(&self) -> Option<String> {
        if self.poster_path.is_empty() {
            return None;
        }
        let file = self.poster_path.trim_start_matches('/');
        Some(format!("{}/{}", IMAGE_BASE_URL, file))
    }
}

/// Image CDN prefix for poster and backdrop paths
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Result of one repository call
#[derive(Debug, Clone)]
pub enum RepoEvent<T> {
    Success(Option<T>),
    Error(ApiError),
}

/// Events the view model reports to screens
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent<T> {
    Loading { showing: bool },
    Success(Option<T>),
    Error { message: String, field: Option<String> },
}

/// Identifies one fetch issued by the view model.
///
/// Ids increase monotonically per view model; `RequestId::NONE` is never
/// handed out and tags the initial idle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RequestId(pub u64);

impl RequestId {
    pub const NONE: RequestId = RequestId(0);
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of a settled request
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    Success(Option<Vec<Movie>>),
    Error { message: String, field: Option<String> },
}

/// Lifecycle state published by the view model.
///
/// `Idle → Loading → Settled`, each transition tagged with the request that
/// caused it. A new request may start from any state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    #[default]
    Idle,
    Loading { request: RequestId },
    Settled { request: RequestId, outcome: Settled },
}

impl ViewState {
    /// Request this state belongs to (`RequestId::NONE` while idle)
    pub fn request(&self) -> RequestId {
        match self {
            ViewState::Idle => RequestId::NONE,
            ViewState::Loading { request } | ViewState::Settled { request, .. } => *request,
        }
    }

    /// Fold a UI event for `request` into the state machine.
    ///
    /// `Loading { showing: false }` carries no information beyond what the
    /// following settle event does, so it only leaves `Loading` when it
    /// belongs to a different request.
    pub fn apply(&self, request: RequestId, event: UiEvent<Vec<Movie>>) -> ViewState {
        match event {
            UiEvent::Loading { showing: true } => ViewState::Loading { request },
            UiEvent::Loading { showing: false } => match self {
                ViewState::Loading { request: current } if *current == request => self.clone(),
                _ => ViewState::Loading { request },
            },
            UiEvent::Success(data) => ViewState::Settled {
                request,
                outcome: Settled::Success(data),
            },
            UiEvent::Error { message, field } => ViewState::Settled {
                request,
                outcome: Settled::Error { message, field },
            },
        }
    }

    /// The UI events a screen should act on for this state
    pub fn events(&self) -> Vec<UiEvent<Vec<Movie>>> {
        match self {
            ViewState::Idle => Vec::new(),
            ViewState::Loading { .. } => vec![UiEvent::Loading { showing: true }],
            ViewState::Settled { outcome, .. } => {
                let settled = match outcome {
                    Settled::Success(data) => UiEvent::Success(data.clone()),
                    Settled::Error { message, field } => UiEvent::Error {
                        message: message.clone(),
                        field: field.clone(),
                    },
                };
                vec![UiEvent::Loading { showing: false }, settled]
            }
        }
    }
}
