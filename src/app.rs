//! Application wiring: config, cache, client, view model and connectivity

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::db::{Database, LocalStore};
use crate::network::{Connectivity, FixedConnectivity, TcpProbe};
use crate::repository::MovieRepository;
use crate::screens::{FavoritesScreen, MoviesScreen};
use crate::tmdb::CatalogClient;
use crate::viewmodel::{FetchSettings, MoviesViewModel};

/// Main application state shared by CLI commands and the shell
pub struct App {
    /// Application configuration
    pub config: Config,
    /// View model shared by every screen
    pub view_model: MoviesViewModel,
    /// Reachability check used by the list screen
    pub connectivity: Arc<dyn Connectivity>,
}

impl App {
    /// Load configuration and open the default database.
    /// `offline` skips the network entirely.
    pub fn init(offline: bool) -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        let db = Database::open().context("Failed to open database")?;
        Self::with_parts(config, db, offline)
    }

    pub fn with_parts(config: Config, db: Database, offline: bool) -> Result<Self> {
        let client = CatalogClient::new(&config.api.base_url, config.api.timeout())
            .context("Failed to create catalog client")?;

        if config.api.api_key.is_empty() && !offline {
            tracing::warn!("No API key configured; set api.api_key or MOVIEBOX_API_KEY");
        }

        let connectivity: Arc<dyn Connectivity> = if offline {
            Arc::new(FixedConnectivity(false))
        } else {
            let (api_host, port) = client
                .endpoint()
                .context("Catalog base URL has no host")?;
            let host = config.network.probe_host.clone().unwrap_or(api_host);
            Arc::new(TcpProbe::new(
                host,
                port,
                Duration::from_millis(config.network.probe_timeout_ms),
            ))
        };

        let repository = MovieRepository::new(Arc::new(client), LocalStore::new(db));
        let view_model = MoviesViewModel::new(repository, FetchSettings::from(&config.api));

        Ok(Self {
            config,
            view_model,
            connectivity,
        })
    }

    /// A fresh list screen using the configured sort
    pub fn movies_screen(&self) -> MoviesScreen {
        MoviesScreen::new(
            self.view_model.clone(),
            Arc::clone(&self.connectivity),
            self.config.display.sort,
        )
    }

    pub fn favorites_screen(&self) -> FavoritesScreen {
        FavoritesScreen::new(self.view_model.clone())
    }
}
