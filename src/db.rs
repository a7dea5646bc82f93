//! SQLite cache of catalog records for offline viewing.
//!
//! Two tables:
//!
//! - `movies`: remote-owned fields, one row per catalog id
//! - `favorites`: the locally owned favorite flag, one row per id the user touched
//!
//! Favorites are kept apart so that re-caching a remote page never resets a
//! user's choice. Reads merge the two.
//!
//! The database is stored under the platform data directory as `moviebox.db`.
//! `Database` is synchronous; `LocalStore` is the async handle the rest of
//! the app uses, running every query on the blocking pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, params};
use thiserror::Error;

use crate::models::Movie;

/// Current schema version (stored in `PRAGMA user_version`)
const SCHEMA_VERSION: i32 = 1;

/// Errors from the local store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Unsupported schema version {0}")]
    SchemaVersion(i32),

    #[error("Database lock poisoned")]
    Poisoned,

    #[error("Task cancelled")]
    Cancelled,
}

/// Database manager for cached records
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

const MOVIE_COLUMNS: &str = "id, adult, backdrop_path, first_air_date, name, original_language, \
     original_name, overview, popularity, poster_path, vote_average, vote_count";

impl Database {
    /// Default database file path
    pub fn db_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("com", "moviebox", "Moviebox")
            .ok_or(StoreError::NoDataDir)?;

        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("moviebox.db"))
    }

    /// Open or create the database at the default location
    pub fn open() -> Result<Self, StoreError> {
        Self::open_at(&Self::db_path()?)
    }

    /// Open or create the database at `path`
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        let db = Self { conn };
        db.init_schema()?;

        tracing::debug!("Opened database at {:?}", path);
        Ok(db)
    }

    /// Open a throwaway in-memory database
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<(), StoreError> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(StoreError::SchemaVersion(version));
        }

        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS movies (
                id INTEGER PRIMARY KEY,
                adult INTEGER NOT NULL DEFAULT 0,
                backdrop_path TEXT NOT NULL DEFAULT '',
                first_air_date TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL DEFAULT '',
                original_language TEXT NOT NULL DEFAULT '',
                original_name TEXT NOT NULL DEFAULT '',
                overview TEXT NOT NULL DEFAULT '',
                popularity REAL NOT NULL DEFAULT 0,
                poster_path TEXT NOT NULL DEFAULT '',
                vote_average REAL NOT NULL DEFAULT 0,
                vote_count INTEGER NOT NULL DEFAULT 0
            );

            -- Locally owned favorite flag, merged into movies on read
            CREATE TABLE IF NOT EXISTS favorites (
                id INTEGER PRIMARY KEY,
                is_favorite INTEGER NOT NULL DEFAULT 0
            );
            ",
        )?;
        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    fn row_to_movie(row: &Row) -> Result<Movie, rusqlite::Error> {
        Ok(Movie {
            id: row.get(0)?,
            adult: row.get::<_, i32>(1)? != 0,
            backdrop_path: row.get(2)?,
            first_air_date: row.get(3)?,
            name: row.get(4)?,
            original_language: row.get(5)?,
            original_name: row.get(6)?,
            overview: row.get(7)?,
            popularity: row.get(8)?,
            poster_path: row.get(9)?,
            vote_average: row.get(10)?,
            vote_count: row.get(11)?,
            is_favorite: row.get::<_, i32>(12)? != 0,
        })
    }

    fn upsert_row(conn: &Connection, movie: &Movie) -> Result<(), rusqlite::Error> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO movies ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                MOVIE_COLUMNS
            ),
            params![
                movie.id,
                movie.adult as i32,
                movie.backdrop_path,
                movie.first_air_date,
                movie.name,
                movie.original_language,
                movie.original_name,
                movie.overview,
                movie.popularity,
                movie.poster_path,
                movie.vote_average,
                movie.vote_count,
            ],
        )?;
        Ok(())
    }

    /// Insert or replace every record. Stored favorite flags are left alone.
    pub fn insert_all(&self, movies: &[Movie]) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        for movie in movies {
            Self::upsert_row(&tx, movie)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Read every cached record with its favorite flag applied
    pub fn get_all(&self) -> Result<Vec<Movie>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.adult, m.backdrop_path, m.first_air_date, m.name,
                    m.original_language, m.original_name, m.overview, m.popularity,
                    m.poster_path, m.vote_average, m.vote_count,
                    COALESCE(f.is_favorite, 0)
             FROM movies m LEFT JOIN favorites f ON f.id = m.id
             ORDER BY m.id",
        )?;

        let movies = stmt
            .query_map([], Self::row_to_movie)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(movies)
    }

    /// Replace one record, including its favorite flag
    pub fn update_one(&self, movie: &Movie) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        Self::upsert_row(&tx, movie)?;
        tx.execute(
            "INSERT OR REPLACE INTO favorites (id, is_favorite) VALUES (?, ?)",
            params![movie.id, movie.is_favorite as i32],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Ids currently marked as favorite
    pub fn favorite_ids(&self) -> Result<HashSet<i64>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM favorites WHERE is_favorite != 0")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// Number of cached records
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Drop all cached records, keeping favorites. Returns rows removed.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let removed = self.conn.execute("DELETE FROM movies", [])?;
        Ok(removed)
    }
}

/// Async, cloneable handle to the database
#[derive(Clone, Debug)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
}

impl LocalStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Run `f` against the database on the blocking pool
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let db = db.lock().map_err(|_| StoreError::Poisoned)?;
            f(&db)
        })
        .await
        .map_err(|_| StoreError::Cancelled)?
    }

    pub async fn insert_all(&self, movies: Vec<Movie>) -> Result<(), StoreError> {
        self.run(move |db| db.insert_all(&movies)).await
    }

    pub async fn get_all(&self) -> Result<Vec<Movie>, StoreError> {
        self.run(|db| db.get_all()).await
    }

    pub async fn update_one(&self, movie: Movie) -> Result<(), StoreError> {
        self.run(move |db| db.update_one(&movie)).await
    }

    pub async fn favorite_ids(&self) -> Result<HashSet<i64>, StoreError> {
        self.run(|db| db.favorite_ids()).await
    }
}
