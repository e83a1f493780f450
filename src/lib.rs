//! Snipster Server Library
//!
//! Snippet storage backend: accounts and sessions, folders, snippets, share
//! links and a live change feed. Exported for the binary and the tests.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod search;
pub mod security;

pub use config::Config;
pub use db::{open_database, Db};
pub use error::{AppError, Result};

use tokio::sync::broadcast;

use crate::constants::CHANGE_FEED_CAPACITY;
use crate::models::{ChangeEvent, ChangeNotice};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub changes: broadcast::Sender<ChangeNotice>,
}

impl AppState {
    /// Create a new AppState with the given database and configuration
    pub fn new(db: Db, config: Config) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            db,
            config,
            changes,
        }
    }

    /// Push a change to the realtime subscribers of `owner_id`
    ///
    /// Having no subscribers is the normal case, not an error.
    pub fn publish(&self, owner_id: &str, event: ChangeEvent) {
        let _ = self.changes.send(ChangeNotice {
            owner_id: owner_id.to_string(),
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.changes.subscribe()
    }
}
