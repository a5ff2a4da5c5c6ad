//! Application state shared across handlers.

use crate::config::Config;
use crate::db::CatalogStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state.
///
/// The store's connection pool is the only cross-request state; everything
/// else is request-scoped.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Read-only catalog store.
    pub store: CatalogStore,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: Config, store: CatalogStore) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Base URL prefix for generated links (may be empty for relative links).
    pub fn base_url(&self) -> &str {
        &self.config.server.base_url
    }

    /// Root directory of the book files.
    pub fn books_root(&self) -> PathBuf {
        self.config.library.books_root()
    }
}
