//! Application state shared across handlers

use std::sync::Arc;

use crate::db::ConnectionManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<ConnectionManager>,
}

impl AppState {
    pub fn new(db: ConnectionManager) -> Self {
        Self { db: Arc::new(db) }
    }

    pub fn db(&self) -> &ConnectionManager {
        &self.db
    }

    /// Owned handle for background tasks (startup warm-up).
    pub fn db_handle(&self) -> Arc<ConnectionManager> {
        Arc::clone(&self.db)
    }
}
