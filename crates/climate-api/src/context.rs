//! # API Context
//!
//! Application state shared across all HTTP handlers.

use std::sync::Arc;

use climate_analytics::{AnalyticsEngine, SnapshotStore};
use climate_store::RawSource;

use crate::config::Config;

/// Application state for Axum handlers
#[derive(Clone)]
pub struct AppState {
    /// Published snapshot handle
    pub snapshots: Arc<SnapshotStore>,

    /// Raw data source used by refreshes
    pub source: Arc<dyn RawSource>,

    /// Service configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(snapshots: Arc<SnapshotStore>, source: Arc<dyn RawSource>, config: Config) -> Self {
        Self {
            snapshots,
            source,
            config: Arc::new(config),
        }
    }

    /// Engine pinned to the snapshot in service when the request arrived.
    #[must_use]
    pub fn engine(&self) -> AnalyticsEngine {
        AnalyticsEngine::new(self.snapshots.current())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("snapshots", &self.snapshots)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
