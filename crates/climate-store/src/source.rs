//! # Source Traits
//!
//! Abstract boundaries between the raw store and whatever produces it.
//! Implementations can be swapped for different backends (World Bank, fixtures, etc.)

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use climate_domain::Catalog;

use crate::error::Result;
use crate::raw::{RawRecord, RawStore};

/// Fetches every country's observations for one upstream indicator code.
#[async_trait]
pub trait IndicatorFetcher: Send + Sync {
    async fn fetch_indicator(&self, code: &str) -> Result<Vec<RawRecord>>;
}

/// Produces a complete raw store for a catalog.
///
/// Per-indicator failures are recorded in [`RawStore::unavailable`] rather
/// than returned; an `Err` means no data could be produced at all.
#[async_trait]
pub trait RawSource: Send + Sync {
    async fn load(&self, catalog: &Catalog) -> Result<RawStore>;
}

/// Serves a fixed, replaceable raw store. Used for offline fixtures and tests.
#[derive(Debug, Default)]
pub struct StaticSource {
    store: RwLock<RawStore>,
}

impl StaticSource {
    #[must_use]
    pub const fn new(store: RawStore) -> Self {
        Self {
            store: RwLock::new(store),
        }
    }

    /// Swap in new content for subsequent loads.
    pub fn replace(&self, store: RawStore) {
        *self.store.write().unwrap_or_else(PoisonError::into_inner) = store;
    }
}

#[async_trait]
impl RawSource for StaticSource {
    async fn load(&self, _catalog: &Catalog) -> Result<RawStore> {
        Ok(self
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}
