//! # Collector
//!
//! Cache-aside loading of every catalog indicator: serve what the disk cache
//! has, fetch the rest in parallel, persist the union, and build a
//! [`RawStore`]. Failed fetches never abort a load; the indicator is marked
//! unavailable and simply has no data.

use std::collections::BTreeMap;

use async_trait::async_trait;
use climate_domain::Catalog;
use futures_util::FutureExt;
use futures_util::stream::{self, StreamExt};

use crate::cache::{CachedIndicators, DiskCache};
use crate::error::{Result, StoreError};
use crate::raw::{RawRecord, RawStore};
use crate::source::{IndicatorFetcher, RawSource};

/// Parallel fetches in flight.
pub const DEFAULT_CONCURRENCY: usize = 12;

/// Cache-aside indicator collector.
#[derive(Debug)]
pub struct Collector<F> {
    fetcher: F,
    cache: Option<DiskCache>,
    offline: bool,
    concurrency: usize,
}

impl<F: IndicatorFetcher> Collector<F> {
    pub const fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cache: None,
            offline: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: DiskCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Serve from the cache only (stale entries included), never fetching.
    #[must_use]
    pub const fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Load the given indicator codes into a raw store.
    ///
    /// With `force`, the cache is ignored on read and rewritten afterwards.
    ///
    /// # Errors
    ///
    /// Only in offline mode, when there is no readable cache to serve from.
    pub async fn collect(&self, codes: &[String], force: bool) -> Result<RawStore> {
        let cached = if force { None } else { self.read_cache().await? };

        let mut raw_data: CachedIndicators = BTreeMap::new();
        if let Some(mut cached) = cached {
            for code in codes {
                if let Some(records) = cached.remove(code) {
                    raw_data.insert(code.clone(), records);
                }
            }
        }

        let missing: Vec<String> = codes
            .iter()
            .filter(|c| !raw_data.contains_key(*c))
            .cloned()
            .collect();
        let mut unavailable = Vec::new();

        if missing.is_empty() {
            tracing::info!(indicators = codes.len(), "Full cache hit");
        } else if self.offline {
            tracing::warn!(missing = missing.len(), "Offline mode, indicators left without data");
            unavailable.extend(missing);
        } else {
            tracing::info!(
                cached = raw_data.len(),
                fetching = missing.len(),
                "Fetching indicators"
            );
            let fetched = self.fetch_all(missing).await;
            let mut fetched_any = false;
            for (code, result) in fetched {
                match result {
                    Ok(records) => {
                        tracing::info!(code = %code, records = records.len(), "Fetched indicator");
                        raw_data.insert(code, records);
                        fetched_any = true;
                    }
                    Err(e) => {
                        tracing::warn!(code = %code, error = %e, "Indicator unavailable");
                        unavailable.push(code);
                    }
                }
            }
            if fetched_any {
                self.write_cache(&raw_data).await;
            }
        }

        let mut store = RawStore::new();
        for (code, records) in &raw_data {
            store.ingest_records(code, records);
        }
        for code in &unavailable {
            store.mark_unavailable(code);
        }

        tracing::info!(
            indicators = store.indicator_count(),
            unavailable = unavailable.len(),
            countries = store.countries().len(),
            "Raw store ready"
        );
        Ok(store)
    }

    async fn fetch_all(&self, codes: Vec<String>) -> Vec<(String, Result<Vec<RawRecord>>)> {
        let fetcher = &self.fetcher;
        // Boxed so the stream's future stays `Send` behind `#[async_trait]`.
        stream::iter(codes)
            .map(move |code| async move {
                let result = fetcher.fetch_indicator(&code).await;
                (code, result)
            })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .boxed()
            .await
    }

    async fn read_cache(&self) -> Result<Option<CachedIndicators>> {
        let Some(cache) = &self.cache else {
            return if self.offline {
                Err(StoreError::CacheUnavailable("no cache configured".to_string()))
            } else {
                Ok(None)
            };
        };

        match cache.load(!self.offline).await {
            Ok(Some(data)) => Ok(Some(data)),
            Ok(None) if self.offline => Err(StoreError::CacheUnavailable(format!(
                "{} not found",
                cache.path().display()
            ))),
            Ok(None) => Ok(None),
            Err(e) if self.offline => Err(StoreError::CacheUnavailable(e.to_string())),
            Err(e) => {
                tracing::warn!(error = %e, "Cache read error, treating as miss");
                Ok(None)
            }
        }
    }

    async fn write_cache(&self, data: &CachedIndicators) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.save(data).await {
                tracing::warn!(error = %e, "Cache write error");
            }
        }
    }
}

#[async_trait]
impl<F: IndicatorFetcher> RawSource for Collector<F> {
    async fn load(&self, catalog: &Catalog) -> Result<RawStore> {
        let codes: Vec<String> = catalog.indicators().map(|d| d.code.clone()).collect();
        self.collect(&codes, false).await
    }
}
