//! # On-disk Cache
//!
//! Flat JSON file of raw World Bank records keyed by indicator code, with a
//! `_meta.timestamp` (unix seconds) used for freshness checks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::raw::RawRecord;

/// Cache file name inside the data directory.
pub const CACHE_FILE_NAME: &str = "world_bank_cache.json";

/// Default freshness window.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 3600);

/// Raw records keyed by indicator code.
pub type CachedIndicators = BTreeMap<String, Vec<RawRecord>>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct CacheMeta {
    timestamp: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    #[serde(rename = "_meta")]
    meta: CacheMeta,
    #[serde(flatten)]
    indicators: CachedIndicators,
}

/// JSON cache file handle.
#[derive(Debug, Clone)]
pub struct DiskCache {
    path: PathBuf,
    max_age: Duration,
}

impl DiskCache {
    pub fn new(data_dir: impl AsRef<Path>, max_age: Duration) -> Self {
        Self {
            path: data_dir.as_ref().join(CACHE_FILE_NAME),
            max_age,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache. With `require_fresh`, a file older than the freshness
    /// window reads as a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self, require_fresh: bool) -> Result<Option<CachedIndicators>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let cache: CacheFile = serde_json::from_str(&raw)?;

        let age = age_secs(cache.meta.timestamp);
        if require_fresh && age > self.max_age.as_secs_f64() {
            tracing::info!(
                age_hours = age / 3600.0,
                path = %self.path.display(),
                "Cache expired, will re-fetch"
            );
            return Ok(None);
        }

        tracing::info!(
            age_hours = age / 3600.0,
            indicators = cache.indicators.len(),
            "Using cached data"
        );
        Ok(Some(cache.indicators))
    }

    /// Persist records, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, indicators: &CachedIndicators) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        let cache = CacheFile {
            meta: CacheMeta {
                timestamp: now_secs(),
            },
            indicators: indicators.clone(),
        };
        let json = serde_json::to_string(&cache)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        #[allow(clippy::cast_precision_loss)]
        let size_mb = json.len() as f64 / (1024.0 * 1024.0);
        tracing::info!(path = %self.path.display(), size_mb, "Cache saved");
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

fn age_secs(timestamp: f64) -> f64 {
    (now_secs() - timestamp).max(0.0)
}
