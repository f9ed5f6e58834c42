//! # Climate Store
//!
//! Raw indicator data for the climate indicator engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RawSource trait                          │
//! │        (Collector for production, StaticSource for tests)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Collector                              │
//! │          (cache-aside, parallel per-indicator fetch)        │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │     DiskCache           │   │     WorldBankClient          │
//! │  (world_bank_cache.json)│   │   (api.worldbank.org/v2)     │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use climate_store::{Collector, DiskCache, WorldBankClient, WorldBankConfig};
//!
//! let client = WorldBankClient::new(WorldBankConfig::default())?;
//! let collector = Collector::new(client).with_cache(DiskCache::new("data", max_age));
//! let raw = collector.load(&catalog).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod collector;
pub mod error;
pub mod raw;
pub mod source;
pub mod worldbank;

// Re-export commonly used types
pub use cache::{CACHE_FILE_NAME, DEFAULT_MAX_AGE, DiskCache};
pub use collector::Collector;
pub use error::{Result, StoreError};
pub use raw::{RawRecord, RawStore};
pub use source::{IndicatorFetcher, RawSource, StaticSource};
pub use worldbank::{WorldBankClient, WorldBankConfig};
