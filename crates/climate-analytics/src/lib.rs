//! # Climate Analytics
//!
//! Builds country profiles from the raw store, publishes them as immutable
//! snapshots, and answers cross-country queries against a snapshot.
//!
//! ## Features
//!
//! - Latest value and five-year compound growth per indicator
//! - Atomic snapshot swap on refresh, with validation before publish
//! - Pearson correlation between any two indicators
//! - Green-growth (GDP/CO2 decoupling) ranking
//! - Linear-trend forecasts with p-values
//! - Latest-value master table

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod error;
pub mod profile;
pub mod queries;
pub mod reports;
pub mod snapshot;
pub mod stats;

pub use engine::{AnalyticsEngine, DEFAULT_TARGET_YEAR};
pub use error::{AnalyticsError, Result};
pub use profile::{ProfileBuilder, growth_rate};
pub use snapshot::{Snapshot, SnapshotStore};
