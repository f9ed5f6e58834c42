//! # Climate Indicator API
//!
//! JSON-over-HTTP service for the climate indicator engine.
//!
//! ## Features
//!
//! - **Country profiles**: every indicator's history, latest value and growth
//! - **Analytics**: correlation, green-growth ranking, linear forecasts
//! - **Metadata**: country list and cluster-grouped indicator catalog
//! - **Refresh**: rebuild from the raw store and swap atomically
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Axum HTTP Server                         │
//! │            (/api/v2, /api/v1/data/master, /health)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  AnalyticsEngine                            │
//! │           (pinned to one Arc<Snapshot> per request)         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SnapshotStore                             │
//! │              (ArcSwap, generation counter)                  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │ refresh
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │          RawSource (Collector: disk cache + World Bank)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use context::AppState;
pub use error::{ApiError, ApiResult};

/// Build the CORS layer from configured origins; `*` allows any.
#[must_use]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(allow_origin)
        .allow_headers(Any)
}

/// Build the Axum router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let v2 = Router::new()
        .route("/country/{iso3}", get(handlers::query::country_profile))
        .route(
            "/analytics/correlation/{x}/{y}",
            get(handlers::query::correlation),
        )
        .route("/analytics/green-growth", get(handlers::query::green_growth))
        .route(
            "/analytics/forecast/{iso3}/{indicator}",
            get(handlers::query::forecast),
        )
        .route("/meta/countries", get(handlers::query::countries))
        .route("/meta/indicators", get(handlers::query::indicators))
        .route("/admin/refresh", post(handlers::admin::refresh))
        .route("/admin/snapshot", get(handlers::admin::snapshot_info));

    Router::new()
        .nest("/api/v2", v2)
        .route("/api/v1/data/master", get(handlers::query::master_table))
        .route("/health", get(handlers::admin::health))
        .route("/", get(|| async { "Climate Indicator Engine API" }))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
