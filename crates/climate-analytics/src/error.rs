//! Analytics error types.

use thiserror::Error;

/// Analytics errors.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Unknown country or indicator key
    #[error("{entity_type} '{id}' not found")]
    NotFound {
        /// Kind of entity looked up
        entity_type: &'static str,
        /// Identifier that missed
        id: String,
    },

    /// Statistical operation below its minimum sample size
    #[error("Insufficient data: need at least {required} samples, have {available}")]
    InsufficientData {
        /// Minimum sample count
        required: usize,
        /// Samples actually available
        available: usize,
    },

    /// Raw store could not be produced
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Built snapshot violates a structural invariant
    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

impl AnalyticsError {
    pub(crate) fn country(iso3: &str) -> Self {
        Self::NotFound {
            entity_type: "Country",
            id: iso3.to_string(),
        }
    }

    pub(crate) fn indicator(key: &str) -> Self {
        Self::NotFound {
            entity_type: "Indicator",
            id: key.to_string(),
        }
    }
}

impl From<climate_store::StoreError> for AnalyticsError {
    fn from(err: climate_store::StoreError) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}

/// Result type for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
