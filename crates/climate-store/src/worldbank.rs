//! # World Bank Client
//!
//! Paginated fetch of one indicator for every country over a year range.

use std::time::Duration;

use async_trait::async_trait;
use climate_domain::YearRange;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::raw::RawRecord;
use crate::source::IndicatorFetcher;

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";

/// World Bank API client configuration
#[derive(Debug, Clone)]
pub struct WorldBankConfig {
    pub base_url: String,
    pub per_page: u32,
    pub timeout: Duration,
    pub years: YearRange,
}

impl Default for WorldBankConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            per_page: 20_000,
            timeout: Duration::from_secs(30),
            years: YearRange::default(),
        }
    }
}

/// HTTP client for the World Bank indicators API.
#[derive(Debug, Clone)]
pub struct WorldBankClient {
    http: reqwest::Client,
    config: WorldBankConfig,
}

impl WorldBankClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: WorldBankConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("climate-engine/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub const fn config(&self) -> &WorldBankConfig {
        &self.config
    }

    async fn fetch_page(&self, code: &str, page: u64) -> Result<Value> {
        let url = format!(
            "{}/country/all/indicator/{code}",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("per_page", self.config.per_page.to_string()),
                ("date", self.config.years.as_query()),
                ("page", page.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl IndicatorFetcher for WorldBankClient {
    async fn fetch_indicator(&self, code: &str) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let payload = self.fetch_page(code, page).await.map_err(|e| StoreError::Upstream {
                code: code.to_string(),
                message: e.to_string(),
            })?;
            let parsed = parse_page(code, payload)?;
            records.extend(parsed.records);

            if page >= parsed.pages {
                break;
            }
            page += 1;
        }

        Ok(records)
    }
}

#[derive(Debug)]
struct Page {
    pages: u64,
    records: Vec<RawRecord>,
}

/// Parse a `[meta, records]` response body.
fn parse_page(code: &str, payload: Value) -> Result<Page> {
    let Value::Array(mut parts) = payload else {
        return Err(StoreError::Upstream {
            code: code.to_string(),
            message: "response is not a JSON array".to_string(),
        });
    };

    let meta = parts.first().cloned().unwrap_or(Value::Null);
    if let Some(message) = meta.get("message") {
        return Err(StoreError::Upstream {
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    let pages = meta
        .get("pages")
        .and_then(|p| p.as_u64().or_else(|| p.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(1);

    let records: Vec<RawRecord> = if parts.len() > 1 {
        match parts.swap_remove(1) {
            Value::Array(items) => serde_json::from_value(Value::Array(items))?,
            _ => Vec::new(),
        }
    } else {
        Vec::new()
    };

    Ok(Page { pages, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_page_records() {
        let payload = json!([
            {"page": 1, "pages": 2, "per_page": 20000, "total": 2},
            [
                {
                    "indicator": {"id": "SP.POP.TOTL", "value": "Population, total"},
                    "country": {"id": "KR", "value": "Korea, Rep."},
                    "countryiso3code": "KOR",
                    "date": "2020",
                    "value": 51836239,
                    "unit": "",
                    "obs_status": "",
                    "decimal": 0
                },
                {
                    "country": {"id": "KR", "value": "Korea, Rep."},
                    "countryiso3code": "KOR",
                    "date": "2023",
                    "value": null
                }
            ]
        ]);

        let page = parse_page("SP.POP.TOTL", payload).unwrap();
        assert_eq!(page.pages, 2);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].iso3, "KOR");
        assert_eq!(page.records[0].value, Some(51_836_239.0));
        assert_eq!(page.records[1].value, None);
    }

    #[test]
    fn test_parse_page_without_data() {
        let payload = json!([{"page": 1, "pages": 0, "total": 0}, null]);
        let page = parse_page("X", payload).unwrap();
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_parse_page_error_message() {
        let payload = json!([{"message": [{"id": "120", "value": "Invalid value"}]}]);
        assert!(matches!(
            parse_page("BAD.CODE", payload),
            Err(StoreError::Upstream { code, .. }) if code == "BAD.CODE"
        ));
    }

    #[test]
    fn test_default_config() {
        let config = WorldBankConfig::default();
        assert_eq!(config.years.as_query(), "1990:2023");
        assert_eq!(config.per_page, 20_000);
    }
}
