// # iNaturalist Count Source
//
// This crate provides the iNaturalist `species_counts` implementation of
// `CountSource`.
//
// ## Behavior
//
// - One GET per call, no retries (a missed tick is simply retried by the
//   next firing)
// - Bounded request timeout
// - Non-2xx statuses and network errors map to `Error::Transport`
// - A body without an integer `total_results` maps to `Error::Format`
//
// ## API Reference
//
// - GET https://api.inaturalist.org/v1/observations/species_counts
//   ?acc=true&identified=true&photos=true&taxon_name=...

use async_trait::async_trait;
use inat_alert_core::config::ApiConfig;
use inat_alert_core::traits::{CountSource, FilterSet};
use inat_alert_core::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// iNaturalist observation-count client
#[derive(Debug, Clone)]
pub struct InaturalistCountSource {
    /// Species-count endpoint
    url: String,

    /// Request timeout
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl InaturalistCountSource {
    /// Create a source for the given endpoint
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("inat-alert/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            url: url.into(),
            timeout,
            client,
        }
    }

    /// Create a source from configuration
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.url.clone(), Duration::from_secs(config.timeout_secs))
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for InaturalistCountSource {
    fn default() -> Self {
        Self::new(inat_alert_core::config::DEFAULT_API_URL, DEFAULT_HTTP_TIMEOUT)
    }
}

#[async_trait]
impl CountSource for InaturalistCountSource {
    async fn total_results(&self, filters: &FilterSet) -> Result<u64> {
        let response = self
            .client
            .get(&self.url)
            .query(&filters.query_pairs())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::transport(format!("Request timed out after {:?}: {}", self.timeout, e))
                } else {
                    Error::transport(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(format!("HTTP error: {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

        let total = parse_total_results(&body)?;
        tracing::debug!("{} reported {} result(s) for '{}'", self.url, total, filters.taxon_name);
        Ok(total)
    }

    fn source_name(&self) -> &'static str {
        "iNaturalist"
    }
}

/// Extract `total_results` from a species-count response body
pub fn parse_total_results(body: &str) -> Result<u64> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| Error::format(format!("Response is not JSON: {}", e)))?;

    match json.get("total_results") {
        None => Err(Error::format("missing total_results")),
        Some(value) => value.as_u64().ok_or_else(|| {
            Error::format(format!("total_results is not a non-negative integer: {}", value))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_total_results() {
        let body = r#"{"total_results": 57, "page": 1, "per_page": 500, "results": []}"#;
        assert_eq!(parse_total_results(body).unwrap(), 57);
    }

    #[test]
    fn test_parse_zero_total() {
        assert_eq!(parse_total_results(r#"{"total_results": 0}"#).unwrap(), 0);
    }

    #[test]
    fn test_parse_missing_field() {
        let err = parse_total_results(r#"{"page": 1, "results": []}"#).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(err.to_string().contains("missing total_results"));
    }

    #[test]
    fn test_parse_wrong_type() {
        for body in [
            r#"{"total_results": "57"}"#,
            r#"{"total_results": -1}"#,
            r#"{"total_results": 1.5}"#,
            r#"{"total_results": null}"#,
        ] {
            let err = parse_total_results(body).unwrap_err();
            assert!(matches!(err, Error::Format(_)), "body {} should be a format error", body);
        }
    }

    #[test]
    fn test_parse_not_json() {
        let err = parse_total_results("<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_from_config() {
        let config = ApiConfig {
            url: "http://127.0.0.1:9/species_counts".to_string(),
            timeout_secs: 3,
        };

        let source = InaturalistCountSource::from_config(&config);
        assert_eq!(source.url(), "http://127.0.0.1:9/species_counts");
        assert_eq!(source.timeout(), Duration::from_secs(3));
        assert_eq!(source.source_name(), "iNaturalist");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Port 9 (discard) is closed on test hosts; connection is refused
        let source = InaturalistCountSource::new(
            "http://127.0.0.1:9/species_counts",
            Duration::from_secs(2),
        );

        let err = source
            .total_results(&FilterSet::new(true, true, true, "Danaus plexippus"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
