// # Count Source Trait
//
// Defines the interface for querying the number of observations matching a
// filter set.
//
// ## Implementations
//
// - iNaturalist species counts: `inat-alert-inaturalist` crate
//
// ## Usage
//
// ```rust,ignore
// use inat_alert_core::{CountSource, FilterSet};
//
// let filters = FilterSet::new(true, true, true, "Danaus plexippus");
// let total = source.total_results(&filters).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Query parameters for the observation-count API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Only research-grade accurate observations
    pub include_accurate: bool,
    /// Only identified observations
    pub include_identified: bool,
    /// Only observations with photos
    pub include_photos: bool,
    /// Scientific or common taxon name
    pub taxon_name: String,
}

impl FilterSet {
    /// Create a new filter set
    pub fn new(
        include_accurate: bool,
        include_identified: bool,
        include_photos: bool,
        taxon_name: impl Into<String>,
    ) -> Self {
        Self {
            include_accurate,
            include_identified,
            include_photos,
            taxon_name: taxon_name.into(),
        }
    }

    /// Query-string pairs with booleans rendered as lowercase strings
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("acc", self.include_accurate.to_string()),
            ("identified", self.include_identified.to_string()),
            ("photos", self.include_photos.to_string()),
            ("taxon_name", self.taxon_name.clone()),
        ]
    }
}

/// Trait for observation-count API clients
///
/// Implementations perform exactly one request per call. Retries, state and
/// notification decisions belong to [`crate::CountChecker`].
#[async_trait]
pub trait CountSource: Send + Sync {
    /// Fetch `total_results` for the given filters
    ///
    /// # Returns
    ///
    /// - `Ok(u64)`: The reported total
    /// - `Err(Error::Transport)`: Network failure, timeout or non-2xx status
    /// - `Err(Error::Format)`: The body lacks an integer `total_results`
    async fn total_results(&self, filters: &FilterSet) -> Result<u64, crate::Error>;

    /// Source name for logging
    fn source_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_lowercase_booleans() {
        let filters = FilterSet::new(true, false, true, "Danaus plexippus");
        let pairs = filters.query_pairs();

        assert_eq!(pairs[0], ("acc", "true".to_string()));
        assert_eq!(pairs[1], ("identified", "false".to_string()));
        assert_eq!(pairs[2], ("photos", "true".to_string()));
        assert_eq!(pairs[3], ("taxon_name", "Danaus plexippus".to_string()));
    }
}
