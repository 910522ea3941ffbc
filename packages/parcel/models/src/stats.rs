//! Commercial listing input and the summary shapes derived from it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Currency every listing price is quoted in.
pub const LISTING_CURRENCY: &str = "TZS";

/// Land-use label for parcels with no recorded land use.
pub const UNKNOWN_LAND_USE: &str = "Unknown";

/// Lifecycle state of a listing. Only [`ListingStatus::Active`] listings
/// feed statistics.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Active,
    Pending,
    Sold,
    Inactive,
}

/// A commercial listing for a parcel, supplied by the listings service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Internal id of the listed parcel.
    pub parcel: u64,
    #[serde(default)]
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub status: ListingStatus,
}

/// Minimum, maximum, and mean of listing prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

/// Listing summary for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub region: String,
    /// Number of active listings in the region.
    pub available_plots: u64,
    pub price_range: PriceRange,
    /// Sum of the stored areas of the listed parcels.
    pub total_area_sqm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStatistics {
    pub min_price: f64,
    pub max_price: f64,
    pub average_price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaStatistics {
    pub min_area_sqm: f64,
    pub max_area_sqm: f64,
    pub average_area_sqm: f64,
    pub total_area_sqm: f64,
}

/// Statistics over a non-empty set of listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingStatistics {
    pub featured_plots: u64,
    pub price_statistics: PriceStatistics,
    pub area_statistics: AreaStatistics,
    /// Land use to number of listings.
    pub land_use_distribution: BTreeMap<String, u64>,
    pub last_updated: DateTime<Utc>,
}

/// Plot statistics for an optional region.
///
/// `statistics` is `None` when no active listing matched, which keeps the
/// empty result a normal value rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotStatistics {
    pub total_plots: u64,
    pub region: Option<String>,
    #[serde(flatten)]
    pub statistics: Option<ListingStatistics>,
}

impl PlotStatistics {
    /// The result for a listing set with no entries.
    #[must_use]
    pub const fn empty(region: Option<String>) -> Self {
        Self {
            total_plots: 0,
            region,
            statistics: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_defaults_to_active() {
        let listing: Listing =
            serde_json::from_value(serde_json::json!({"parcel": 3, "price": 1500.0})).unwrap();
        assert_eq!(listing.status, ListingStatus::Active);
        assert!(!listing.featured);
    }

    #[test]
    fn empty_statistics_shape() {
        let value =
            serde_json::to_value(PlotStatistics::empty(Some("Arusha".to_string()))).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"total_plots": 0, "region": "Arusha"})
        );
    }
}
