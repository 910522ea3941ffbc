//! Listing statistics joined against stored parcels.
//!
//! Listings come from outside the engine. Only active listings are
//! counted, and a listing whose parcel is not in the store is skipped.

use std::collections::BTreeMap;

use chrono::Utc;
use parcel_map_parcel_models::stats::{LISTING_CURRENCY, UNKNOWN_LAND_USE};
use parcel_map_parcel_models::{
    AreaStatistics, Listing, ListingStatistics, ListingStatus, PlotStatistics, PriceRange,
    PriceStatistics, RegionSummary,
};

use crate::store::{ParcelRecord, ParcelStore};

/// Computes summaries over listings without modifying the store.
pub struct StatisticsAggregator<'a> {
    store: &'a ParcelStore,
}

impl<'a> StatisticsAggregator<'a> {
    #[must_use]
    pub const fn new(store: &'a ParcelStore) -> Self {
        Self { store }
    }

    /// Active listings paired with their parcels.
    fn active<'l>(
        &self,
        listings: &'l [Listing],
    ) -> impl Iterator<Item = (&'l Listing, &'a ParcelRecord)> {
        let store = self.store;
        listings
            .iter()
            .filter(|l| l.status == ListingStatus::Active)
            .filter_map(move |l| {
                let parcel = store.get_by_internal_id(l.parcel);
                if parcel.is_none() {
                    log::warn!("Listing {:?} references unknown parcel {}", l.title, l.parcel);
                }
                parcel.map(|p| (l, p))
            })
    }

    /// Per-region listing count, price range, and total stored area,
    /// sorted by region. Regions without active listings are omitted.
    #[must_use]
    pub fn regions_summary(&self, listings: &[Listing]) -> Vec<RegionSummary> {
        let mut groups: BTreeMap<&str, (Vec<f64>, f64)> = BTreeMap::new();

        for (listing, parcel) in self.active(listings) {
            let (prices, area) = groups.entry(parcel.attributes.region.as_str()).or_default();
            prices.push(listing.price);
            *area += parcel.attributes.area_sqm.unwrap_or(0.0);
        }

        groups
            .into_iter()
            .map(|(region, (prices, total_area_sqm))| {
                let (min, max, average) = min_max_mean(&prices);
                RegionSummary {
                    region: region.to_string(),
                    available_plots: prices.len() as u64,
                    price_range: PriceRange { min, max, average },
                    total_area_sqm,
                }
            })
            .collect()
    }

    /// Count, featured count, price and area statistics, and land-use
    /// distribution of active listings, optionally restricted to one
    /// region (exact match).
    ///
    /// Area statistics only use parcels with a stored area.
    #[must_use]
    pub fn plot_statistics(&self, listings: &[Listing], region: Option<&str>) -> PlotStatistics {
        let selected: Vec<(&Listing, &ParcelRecord)> = self
            .active(listings)
            .filter(|(_, p)| region.is_none_or(|r| p.attributes.region == r))
            .collect();

        let region = region.map(ToString::to_string);
        if selected.is_empty() {
            return PlotStatistics::empty(region);
        }

        let prices: Vec<f64> = selected.iter().map(|(l, _)| l.price).collect();
        let areas: Vec<f64> = selected
            .iter()
            .filter_map(|(_, p)| p.attributes.area_sqm)
            .collect();

        let mut land_use_distribution = BTreeMap::new();
        for (_, parcel) in &selected {
            let land_use = parcel
                .attributes
                .land_use
                .clone()
                .unwrap_or_else(|| UNKNOWN_LAND_USE.to_string());
            *land_use_distribution.entry(land_use).or_insert(0) += 1;
        }

        let (min_price, max_price, average_price) = min_max_mean(&prices);
        let (min_area_sqm, max_area_sqm, average_area_sqm) = min_max_mean(&areas);

        PlotStatistics {
            total_plots: selected.len() as u64,
            region,
            statistics: Some(ListingStatistics {
                featured_plots: selected.iter().filter(|(l, _)| l.featured).count() as u64,
                price_statistics: PriceStatistics {
                    min_price,
                    max_price,
                    average_price,
                    currency: LISTING_CURRENCY.to_string(),
                },
                area_statistics: AreaStatistics {
                    min_area_sqm,
                    max_area_sqm,
                    average_area_sqm,
                    total_area_sqm: areas.iter().sum(),
                },
                land_use_distribution,
                last_updated: Utc::now(),
            }),
        }
    }
}

/// Minimum, maximum, and mean, or all zeros for an empty slice.
fn min_max_mean(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    #[allow(clippy::cast_precision_loss)]
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    (min, max, mean)
}
