//! Postcode → coordinate resolution
//!
//! A postcode is resolved by trying, in order, the offline postcode dataset,
//! results prefetched from postcodes.io during this run, the persisted
//! coordinate cache and finally an estimate from the postcode prefix.

pub mod cache;
pub mod dataset;
pub mod estimator;
pub mod postcodes_io;

pub use cache::{CacheError, CoordinateCache};
pub use dataset::{DatasetDownloader, DatasetError, PostcodeDataset};
pub use estimator::{Estimate, PrefixEstimator};
pub use postcodes_io::{PostcodesIoClient, PostcodesIoError};

use indicatif::ProgressBar;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::models::{CoordinateSource, Coordinates, GeocodedSale, HouseSale};
use crate::postcode;

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Coordinate cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub coordinates: Coordinates,
    pub source: CoordinateSource,
}

/// Per-source counts for one geocoding run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeocodeReport {
    pub dataset: usize,
    pub cache: usize,
    pub api: usize,
    pub estimated: usize,
    /// Placed at the default location and dropped
    pub defaulted: usize,
    pub unresolved: usize,
}

impl GeocodeReport {
    pub fn record(&mut self, source: Option<CoordinateSource>) {
        match source {
            Some(CoordinateSource::Dataset) => self.dataset += 1,
            Some(CoordinateSource::Cache) => self.cache += 1,
            Some(CoordinateSource::Api) => self.api += 1,
            Some(CoordinateSource::Estimated) => self.estimated += 1,
            Some(CoordinateSource::Default) => self.defaulted += 1,
            None => self.unresolved += 1,
        }
    }

    pub fn kept(&self) -> usize {
        self.dataset + self.cache + self.api + self.estimated
    }

    pub fn dropped(&self) -> usize {
        self.defaulted + self.unresolved
    }
}

pub struct Geocoder {
    dataset: Option<PostcodeDataset>,
    cache: CoordinateCache,
    estimator: PrefixEstimator,
    api: Option<PostcodesIoClient>,
    /// postcodes.io hits from this run, keyed by normalized postcode
    fetched: HashMap<String, Coordinates>,
    estimate_missing: bool,
}

impl Geocoder {
    pub fn new(cache: CoordinateCache, estimator: PrefixEstimator) -> Self {
        Self {
            dataset: None,
            cache,
            estimator,
            api: None,
            fetched: HashMap::new(),
            estimate_missing: true,
        }
    }

    pub fn with_dataset(mut self, dataset: PostcodeDataset) -> Self {
        self.dataset = Some(dataset);
        self
    }

    pub fn with_api(mut self, client: PostcodesIoClient) -> Self {
        self.api = Some(client);
        self
    }

    pub fn with_estimation(mut self, enabled: bool) -> Self {
        self.estimate_missing = enabled;
        self
    }

    pub fn cache(&self) -> &CoordinateCache {
        &self.cache
    }

    /// Query postcodes.io for every postcode the dataset and cache cannot
    /// answer, storing hits in the cache. Returns the number of new hits.
    #[instrument(skip_all, fields(postcodes = postcodes.len()))]
    pub async fn prefetch(&mut self, postcodes: &[String]) -> usize {
        let Some(client) = self.api.clone() else {
            return 0;
        };

        let missing: Vec<String> = postcodes
            .iter()
            .filter_map(|pc| postcode::normalize(pc))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|key| self.lookup_known(key).is_none())
            .collect();

        if missing.is_empty() {
            debug!("All postcodes already resolved offline");
            return 0;
        }

        info!("Querying postcodes.io for {} postcodes", missing.len());
        let hits = match missing.as_slice() {
            [single] => match client.lookup(single).await {
                Ok(Some(coordinates)) => HashMap::from([(single.clone(), coordinates)]),
                Ok(None) => HashMap::new(),
                Err(e) => {
                    warn!("postcodes.io lookup for {} failed: {}", single, e);
                    HashMap::new()
                }
            },
            _ => client.lookup_batch(&missing).await,
        };
        for (pc, coordinates) in &hits {
            self.cache.insert(pc, *coordinates);
        }
        let count = hits.len();
        self.fetched.extend(hits);
        count
    }

    fn lookup_known(&self, pc: &str) -> Option<Resolution> {
        if let Some(coordinates) = self
            .dataset
            .as_ref()
            .and_then(|dataset| dataset.get_coordinates(pc))
        {
            return Some(Resolution {
                coordinates,
                source: CoordinateSource::Dataset,
            });
        }

        let key = postcode::normalize(pc)?;
        if let Some(coordinates) = self.fetched.get(&key) {
            return Some(Resolution {
                coordinates: *coordinates,
                source: CoordinateSource::Api,
            });
        }

        self.cache.get(&key).map(|coordinates| Resolution {
            coordinates,
            source: CoordinateSource::Cache,
        })
    }

    /// Resolve one postcode. `None` means no coordinates could be assigned.
    pub fn resolve(&mut self, pc: &str) -> Option<Resolution> {
        if let Some(resolution) = self.lookup_known(pc) {
            return Some(resolution);
        }

        if !self.estimate_missing {
            return None;
        }

        let key = postcode::normalize(pc)?;
        let estimate = self.estimator.estimate(pc)?;
        let Some(prefix) = estimate.prefix else {
            return Some(Resolution {
                coordinates: estimate.coordinates,
                source: estimate.source,
            });
        };

        // A previously stored centroid for the prefix wins over the built-in table
        let centroid = match self.cache.get_prefix(&prefix) {
            Some(stored) => stored,
            None => {
                self.cache.insert_prefix(&prefix, estimate.centroid);
                estimate.centroid
            }
        };

        Some(Resolution {
            coordinates: estimator::jitter(centroid, &key, estimator::MATCHED_JITTER),
            source: CoordinateSource::Estimated,
        })
    }

    /// Attach coordinates to each sale, dropping sales placed at the default
    /// location or left unresolved.
    #[instrument(skip_all, fields(sales = sales.len()))]
    pub fn geocode_sales(
        &mut self,
        sales: Vec<HouseSale>,
        progress: &ProgressBar,
    ) -> (Vec<GeocodedSale>, GeocodeReport) {
        let mut report = GeocodeReport::default();
        let mut geocoded = Vec::with_capacity(sales.len());

        progress.set_length(sales.len() as u64);
        for sale in sales {
            let resolution = self.resolve(&sale.postcode);
            report.record(resolution.map(|r| r.source));
            progress.inc(1);

            match resolution {
                Some(Resolution {
                    source: CoordinateSource::Default,
                    ..
                })
                | None => {
                    debug!("Dropping sale with unplaceable postcode {}", sale.postcode);
                }
                Some(Resolution {
                    coordinates,
                    source,
                }) => geocoded.push(GeocodedSale {
                    sale,
                    coordinates,
                    source,
                }),
            }
        }
        progress.finish_with_message("geocoded");

        info!(
            "Geocoded {} sales: {} dataset, {} cache, {} api, {} estimated, {} dropped",
            report.kept(),
            report.dataset,
            report.cache,
            report.api,
            report.estimated,
            report.dropped()
        );
        (geocoded, report)
    }

    /// Persist the coordinate cache if anything new was learned.
    pub fn save_cache(&mut self) -> Result<bool, GeocodeError> {
        Ok(self.cache.save_if_dirty()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(pc: &str) -> HouseSale {
        HouseSale {
            price_per_sqm: 5000.0,
            postcode: pc.to_string(),
            year: Some(2024),
            date_of_transfer: None,
            property_type: None,
            duration: None,
            price: None,
            area: "Camden".to_string(),
        }
    }

    fn geocoder(dir: &tempfile::TempDir) -> Geocoder {
        Geocoder::new(
            CoordinateCache::new(dir.path().join("coords.json")),
            PrefixEstimator::new(),
        )
    }

    #[test]
    fn test_dataset_takes_precedence_over_cache() {
        let dir = tempfile::tempdir().unwrap();
        let exact = Coordinates::new(51.55, -0.17);
        let mut cache = CoordinateCache::new(dir.path().join("coords.json"));
        cache.insert("NW3 2AB", Coordinates::new(0.0, 0.0));

        let mut geocoder = Geocoder::new(cache, PrefixEstimator::new())
            .with_dataset(PostcodeDataset::from_entries([("NW3 2AB", exact)]));

        let resolution = geocoder.resolve("nw32ab").unwrap();
        assert_eq!(resolution.coordinates, exact);
        assert_eq!(resolution.source, CoordinateSource::Dataset);
    }

    #[test]
    fn test_fetched_result_takes_precedence_over_cache() {
        let dir = tempfile::tempdir().unwrap();
        let fetched = Coordinates::new(51.5889, -0.1651);
        let mut cache = CoordinateCache::new(dir.path().join("coords.json"));
        cache.insert("N2 9QL", Coordinates::new(0.0, 0.0));

        let mut geocoder = Geocoder::new(cache, PrefixEstimator::new());
        geocoder.fetched.insert("N29QL".to_string(), fetched);

        let resolution = geocoder.resolve("n2 9ql").unwrap();
        assert_eq!(resolution.source, CoordinateSource::Api);
        assert_eq!(resolution.coordinates, fetched);
    }

    #[test]
    fn test_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let mut geocoder = geocoder(&dir);
        geocoder.cache.insert("E1 6AN", Coordinates::new(51.52, -0.07));

        assert_eq!(
            geocoder.resolve("E1 6AN").unwrap().source,
            CoordinateSource::Cache
        );
    }

    #[test]
    fn test_estimate_stores_prefix_in_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut geocoder = geocoder(&dir);

        let resolution = geocoder.resolve("SE15 4QN").unwrap();
        assert_eq!(resolution.source, CoordinateSource::Estimated);
        assert!(geocoder.cache().get_prefix("SE15").is_some());
        assert!(geocoder.cache().is_dirty());
    }

    #[test]
    fn test_stored_prefix_centroid_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let mut geocoder = geocoder(&dir);
        let stored = Coordinates::new(52.0, 0.5);
        geocoder.cache.insert_prefix("SE15", stored);

        let resolution = geocoder.resolve("SE15 4QN").unwrap();
        assert!((resolution.coordinates.latitude - stored.latitude).abs() <= 0.005);
        assert!((resolution.coordinates.longitude - stored.longitude).abs() <= 0.005);
    }

    #[test]
    fn test_estimation_disabled_leaves_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let mut geocoder = geocoder(&dir).with_estimation(false);
        assert!(geocoder.resolve("SE15 4QN").is_none());
    }

    #[test]
    fn test_geocode_sales_drops_default_and_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let mut geocoder = geocoder(&dir);
        let sales = vec![sale("N2 9QL"), sale("ZE1 0AA"), sale("   ")];

        let (geocoded, report) = geocoder.geocode_sales(sales, &ProgressBar::hidden());

        assert_eq!(geocoded.len(), 1);
        assert_eq!(geocoded[0].sale.postcode, "N2 9QL");
        assert_eq!(report.estimated, 1);
        assert_eq!(report.defaulted, 1);
        assert_eq!(report.unresolved, 1);
        assert_eq!(report.dropped(), 2);
    }

    #[tokio::test]
    async fn test_prefetch_without_api_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut geocoder = geocoder(&dir);
        assert_eq!(geocoder.prefetch(&["N2 9QL".to_string()]).await, 0);
    }
}
