use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::analysis::{self, DEFAULT_HISTOGRAM_BINS};
use crate::models::{
    AreaAverage, Coordinates, DatasetStatistics, DistrictSummary, GeocodedSale, HistogramBin,
};

pub const ALL_AREAS: &str = "all";
pub const NO_DATA_MESSAGE: &str = "No data available for selected filters";
pub const DEFAULT_PRICE_RANGE: (f64, f64) = (2000.0, 8000.0);
pub const PRICE_STEP: f64 = 100.0;
const MARK_INTERVAL: usize = 2000;
const MARK_LIMIT: usize = 15000;
const AREA_MIN_SALES: usize = 5;
const AREA_TOP_N: usize = 10;
pub const DASHBOARD_MARKER_MIN_SIZE: f64 = 8.0;
pub const DASHBOARD_MARKER_MAX_SIZE: f64 = 20.0;

#[derive(Error, Debug, PartialEq)]
pub enum DashboardError {
    #[error("Invalid price range: minimum {min} is greater than maximum {max}")]
    InvalidRange { min: f64, max: f64 },
}

// Query parameters for the dashboard view
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardFilter {
    #[serde(default = "default_min_price")]
    pub min_price: f64,
    #[serde(default = "default_max_price")]
    pub max_price: f64,
    #[serde(default = "default_area")]
    pub area: String,
}

fn default_min_price() -> f64 {
    DEFAULT_PRICE_RANGE.0
}

fn default_max_price() -> f64 {
    DEFAULT_PRICE_RANGE.1
}

fn default_area() -> String {
    ALL_AREAS.to_string()
}

impl Default for DashboardFilter {
    fn default() -> Self {
        Self {
            min_price: default_min_price(),
            max_price: default_max_price(),
            area: default_area(),
        }
    }
}

impl DashboardFilter {
    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.min_price > self.max_price || self.min_price.is_nan() || self.max_price.is_nan() {
            return Err(DashboardError::InvalidRange {
                min: self.min_price,
                max: self.max_price,
            });
        }
        Ok(())
    }

    fn matches(&self, sale: &GeocodedSale) -> bool {
        let price = sale.sale.price_per_sqm;
        price >= self.min_price
            && price <= self.max_price
            && (self.area == ALL_AREAS || sale.sale.area == self.area)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceMark {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardOptions {
    pub price_min: f64,
    pub price_max: f64,
    pub default_range: [f64; 2],
    pub step: f64,
    pub marks: Vec<PriceMark>,
    pub areas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictMarker {
    #[serde(flatten)]
    pub summary: DistrictSummary,
    pub marker_size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub average_price_per_sqm: f64,
    pub median_price_per_sqm: f64,
    pub total_sales: usize,
    pub districts_shown: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub filter_area: String,
    pub price_range: [f64; 2],
    pub center: Coordinates,
    pub districts: Vec<DistrictMarker>,
    pub histogram: Vec<HistogramBin>,
    pub area_comparison: Vec<AreaAverage>,
    pub summary: Option<DashboardSummary>,
    pub message: Option<String>,
}

/// Read-only queries over the prepared dataset
#[derive(Clone)]
pub struct DashboardService {
    sales: Arc<Vec<GeocodedSale>>,
    min_district_sales: usize,
}

impl DashboardService {
    pub fn new(sales: Arc<Vec<GeocodedSale>>, min_district_sales: usize) -> Self {
        Self {
            sales,
            min_district_sales,
        }
    }

    pub fn sale_count(&self) -> usize {
        self.sales.len()
    }

    /// Control options for the price slider and area dropdown
    pub fn options(&self) -> DashboardOptions {
        let (price_min, price_max) = self
            .sales
            .iter()
            .map(|s| s.sale.price_per_sqm)
            .fold(None, |acc: Option<(f64, f64)>, p| match acc {
                None => Some((p, p)),
                Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
            })
            .map(|(lo, hi)| (lo.floor(), hi.ceil()))
            .unwrap_or((0.0, 10000.0));

        let default_range = [
            DEFAULT_PRICE_RANGE.0.clamp(price_min, price_max),
            DEFAULT_PRICE_RANGE.1.clamp(price_min, price_max),
        ];

        let marks = (0..MARK_LIMIT)
            .step_by(MARK_INTERVAL)
            .map(|value| PriceMark {
                value: value as f64,
                label: crate::render::format_gbp(value as f64),
            })
            .collect();

        let areas: BTreeSet<&str> = self.sales.iter().map(|s| s.sale.area.as_str()).collect();

        DashboardOptions {
            price_min,
            price_max,
            default_range,
            step: PRICE_STEP,
            marks,
            areas: areas.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn statistics(&self) -> DatasetStatistics {
        analysis::dataset_statistics(&self.sales)
    }

    /// Map, charts and summary for one filter selection.
    #[instrument(skip(self))]
    pub fn view(&self, filter: &DashboardFilter) -> Result<DashboardView, DashboardError> {
        filter.validate()?;

        let filtered: Vec<GeocodedSale> = self
            .sales
            .iter()
            .filter(|sale| filter.matches(sale))
            .cloned()
            .collect();

        let mut view = DashboardView {
            filter_area: filter.area.clone(),
            price_range: [filter.min_price, filter.max_price],
            center: analysis::map_center(&[]),
            districts: Vec::new(),
            histogram: Vec::new(),
            area_comparison: Vec::new(),
            summary: None,
            message: None,
        };

        if filtered.is_empty() {
            view.message = Some(NO_DATA_MESSAGE.to_string());
            return Ok(view);
        }

        let districts = analysis::aggregate_districts(&filtered, self.min_district_sales);
        debug!(
            "Showing {} postcode districts (aggregated from {} sales)",
            districts.len(),
            filtered.len()
        );

        let prices: Vec<f64> = filtered.iter().map(|s| s.sale.price_per_sqm).collect();
        view.center = analysis::map_center(&districts);
        view.histogram = analysis::price_histogram(&prices, DEFAULT_HISTOGRAM_BINS);
        view.area_comparison = analysis::area_comparison(&filtered, AREA_MIN_SALES, AREA_TOP_N);
        view.summary = analysis::price_summary(&prices).map(|price| DashboardSummary {
            average_price_per_sqm: price.mean,
            median_price_per_sqm: price.median,
            total_sales: filtered.len(),
            districts_shown: districts.len(),
        });
        view.districts = districts
            .into_iter()
            .map(|summary| DistrictMarker {
                marker_size: analysis::marker_radius(
                    summary.sale_count,
                    DASHBOARD_MARKER_MIN_SIZE,
                    DASHBOARD_MARKER_MAX_SIZE,
                ),
                summary,
            })
            .collect();

        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CoordinateSource, HouseSale};

    fn sale(pc: &str, price: f64, area: &str) -> GeocodedSale {
        GeocodedSale {
            sale: HouseSale {
                price_per_sqm: price,
                postcode: pc.to_string(),
                year: Some(2024),
                date_of_transfer: None,
                property_type: None,
                duration: None,
                price: None,
                area: area.to_string(),
            },
            coordinates: Coordinates::new(51.55, -0.15),
            source: CoordinateSource::Estimated,
        }
    }

    fn service() -> DashboardService {
        let mut sales = Vec::new();
        for price in [3000.0, 4000.0, 5000.0, 6000.0, 7000.0] {
            sales.push(sale("NW3 2AB", price, "Camden"));
        }
        for price in [9000.0, 12000.0] {
            sales.push(sale("N2 9QL", price, "Barnet"));
        }
        DashboardService::new(Arc::new(sales), 3)
    }

    #[test]
    fn test_options() {
        let options = service().options();

        assert_eq!(options.price_min, 3000.0);
        assert_eq!(options.price_max, 12000.0);
        assert_eq!(options.default_range, [3000.0, 8000.0]);
        assert_eq!(options.marks.len(), 8);
        assert_eq!(options.marks[7].label, "£14,000");
        assert_eq!(options.areas, ["Barnet", "Camden"]);
    }

    #[test]
    fn test_view_filters_by_price_and_area() {
        let view = service().view(&DashboardFilter::default()).unwrap();
        let summary = view.summary.unwrap();

        assert_eq!(summary.total_sales, 5);
        assert_eq!(summary.districts_shown, 1);
        assert_eq!(summary.median_price_per_sqm, 5000.0);
        assert_eq!(view.districts[0].summary.district, "NW3");
        assert_eq!(view.districts[0].marker_size, 10.5);
        assert_eq!(view.area_comparison.len(), 1);
        assert!(view.message.is_none());
    }

    #[test]
    fn test_view_area_filter() {
        let filter = DashboardFilter {
            min_price: 0.0,
            max_price: 50000.0,
            area: "Barnet".to_string(),
        };
        let view = service().view(&filter).unwrap();

        assert_eq!(view.summary.unwrap().total_sales, 2);
        // Two sales is below the district minimum
        assert!(view.districts.is_empty());
    }

    #[test]
    fn test_view_empty_selection() {
        let filter = DashboardFilter {
            area: "Croydon".to_string(),
            ..Default::default()
        };
        let view = service().view(&filter).unwrap();

        assert_eq!(view.message.as_deref(), Some(NO_DATA_MESSAGE));
        assert!(view.districts.is_empty());
        assert!(view.summary.is_none());
    }

    #[test]
    fn test_view_rejects_inverted_range() {
        let filter = DashboardFilter {
            min_price: 9000.0,
            max_price: 1000.0,
            ..Default::default()
        };
        assert_eq!(
            service().view(&filter),
            Err(DashboardError::InvalidRange {
                min: 9000.0,
                max: 1000.0
            })
        );
    }
}
