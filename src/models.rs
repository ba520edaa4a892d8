use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CENTRAL_LONDON: Coordinates = Coordinates {
    latitude: 51.5074,
    longitude: -0.1278,
};

// A cleaned house-price transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseSale {
    pub price_per_sqm: f64,
    pub postcode: String,
    pub year: Option<i32>,
    pub date_of_transfer: Option<NaiveDate>,
    pub property_type: Option<String>,
    pub duration: Option<String>,
    pub price: Option<f64>,
    /// Borough or local authority, derived from the source file name
    pub area: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn offset(self, d_lat: f64, d_lon: f64) -> Self {
        Self::new(self.latitude + d_lat, self.longitude + d_lon)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    Dataset,
    Cache,
    Api,
    Estimated,
    /// No prefix matched; placed at central London
    Default,
}

impl CoordinateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateSource::Dataset => "dataset",
            CoordinateSource::Cache => "cache",
            CoordinateSource::Api => "api",
            CoordinateSource::Estimated => "estimated",
            CoordinateSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodedSale {
    #[serde(flatten)]
    pub sale: HouseSale,
    pub coordinates: Coordinates,
    pub source: CoordinateSource,
}

// Aggregated views (shared by the static renderer and the dashboard API)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistrictSummary {
    pub district: String,
    pub average_price_per_sqm: f64,
    pub sale_count: usize,
    pub latitude: f64,
    pub longitude: f64,
    pub area: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostcodePoint {
    pub postcode: String,
    pub average_price_per_sqm: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub area: String,
    pub latest_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStatistics {
    pub total_records: usize,
    pub unique_postcodes: usize,
    pub area_count: usize,
    pub price: Option<PriceSummary>,
    pub property_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaAverage {
    pub area: String,
    pub average_price_per_sqm: f64,
    pub sale_count: usize,
}
