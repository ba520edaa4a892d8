//! Aggregations over geocoded sales shared by the static heatmap and the
//! dashboard.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::{
    AreaAverage, Coordinates, DatasetStatistics, DistrictSummary, GeocodedSale, HeatPoint,
    HistogramBin, PostcodePoint, PriceSummary, CENTRAL_LONDON,
};
use crate::postcode;

pub const DEFAULT_HISTOGRAM_BINS: usize = 30;
pub const MIN_HEAT_INTENSITY: f64 = 0.1;
const MAX_HEAT_WEIGHT: f64 = 3.0;

#[derive(Default)]
struct Accumulator {
    price_sum: f64,
    count: usize,
    latitude_sum: f64,
    longitude_sum: f64,
    area: String,
}

impl Accumulator {
    fn add(&mut self, sale: &GeocodedSale) {
        if self.count == 0 {
            self.area = sale.sale.area.clone();
        }
        self.price_sum += sale.sale.price_per_sqm;
        self.latitude_sum += sale.coordinates.latitude;
        self.longitude_sum += sale.coordinates.longitude;
        self.count += 1;
    }

    fn mean_price(&self) -> f64 {
        self.price_sum / self.count as f64
    }

    fn mean_position(&self) -> Coordinates {
        Coordinates::new(
            self.latitude_sum / self.count as f64,
            self.longitude_sum / self.count as f64,
        )
    }
}

/// Group sales by postcode district, hiding districts with fewer than
/// `min_sales` sales. Ordered by district code.
pub fn aggregate_districts(sales: &[GeocodedSale], min_sales: usize) -> Vec<DistrictSummary> {
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    for sale in sales {
        if let Some(district) = postcode::district(&sale.sale.postcode) {
            groups.entry(district).or_default().add(sale);
        }
    }

    groups
        .into_iter()
        .filter(|(_, acc)| acc.count >= min_sales.max(1))
        .map(|(district, acc)| {
            let position = acc.mean_position();
            DistrictSummary {
                district,
                average_price_per_sqm: acc.mean_price(),
                sale_count: acc.count,
                latitude: position.latitude,
                longitude: position.longitude,
                area: acc.area,
            }
        })
        .collect()
}

/// Weighted heat layer points; busier districts contribute up to three copies.
pub fn heat_points(districts: &[DistrictSummary]) -> Vec<HeatPoint> {
    let Some((min, max)) = min_max(districts.iter().map(|d| d.average_price_per_sqm)) else {
        return Vec::new();
    };

    let mut points = Vec::new();
    for district in districts {
        let intensity = normalized_intensity(district.average_price_per_sqm, min, max);
        let weight = (district.sale_count as f64 / 5.0).min(MAX_HEAT_WEIGHT).floor() as usize;
        for _ in 0..weight.max(1) {
            points.push(HeatPoint {
                latitude: district.latitude,
                longitude: district.longitude,
                intensity,
            });
        }
    }
    points
}

/// Scale `value` into `MIN_HEAT_INTENSITY..=1.0`; a flat range maps to 1.0.
pub fn normalized_intensity(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 1.0;
    }
    ((value - min) / (max - min)).clamp(MIN_HEAT_INTENSITY, 1.0)
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    values.sort_by(f64::total_cmp);
    values
}

/// Percentile `p` (0..=100) of already sorted values, interpolating linearly
/// between the closest ranks.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Percentile `p` (0..=100) of unsorted values.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    percentile_sorted(&sorted(values.iter().copied()), p)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBand {
    Red,
    Orange,
    Yellow,
    Green,
}

impl PriceBand {
    pub fn color(&self) -> &'static str {
        match self {
            PriceBand::Red => "red",
            PriceBand::Orange => "orange",
            PriceBand::Yellow => "yellow",
            PriceBand::Green => "green",
        }
    }
}

/// District price percentiles used for marker colours
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBands {
    pub p40: f64,
    pub p60: f64,
    pub p80: f64,
}

impl PriceBands {
    pub fn from_districts(districts: &[DistrictSummary]) -> Option<Self> {
        let prices = sorted(districts.iter().map(|d| d.average_price_per_sqm));
        Some(Self {
            p40: percentile_sorted(&prices, 40.0)?,
            p60: percentile_sorted(&prices, 60.0)?,
            p80: percentile_sorted(&prices, 80.0)?,
        })
    }

    pub fn classify(&self, price: f64) -> PriceBand {
        if price >= self.p80 {
            PriceBand::Red
        } else if price >= self.p60 {
            PriceBand::Orange
        } else if price >= self.p40 {
            PriceBand::Yellow
        } else {
            PriceBand::Green
        }
    }
}

pub fn marker_radius(sale_count: usize, min: f64, max: f64) -> f64 {
    (sale_count as f64 / 2.0 + min).clamp(min, max)
}

/// Median district position, or central London when there are none.
pub fn map_center(districts: &[DistrictSummary]) -> Coordinates {
    let latitudes = sorted(districts.iter().map(|d| d.latitude));
    let longitudes = sorted(districts.iter().map(|d| d.longitude));
    match (
        percentile_sorted(&latitudes, 50.0),
        percentile_sorted(&longitudes, 50.0),
    ) {
        (Some(latitude), Some(longitude)) => Coordinates::new(latitude, longitude),
        _ => CENTRAL_LONDON,
    }
}

pub fn price_summary(prices: &[f64]) -> Option<PriceSummary> {
    let prices = sorted(prices.iter().copied());
    let (min, max) = (*prices.first()?, *prices.last()?);
    Some(PriceSummary {
        min,
        max,
        mean: prices.iter().sum::<f64>() / prices.len() as f64,
        median: percentile_sorted(&prices, 50.0)?,
    })
}

pub fn dataset_statistics(sales: &[GeocodedSale]) -> DatasetStatistics {
    let prices: Vec<f64> = sales.iter().map(|s| s.sale.price_per_sqm).collect();
    let unique_postcodes: BTreeSet<String> = sales
        .iter()
        .filter_map(|s| postcode::normalize(&s.sale.postcode))
        .collect();
    let areas: BTreeSet<&str> = sales.iter().map(|s| s.sale.area.as_str()).collect();

    let mut property_types = BTreeMap::new();
    for sale in sales {
        if let Some(kind) = &sale.sale.property_type {
            *property_types.entry(kind.clone()).or_insert(0) += 1;
        }
    }

    DatasetStatistics {
        total_records: sales.len(),
        unique_postcodes: unique_postcodes.len(),
        area_count: areas.len(),
        price: price_summary(&prices),
        property_types,
    }
}

/// Equal-width histogram over the observed price range. The last bin is
/// closed so the maximum lands in it.
pub fn price_histogram(prices: &[f64], bins: usize) -> Vec<HistogramBin> {
    let Some((min, max)) = min_max(prices.iter().copied().filter(|p| p.is_finite())) else {
        return Vec::new();
    };
    let bins = bins.max(1);

    if max <= min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: prices.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for price in prices.iter().filter(|p| p.is_finite()) {
        let index = (((price - min) / width) as usize).min(bins - 1);
        histogram[index].count += 1;
    }
    histogram
}

/// Mean price per area for areas with at least `min_sales` sales, keeping the
/// `top` most expensive, cheapest first.
pub fn area_comparison(sales: &[GeocodedSale], min_sales: usize, top: usize) -> Vec<AreaAverage> {
    let mut groups: HashMap<&str, (f64, usize)> = HashMap::new();
    for sale in sales {
        let entry = groups.entry(sale.sale.area.as_str()).or_default();
        entry.0 += sale.sale.price_per_sqm;
        entry.1 += 1;
    }

    let mut averages: Vec<AreaAverage> = groups
        .into_iter()
        .filter(|(_, (_, count))| *count >= min_sales)
        .map(|(area, (sum, count))| AreaAverage {
            area: area.to_string(),
            average_price_per_sqm: sum / count as f64,
            sale_count: count,
        })
        .collect();

    averages.sort_by(|a, b| {
        b.average_price_per_sqm
            .total_cmp(&a.average_price_per_sqm)
            .then_with(|| a.area.cmp(&b.area))
    });
    averages.truncate(top);
    averages.reverse();
    averages
}

/// Mean price per full postcode, ordered by postcode.
pub fn postcode_points(sales: &[GeocodedSale]) -> Vec<PostcodePoint> {
    let mut groups: BTreeMap<String, (Accumulator, Option<i32>)> = BTreeMap::new();
    for sale in sales {
        let Some(key) = postcode::normalize(&sale.sale.postcode) else {
            continue;
        };
        let (acc, latest_year) = groups.entry(key).or_default();
        acc.add(sale);
        *latest_year = (*latest_year).max(sale.sale.year);
    }

    groups
        .into_iter()
        .map(|(key, (acc, latest_year))| {
            let position = acc.mean_position();
            PostcodePoint {
                postcode: postcode::display_form(&key).unwrap_or(key),
                average_price_per_sqm: acc.mean_price(),
                latitude: position.latitude,
                longitude: position.longitude,
                area: acc.area,
                latest_year,
            }
        })
        .collect()
}
