use std::path::{Path, PathBuf};

use house_price_heatmap::config::Config;
use house_price_heatmap::models::{CoordinateSource, Coordinates, GeocodedSale, HouseSale};

pub const HEADER: &str = "priceper,postcode,year,dateoftransfer,propertytype,duration,price";

/// Write a per-borough data file with the standard header
pub fn write_data_file(dir: &Path, area_key: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(format!("{area_key}_link_26122024.csv"));
    let mut contents = String::from(HEADER);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    std::fs::write(&path, contents).expect("Failed to write fixture file");
    path
}

/// Configuration pointing every file at `dir`, with no network access
pub fn test_config(dir: &Path) -> Config {
    Config {
        data_dir: dir.join("data"),
        postcode_dataset_path: dir.join("postcode_data/postcodes.csv"),
        postcode_lookup_cache: dir.join("postcode_lookup.json"),
        coords_cache_file: dir.join("coords_cache.json"),
        heatmap_output: dir.join("heatmap.html"),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        ..Config::default()
    }
}

pub fn geocoded_sale(postcode: &str, price: f64, area: &str) -> GeocodedSale {
    GeocodedSale {
        sale: HouseSale {
            price_per_sqm: price,
            postcode: postcode.to_string(),
            year: Some(2024),
            date_of_transfer: None,
            property_type: Some("T".to_string()),
            duration: Some("F".to_string()),
            price: None,
            area: area.to_string(),
        },
        coordinates: Coordinates::new(51.55, -0.15),
        source: CoordinateSource::Dataset,
    }
}
