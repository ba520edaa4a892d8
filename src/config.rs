use std::env;
use std::path::PathBuf;

pub const DEFAULT_POSTCODE_DATASET_URL: &str = "https://www.doogal.co.uk/files/postcodes.zip";
pub const DEFAULT_POSTCODES_IO_URL: &str = "https://api.postcodes.io";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Price thresholds are inverted: min {min} must be below max {max}")]
    InvertedPriceThresholds { min: f64, max: f64 },

    #[error("Price threshold {name} must be a finite number, got {value}")]
    NonFiniteThreshold { name: &'static str, value: f64 },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub max_files: usize,
    pub max_rows_per_file: usize,
    pub min_price_per_sqm: f64,
    pub max_price_per_sqm: f64,
    pub min_sale_year: Option<i32>,
    pub min_district_sales: usize,
    pub postcode_dataset_path: PathBuf,
    pub postcode_dataset_url: String,
    pub postcode_lookup_cache: PathBuf,
    pub coords_cache_file: PathBuf,
    pub postcodes_io_url: String,
    pub geocode_with_api: bool,
    pub download_postcode_dataset: bool,
    pub estimate_missing_coordinates: bool,
    pub heatmap_output: PathBuf,
    pub server_host: String,
    pub server_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("data"),
            max_files: 350,
            max_rows_per_file: 180_000,
            min_price_per_sqm: 0.0,
            max_price_per_sqm: 50_000.0,
            min_sale_year: Some(2024),
            min_district_sales: 3,
            postcode_dataset_path: PathBuf::from("postcode_data/postcodes.csv"),
            postcode_dataset_url: DEFAULT_POSTCODE_DATASET_URL.to_string(),
            postcode_lookup_cache: PathBuf::from("postcode_lookup.json"),
            coords_cache_file: PathBuf::from("postcode_coords_cache.json"),
            postcodes_io_url: DEFAULT_POSTCODES_IO_URL.to_string(),
            geocode_with_api: false,
            download_postcode_dataset: false,
            estimate_missing_coordinates: true,
            heatmap_output: PathBuf::from("uk_house_price_heatmap.html"),
            server_host: "0.0.0.0".to_string(),
            server_port: 8050,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let config = Config {
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            max_files: parse_var("MAX_FILES", defaults.max_files),
            max_rows_per_file: parse_var("MAX_ROWS_PER_FILE", defaults.max_rows_per_file),
            min_price_per_sqm: parse_var("MIN_PRICE_PER_SQM", defaults.min_price_per_sqm),
            max_price_per_sqm: parse_var("MAX_PRICE_PER_SQM", defaults.max_price_per_sqm),
            min_sale_year: match env::var("MIN_SALE_YEAR") {
                Ok(value) if value.trim().eq_ignore_ascii_case("none") => None,
                Ok(value) => value.trim().parse().ok().or(defaults.min_sale_year),
                Err(_) => defaults.min_sale_year,
            },
            min_district_sales: parse_var("MIN_DISTRICT_SALES", defaults.min_district_sales),
            postcode_dataset_path: env::var("POSTCODE_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.postcode_dataset_path),
            postcode_dataset_url: env::var("POSTCODE_DATASET_URL")
                .unwrap_or(defaults.postcode_dataset_url),
            postcode_lookup_cache: env::var("POSTCODE_LOOKUP_CACHE")
                .map(PathBuf::from)
                .unwrap_or(defaults.postcode_lookup_cache),
            coords_cache_file: env::var("COORDS_CACHE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.coords_cache_file),
            postcodes_io_url: env::var("POSTCODES_IO_URL").unwrap_or(defaults.postcodes_io_url),
            geocode_with_api: parse_flag("GEOCODE_WITH_API", defaults.geocode_with_api),
            download_postcode_dataset: parse_flag(
                "DOWNLOAD_POSTCODE_DATASET",
                defaults.download_postcode_dataset,
            ),
            estimate_missing_coordinates: parse_flag(
                "ESTIMATE_MISSING_COORDINATES",
                defaults.estimate_missing_coordinates,
            ),
            heatmap_output: env::var("HEATMAP_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or(defaults.heatmap_output),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("MIN_PRICE_PER_SQM", self.min_price_per_sqm),
            ("MAX_PRICE_PER_SQM", self.max_price_per_sqm),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteThreshold { name, value });
            }
        }
        if self.min_price_per_sqm >= self.max_price_per_sqm {
            return Err(ConfigError::InvertedPriceThresholds {
                min: self.min_price_per_sqm,
                max: self.max_price_per_sqm,
            });
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
