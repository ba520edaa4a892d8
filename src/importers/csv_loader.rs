use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::models::HouseSale;

const LINK_MARKER: &str = "_link_";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read data directory {path}: {source}")]
    DataDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column '{column}' in {file}")]
    MissingColumn { file: String, column: &'static str },
}

/// Row filters and read limits applied while loading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    pub max_files: usize,
    pub max_rows_per_file: usize,
    pub min_price_per_sqm: f64,
    pub max_price_per_sqm: f64,
    pub min_sale_year: Option<i32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for LoadOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_files: config.max_files,
            max_rows_per_file: config.max_rows_per_file,
            min_price_per_sqm: config.min_price_per_sqm,
            max_price_per_sqm: config.max_price_per_sqm,
            min_sale_year: config.min_sale_year,
        }
    }
}

/// Raw row as it appears in the per-borough transaction files.
/// Only the columns used downstream are named; the rest are ignored.
#[derive(Debug, Deserialize)]
struct RawSaleRow {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    priceper: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    postcode: Option<String>,
    // Some exports write the year as a float ("2024.0")
    #[serde(default, deserialize_with = "csv::invalid_option")]
    year: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    dateoftransfer: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    propertytype: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    duration: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    price: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    pub rows_read: usize,
    pub rows_malformed: usize,
    pub dropped_missing_fields: usize,
    pub dropped_outliers: usize,
    pub dropped_before_min_year: usize,
    pub rows_kept: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files_found: usize,
    pub files_loaded: usize,
    pub files_failed: usize,
    pub rows_read: usize,
    pub rows_malformed: usize,
    pub dropped_missing_fields: usize,
    pub dropped_outliers: usize,
    pub dropped_before_min_year: usize,
    pub rows_kept: usize,
}

impl LoadReport {
    fn absorb(&mut self, stats: &FileStats) {
        self.files_loaded += 1;
        self.rows_read += stats.rows_read;
        self.rows_malformed += stats.rows_malformed;
        self.dropped_missing_fields += stats.dropped_missing_fields;
        self.dropped_outliers += stats.dropped_outliers;
        self.dropped_before_min_year += stats.dropped_before_min_year;
        self.rows_kept += stats.rows_kept;
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSales {
    pub sales: Vec<HouseSale>,
    pub report: LoadReport,
}

/// `*_link_*.csv`
pub fn is_data_file(file_name: &str) -> bool {
    file_name.ends_with(".csv") && file_name.contains(LINK_MARKER)
}

/// Area key in file-name form (`Kingston_upon_Thames_link_26122024.csv` ->
/// `Kingston_upon_Thames`).
pub fn area_key(file_name: &str) -> Option<&str> {
    if !is_data_file(file_name) {
        return None;
    }
    file_name.find(LINK_MARKER).map(|idx| &file_name[..idx])
}

/// Human-readable area name (`Kingston upon Thames`).
pub fn area_name(file_name: &str) -> Option<String> {
    area_key(file_name).map(|key| key.replace('_', " "))
}

/// All `*_link_*.csv` files in `data_dir`, sorted by file name.
pub fn discover_data_files(data_dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = fs::read_dir(data_dir).map_err(|source| LoadError::DataDir {
        path: data_dir.display().to_string(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(is_data_file)
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Parse `dateoftransfer` values such as `2024-03-15`, `2024-03-15 00:00`
/// or `15/03/2024`.
pub fn parse_transfer_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if let Some(day_part) = trimmed.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(day_part, "%Y-%m-%d") {
            return Some(date);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y").ok()
}

/// Loader for the per-borough transaction CSV files
pub struct SaleLoader {
    data_dir: PathBuf,
    options: LoadOptions,
}

impl SaleLoader {
    pub fn new(data_dir: impl Into<PathBuf>, options: LoadOptions) -> Self {
        Self {
            data_dir: data_dir.into(),
            options,
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load and clean every data file up to `max_files`.
    ///
    /// Only an unreadable data directory is an error; individual files that
    /// fail are logged and counted in the report.
    #[instrument(skip(self), fields(data_dir = %self.data_dir.display()))]
    pub fn load(&self) -> Result<LoadedSales, LoadError> {
        let files = discover_data_files(&self.data_dir)?;
        info!("Found {} CSV files", files.len());

        let mut report = LoadReport {
            files_found: files.len(),
            ..Default::default()
        };
        let mut sales = Vec::new();

        for path in files.iter().take(self.options.max_files) {
            debug!("Processing {}", path.display());
            match self.load_file(path) {
                Ok((mut file_sales, stats)) => {
                    debug!(
                        "Kept {} of {} rows from {}",
                        stats.rows_kept,
                        stats.rows_read,
                        path.display()
                    );
                    report.absorb(&stats);
                    sales.append(&mut file_sales);
                }
                Err(e) => {
                    warn!("Error processing {}: {}", path.display(), e);
                    report.files_failed += 1;
                }
            }
        }

        info!(
            "Loaded {} sales from {} files ({} rows read, {} missing fields, {} outliers, {} before cutoff year)",
            report.rows_kept,
            report.files_loaded,
            report.rows_read,
            report.dropped_missing_fields,
            report.dropped_outliers,
            report.dropped_before_min_year
        );

        Ok(LoadedSales { sales, report })
    }

    /// Load and clean a single file.
    pub fn load_file(&self, path: &Path) -> Result<(Vec<HouseSale>, FileStats), LoadError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let area = area_name(file_name).unwrap_or_else(|| file_name.to_string());

        let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader.headers()?.clone();

        for column in ["priceper", "postcode"] {
            if !headers.iter().any(|h| h == column) {
                return Err(LoadError::MissingColumn {
                    file: file_name.to_string(),
                    column,
                });
            }
        }
        let has_year = headers.iter().any(|h| h == "year");
        let has_transfer_date = headers.iter().any(|h| h == "dateoftransfer");

        let mut stats = FileStats::default();
        let mut sales = Vec::new();

        for result in reader
            .deserialize::<RawSaleRow>()
            .take(self.options.max_rows_per_file)
        {
            stats.rows_read += 1;

            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    debug!("Skipping malformed row in {}: {}", file_name, e);
                    stats.rows_malformed += 1;
                    continue;
                }
            };

            let (Some(price_per_sqm), Some(postcode)) = (
                row.priceper.filter(|p| p.is_finite()),
                row.postcode
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty()),
            ) else {
                stats.dropped_missing_fields += 1;
                continue;
            };

            // Strictly inside; a NaN threshold matches nothing
            let within_thresholds = price_per_sqm > self.options.min_price_per_sqm
                && price_per_sqm < self.options.max_price_per_sqm;
            if !within_thresholds {
                stats.dropped_outliers += 1;
                continue;
            }

            let year = row
                .year
                .filter(|y| y.is_finite())
                .map(|y| y.trunc() as i32);
            let date_of_transfer = row
                .dateoftransfer
                .as_deref()
                .and_then(parse_transfer_date);

            if let Some(min_year) = self.options.min_sale_year {
                let recent = if has_year {
                    year.is_some_and(|y| y >= min_year)
                } else if has_transfer_date {
                    date_of_transfer.is_some_and(|d| d.year() >= min_year)
                } else {
                    true
                };
                if !recent {
                    stats.dropped_before_min_year += 1;
                    continue;
                }
            }

            sales.push(HouseSale {
                price_per_sqm,
                postcode,
                year: year.or_else(|| date_of_transfer.map(|d| d.year())),
                date_of_transfer,
                property_type: row.propertytype.filter(|s| !s.trim().is_empty()),
                duration: row.duration.filter(|s| !s.trim().is_empty()),
                price: row.price.filter(|p| p.is_finite()),
                area: area.clone(),
            });
            stats.rows_kept += 1;
        }

        Ok((sales, stats))
    }
}
