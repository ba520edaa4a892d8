//! Loaders for the per-borough house-price CSV files

pub mod area_filter;
pub mod csv_loader;

// Re-export commonly used items
pub use area_filter::{partition_data_files, remove_files, AreaPartition, LONDON_AREAS};
pub use csv_loader::{LoadError, LoadOptions, LoadReport, LoadedSales, SaleLoader};
