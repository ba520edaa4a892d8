//! Shared data preparation: read CSVs, clean, geocode.

use indicatif::ProgressBar;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::geocoding::{
    CoordinateCache, DatasetDownloader, GeocodeReport, Geocoder, PostcodeDataset,
    PostcodesIoClient, PrefixEstimator,
};
use crate::importers::{LoadError, LoadOptions, LoadReport, SaleLoader};
use crate::models::GeocodedSale;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to load sales: {0}")]
    Load(#[from] LoadError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub sales: Vec<GeocodedSale>,
    pub load_report: LoadReport,
    pub geocode_report: GeocodeReport,
}

/// Load, clean and geocode the configured data directory.
///
/// The postcode dataset and postcodes.io are optional sources: when they are
/// unavailable the run continues with the cache and prefix estimates.
#[instrument(skip_all, fields(data_dir = %config.data_dir.display()))]
pub async fn prepare_dataset(
    config: &Config,
    progress: &ProgressBar,
) -> Result<PreparedDataset, PipelineError> {
    progress.set_message("Loading sales");
    let loader = SaleLoader::new(config.data_dir.clone(), LoadOptions::from(config));
    let loaded = tokio::task::spawn_blocking(move || loader.load()).await??;

    progress.set_message("Loading postcode dataset");
    let dataset = load_postcode_dataset(config).await;

    let cache_path = config.coords_cache_file.clone();
    let cache = tokio::task::spawn_blocking(move || CoordinateCache::load(cache_path)).await?;

    let mut geocoder = Geocoder::new(cache, PrefixEstimator::new())
        .with_estimation(config.estimate_missing_coordinates);
    if let Some(dataset) = dataset {
        geocoder = geocoder.with_dataset(dataset);
    }

    if config.geocode_with_api {
        progress.set_message("Querying postcodes.io");
        geocoder = geocoder.with_api(PostcodesIoClient::new(config.postcodes_io_url.clone()));
        let postcodes: Vec<String> = loaded
            .sales
            .iter()
            .map(|sale| sale.postcode.clone())
            .collect();
        geocoder.prefetch(&postcodes).await;
    }

    progress.set_message("Geocoding");
    let (sales, geocode_report) = geocoder.geocode_sales(loaded.sales, progress);

    match geocoder.save_cache() {
        Ok(true) => info!(
            "Coordinate cache updated at {}",
            geocoder.cache().path().display()
        ),
        Ok(false) => {}
        Err(e) => warn!("Failed to save coordinate cache: {}", e),
    }

    info!(
        "Prepared {} geocoded sales from {} files",
        sales.len(),
        loaded.report.files_loaded
    );

    Ok(PreparedDataset {
        sales,
        load_report: loaded.report,
        geocode_report,
    })
}

/// Load the offline postcode dataset, downloading it first when configured.
pub async fn load_postcode_dataset(config: &Config) -> Option<PostcodeDataset> {
    let csv_path = config.postcode_dataset_path.clone();
    let lookup_path = config.postcode_lookup_cache.clone();

    if !csv_path.exists() && !lookup_path.exists() {
        if !config.download_postcode_dataset {
            info!(
                "No postcode dataset at {}; using cache and estimates only",
                csv_path.display()
            );
            return None;
        }

        let downloader = DatasetDownloader::new(config.postcode_dataset_url.clone());
        if let Err(e) = downloader.download_to(&csv_path).await {
            warn!("Postcode dataset download failed: {}", e);
            return None;
        }
    }

    let result =
        tokio::task::spawn_blocking(move || PostcodeDataset::load(&csv_path, &lookup_path, false))
            .await;

    match result {
        Ok(Ok(dataset)) => Some(dataset),
        Ok(Err(e)) => {
            warn!("Postcode dataset unavailable: {}", e);
            None
        }
        Err(e) => {
            warn!("Postcode dataset task failed: {}", e);
            None
        }
    }
}
