use csv::ReaderBuilder;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::models::Coordinates;
use crate::postcode;
use crate::utils::{persist, temp_file_beside, write_atomically};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ARCHIVE_ENTRY_SUFFIX: &str = "postcodes.csv";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Postcode dataset not found at {0}")]
    NotFound(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Postcode dataset is missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lookup cache is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed with status {0}")]
    Status(u16),

    #[error("Invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Archive does not contain a file ending in '{ARCHIVE_ENTRY_SUFFIX}'")]
    MissingArchiveEntry,

    #[error("Extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Deserialize)]
struct DatasetRow {
    #[serde(rename = "Postcode")]
    postcode: String,
    #[serde(rename = "Latitude", default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(rename = "Longitude", default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
}

/// Offline postcode → coordinates lookup built from the Doogal postcode CSV
#[derive(Debug, Clone, Default)]
pub struct PostcodeDataset {
    lookup: HashMap<String, Coordinates>,
}

impl PostcodeDataset {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Coordinates)>,
        S: AsRef<str>,
    {
        let lookup = entries
            .into_iter()
            .filter_map(|(pc, coords)| postcode::normalize(pc.as_ref()).map(|key| (key, coords)))
            .collect();
        Self { lookup }
    }

    /// Load the dataset, preferring the parsed lookup cache unless `force` is set.
    ///
    /// A freshly parsed CSV is written back to `lookup_cache`; failing to write
    /// it is only logged.
    #[instrument(skip_all, fields(csv = %csv_path.display()))]
    pub fn load(csv_path: &Path, lookup_cache: &Path, force: bool) -> Result<Self, DatasetError> {
        if !force && lookup_cache.exists() {
            match Self::from_lookup_cache(lookup_cache) {
                Ok(dataset) => {
                    info!(
                        "Loaded {} postcodes from lookup cache {}",
                        dataset.len(),
                        lookup_cache.display()
                    );
                    return Ok(dataset);
                }
                Err(e) => warn!(
                    "Ignoring unreadable lookup cache {}: {}",
                    lookup_cache.display(),
                    e
                ),
            }
        }

        if !csv_path.exists() {
            return Err(DatasetError::NotFound(csv_path.to_path_buf()));
        }

        let dataset = Self::from_csv(csv_path)?;
        if let Err(e) = dataset.save_lookup_cache(lookup_cache) {
            warn!("Failed to write lookup cache {}: {}", lookup_cache.display(), e);
        }
        Ok(dataset)
    }

    pub fn from_csv(path: &Path) -> Result<Self, DatasetError> {
        let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers = reader.headers()?.clone();
        for column in ["Postcode", "Latitude", "Longitude"] {
            if !headers.iter().any(|h| h == column) {
                return Err(DatasetError::MissingColumn(column));
            }
        }

        let mut lookup = HashMap::new();
        let mut skipped = 0usize;
        for result in reader.deserialize::<DatasetRow>() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    debug!("Skipping malformed dataset row: {}", e);
                    skipped += 1;
                    continue;
                }
            };

            match (postcode::normalize(&row.postcode), row.latitude, row.longitude) {
                (Some(key), Some(latitude), Some(longitude)) => {
                    lookup.insert(key, Coordinates::new(latitude, longitude));
                }
                _ => skipped += 1,
            }
        }

        info!(
            "Parsed {} postcodes from {} ({} rows skipped)",
            lookup.len(),
            path.display(),
            skipped
        );
        Ok(Self { lookup })
    }

    fn from_lookup_cache(path: &Path) -> Result<Self, DatasetError> {
        let bytes = std::fs::read(path)?;
        let lookup: HashMap<String, Coordinates> = serde_json::from_slice(&bytes)?;
        Ok(Self { lookup })
    }

    pub fn save_lookup_cache(&self, path: &Path) -> Result<(), DatasetError> {
        let json = serde_json::to_vec(&self.lookup)?;
        write_atomically(path, &json)?;
        debug!("Wrote lookup cache {}", path.display());
        Ok(())
    }

    pub fn get_coordinates(&self, pc: &str) -> Option<Coordinates> {
        let key = postcode::normalize(pc)?;
        self.lookup.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

/// Downloader for the postcode dataset
pub struct DatasetDownloader {
    client: Client,
    url: String,
}

impl DatasetDownloader {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            url: url.into(),
        }
    }

    /// Download the dataset to `target`. Zip archives are unpacked, taking the
    /// entry whose name ends in `postcodes.csv`; anything else is written as is.
    ///
    /// The body is streamed to a temporary file next to `target` and never
    /// held in memory as a whole.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn download_to(&self, target: &Path) -> Result<(), DatasetError> {
        info!("Downloading postcode dataset");
        let mut response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DatasetError::Status(status.as_u16()));
        }

        let mut download = temp_file_beside(target)?;
        let mut head = Vec::with_capacity(ZIP_MAGIC.len());
        let mut total = 0usize;
        while let Some(chunk) = response.chunk().await? {
            if head.len() < ZIP_MAGIC.len() {
                let wanted = (ZIP_MAGIC.len() - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..wanted]);
            }
            download.write_all(&chunk)?;
            total += chunk.len();
        }
        download.flush()?;
        debug!("Downloaded {} bytes", total);

        if head != ZIP_MAGIC {
            persist(download, target)?;
        } else {
            let archive = download.reopen()?;
            let target = target.to_path_buf();
            tokio::task::spawn_blocking(move || {
                let extracted = extract_csv(archive, &target);
                drop(download);
                extracted
            })
            .await??;
        }

        info!("Postcode dataset saved to {}", target.display());
        Ok(())
    }
}

/// Copy the dataset entry of a zip archive to `target`.
fn extract_csv(archive: File, target: &Path) -> Result<(), DatasetError> {
    let mut archive = zip::ZipArchive::new(archive)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_file() && entry.name().to_lowercase().ends_with(ARCHIVE_ENTRY_SUFFIX) {
            debug!("Extracting {}", entry.name());
            let mut output = temp_file_beside(target)?;
            let written = std::io::copy(&mut entry, &mut output)?;
            output.flush()?;
            persist(output, target)?;
            debug!("Extracted {} bytes", written);
            return Ok(());
        }
    }

    Err(DatasetError::MissingArchiveEntry)
}
