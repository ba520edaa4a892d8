use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::models::Coordinates;
use crate::postcode;
use crate::utils::write_atomically;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct CacheContents {
    /// Remotely geocoded postcodes, keyed by normalized postcode
    #[serde(default)]
    postcodes: BTreeMap<String, Coordinates>,
    /// Estimated centroids, keyed by postcode prefix
    #[serde(default)]
    prefixes: BTreeMap<String, Coordinates>,
}

/// Coordinates persisted between runs
#[derive(Debug, Clone)]
pub struct CoordinateCache {
    path: PathBuf,
    contents: CacheContents,
    dirty: bool,
}

impl CoordinateCache {
    /// Empty cache that will be saved to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            contents: CacheContents::default(),
            dirty: false,
        }
    }

    /// Load the cache, starting empty when the file is missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_load(&path) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("Error loading coordinate cache {}: {}", path.display(), e);
                Self::new(path)
            }
        }
    }

    /// Load the cache; a missing file is an empty cache, a corrupt one is an error.
    pub fn try_load(path: &Path) -> Result<Self, CacheError> {
        if !path.exists() {
            debug!("No coordinate cache at {}", path.display());
            return Ok(Self::new(path));
        }

        let bytes = std::fs::read(path)?;
        let contents: CacheContents = serde_json::from_slice(&bytes)?;
        info!(
            "Loaded {} cached postcode coordinates and {} prefix estimates",
            contents.postcodes.len(),
            contents.prefixes.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            contents,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, postcode: &str) -> Option<Coordinates> {
        let key = postcode::normalize(postcode)?;
        self.contents.postcodes.get(&key).copied()
    }

    pub fn insert(&mut self, postcode: &str, coordinates: Coordinates) {
        if let Some(key) = postcode::normalize(postcode) {
            if self.contents.postcodes.insert(key, coordinates) != Some(coordinates) {
                self.dirty = true;
            }
        }
    }

    pub fn get_prefix(&self, prefix: &str) -> Option<Coordinates> {
        self.contents.prefixes.get(prefix).copied()
    }

    pub fn insert_prefix(&mut self, prefix: &str, coordinates: Coordinates) {
        if self
            .contents
            .prefixes
            .insert(prefix.to_string(), coordinates)
            != Some(coordinates)
        {
            self.dirty = true;
        }
    }

    /// Number of cached postcodes (prefix estimates excluded)
    pub fn len(&self) -> usize {
        self.contents.postcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.postcodes.is_empty() && self.contents.prefixes.is_empty()
    }

    pub fn prefix_count(&self) -> usize {
        self.contents.prefixes.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Persist the cache atomically.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn save(&mut self) -> Result<(), CacheError> {
        let json = serde_json::to_vec_pretty(&self.contents)?;
        write_atomically(&self.path, &json)?;
        self.dirty = false;
        info!(
            "Saved {} postcode coordinates and {} prefix estimates to cache",
            self.contents.postcodes.len(),
            self.contents.prefixes.len()
        );
        Ok(())
    }

    /// Persist only when something changed since the last load or save.
    pub fn save_if_dirty(&mut self) -> Result<bool, CacheError> {
        if !self.dirty {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CoordinateCache::try_load(&dir.path().join("absent.json")).unwrap();
        assert!(cache.is_empty());
        assert!(!cache.is_dirty());
    }

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coords.json");

        let mut cache = CoordinateCache::new(&path);
        cache.insert("sw1a 1aa", Coordinates::new(51.501, -0.1416));
        cache.insert_prefix("NW3", Coordinates::new(51.5591, -0.1787));
        assert!(cache.is_dirty());
        cache.save().unwrap();
        assert!(!cache.is_dirty());

        let reloaded = CoordinateCache::try_load(&path).unwrap();
        assert_eq!(
            reloaded.get("SW1A1AA").unwrap(),
            Coordinates::new(51.501, -0.1416)
        );
        assert_eq!(
            reloaded.get_prefix("NW3").unwrap(),
            Coordinates::new(51.5591, -0.1787)
        );
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.prefix_count(), 1);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coords.json");
        std::fs::write(&path, b"not json").unwrap();

        assert!(matches!(
            CoordinateCache::try_load(&path),
            Err(CacheError::Json(_))
        ));
        assert!(CoordinateCache::load(&path).is_empty());
    }

    #[test]
    fn test_reinserting_same_value_keeps_cache_clean() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = CoordinateCache::new(dir.path().join("coords.json"));
        cache.insert_prefix("E1", Coordinates::new(51.5154, -0.0648));
        cache.save().unwrap();

        cache.insert_prefix("E1", Coordinates::new(51.5154, -0.0648));
        assert!(!cache.is_dirty());
        assert!(!cache.save_if_dirty().unwrap());
    }
}
