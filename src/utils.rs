//! Shared utility functions for the heatmap tooling
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Write `contents` to `path` through a temporary file in the same directory
/// followed by a rename, so readers never observe a half-written file.
pub fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut temp_file = temp_file_beside(path)?;
    temp_file.write_all(contents)?;
    temp_file.flush()?;
    persist(temp_file, path)
}

/// Temporary file in the directory that will hold `path`, creating the
/// directory if needed.
pub fn temp_file_beside(path: &Path) -> io::Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    NamedTempFile::new_in(dir)
}

/// Rename `temp_file` onto `path`.
///
/// Temporary files are created owner-only; the result takes the mode of the
/// file it replaces, or 0o644 for a new file.
pub fn persist(temp_file: NamedTempFile, path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let permissions = match std::fs::metadata(path) {
            Ok(metadata) => metadata.permissions(),
            Err(_) => std::fs::Permissions::from_mode(0o644),
        };
        temp_file.as_file().set_permissions(permissions)?;
    }

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// FNV-1a over the bytes of `value`.
///
/// Stable across processes and toolchains, unlike `DefaultHasher`.
///
/// # Examples
///
/// ```
/// use house_price_heatmap::utils::stable_hash;
///
/// assert_eq!(stable_hash(""), 0xcbf29ce484222325);
/// assert_eq!(stable_hash("N2 9QL"), stable_hash("N2 9QL"));
/// ```
pub fn stable_hash(value: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    value.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}
