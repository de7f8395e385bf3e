//! Zip extraction for downloaded dataset archives

use crate::error::{Error, Result};
use log::{debug, warn};
use std::fs::File;
use std::io;
use std::path::Path;
use zip::ZipArchive;

/// Extract every entry of `archive_path` below `dest`; returns the number of files written.
///
/// Entries whose names would escape `dest` are skipped.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| Error::Archive(format!("{}: {}", archive_path.display(), e)))?;
    std::fs::create_dir_all(dest)?;

    let mut files = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::Archive(format!("entry {i}: {e}")))?;
        let Some(rel) = entry.enclosed_name() else {
            warn!("Skipping unsafe archive entry {}", entry.name());
            continue;
        };
        let target = dest.join(rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        files += 1;
    }
    debug!("Extracted {} files from {}", files, archive_path.display());
    Ok(files)
}
