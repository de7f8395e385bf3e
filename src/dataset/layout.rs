//! Locating the real data root inside an extracted archive
//!
//! Kaggle archives are sometimes extracted one level deeper than expected
//! (`vimeo-90k-3/vimeo_septuplet/sequences`), so the root is whichever of
//! the dataset directory or its immediate children holds `sequences`.

use super::Split;
use crate::config::Config;
use crate::error::{Error, Result};
use log::debug;
use std::io;
use std::path::{Path, PathBuf};

/// Resolved paths of one dataset part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    /// Directory that holds `sequences` and the manifests; split dirs are created here
    pub root: PathBuf,
    pub sequences: PathBuf,
    pub test_manifest: PathBuf,
    pub train_manifest: PathBuf,
}

impl DatasetLayout {
    /// Resolve the layout under `path`, failing when no `sequences` tree is found
    pub fn resolve(path: &Path, cfg: &Config) -> Result<Self> {
        let root = resolve_data_root(path, &cfg.sequences_dir).ok_or_else(|| {
            Error::layout(path, format!("no '{}' directory found", cfg.sequences_dir))
        })?;
        debug!("Resolved data root of {} to {}", path.display(), root.display());
        Ok(Self::at(root, cfg))
    }

    /// Layout rooted exactly at `root`, without searching
    pub fn at(root: PathBuf, cfg: &Config) -> Self {
        Self {
            sequences: root.join(&cfg.sequences_dir),
            test_manifest: root.join(&cfg.test_manifest),
            train_manifest: root.join(&cfg.train_manifest),
            root,
        }
    }

    pub fn split_dir(&self, split: Split) -> PathBuf {
        self.root.join(split.as_str())
    }

    /// Major-index directories under `sequences`, sorted by name
    pub fn major_dirs(&self) -> Result<Vec<PathBuf>> {
        list_subdirs(&self.sequences).map_err(|e| {
            Error::layout(&self.sequences, format!("cannot list major directories: {e}"))
        })
    }
}

/// Find the directory holding `marker`: `path` itself, else its first child (by name) that does
pub fn resolve_data_root(path: &Path, marker: &str) -> Option<PathBuf> {
    if path.join(marker).is_dir() {
        return Some(path.to_path_buf());
    }
    let children = list_subdirs(path).ok()?;
    children.into_iter().find(|child| child.join(marker).is_dir())
}

/// Immediate subdirectories of `dir` (symlinks to directories included), sorted
pub fn list_subdirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
