//! Run configuration
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! `FRAMESPLIT_*` environment variables. The CLI applies explicit flags last.

use crate::error::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_WORKERS: usize = 20;

/// How a split entry is materialized on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Symlink pointing at the original directory
    #[default]
    Symlink,
    /// Full recursive copy of the directory
    Copy,
}

/// What to do when the destination entry already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Keep whatever is there
    #[default]
    Skip,
    /// Remove the existing entry and link again
    Replace,
}

impl LinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkMode::Symlink => "symlink",
            LinkMode::Copy => "copy",
        }
    }
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Skip => "skip",
            ConflictPolicy::Replace => "replace",
        }
    }
}

/// Settings shared by the download, parse and merge commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding every downloaded dataset part
    pub dataset_root: PathBuf,
    /// Worker count for each batch pool
    pub workers: usize,
    pub link_mode: LinkMode,
    pub on_conflict: ConflictPolicy,
    pub test_manifest: String,
    pub train_manifest: String,
    pub sequences_dir: String,
    pub report_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from("dataset"),
            workers: DEFAULT_WORKERS,
            link_mode: LinkMode::Symlink,
            on_conflict: ConflictPolicy::Skip,
            test_manifest: "sep_testlist.txt".to_string(),
            train_manifest: "sep_trainlist.txt".to_string(),
            sequences_dir: "sequences".to_string(),
            report_file: "split-report.json".to_string(),
        }
    }
}

impl Config {
    /// Defaults, overlaid with `path` when given, overlaid with the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.with_env(|key| std::env::var(key).ok())
    }

    /// Read a JSON config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Apply `FRAMESPLIT_*` overrides found through `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("FRAMESPLIT_ROOT") {
            self.dataset_root = PathBuf::from(root);
        }
        if let Some(workers) = lookup("FRAMESPLIT_WORKERS") {
            self.workers = workers
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("FRAMESPLIT_WORKERS is not a number: {workers}")))?;
        }
        if let Some(mode) = lookup("FRAMESPLIT_MODE") {
            self.link_mode = LinkMode::from_str(mode.trim(), true)
                .map_err(|_| Error::Config(format!("unknown link mode: {mode}")))?;
        }
        if let Some(policy) = lookup("FRAMESPLIT_ON_CONFLICT") {
            self.on_conflict = ConflictPolicy::from_str(policy.trim(), true)
                .map_err(|_| Error::Config(format!("unknown conflict policy: {policy}")))?;
        }
        Ok(self)
    }

    /// Worker count actually used by the pool; never zero
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }

    /// Location of a named dataset part under the dataset root
    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.dataset_root.join(name)
    }
}
