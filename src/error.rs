//! Error types shared by every stage of the pipeline

use std::path::PathBuf;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while downloading, splitting or merging a dataset
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset directory does not contain a usable `sequences` tree
    #[error("dataset layout error at {path}: {reason}")]
    Layout { path: PathBuf, reason: String },

    #[error("manifest error in {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("download failed for {dataset}: {reason}")]
    Download { dataset: String, reason: String },

    #[error("missing Kaggle credentials: {0}")]
    Credentials(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("config error: {0}")]
    Config(String),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("report error: {0}")]
    Report(#[from] serde_json::Error),
}

impl Error {
    pub fn layout(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Layout {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Manifest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn download(dataset: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Download {
            dataset: dataset.into(),
            reason: reason.into(),
        }
    }
}
