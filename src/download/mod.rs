//! Dataset download from Kaggle
//!
//! A dataset part is fetched as one zip archive and extracted into
//! `<dataset_root>/<dataset>`. Extraction goes through a staging directory
//! that is renamed into place at the end, so an interrupted run never leaves
//! a directory that later runs would mistake for a finished download.

pub mod archive;
pub mod credentials;

pub use archive::extract_zip;
pub use credentials::KaggleCredentials;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::progress;
use crate::reorganize::parse_dataset;
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const KAGGLE_API: &str = "https://www.kaggle.com/api/v1";
pub const DEFAULT_OWNER: &str = "wangsally";
pub const DEFAULT_DATASET: &str = "vimeo-90k-00001";
pub const DEFAULT_PART_PREFIX: &str = "vimeo-90k-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Target directory already existed; nothing was fetched
    Skipped(PathBuf),
    Downloaded { path: PathBuf, bytes: u64, files: usize },
}

#[derive(Debug, Clone)]
pub struct Downloader {
    root: PathBuf,
    base_url: String,
    credentials: Option<KaggleCredentials>,
}

impl Downloader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            base_url: KAGGLE_API.to_string(),
            credentials: None,
        }
    }

    /// Use these credentials instead of discovering them at download time
    pub fn with_credentials(mut self, credentials: KaggleCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Point at a different API host (mirrors, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn archive_url(&self, owner: &str, dataset: &str) -> String {
        format!("{}/datasets/download/{}/{}", self.base_url, owner, dataset)
    }

    /// Fetch `owner/dataset` unless `<root>/<dataset>` already exists.
    ///
    /// Blocking; failures are returned as-is and never retried.
    pub fn download(&self, owner: &str, dataset: &str) -> Result<DownloadOutcome> {
        std::fs::create_dir_all(&self.root)?;
        let target = self.root.join(dataset);
        if target.exists() {
            warn!("dataset {} already exists!", dataset);
            return Ok(DownloadOutcome::Skipped(target));
        }

        let credentials = match &self.credentials {
            Some(credentials) => credentials.clone(),
            None => KaggleCredentials::discover()?,
        };
        let archive_path = self.root.join(format!("{dataset}.zip.part"));
        let staging = self.root.join(format!("{dataset}.extracting"));

        let unpacked = self
            .fetch(owner, dataset, &credentials, &archive_path)
            .and_then(|bytes| unpack(&archive_path, &staging).map(|files| (bytes, files)));
        let (bytes, files) = match unpacked {
            Ok(counts) => counts,
            Err(e) => {
                let _ = std::fs::remove_file(&archive_path);
                let _ = std::fs::remove_dir_all(&staging);
                return Err(e);
            }
        };
        std::fs::rename(&staging, &target)?;
        std::fs::remove_file(&archive_path)?;

        info!(
            "Downloaded {} ({} bytes, {} files) to {}",
            dataset,
            bytes,
            files,
            target.display()
        );
        Ok(DownloadOutcome::Downloaded {
            path: target,
            bytes,
            files,
        })
    }

    fn fetch(
        &self,
        owner: &str,
        dataset: &str,
        credentials: &KaggleCredentials,
        dest: &Path,
    ) -> Result<u64> {
        let url = self.archive_url(owner, dataset);
        info!("Fetching {}", url);
        let response = ureq::get(&url)
            .set("Authorization", &credentials.basic_auth())
            .call()
            .map_err(|e| Error::download(dataset, format!("GET {url}: {e}")))?;

        let total = response
            .header("Content-Length")
            .and_then(|len| len.parse::<u64>().ok());
        let bar = progress::byte_bar(total, "download");
        let mut reader = bar.wrap_read(response.into_reader());
        let mut out = BufWriter::new(File::create(dest)?);
        let bytes = io::copy(&mut reader, &mut out)
            .map_err(|e| Error::download(dataset, format!("reading {url}: {e}")))?;
        out.flush()?;
        bar.finish_and_clear();
        Ok(bytes)
    }
}

fn unpack(archive_path: &Path, staging: &Path) -> Result<usize> {
    if staging.exists() {
        std::fs::remove_dir_all(staging)?;
    }
    extract_zip(archive_path, staging)
}

/// Which parts of a `download_all` batch made it through download and parse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartsReport {
    pub parsed: Vec<String>,
    pub failed: Vec<String>,
}

impl PartsReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Download then parse each part in order.
///
/// A part that fails either step is logged and recorded; the batch moves on
/// to the next part.
pub async fn download_all(
    cfg: &Config,
    downloader: &Downloader,
    owner: &str,
    parts: &[String],
) -> PartsReport {
    let mut report = PartsReport::default();
    for name in parts {
        info!("download {}", name);
        let fetch = {
            let (downloader, owner, name) = (downloader.clone(), owner.to_string(), name.clone());
            tokio::task::spawn_blocking(move || downloader.download(&owner, &name)).await
        };
        let downloaded = match fetch {
            Ok(result) => result,
            Err(e) => Err(Error::from(e)),
        };
        if let Err(e) = downloaded {
            error!("Download of {} failed: {}", name, e);
            report.failed.push(name.clone());
            continue;
        }

        info!("parse {}", name);
        match parse_dataset(cfg, name).await {
            Ok(_) => report.parsed.push(name.clone()),
            Err(e) => {
                error!("Parse of {} failed: {}", name, e);
                report.failed.push(name.clone());
            }
        }
    }
    if !report.is_complete() {
        warn!("{} parts failed: {}", report.failed.len(), report.failed.join(", "));
    }
    report
}

/// Part names `{prefix}{i}` for `i` in `start..=end`
pub fn part_names(prefix: &str, start: u32, end: u32) -> Vec<String> {
    (start..=end).map(|i| format!("{prefix}{i}")).collect()
}
