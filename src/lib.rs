//! framesplit: download, split and merge video-frame datasets
//!
//! A Vimeo-90k style dataset part holds `sequences/{major}/{minor}` frame
//! directories and two manifests naming the test and train members. This
//! crate exposes each minor directory under `test/`, `train/` or `other/`
//! through symlinks (or copies), and merges several such parts into one
//! tree without duplicating frame data.

pub mod config;
pub mod dataset;
pub mod download;
pub mod error;
pub mod merge;
pub mod pool;
pub mod progress;
pub mod reorganize;
pub mod storage;

pub use config::{Config, ConflictPolicy, LinkMode};
pub use dataset::{DatasetLayout, Membership, Split};
pub use download::{DownloadOutcome, Downloader};
pub use error::{Error, Result};
pub use merge::merge;
pub use reorganize::{parse_dataset, reorganize};
pub use storage::{LinkOutcome, RunReport, RunSummary};
