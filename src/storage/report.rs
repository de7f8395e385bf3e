//! Run reports: what a parse or merge run produced
//!
//! Written as `split-report.json` next to the split directories so a later
//! run (or a person) can tell which manifests and inputs a tree was built from.

use super::link::LinkOutcome;
use crate::config::{ConflictPolicy, LinkMode};
use crate::dataset::Split;
use crate::error::Result;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Entries per split
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitCounts {
    pub test: usize,
    pub train: usize,
    pub other: usize,
}

impl SplitCounts {
    pub fn get(&self, split: Split) -> usize {
        match split {
            Split::Test => self.test,
            Split::Train => self.train,
            Split::Other => self.other,
        }
    }

    fn bump(&mut self, split: Split) {
        match split {
            Split::Test => self.test += 1,
            Split::Train => self.train += 1,
            Split::Other => self.other += 1,
        }
    }
}

/// Tally of every unit processed in a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub units: usize,
    pub splits: SplitCounts,
    pub created: usize,
    pub existed: usize,
    pub replaced: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Count one finished unit; failed units still count as done
    pub fn record(&mut self, split: Split, outcome: &LinkOutcome) {
        self.units += 1;
        self.splits.bump(split);
        match outcome {
            LinkOutcome::Created => self.created += 1,
            LinkOutcome::Existed => self.existed += 1,
            LinkOutcome::Replaced => self.replaced += 1,
            LinkOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn absorb(&mut self, other: &RunSummary) {
        self.units += other.units;
        self.splits.test += other.splits.test;
        self.splits.train += other.splits.train;
        self.splits.other += other.splits.other;
        self.created += other.created;
        self.existed += other.existed;
        self.replaced += other.replaced;
        self.failed += other.failed;
    }

    pub fn describe(&self) -> String {
        format!(
            "{} entries (test {}, train {}, other {}) | created {} | existed {} | replaced {} | failed {}",
            self.units,
            self.splits.test,
            self.splits.train,
            self.splits.other,
            self.created,
            self.existed,
            self.replaced,
            self.failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Parse,
    Merge,
}

/// SHA-256 of the manifests a parse run classified against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDigests {
    pub test: String,
    pub train: String,
    /// Identifiers listed in both manifests
    pub overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub operation: Operation,
    pub link_mode: LinkMode,
    pub on_conflict: ConflictPolicy,
    /// Root the split directories were written under
    pub root: PathBuf,
    pub summary: RunSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifests: Option<ManifestDigests>,
    /// Dataset roots a merge drew from
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<PathBuf>,
}

impl RunReport {
    pub fn new(
        operation: Operation,
        root: impl Into<PathBuf>,
        link_mode: LinkMode,
        on_conflict: ConflictPolicy,
        summary: RunSummary,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            operation,
            link_mode,
            on_conflict,
            root: root.into(),
            summary,
            manifests: None,
            sources: Vec::new(),
        }
    }

    pub fn with_manifests(mut self, digests: ManifestDigests) -> Self {
        self.manifests = Some(digests);
        self
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Wrote {:?} report {} to {}", self.operation, self.run_id, path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_failures_as_done() {
        let mut summary = RunSummary::default();
        summary.record(Split::Test, &LinkOutcome::Created);
        summary.record(Split::Train, &LinkOutcome::Existed);
        summary.record(Split::Other, &LinkOutcome::Failed("denied".into()));
        summary.record(Split::Other, &LinkOutcome::Replaced);

        assert_eq!(summary.units, 4);
        assert_eq!(summary.splits.get(Split::Other), 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created + summary.existed + summary.replaced + summary.failed, 4);
    }

    #[test]
    fn test_absorb_adds_up() {
        let mut a = RunSummary::default();
        a.record(Split::Test, &LinkOutcome::Created);
        let mut b = RunSummary::default();
        b.record(Split::Train, &LinkOutcome::Created);
        b.record(Split::Train, &LinkOutcome::Existed);

        a.absorb(&b);
        assert_eq!(a.units, 3);
        assert_eq!(a.splits, SplitCounts { test: 1, train: 2, other: 0 });
        assert_eq!(a.created, 2);
    }

    #[test]
    fn test_save_and_load_report() {
        let dir = std::env::temp_dir().join(format!("framesplit-report-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("split-report.json");

        let mut summary = RunSummary::default();
        summary.record(Split::Test, &LinkOutcome::Created);
        let report = RunReport::new(
            Operation::Parse,
            &dir,
            LinkMode::Symlink,
            ConflictPolicy::Skip,
            summary.clone(),
        )
        .with_manifests(ManifestDigests {
            test: "aa".into(),
            train: "bb".into(),
            overlap: 0,
        });
        report.save(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"operation\": \"parse\""));
        assert!(json.contains("\"link_mode\": \"symlink\""));
        assert!(!json.contains("sources"));

        let loaded = RunReport::load(&path).unwrap();
        assert_eq!(loaded.run_id, report.run_id);
        assert_eq!(loaded.summary, summary);
        assert_eq!(loaded.manifests, report.manifests);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
