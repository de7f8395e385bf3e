//! Split one dataset part into `test/`, `train/` and `other/`
//!
//! Every `sequences/{major}/{minor}` directory is classified against the
//! manifests and exposed as `{split}/{major}-{minor}` under the data root.
//! Major directories are processed one batch at a time.

use crate::config::Config;
use crate::dataset::{list_subdirs, DatasetLayout, Membership};
use crate::error::Result;
use crate::pool::{BatchPool, LinkJob};
use crate::progress;
use crate::storage::{ManifestDigests, Operation, RunReport, RunSummary};
use log::{info, warn};
use std::io;
use std::path::Path;

/// Progress estimate of minor directories per major directory
pub const MINORS_PER_MAJOR_ESTIMATE: u64 = 1000;

/// Resolve `<dataset_root>/<dataset>` and reorganize it
pub async fn parse_dataset(cfg: &Config, dataset: &str) -> Result<RunReport> {
    let layout = DatasetLayout::resolve(&cfg.dataset_path(dataset), cfg)?;
    reorganize(&layout, cfg).await
}

/// Link every minor directory of `layout` into its split and write the run report
pub async fn reorganize(layout: &DatasetLayout, cfg: &Config) -> Result<RunReport> {
    let membership = Membership::load(layout)?;
    let majors = layout.major_dirs()?;
    let root = layout.root.canonicalize()?;
    info!(
        "Reorganizing {} ({} major directories, {} workers, {})",
        root.display(),
        majors.len(),
        cfg.effective_workers(),
        cfg.link_mode.as_str()
    );

    let pool = BatchPool::new(cfg.effective_workers(), cfg.link_mode, cfg.on_conflict);
    let bar = progress::unit_bar(majors.len() as u64 * MINORS_PER_MAJOR_ESTIMATE, "parse");
    let mut summary = RunSummary::default();

    for major_dir in &majors {
        let jobs = match plan_major(&root, major_dir, &membership) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!("Skipping {}: {}", major_dir.display(), e);
                continue;
            }
        };
        bar.set_message(dir_name(major_dir));
        let batch = pool.run(jobs, |_, _| bar.inc(1)).await?;
        summary.absorb(&batch);
    }
    bar.finish_with_message("done");

    info!("Parsed {}: {}", root.display(), summary.describe());
    let report = RunReport::new(Operation::Parse, &root, cfg.link_mode, cfg.on_conflict, summary)
        .with_manifests(ManifestDigests {
            test: membership.test_digest().to_string(),
            train: membership.train_digest().to_string(),
            overlap: membership.overlap(),
        });
    report.save(&root.join(&cfg.report_file))?;
    Ok(report)
}

/// Jobs for every minor directory under one major directory
pub fn plan_major(root: &Path, major_dir: &Path, membership: &Membership) -> io::Result<Vec<LinkJob>> {
    let major = dir_name(major_dir);
    let jobs = list_subdirs(major_dir)?
        .into_iter()
        .map(|minor_dir| {
            let minor = dir_name(&minor_dir);
            let split = membership.classify(&major, &minor);
            LinkJob {
                split,
                dest: root.join(split.as_str()).join(format!("{major}-{minor}")),
                source: minor_dir,
            }
        })
        .collect();
    Ok(jobs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConflictPolicy, LinkMode};
    use crate::dataset::Split;
    use crate::storage::{resolves_to, verify_tree};
    use std::path::PathBuf;

    fn test_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("framesplit-parse-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Two majors with three minors each, written under `root`
    fn build_dataset(root: &Path, test: &str, train: &str) {
        for major in ["00001", "00002"] {
            for minor in ["0001", "0002", "0003"] {
                let dir = root.join("sequences").join(major).join(minor);
                std::fs::create_dir_all(&dir).unwrap();
                std::fs::write(dir.join("im1.png"), format!("{major}/{minor}")).unwrap();
            }
        }
        std::fs::write(root.join("sep_testlist.txt"), test).unwrap();
        std::fs::write(root.join("sep_trainlist.txt"), train).unwrap();
    }

    fn cfg(dataset_root: &Path) -> Config {
        Config {
            dataset_root: dataset_root.to_path_buf(),
            workers: 4,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_entries_land_in_their_split() {
        let dir = test_dir();
        build_dataset(
            &dir.join("vimeo-90k-1"),
            "00001/0001\n00002/0003\n",
            "00001/0002\n00002/0001\n",
        );

        let report = parse_dataset(&cfg(&dir), "vimeo-90k-1").await.unwrap();
        let root = dir.join("vimeo-90k-1").canonicalize().unwrap();

        assert_eq!(report.summary.units, 6);
        assert_eq!(report.summary.splits.test, 2);
        assert_eq!(report.summary.splits.train, 2);
        assert_eq!(report.summary.splits.other, 2);
        assert_eq!(report.summary.created, 6);

        assert!(resolves_to(&root.join("test/00001-0001"), &root.join("sequences/00001/0001")));
        assert!(resolves_to(&root.join("test/00002-0003"), &root.join("sequences/00002/0003")));
        assert!(resolves_to(&root.join("train/00002-0001"), &root.join("sequences/00002/0001")));
        assert!(resolves_to(&root.join("other/00001-0003"), &root.join("sequences/00001/0003")));
        assert!(!root.join("train/00001-0001").exists());

        let saved = RunReport::load(&root.join("split-report.json")).unwrap();
        assert_eq!(saved.run_id, report.run_id);
        assert_eq!(saved.operation, Operation::Parse);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_rerun_is_tolerated() {
        let dir = test_dir();
        build_dataset(&dir.join("part"), "00001/0001\n", "00001/0002\n");
        let cfg = cfg(&dir);

        parse_dataset(&cfg, "part").await.unwrap();
        let second = parse_dataset(&cfg, "part").await.unwrap();

        assert_eq!(second.summary.units, 6);
        assert_eq!(second.summary.existed, 6);
        assert_eq!(second.summary.failed, 0);
        assert!(verify_tree(&dir.join("part")).unwrap().is_healthy());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_empty_manifests_put_everything_in_other() {
        let dir = test_dir();
        build_dataset(&dir.join("part"), "", "99999/9999\n");

        let report = parse_dataset(&cfg(&dir), "part").await.unwrap();
        assert_eq!(report.summary.splits.other, 6);
        assert_eq!(report.summary.splits.get(Split::Test), 0);
        assert_eq!(std::fs::read_dir(dir.join("part/other")).unwrap().count(), 6);
        assert!(!dir.join("part/test").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_nested_archive_layout_and_copy_mode() {
        let dir = test_dir();
        build_dataset(&dir.join("part/vimeo_septuplet"), "00002/0002\n", "");
        let cfg = Config {
            link_mode: LinkMode::Copy,
            on_conflict: ConflictPolicy::Skip,
            ..cfg(&dir)
        };

        let report = parse_dataset(&cfg, "part").await.unwrap();
        let root = dir.join("part/vimeo_septuplet");
        assert_eq!(report.summary.created, 6);
        let copied = root.join("test/00002-0002");
        assert!(!copied.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(copied.join("im1.png")).unwrap(), "00002/0002");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_layout_is_reported() {
        let dir = test_dir();
        std::fs::create_dir_all(dir.join("broken/frames")).unwrap();

        let err = parse_dataset(&cfg(&dir), "broken").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Layout { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_plan_major_names_destinations() {
        let dir = test_dir();
        std::fs::create_dir_all(dir.join("sequences/00007/0010")).unwrap();
        std::fs::create_dir_all(dir.join("sequences/00007/0002")).unwrap();
        std::fs::write(dir.join("sequences/00007/stray.txt"), "x").unwrap();
        let membership = Membership::from_lists("00007/0010\n", "");

        let jobs = plan_major(&dir, &dir.join("sequences/00007"), &membership).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].dest, dir.join("other/00007-0002"));
        assert_eq!(jobs[1].dest, dir.join("test/00007-0010"));
        assert_eq!(jobs[1].split, Split::Test);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
