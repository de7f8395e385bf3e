//! Merge several reorganized dataset parts into one tree
//!
//! Each matched part contributes its `test/`, `train/` and `other/` entries
//! to `<output>/{split}/`. Links always point at the original frame
//! directory behind an entry, never at the part's own link.

use crate::config::Config;
use crate::dataset::{resolve_data_root, Split};
use crate::error::Result;
use crate::pool::{BatchPool, LinkJob};
use crate::progress;
use crate::storage::{Operation, RunReport, RunSummary};
use glob::Pattern;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Progress estimate of entries per merged part, corrected once a part is listed
pub const ENTRIES_PER_ROOT_ESTIMATE: u64 = 10_000;

pub const DEFAULT_INPUT_PATTERN: &str = "vimeo-90k-*";
pub const DEFAULT_OUTPUT: &str = "merged-vimeo-90k";

/// Merge every part under the dataset root matching `pattern` into `<dataset_root>/<output>`
pub async fn merge(cfg: &Config, pattern: &str, output: &str) -> Result<RunReport> {
    let output_root = cfg.dataset_path(output);
    std::fs::create_dir_all(&output_root)?;
    let output_root = output_root.canonicalize()?;

    let roots = find_roots(&cfg.dataset_root, pattern, &cfg.sequences_dir, &output_root)?;
    info!(
        "Merging {} dataset parts matching '{}' into {}",
        roots.len(),
        pattern,
        output_root.display()
    );

    let pool = BatchPool::new(cfg.effective_workers(), cfg.link_mode, cfg.on_conflict);
    let bar = progress::unit_bar(roots.len() as u64 * ENTRIES_PER_ROOT_ESTIMATE, "merge");
    let mut summary = RunSummary::default();

    for root in &roots {
        let jobs = plan_root(root, &output_root);
        let estimate = bar.length().unwrap_or(0) + jobs.len() as u64;
        bar.set_length(estimate.saturating_sub(ENTRIES_PER_ROOT_ESTIMATE));
        bar.set_message(root.display().to_string());
        let batch = pool.run(jobs, |_, _| bar.inc(1)).await?;
        summary.absorb(&batch);
    }
    bar.finish_with_message("done");

    info!("Merged into {}: {}", output_root.display(), summary.describe());
    let report = RunReport::new(Operation::Merge, &output_root, cfg.link_mode, cfg.on_conflict, summary)
        .with_sources(roots);
    report.save(&output_root.join(&cfg.report_file))?;
    Ok(report)
}

/// Data roots of every match of `pattern` under `dataset_root`, sorted, excluding `output_root`
pub fn find_roots(
    dataset_root: &Path,
    pattern: &str,
    marker: &str,
    output_root: &Path,
) -> Result<Vec<PathBuf>> {
    let base = Pattern::escape(&dataset_root.to_string_lossy());
    let full = Path::new(&base).join(pattern);
    let mut roots = Vec::new();

    for entry in glob::glob(&full.to_string_lossy())? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("Cannot read glob match: {}", e);
                continue;
            }
        };
        if !path.is_dir() {
            continue;
        }
        if path.canonicalize().ok().as_deref() == Some(output_root) {
            continue;
        }
        match resolve_data_root(&path, marker) {
            Some(root) => roots.push(root),
            None => warn!("No dataset found in {}, skipping", path.display()),
        }
    }
    roots.sort();
    Ok(roots)
}

/// Jobs for every entry of one part's split directories
pub fn plan_root(root: &Path, output_root: &Path) -> Vec<LinkJob> {
    let mut jobs = Vec::new();
    for split in Split::ALL {
        let split_dir = root.join(split.as_str());
        let entries = match std::fs::read_dir(&split_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping {}: {}", split_dir.display(), e);
                continue;
            }
        };
        let mut children: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        children.sort();
        for source in children {
            let Some(name) = source.file_name() else {
                continue;
            };
            jobs.push(LinkJob {
                split,
                dest: output_root.join(split.as_str()).join(name),
                source,
            });
        }
    }
    jobs
}
