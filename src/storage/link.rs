//! Materializing split entries as symlinks or directory copies

use crate::config::{ConflictPolicy, LinkMode};
use crate::dataset::Split;
use crate::error::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of materializing one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    /// Destination was already present and left alone
    Existed,
    /// Destination was present and has been recreated
    Replaced,
    Failed(String),
}

impl LinkOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, LinkOutcome::Failed(_))
    }
}

/// Create `dest` as a view of `source`.
///
/// The parent of `dest` is created if needed. Symlinks always point at the
/// canonical path of `source`, so linking an existing link yields a link to
/// the original directory. Errors are folded into [`LinkOutcome::Failed`].
pub fn materialize(source: &Path, dest: &Path, mode: LinkMode, policy: ConflictPolicy) -> LinkOutcome {
    match try_materialize(source, dest, mode, policy) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Failed to {} {} -> {}: {}", mode.as_str(), dest.display(), source.display(), e);
            LinkOutcome::Failed(e.to_string())
        }
    }
}

fn try_materialize(
    source: &Path,
    dest: &Path,
    mode: LinkMode,
    policy: ConflictPolicy,
) -> io::Result<LinkOutcome> {
    let target = source.canonicalize()?;
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let existed = dest.symlink_metadata().is_ok();
    if existed {
        match policy {
            ConflictPolicy::Skip => return Ok(LinkOutcome::Existed),
            ConflictPolicy::Replace => remove_entry(dest)?,
        }
    }

    let created = match mode {
        LinkMode::Symlink => symlink_dir(&target, dest),
        LinkMode::Copy => copy_into_place(&target, dest),
    };
    match created {
        Ok(()) => {
            debug!("{} {} -> {}", mode.as_str(), dest.display(), target.display());
            Ok(if existed { LinkOutcome::Replaced } else { LinkOutcome::Created })
        }
        // another worker got there first
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && policy == ConflictPolicy::Skip => {
            Ok(LinkOutcome::Existed)
        }
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

/// Copy `source` to a hidden sibling of `dest`, then rename it into place.
///
/// A copy that fails partway is removed, so `dest` only ever appears complete.
fn copy_into_place(source: &Path, dest: &Path) -> io::Result<()> {
    let staging = staging_path(dest);
    if staging.symlink_metadata().is_ok() {
        remove_entry(&staging)?;
    }
    if let Err(e) = copy_dir(source, &staging) {
        let _ = std::fs::remove_dir_all(&staging);
        return Err(e);
    }
    if let Err(e) = std::fs::rename(&staging, dest) {
        let _ = std::fs::remove_dir_all(&staging);
        if dest.symlink_metadata().is_ok() {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, e));
        }
        return Err(e);
    }
    Ok(())
}

fn staging_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.partial"))
}

/// Recursive copy of `source` into a new directory `dest`
pub fn copy_dir(source: &Path, dest: &Path) -> io::Result<()> {
    std::fs::create_dir(dest)?;
    for entry in WalkDir::new(source).min_depth(1).follow_links(true) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Remove a file, symlink or directory tree without following symlinks
fn remove_entry(path: &Path) -> io::Result<()> {
    let meta = path.symlink_metadata()?;
    if meta.file_type().is_symlink() {
        #[cfg(windows)]
        if std::fs::remove_dir(path).is_ok() {
            return Ok(());
        }
        std::fs::remove_file(path)
    } else if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// True when `dest` resolves to the same directory as `source`
pub fn resolves_to(dest: &Path, source: &Path) -> bool {
    match (dest.canonicalize(), source.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Integrity of the split directories of one reorganized root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyReport {
    pub checked: usize,
    pub broken: Vec<PathBuf>,
}

impl VerifyReport {
    pub fn is_healthy(&self) -> bool {
        self.broken.is_empty()
    }
}

/// Check that every entry under `root/{test,train,other}` resolves to a directory
pub fn verify_tree(root: &Path) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    for split in Split::ALL {
        let dir = root.join(split.as_str());
        if !dir.is_dir() {
            continue;
        }
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .map(|e| e.map(|e| e.path()))
            .collect::<io::Result<_>>()?;
        entries.sort();
        for entry in entries {
            report.checked += 1;
            if !entry.is_dir() {
                report.broken.push(entry);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("framesplit-link-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn frame_dir(dir: &Path, name: &str) -> PathBuf {
        let src = dir.join(name);
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("im1.png"), b"frame-1").unwrap();
        std::fs::write(src.join("im2.png"), b"frame-2").unwrap();
        src
    }

    #[test]
    fn test_symlink_created_and_resolves() {
        let dir = test_dir();
        let src = frame_dir(&dir, "sequences/00001/0001");
        let dest = dir.join("test/00001-0001");

        let outcome = materialize(&src, &dest, LinkMode::Symlink, ConflictPolicy::Skip);
        assert_eq!(outcome, LinkOutcome::Created);
        assert!(dest.symlink_metadata().unwrap().file_type().is_symlink());
        assert!(resolves_to(&dest, &src));
        assert_eq!(std::fs::read(dest.join("im1.png")).unwrap(), b"frame-1");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_existing_destination_is_tolerated() {
        let dir = test_dir();
        let src = frame_dir(&dir, "a");
        let dest = dir.join("train/a");

        assert_eq!(materialize(&src, &dest, LinkMode::Symlink, ConflictPolicy::Skip), LinkOutcome::Created);
        assert_eq!(materialize(&src, &dest, LinkMode::Symlink, ConflictPolicy::Skip), LinkOutcome::Existed);
        assert!(resolves_to(&dest, &src));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_replace_relinks_to_new_source() {
        let dir = test_dir();
        let old = frame_dir(&dir, "old");
        let new = frame_dir(&dir, "new");
        let dest = dir.join("other/x");

        materialize(&old, &dest, LinkMode::Symlink, ConflictPolicy::Skip);
        let outcome = materialize(&new, &dest, LinkMode::Symlink, ConflictPolicy::Replace);
        assert_eq!(outcome, LinkOutcome::Replaced);
        assert!(resolves_to(&dest, &new));
        // the replaced link must not have taken the old data with it
        assert!(old.join("im1.png").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_copy_mode_duplicates_files() {
        let dir = test_dir();
        let src = frame_dir(&dir, "src");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("nested/im3.png"), b"frame-3").unwrap();
        let dest = dir.join("test/src");

        let outcome = materialize(&src, &dest, LinkMode::Copy, ConflictPolicy::Skip);
        assert_eq!(outcome, LinkOutcome::Created);
        assert!(!dest.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(dest.join("im2.png")).unwrap(), b"frame-2");
        assert_eq!(std::fs::read(dest.join("nested/im3.png")).unwrap(), b"frame-3");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_source_fails_without_panic() {
        let dir = test_dir();
        let outcome = materialize(
            &dir.join("missing"),
            &dir.join("test/missing"),
            LinkMode::Symlink,
            ConflictPolicy::Skip,
        );
        assert!(outcome.is_failure());
        assert!(!dir.join("test").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_copy_leaves_nothing_behind() {
        let dir = test_dir();
        let src = frame_dir(&dir, "src");
        std::os::unix::fs::symlink(dir.join("nowhere"), src.join("zz-dangling")).unwrap();
        let dest = dir.join("test/src");

        let first = materialize(&src, &dest, LinkMode::Copy, ConflictPolicy::Skip);
        assert!(first.is_failure());
        assert!(dest.symlink_metadata().is_err());
        assert_eq!(std::fs::read_dir(dir.join("test")).unwrap().count(), 0);

        // a rerun must retry the copy instead of trusting a truncated one
        std::fs::remove_file(src.join("zz-dangling")).unwrap();
        let second = materialize(&src, &dest, LinkMode::Copy, ConflictPolicy::Skip);
        assert_eq!(second, LinkOutcome::Created);
        assert_eq!(std::fs::read(dest.join("im2.png")).unwrap(), b"frame-2");
        assert!(verify_tree(&dir).unwrap().is_healthy());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_verify_finds_broken_links() {
        let dir = test_dir();
        let keep = frame_dir(&dir, "keep");
        let gone = frame_dir(&dir, "gone");
        materialize(&keep, &dir.join("test/keep"), LinkMode::Symlink, ConflictPolicy::Skip);
        materialize(&gone, &dir.join("train/gone"), LinkMode::Symlink, ConflictPolicy::Skip);
        std::fs::remove_dir_all(&gone).unwrap();

        let report = verify_tree(&dir).unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.broken, vec![dir.join("train/gone")]);
        assert!(!report.is_healthy());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
