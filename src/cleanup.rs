use crate::errors::Result;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Counts from one cleanup pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct PruneStats {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

/// Deletes every regular file under `root` that is not in `modified`, then
/// removes directories left empty.
///
/// This is destructive and irreversible; it is the accepted cost of keeping
/// only successfully patched output. `modified` must hold paths as produced
/// by the scan over the same `root`, so the two walks agree textually.
///
/// Children are visited before their parents, so emptied directories are
/// pruned bottom-up in the same pass. Any filesystem error aborts immediately,
/// before deleting further files.
pub fn prune_unmodified(root: &Path, modified: &BTreeSet<PathBuf>) -> Result<PruneStats> {
    let mut stats = PruneStats::default();

    for entry in WalkDir::new(root).contents_first(true) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() {
            if !modified.contains(path) {
                fs::remove_file(path)?;
                stats.files_removed += 1;
            }
        } else if entry.file_type().is_dir() && path != root {
            if fs::read_dir(path)?.next().is_none() {
                fs::remove_dir(path)?;
                stats.dirs_removed += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prune_deletes_only_unmodified() {
        let dir = TempDir::new().unwrap();
        let x = dir.path().join("x.bin");
        let y = dir.path().join("y.bin");
        let z = dir.path().join("z.bin");
        fs::write(&x, b"x-content").unwrap();
        fs::write(&y, b"y-content").unwrap();
        fs::write(&z, b"z-content").unwrap();

        let modified: BTreeSet<PathBuf> = [x.clone(), y.clone()].into_iter().collect();
        let stats = prune_unmodified(dir.path(), &modified).unwrap();

        assert_eq!(stats.files_removed, 1);
        assert!(!z.exists());
        // Survivors are byte-for-byte intact
        assert_eq!(fs::read(&x).unwrap(), b"x-content");
        assert_eq!(fs::read(&y).unwrap(), b"y-content");
    }

    #[test]
    fn test_prune_removes_emptied_directories() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub/deeper");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("stale.bin"), b"stale").unwrap();
        let kept = dir.path().join("kept.bin");
        fs::write(&kept, b"kept").unwrap();

        let modified: BTreeSet<PathBuf> = [kept.clone()].into_iter().collect();
        let stats = prune_unmodified(dir.path(), &modified).unwrap();

        assert_eq!(stats.files_removed, 1);
        assert_eq!(stats.dirs_removed, 2);
        assert!(!dir.path().join("sub").exists());
        assert!(kept.exists());
    }

    #[test]
    fn test_prune_keeps_populated_directories() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir_all(&sub).unwrap();
        let kept = sub.join("kept.bin");
        fs::write(&kept, b"kept").unwrap();
        fs::write(sub.join("stale.bin"), b"stale").unwrap();

        let modified: BTreeSet<PathBuf> = [kept.clone()].into_iter().collect();
        prune_unmodified(dir.path(), &modified).unwrap();

        assert!(sub.exists());
        assert!(kept.exists());
    }

    #[test]
    fn test_prune_empty_modified_set_clears_tree() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), b"a").unwrap();
        fs::write(dir.path().join("b.bin"), b"b").unwrap();

        let stats = prune_unmodified(dir.path(), &BTreeSet::new()).unwrap();
        assert_eq!(stats.files_removed, 2);
        assert!(dir.path().exists());
    }
}
