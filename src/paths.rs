use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File-name suffix of raw MLHD+ listen archives (one file per user).
pub const LISTEN_FILE_SUFFIX: &str = ".txt.zst";

/// True for paths named like a raw listen archive.
pub fn is_listen_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(LISTEN_FILE_SUFFIX))
}

/// Collect every raw listen archive under `root`, sorted by path so
/// runs visit users in a stable order.
pub fn collect_listen_files(root: &Path) -> Result<Vec<PathBuf>> {
    collect_listen_files_with(root, |_| {})
}

/// Same as [`collect_listen_files`], reporting the running count so
/// callers can drive a progress indicator over large dumps.
pub fn collect_listen_files_with(
    root: &Path,
    mut on_file: impl FnMut(u64),
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("cannot walk raw dump {}", root.display()))?;
        if entry.file_type().is_file() && is_listen_file(entry.path()) {
            files.push(entry.into_path());
            on_file(files.len() as u64);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_collects_only_listen_files_sorted() {
        let dir = tempdir().unwrap();
        let shard_a = dir.path().join("00");
        let shard_b = dir.path().join("ff");
        fs::create_dir_all(&shard_a).unwrap();
        fs::create_dir_all(&shard_b).unwrap();

        let first = shard_a.join("1111.txt.zst");
        let second = shard_b.join("0000.txt.zst");
        File::create(&first).unwrap();
        File::create(&second).unwrap();
        File::create(shard_a.join("notes.txt")).unwrap();
        File::create(shard_b.join("index.zst")).unwrap();

        let files = collect_listen_files(dir.path()).unwrap();
        assert_eq!(files, vec![first, second]);
    }

    #[test]
    fn test_reports_running_count() {
        let dir = tempdir().unwrap();
        for name in ["a.txt.zst", "b.txt.zst", "c.txt.zst"] {
            File::create(dir.path().join(name)).unwrap();
        }

        let mut seen = Vec::new();
        let files = collect_listen_files_with(dir.path(), |count| seen.push(count)).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(collect_listen_files(&missing).is_err());
    }

    #[test]
    fn test_is_listen_file() {
        assert!(is_listen_file(Path::new("00/abcd-1234.txt.zst")));
        assert!(!is_listen_file(Path::new("00/abcd-1234.txt")));
        assert!(!is_listen_file(Path::new("00/abcd-1234.zst")));
        assert!(!is_listen_file(Path::new("00")));
    }
}
