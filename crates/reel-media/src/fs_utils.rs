//! Filesystem helpers for the run's temporary artifacts.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;

static PATH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Build a collision-free path `<dir>/<prefix>_<stamp_ms>_<n>.<ext>`.
///
/// The counter is process-wide, so two calls never return the same path even
/// when they share a timestamp.
pub fn unique_path(dir: &Path, prefix: &str, stamp_ms: i64, ext: &str) -> PathBuf {
    let n = PATH_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("{}_{}_{}.{}", prefix, stamp_ms, n, ext))
}

/// Delete a file, ignoring errors. Returns whether something was removed.
pub async fn remove_quietly(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!("Removed {}", path.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::debug!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}

/// Delete every file in `paths`, ignoring errors.
pub async fn remove_all_quietly<P: AsRef<Path>>(paths: &[P]) -> usize {
    let mut removed = 0;
    for path in paths {
        if remove_quietly(path).await {
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unique_path_never_repeats() {
        let dir = Path::new("/tmp/work");
        let a = unique_path(dir, "clip", 1_700_000_000_000, "mp4");
        let b = unique_path(dir, "clip", 1_700_000_000_000, "mp4");

        assert_ne!(a, b);
        assert!(a.starts_with(dir));
        let name = a.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("clip_1700000000000_"));
        assert!(name.ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_remove_quietly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        fs::write(&path, b"data").await.unwrap();

        assert!(remove_quietly(&path).await);
        assert!(!path.exists());
        // Second removal is a no-op, not an error
        assert!(!remove_quietly(&path).await);
    }

    #[tokio::test]
    async fn test_remove_all_quietly_skips_missing() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.mp4");
        let b = dir.path().join("b.mp4");
        let missing = dir.path().join("missing.mp4");
        fs::write(&a, b"a").await.unwrap();
        fs::write(&b, b"b").await.unwrap();

        let removed = remove_all_quietly(&[a.clone(), missing, b.clone()]).await;
        assert_eq!(removed, 2);
        assert!(!a.exists());
        assert!(!b.exists());
    }
}
