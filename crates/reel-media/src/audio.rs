//! Background audio track, fetched once per process.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::download::download_to_file;

/// File name of the cached track inside the work directory.
pub const BACKGROUND_AUDIO_FILE: &str = "background_audio.mp3";

/// Lazily downloaded background track shared by every run.
///
/// The first caller downloads the track while holding the lock, later callers
/// reuse the file. A failed download is not fatal: the caller gets `None` and
/// renders without audio, and the next run tries again.
#[derive(Debug)]
pub struct BackgroundAudioCache {
    client: reqwest::Client,
    url: Option<String>,
    path: PathBuf,
    lock: Mutex<()>,
}

impl BackgroundAudioCache {
    pub fn new(client: reqwest::Client, url: Option<String>, work_dir: &Path) -> Self {
        Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
            path: work_dir.join(BACKGROUND_AUDIO_FILE),
            lock: Mutex::new(()),
        }
    }

    /// A cache that never produces a track.
    pub fn disabled(work_dir: &Path) -> Self {
        Self::new(reqwest::Client::new(), None, work_dir)
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the local track, downloading it on first use.
    pub async fn get(&self) -> Option<PathBuf> {
        let url = self.url.as_deref()?;
        let _guard = self.lock.lock().await;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            return Some(self.path.clone());
        }

        let partial = self.path.with_extension("mp3.part");
        match download_to_file(&self.client, url, &partial).await {
            Ok(bytes) => {
                if let Err(e) = fs::rename(&partial, &self.path).await {
                    warn!("Failed to store background audio: {}", e);
                    crate::fs_utils::remove_quietly(&partial).await;
                    return None;
                }
                info!(bytes, "Cached background audio at {}", self.path.display());
                Some(self.path.clone())
            }
            Err(e) => {
                warn!("Background audio unavailable, rendering without it: {}", e);
                None
            }
        }
    }
}
