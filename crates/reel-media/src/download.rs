//! Streaming HTTP downloads.

use std::path::Path;

use futures_util::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Stream `url` into `dest`, returning the number of bytes written.
///
/// On any failure the partially written file is removed before the error is
/// returned.
pub async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> MediaResult<u64> {
    match stream_to_file(client, url, dest).await {
        Ok(bytes) => {
            debug!("Downloaded {} bytes to {}", bytes, dest.display());
            Ok(bytes)
        }
        Err(e) => {
            crate::fs_utils::remove_quietly(dest).await;
            Err(e)
        }
    }
}

async fn stream_to_file(client: &reqwest::Client, url: &str, dest: &Path) -> MediaResult<u64> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(MediaError::download_failed(format!(
            "HTTP {} fetching {}",
            response.status(),
            url
        )));
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = fs::File::create(dest).await?;
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    if written == 0 {
        return Err(MediaError::download_failed(format!(
            "empty response body from {}",
            url
        )));
    }

    Ok(written)
}
