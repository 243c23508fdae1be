//! Max-age-gated fetching of remote resources into local cache slots.

use std::path::Path;
use std::time::{Duration, SystemTime};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::error::FeedError;

/// Upper bound for any single downloaded resource.
const MAX_DOWNLOAD_SIZE: u64 = 500 * 1024 * 1024; // 500 MB

/// Whether a fetch touched the network or found the cache slot still fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The resource was downloaded and the cache slot rewritten.
    Downloaded,
    /// The cached file was younger than the max age; the network was not hit.
    CacheFresh,
}

/// Age of the file at `path` from its modification time, `None` when the
/// file is missing or its metadata is unreadable.
async fn file_age(path: &Path) -> Option<Duration> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    let modified = meta.modified().ok()?;
    // An mtime in the future (clock rollback) reads as age zero.
    Some(SystemTime::now().duration_since(modified).unwrap_or_default())
}

/// Fetch `url` into `path` unless the cached copy is younger than `max_age`.
///
/// Non-2xx responses are failures and leave the cache slot untouched. The
/// body streams into a sibling `.part` file that is renamed over `path` only
/// once the transfer completed, so an interrupted download never leaves
/// partial bytes behind as a fresh-looking cache entry.
pub async fn fetch_cached(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    max_age: Duration,
    timeout: Duration,
) -> Result<FetchOutcome, FeedError> {
    if let Some(age) = file_age(path).await {
        if age < max_age {
            debug!(
                path = %path.display(),
                age_secs = age.as_secs(),
                "Cached copy still fresh, skipping fetch"
            );
            return Ok(FetchOutcome::CacheFresh);
        }
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let response = client.get(url).timeout(timeout).send().await?;

    if !response.status().is_success() {
        return Err(FeedError::FetchFailed(format!(
            "HTTP {} from {}",
            response.status(),
            url
        )));
    }

    // Check Content-Length before downloading
    if let Some(content_length) = response.content_length() {
        if content_length > MAX_DOWNLOAD_SIZE {
            return Err(FeedError::FetchFailed(format!(
                "download too large: {} bytes (max {} bytes)",
                content_length, MAX_DOWNLOAD_SIZE
            )));
        }
    }

    let mut part_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    part_name.push(".part");
    let part_path = path.with_file_name(part_name);

    // Stream download with size limit
    let mut total_bytes: u64 = 0;
    let mut file = tokio::fs::File::create(&part_path).await?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        total_bytes += chunk.len() as u64;
        if total_bytes > MAX_DOWNLOAD_SIZE {
            drop(file);
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(FeedError::FetchFailed(format!(
                "download exceeded size limit at {} bytes (max {} bytes)",
                total_bytes, MAX_DOWNLOAD_SIZE
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&part_path, path).await?;

    info!(url, path = %path.display(), size_bytes = total_bytes, "Downloaded resource");
    Ok(FetchOutcome::Downloaded)
}
