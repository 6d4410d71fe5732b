//! Remote video download: streamed GET saved verbatim into the workspace.

use std::path::Path;

use dispatch_core::{DispatchError, Result};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Extension used when the URL path has none.
pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

/// Extension of the last URL path segment (query and fragment ignored), or `mp4`.
pub fn url_extension(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            let segment = u.path_segments()?.next_back()?.to_string();
            Path::new(&segment)
                .extension()
                .and_then(|e| e.to_str())
                .filter(|e| !e.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_VIDEO_EXTENSION.to_string())
}

/// Streams `url` into `dest`, returning the byte count. A partially written file is removed on error.
/// Only http and https URLs are fetched.
#[instrument(skip(client))]
pub async fn download_to(client: &Client, url: &str, dest: &Path) -> Result<u64> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| DispatchError::InvalidInput(format!("Invalid video URL {:?}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DispatchError::InvalidInput(format!(
            "Unsupported URL scheme {:?}",
            parsed.scheme()
        )));
    }
    let result = stream_body(client, url, dest).await;
    if result.is_err() && dest.exists() {
        let _ = tokio::fs::remove_file(dest).await;
    }
    result
}

async fn stream_body(client: &Client, url: &str, dest: &Path) -> Result<u64> {
    let mut response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| DispatchError::Http(e.to_string()))?;

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| DispatchError::Http(e.to_string()))?
    {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    debug!(bytes = written, dest = %dest.display(), "Download finished");
    Ok(written)
}
