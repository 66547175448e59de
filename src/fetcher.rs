// fforge (ffmpeg format conversion service)
// Copyright (C) 2025

use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use url::Url;

const MAX_REDIRECTS: usize = 5;

/// Per-fetch limits, enforced identically on every transfer.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub max_bytes: u64,
    pub timeout: Duration,
    pub verify_tls: bool,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("File is too large (limit: {limit_mb}MB).")]
    TooLarge { limit_mb: u64 },
    #[error("Failed to download. Server responded with HTTP code {code}.")]
    HttpStatus { code: u16 },
    #[error("Download timed out after {0} seconds.")]
    TimedOut(u64),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    BadSource(String),
}

impl FetchError {
    fn too_large(policy: &FetchPolicy) -> Self {
        FetchError::TooLarge {
            limit_mb: policy.max_bytes / 1024 / 1024,
        }
    }
}

/// Streams `url` to `dest` while enforcing the policy's byte ceiling (checked
/// against both the declared content length and the running total on every
/// chunk) and wall-clock timeout. On any failure the destination file is
/// removed; no partial download is ever left behind.
pub async fn fetch_to_path(url: &Url, dest: &Path, policy: &FetchPolicy) -> Result<u64, FetchError> {
    let result = match url.scheme() {
        "file" => copy_local(url, dest, policy).await,
        _ => match tokio::time::timeout(policy.timeout, stream_remote(url, dest, policy)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::TimedOut(policy.timeout.as_secs())),
        },
    };

    if result.is_err() && dest.exists() {
        let _ = tokio::fs::remove_file(dest).await;
    }

    result
}

async fn stream_remote(url: &Url, dest: &Path, policy: &FetchPolicy) -> Result<u64, FetchError> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(!policy.verify_tls)
        .build()?;

    let response = client.get(url.clone()).send().await?;

    let status = response.status().as_u16();
    if status >= 400 {
        return Err(FetchError::HttpStatus { code: status });
    }

    // Reject on the declared size before transferring anything.
    if let Some(declared) = response.content_length()
        && declared > policy.max_bytes
    {
        return Err(FetchError::too_large(policy));
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        downloaded += chunk.len() as u64;
        // The declared length can lie (or be absent); the running total is
        // the enforcement that actually matters.
        if downloaded > policy.max_bytes {
            return Err(FetchError::too_large(policy));
        }
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(downloaded)
}

async fn copy_local(url: &Url, dest: &Path, policy: &FetchPolicy) -> Result<u64, FetchError> {
    let source = url
        .to_file_path()
        .map_err(|_| FetchError::BadSource("file URL does not name a local path".to_string()))?;

    let metadata = tokio::fs::metadata(&source).await?;
    if !metadata.is_file() {
        return Err(FetchError::BadSource(format!(
            "Not a regular file: {}",
            source.display()
        )));
    }
    if metadata.len() > policy.max_bytes {
        return Err(FetchError::too_large(policy));
    }

    tokio::fs::copy(&source, dest).await?;
    Ok(metadata.len())
}
