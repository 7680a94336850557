//! Streamed component download with SHA-256 verification. Grounded in the
//! teacher's `reqwest`-based async I/O style (`transcribe/whisper.rs`'s
//! multipart uploads use the same client-building pattern) and homeflix's
//! `sha2`/`hex` for checksum verification, the closest pack precedent for
//! content hashing.

use crate::error::{Result, SubgenError};
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

const MAX_RESUME_ATTEMPTS: u32 = 5;

/// Stream `url` to a unique temp file under `dest_dir` (never a shared fixed
/// name, so concurrent installs of different components cannot collide),
/// returning the temp file's path and its SHA-256 hex digest.
///
/// If the connection drops partway through, retries by reopening the same
/// `.part` file and issuing a `Range: bytes=<len>-` request, so an
/// interrupted download of a large component resumes instead of restarting
/// from zero. The hasher is rebuilt from the bytes already on disk before
/// each resume so the final digest always covers the whole file.
pub async fn download_to_temp(
    client: &reqwest::Client,
    url: &str,
    dest_dir: &Path,
) -> Result<(PathBuf, String)> {
    std::fs::create_dir_all(dest_dir)?;
    let tmp_path = dest_dir.join(format!("{}.part", uuid::Uuid::new_v4()));

    let mut attempt = 0;
    loop {
        match download_once(client, url, &tmp_path).await {
            Ok(digest) => return Ok((tmp_path, digest)),
            Err(e) if attempt < MAX_RESUME_ATTEMPTS => {
                attempt += 1;
                tracing::warn!(
                    "download of {url} interrupted ({e}), resuming (attempt {attempt}/{MAX_RESUME_ATTEMPTS})"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// One download pass, resuming from whatever is already on disk at
/// `tmp_path`. Returns the SHA-256 of the complete file on success.
async fn download_once(client: &reqwest::Client, url: &str, tmp_path: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let existing_len = match tokio::fs::metadata(tmp_path).await {
        Ok(meta) => meta.len(),
        Err(_) => 0,
    };
    if existing_len > 0 {
        let existing = tokio::fs::read(tmp_path).await?;
        hasher.update(&existing);
    }

    let mut request = client.get(url);
    if existing_len > 0 {
        request = request.header("Range", format!("bytes={existing_len}-"));
    }

    let response = request
        .send()
        .await?
        .error_for_status()
        .map_err(|e| SubgenError::Api(format!("download failed for {url}: {e}")))?;

    let resumed = existing_len > 0 && response.status() == reqwest::StatusCode::PARTIAL_CONTENT;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(!resumed)
        .open(tmp_path)
        .await?;
    if resumed {
        file.seek(std::io::SeekFrom::Start(existing_len)).await?;
    } else if existing_len > 0 {
        // Server ignored the Range request; restart the hash from scratch.
        hasher = Sha256::new();
    }

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(hex::encode(hasher.finalize()))
}

/// Verify a downloaded file's checksum against the registry entry. An empty
/// `expected` is the "missing-integrity" condition, not a pass-through.
pub fn verify_checksum(id: &str, expected: Option<&str>, actual: &str) -> Result<()> {
    match expected {
        None | Some("") => Err(SubgenError::MissingIntegrity {
            id: id.to_string(),
            reason: "no checksum published for this platform".to_string(),
        }),
        Some(expected) if expected.eq_ignore_ascii_case(actual) => Ok(()),
        Some(expected) => Err(SubgenError::MissingIntegrity {
            id: id.to_string(),
            reason: format!("checksum mismatch: expected {expected}, got {actual}"),
        }),
    }
}
