//! Transcription cache keyed by content fingerprint. Grounded in homeflix's
//! `sha2`/`hex` usage for content hashing; the atomic-write contract reuses
//! `fsutil::atomic_write`, the same pattern the component manager uses for
//! `installed.json`.

use crate::error::{Result, SubgenError};
use crate::project::Segment;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Bumped whenever the on-disk `CacheEntry` shape changes incompatibly.
/// Readers reject anything newer than this with `IncompatibleCache`.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub schema_version: u32,
    pub fingerprint: String,
    pub source_lang: Option<String>,
    pub segments: Vec<Segment>,
}

/// Compute the cache fingerprint from (audio content hash, recognizer
/// provider id, recognizer model id, forced language). Order and separator
/// choice are arbitrary but must stay stable across releases since the
/// fingerprint is persisted on disk as a cache key.
pub fn fingerprint(
    audio_hash: &str,
    provider_id: &str,
    model_id: &str,
    forced_language: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(audio_hash.as_bytes());
    hasher.update(b"\0");
    hasher.update(provider_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(model_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(forced_language.unwrap_or("").as_bytes());
    hex::encode(hasher.finalize())
}

/// SHA-256 of a file's bytes, used as the "audio content hash" input to
/// `fingerprint`.
pub fn hash_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Cache Store. One JSON file per video, at `<video>.subgen-cache.json`.
pub struct CacheStore;

impl CacheStore {
    fn cache_path(video_path: &Path) -> PathBuf {
        let mut name = video_path.as_os_str().to_os_string();
        name.push(".subgen-cache.json");
        PathBuf::from(name)
    }

    /// Look up a cache entry for `video_path`, validating that it matches
    /// `expected_fingerprint`. Entries are write-once: a mismatched
    /// fingerprint simply misses (stale file from a prior configuration),
    /// it does not error.
    pub fn get(video_path: &Path, expected_fingerprint: &str) -> Result<Option<CacheEntry>> {
        let path = Self::cache_path(video_path);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)?;
        let entry: CacheEntry = serde_json::from_str(&contents)?;

        if entry.schema_version > CACHE_SCHEMA_VERSION {
            return Err(SubgenError::IncompatibleCache {
                found: entry.schema_version,
                expected: CACHE_SCHEMA_VERSION,
            });
        }

        if entry.fingerprint != expected_fingerprint {
            return Ok(None);
        }

        Ok(Some(entry))
    }

    /// Write-once: called only after a fresh transcription succeeds.
    /// `--force-transcribe` is the only documented way to invalidate an
    /// entry, by bypassing `get` entirely rather than deleting the file.
    pub fn put(
        video_path: &Path,
        fingerprint: String,
        source_lang: Option<String>,
        segments: Vec<Segment>,
    ) -> Result<()> {
        let entry = CacheEntry {
            schema_version: CACHE_SCHEMA_VERSION,
            fingerprint,
            source_lang,
            segments,
        };
        let path = Self::cache_path(video_path);
        let json = serde_json::to_string_pretty(&entry)?;
        crate::fsutil::atomic_write(&path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint("hash1", "cloud", "base", Some("en"));
        let b = fingerprint("hash1", "cloud", "base", Some("en"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_differs_on_language() {
        let a = fingerprint("hash1", "cloud", "base", Some("en"));
        let b = fingerprint("hash1", "cloud", "base", Some("es"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_cache_miss_when_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        let result = CacheStore::get(&video, "anything").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_cache_put_then_get_same_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        let fp = fingerprint("hash1", "cloud", "base", Some("es"));
        CacheStore::put(&video, fp.clone(), Some("es".to_string()), vec![]).unwrap();

        let entry = CacheStore::get(&video, &fp).unwrap().unwrap();
        assert_eq!(entry.source_lang.as_deref(), Some("es"));
    }

    #[test]
    fn test_cache_miss_on_fingerprint_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        let fp = fingerprint("hash1", "cloud", "base", Some("es"));
        CacheStore::put(&video, fp, Some("es".to_string()), vec![]).unwrap();

        let other_fp = fingerprint("hash2", "cloud", "base", Some("es"));
        assert!(CacheStore::get(&video, &other_fp).unwrap().is_none());
    }

    #[test]
    fn test_future_schema_version_is_incompatible_error() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        let path = CacheStore::cache_path(&video);
        let entry = CacheEntry {
            schema_version: CACHE_SCHEMA_VERSION + 1,
            fingerprint: "fp".to_string(),
            source_lang: None,
            segments: vec![],
        };
        crate::fsutil::atomic_write(&path, serde_json::to_string(&entry).unwrap().as_bytes())
            .unwrap();

        let err = CacheStore::get(&video, "fp").unwrap_err();
        assert!(matches!(err, SubgenError::IncompatibleCache { .. }));
    }
}
