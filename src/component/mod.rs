//! Component Manager: on-demand download, verification, install, and
//! lookup of native binaries and model files. The teacher has no
//! equivalent module; this one is grounded in the teacher's async HTTP
//! style (`transcribe/whisper.rs`, `transcribe/gemini.rs`) plus homeflix's
//! `sha2`/`hex` checksum conventions, composed with the pack's `zip` and
//! `fd-lock` crates for the parts neither example repo covers directly.

pub mod archive;
pub mod download;
pub mod platform;
pub mod registry;
pub mod state;

use crate::config::Config;
use crate::error::{Result, SubgenError};
use platform::PlatformKey;
use registry::{ComponentDescriptor, Registry};
use state::{InstalledRecord, InstalledState, StateLock};
use std::path::{Path, PathBuf};

/// Progress callback shape shared with the pipeline: cumulative
/// `(bytes_downloaded, total_bytes)`, never per-chunk deltas.
pub type DownloadProgress = std::sync::Arc<dyn Fn(u64, u64) + Send + Sync>;

pub struct ComponentManager {
    data_root: PathBuf,
    registry: Registry,
    client: reqwest::Client,
}

impl ComponentManager {
    pub fn new(registry: Registry) -> Self {
        Self {
            data_root: Config::data_root(),
            registry,
            client: reqwest::Client::new(),
        }
    }

    fn installed_json_path(&self) -> PathBuf {
        self.data_root.join("installed.json")
    }

    fn assert_inside_data_root(&self, path: &Path) -> Result<()> {
        let canonical_root = self
            .data_root
            .canonicalize()
            .unwrap_or_else(|_| self.data_root.clone());
        let canonical_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if !canonical_path.starts_with(&canonical_root) {
            return Err(SubgenError::UnsafeArchive {
                entry: path.display().to_string(),
            });
        }
        Ok(())
    }

    pub fn list_available(&self) -> &[ComponentDescriptor] {
        &self.registry.components
    }

    pub fn list_installed(&self) -> Result<InstalledState> {
        let mut lock = StateLock::acquire(&self.installed_json_path())?;
        lock.load()
    }

    pub fn is_installed(&self, id: &str) -> Result<bool> {
        Ok(self.list_installed()?.components.contains_key(id))
    }

    pub fn get_path(&self, id: &str) -> Result<PathBuf> {
        let state = self.list_installed()?;
        state
            .components
            .get(id)
            .map(|r| r.absolute_path.clone())
            .ok_or_else(|| SubgenError::MissingComponent { id: id.to_string() })
    }

    /// Download, verify, extract (if the asset is an archive), and record a
    /// component. `progress` receives cumulative bytes downloaded.
    pub async fn install(&self, id: &str, progress: Option<DownloadProgress>) -> Result<PathBuf> {
        let descriptor = self
            .registry
            .find(id)
            .ok_or_else(|| SubgenError::MissingComponent { id: id.to_string() })?
            .clone();

        let platform = PlatformKey::current()?;
        let url = descriptor
            .url_for(platform)
            .ok_or_else(|| SubgenError::MissingComponent { id: id.to_string() })?;
        let expected_checksum = descriptor.checksum_for(platform);

        // The registry's checksum is a static property of the descriptor, so
        // a missing one is detectable before any network I/O: no bytes are
        // ever written under the data root for a component with no
        // published checksum to verify against.
        if expected_checksum.is_none() {
            return Err(SubgenError::MissingIntegrity {
                id: id.to_string(),
                reason: "no checksum published for this platform".to_string(),
            });
        }

        let scratch_dir = self.data_root.join("tmp");
        let (tmp_path, actual_checksum) =
            download::download_to_temp(&self.client, url, &scratch_dir).await?;
        if let Some(cb) = &progress {
            cb(1, 1);
        }

        if let Err(e) = download::verify_checksum(id, expected_checksum, &actual_checksum) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }

        let install_path = self.data_root.join(&descriptor.install_path);
        self.assert_inside_data_root(&self.data_root)?;

        let size_bytes = match self.place_installed_asset(url, &tmp_path, &install_path) {
            Ok(size) => size,
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                return Err(e);
            }
        };
        let _ = std::fs::remove_file(&tmp_path);

        let mut lock = StateLock::acquire(&self.installed_json_path())?;
        lock.with_locked(|state| {
            state.components.insert(
                id.to_string(),
                InstalledRecord {
                    version: descriptor.version.clone(),
                    absolute_path: install_path.clone(),
                    installed_at: chrono::Utc::now(),
                    size_bytes,
                },
            );
            Ok(())
        })?;

        Ok(install_path)
    }

    /// Extracts a zip asset into `install_path`, or moves a bare-binary
    /// asset into place. Returns the total installed size in bytes.
    fn place_installed_asset(&self, url: &str, tmp_path: &Path, install_path: &Path) -> Result<u64> {
        if url.ends_with(".zip") {
            let written = archive::extract_zip(tmp_path, install_path)?;
            Ok(written.iter().filter_map(|p| std::fs::metadata(p).ok()).map(|m| m.len()).sum())
        } else {
            if let Some(parent) = install_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::rename(tmp_path, install_path)?;
            Ok(std::fs::metadata(install_path)?.len())
        }
    }

    pub fn uninstall(&self, id: &str) -> Result<()> {
        let mut lock = StateLock::acquire(&self.installed_json_path())?;
        lock.with_locked(|state| {
            let record = state
                .components
                .get(id)
                .ok_or_else(|| SubgenError::MissingComponent { id: id.to_string() })?
                .clone();

            self.assert_inside_data_root(&record.absolute_path)?;

            if record.absolute_path.is_dir() {
                std::fs::remove_dir_all(&record.absolute_path)?;
            } else if record.absolute_path.exists() {
                std::fs::remove_file(&record.absolute_path)?;
            }

            state.components.remove(id);
            Ok(())
        })
    }

    pub async fn update(&self, id: &str) -> Result<PathBuf> {
        if self.is_installed(id)? {
            self.uninstall(id)?;
        }
        self.install(id, None).await
    }

    pub fn find_ffmpeg(&self) -> Result<PathBuf> {
        if let Ok(path) = which_in_path("ffmpeg") {
            return Ok(path);
        }
        self.get_path("ffmpeg")
    }

    pub fn find_whisper_engine(&self) -> Result<PathBuf> {
        self.get_path("whisper-engine")
    }

    pub fn find_whisper_model(&self, name: &str) -> Result<PathBuf> {
        self.get_path(&format!("whisper-model-{name}"))
    }
}

fn which_in_path(bin: &str) -> Result<PathBuf> {
    let path_var = std::env::var_os("PATH").ok_or_else(|| SubgenError::FileNotFound(bin.to_string()))?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(bin);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(SubgenError::FileNotFound(bin.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry::ComponentKind;
    use std::collections::HashMap;

    fn manager_in(dir: &Path) -> ComponentManager {
        ComponentManager {
            data_root: dir.to_path_buf(),
            registry: Registry::default(),
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn test_get_path_missing_component() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let err = manager.get_path("whisper-base").unwrap_err();
        assert!(matches!(err, SubgenError::MissingComponent { .. }));
    }

    #[test]
    fn test_uninstall_path_outside_data_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        let mut lock = StateLock::acquire(&manager.installed_json_path()).unwrap();
        let mut state = InstalledState::default();
        state.components.insert(
            "evil".to_string(),
            InstalledRecord {
                version: "1.0".to_string(),
                absolute_path: PathBuf::from("/etc/passwd"),
                installed_at: chrono::Utc::now(),
                size_bytes: 0,
            },
        );
        lock.save(&state).unwrap();

        let err = manager.uninstall("evil").unwrap_err();
        assert!(matches!(err, SubgenError::UnsafeArchive { .. }));
    }

    #[tokio::test]
    async fn test_install_rejects_missing_checksum_before_writing_any_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());
        let platform = PlatformKey::current().unwrap();

        let mut urls = HashMap::new();
        urls.insert(platform, "http://127.0.0.1:1/unreachable/component.bin".to_string());
        let descriptor = ComponentDescriptor {
            id: "ffmpeg".to_string(),
            kind: ComponentKind::Tool,
            version: "1.0".to_string(),
            urls,
            sha256: HashMap::new(),
            install_path: "bin/ffmpeg".to_string(),
            executable_name: Some("ffmpeg".to_string()),
        };
        let manager = ComponentManager {
            registry: Registry { components: vec![descriptor] },
            ..manager
        };

        let err = manager.install("ffmpeg", None).await.unwrap_err();
        assert!(matches!(err, SubgenError::MissingIntegrity { .. }));

        // No network call was ever made: the data root stays untouched.
        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        assert!(entries.next().is_none());
    }

    #[test]
    fn test_registry_descriptor_roundtrip() {
        let desc = ComponentDescriptor {
            id: "ffmpeg".to_string(),
            kind: ComponentKind::Tool,
            version: "6.0".to_string(),
            urls: HashMap::new(),
            sha256: HashMap::new(),
            install_path: "bin/ffmpeg".to_string(),
            executable_name: Some("ffmpeg".to_string()),
        };
        let registry = Registry {
            components: vec![desc],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("components.json");
        registry.save(&path).unwrap();
        let loaded = Registry::load(&path).unwrap();
        assert_eq!(loaded.components.len(), 1);
    }
}
