//! Small filesystem helpers shared by the cache store and the component
//! manager's state file, both of which need atomic, corruption-resistant
//! writes to JSON files that other processes may read concurrently.

use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Write `contents` to `path` atomically: write to a sibling temp file in
/// the same directory (so the final rename is same-filesystem), flush, then
/// rename over the destination. A reader never observes a partial file.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Same as `atomic_write`, but the temp file is created with owner-only
/// (`0600`) permissions from the moment it's opened, so the data is never
/// briefly world-readable between write and a later chmod. Used for
/// `config.yaml` and `credentials.json`.
#[cfg(unix)]
pub fn atomic_write_owner_only(path: &Path, contents: &[u8]) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .permissions(std::fs::Permissions::from_mode(0o600))
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn atomic_write_owner_only(path: &Path, contents: &[u8]) -> Result<()> {
    atomic_write(path, contents)
}

/// Set owner-only (`0600`) permissions on a file just written. Used for
/// `config.yaml` and `credentials.json`, which must never be group/world
/// readable.
#[cfg(unix)]
pub fn restrict_to_owner(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(0o600);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn restrict_to_owner(_path: &Path) -> Result<()> {
    Ok(())
}
