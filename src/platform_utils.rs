// ============================================================================
// File: packages/rerobots/src/platform_utils.rs
// ----------------------------------------------------------------------------
// Cross-platform utilities for writing secret files
// ============================================================================

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Restrict a file to its owner
///
/// On Unix systems, sets mode to 0o600 (rw-------), as ssh requires for
/// private keys. Elsewhere this is a no-op.
#[cfg(unix)]
pub fn restrict_to_owner(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
pub fn restrict_to_owner(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Open `path` for writing, created owner-only where the platform allows
#[cfg(unix)]
fn create_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}

/// Write `contents` to `path` and restrict it to the owner
///
/// A new file never exists with wider permissions. An existing file is
/// narrowed before it is rewritten.
pub fn write_secret(path: &Path, contents: &str) -> io::Result<()> {
    if path.exists() {
        restrict_to_owner(path)?;
    }
    let mut file = create_private(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}
