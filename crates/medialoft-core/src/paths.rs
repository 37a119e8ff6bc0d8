//! Application path resolution.
//!
//! Resolution order for the data root:
//! 1. `MEDIALOFT_DATA_DIR` environment variable
//! 2. System data directory (e.g. `~/.local/share/medialoft`)
//!
//! The location store database lives in `<root>/data/medialoft.db`.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "MEDIALOFT_DATA_DIR";

/// Errors that can occur during path resolution and directory operations.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the system data directory.
    #[error("Cannot determine system data directory")]
    NoDataDir,

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },
}

/// Get the root directory for application data, creating it if needed.
pub fn data_root() -> Result<PathBuf, PathError> {
    let root = resolve_data_root(env::var_os(DATA_DIR_ENV), dirs::data_local_dir())?;
    ensure_dir(&root)?;
    Ok(root)
}

/// Get the path to the location store database file.
///
/// The `data/` subdirectory is created if it doesn't exist.
pub fn database_path() -> Result<PathBuf, PathError> {
    let data_dir = data_root()?.join("data");
    ensure_dir(&data_dir)?;
    Ok(data_dir.join("medialoft.db"))
}

fn resolve_data_root(
    override_dir: Option<OsString>,
    system_dir: Option<PathBuf>,
) -> Result<PathBuf, PathError> {
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    system_dir
        .map(|dir| dir.join("medialoft"))
        .ok_or(PathError::NoDataDir)
}

fn ensure_dir(path: &Path) -> Result<(), PathError> {
    fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
