//! On-disk artifact cleanup.

use std::io;
use std::path::Path;

/// Remove a downloaded artifact, whether a single file or a directory bundle.
///
/// A path that does not exist counts as removed.
pub async fn remove_artifact(path: &Path) -> io::Result<()> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_removes_file() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("partial.ts");
        std::fs::write(&file, b"data").unwrap();

        remove_artifact(&file).await.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_removes_bundle_recursively() {
        let temp = tempfile::tempdir().unwrap();
        let bundle = temp.path().join("a.movpkg");
        std::fs::create_dir_all(bundle.join("segments")).unwrap();
        std::fs::write(bundle.join("segments").join("0.ts"), b"data").unwrap();

        remove_artifact(&bundle).await.unwrap();
        assert!(!bundle.exists());
    }

    #[tokio::test]
    async fn test_missing_path_is_ok() {
        let temp = tempfile::tempdir().unwrap();
        remove_artifact(&temp.path().join("never-written")).await.unwrap();
    }
}
