//! Filesystem helpers for publishing generated media files.
//!
//! FFmpeg writes into a temporary sibling of the final path. The sibling is
//! renamed into place only after the process exits cleanly, so a reader never
//! observes a half-written clip under its final name.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Temporary sibling path for `dst`: `clip_1.mp4` -> `.clip_1.partial.mp4`.
///
/// The extension is kept so FFmpeg still picks the right muxer.
pub fn temp_sibling(dst: &Path) -> PathBuf {
    let stem = dst
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match dst.extension() {
        Some(ext) => format!(".{}.partial.{}", stem, ext.to_string_lossy()),
        None => format!(".{}.partial", stem),
    };
    dst.with_file_name(name)
}

/// Create the parent directory of `path` if it is missing.
pub async fn ensure_parent(path: &Path) -> MediaResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Remove `path`, ignoring a missing file.
pub async fn remove_if_exists(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// Tries a plain rename first and falls back to copy-and-delete on EXDEV.
/// An existing `dst` is replaced.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !src.exists() {
        return Err(MediaError::FileNotFound(src.to_path_buf()));
    }
    ensure_parent(dst).await?;

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// EXDEV is error code 18 on Linux/macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    // Copy next to dst so the final rename stays on one filesystem
    let staged = temp_sibling(dst);

    if let Err(e) = fs::copy(src, &staged).await {
        remove_if_exists(&staged).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&staged, dst).await {
        remove_if_exists(&staged).await;
        return Err(e.into());
    }

    // Source removal is best effort
    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove source after cross-device move: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_sibling_keeps_extension() {
        let tmp = temp_sibling(Path::new("/out/v1/clip_3.mp4"));
        assert_eq!(tmp, PathBuf::from("/out/v1/.clip_3.partial.mp4"));

        let tmp = temp_sibling(Path::new("thumb"));
        assert_eq!(tmp, PathBuf::from(".thumb.partial"));
    }

    #[tokio::test]
    async fn test_move_file_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join(".clip_1.partial.mp4");
        let dst = dir.path().join("v1").join("clip_1.mp4");

        fs::write(&src, b"clip bytes").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists(), "temporary file should be gone");
        assert_eq!(fs::read(&dst).await.unwrap(), b"clip bytes");
    }

    #[tokio::test]
    async fn test_move_file_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.jpg");
        let dst = dir.path().join("thumb_1.jpg");

        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_move_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = move_file(dir.path().join("nope"), dir.path().join("dst"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_if_exists_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        remove_if_exists(&dir.path().join("missing")).await;
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
