//! Uploaded pictures (profile pictures and review photos).
//!
//! Files are sniffed by their leading bytes rather than trusting the
//! browser's content type, then written under
//! `{media_dir}/{folder}/YYYY/MM/DD/{uuid}.{ext}`. The stored path is
//! relative to the media directory and served under `/media`.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Errors that can occur while accepting an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The file field was present but empty.
    #[error("the uploaded file is empty")]
    Empty,

    /// Larger than [`MAX_UPLOAD_BYTES`].
    #[error("the uploaded file is larger than {max} bytes")]
    TooLarge { max: usize },

    /// Not a JPEG, PNG, WebP or GIF image.
    #[error("unsupported file type; use JPEG, PNG, WebP or GIF")]
    UnsupportedType,

    /// Writing to disk failed.
    #[error("could not store the file: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Gif,
}

impl ImageKind {
    /// Identify an image from its magic bytes.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'G', b'I', b'F', b'8', ..] => Some(Self::Gif),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            _ => None,
        }
    }

    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }
}

/// Check an upload and pick its extension.
///
/// # Errors
///
/// Returns `UploadError::Empty`, `UploadError::TooLarge` or
/// `UploadError::UnsupportedType`.
pub fn validate_image(bytes: &[u8]) -> Result<ImageKind, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            max: MAX_UPLOAD_BYTES,
        });
    }
    ImageKind::sniff(bytes).ok_or(UploadError::UnsupportedType)
}

/// Relative path for a new upload.
fn relative_path(folder: &str, day: NaiveDate, kind: ImageKind) -> PathBuf {
    Path::new(folder)
        .join(format!("{:04}", day.year()))
        .join(format!("{:02}", day.month()))
        .join(format!("{:02}", day.day()))
        .join(format!("{}.{}", Uuid::new_v4(), kind.extension()))
}

/// Writes validated uploads below the media directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Store files below `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Validate and save an image into `folder`, dated `day`.
    ///
    /// Returns the path relative to the media root, with `/` separators.
    ///
    /// # Errors
    ///
    /// Returns an `UploadError` if the file is rejected or cannot be written.
    pub async fn save_image(
        &self,
        folder: &str,
        day: NaiveDate,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        let kind = validate_image(bytes)?;
        let relative = relative_path(folder, day, kind);
        let absolute = self.root.join(&relative);

        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&absolute, bytes).await?;

        tracing::debug!(path = %absolute.display(), size = bytes.len(), "Upload stored");

        Ok(relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }

    /// Delete files previously returned by [`MediaStore::save_image`].
    ///
    /// Paths that leave the media root are ignored. Failures are logged,
    /// since an orphaned file is harmless.
    pub async fn discard(&self, paths: &[String]) {
        for relative in paths {
            let path = Path::new(relative);
            if !path
                .components()
                .all(|c| matches!(c, std::path::Component::Normal(_)))
            {
                tracing::warn!(path = %relative, "Refusing to delete media outside the root");
                continue;
            }
            if let Err(e) = tokio::fs::remove_file(self.root.join(path)).await {
                tracing::warn!(error = %e, path = %relative, "Could not delete upload");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn test_sniff_known_formats() {
        assert_eq!(ImageKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::sniff(PNG_HEADER), Some(ImageKind::Png));
        assert_eq!(ImageKind::sniff(b"GIF89a..."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::sniff(b"RIFF\x10\x00\x00\x00WEBPVP8 "), Some(ImageKind::Webp));
    }

    #[test]
    fn test_rejects_other_content() {
        assert!(matches!(
            validate_image(b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(validate_image(b""), Err(UploadError::Empty)));
        assert!(matches!(
            validate_image(b"RIFF\x10\x00\x00\x00WAVEfmt "),
            Err(UploadError::UnsupportedType)
        ));
    }

    #[test]
    fn test_rejects_oversized() {
        let mut big = vec![0xFF, 0xD8, 0xFF];
        big.resize(MAX_UPLOAD_BYTES + 1, 0);
        assert!(matches!(
            validate_image(&big),
            Err(UploadError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_relative_path_is_dated() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let path = relative_path("reviews", day, ImageKind::Png);
        let text = path.to_string_lossy().replace('\\', "/");
        assert!(text.starts_with("reviews/2024/03/07/"));
        assert!(text.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_save_image_writes_file() {
        let root = std::env::temp_dir().join(format!("tsitsi-media-{}", Uuid::new_v4()));
        let store = MediaStore::new(&root);
        let day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

        let stored = store.save_image("profiles", day, PNG_HEADER).await.unwrap();
        assert!(stored.starts_with("profiles/2024/12/31/"));
        let written = tokio::fs::read(root.join(&stored)).await.unwrap();
        assert_eq!(written, PNG_HEADER);

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_discard_removes_unused_uploads() {
        let root = std::env::temp_dir().join(format!("tsitsi-media-{}", Uuid::new_v4()));
        let store = MediaStore::new(&root);
        let day = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        let kept = store.save_image("reviews", day, PNG_HEADER).await.unwrap();
        let extra = store.save_image("reviews", day, PNG_HEADER).await.unwrap();
        store.discard(std::slice::from_ref(&extra)).await;

        assert!(root.join(&kept).exists());
        assert!(!root.join(&extra).exists());

        // Escaping paths are left alone.
        let outside = std::env::temp_dir().join(format!("tsitsi-outside-{}", Uuid::new_v4()));
        tokio::fs::write(&outside, b"keep").await.unwrap();
        store
            .discard(&[format!("../{}", outside.file_name().unwrap().to_string_lossy())])
            .await;
        assert!(outside.exists());

        tokio::fs::remove_file(&outside).await.unwrap();
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
