//! Product image uploads.
//!
//! Images are checked twice: the declared content type must be an accepted
//! format, and the leading bytes must match that format.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use nature_de_pierre_core::ProductId;

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image is empty")]
    Empty,

    #[error("image is {size} bytes, the limit is {max}", max = MAX_IMAGE_BYTES)]
    TooLarge { size: usize },

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    /// The bytes do not look like the declared format.
    #[error("file content does not match {0}")]
    ContentMismatch(&'static str),

    #[error("could not store image: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Whether `bytes` start with this format's signature.
    #[must_use]
    pub fn matches(self, bytes: &[u8]) -> bool {
        match self {
            Self::Png => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
            Self::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
            Self::Webp => bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()),
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// Validate an uploaded image and return its format.
///
/// # Errors
///
/// Returns `Empty`, `TooLarge`, `UnsupportedType` or `ContentMismatch`.
pub fn check_image(content_type: Option<&str>, bytes: &[u8]) -> Result<ImageFormat, UploadError> {
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(UploadError::TooLarge { size: bytes.len() });
    }
    let declared = content_type.unwrap_or("application/octet-stream");
    let format = ImageFormat::from_content_type(declared)
        .ok_or_else(|| UploadError::UnsupportedType(declared.to_owned()))?;
    if !format.matches(bytes) {
        return Err(UploadError::ContentMismatch(format.mime()));
    }
    Ok(format)
}

/// Write a product image under `dir` and return its file name.
///
/// Every upload gets a fresh name so cached copies of a previous image are
/// never served for the new one.
///
/// # Errors
///
/// Returns `UploadError::Io` if the directory or file cannot be written.
pub async fn store_product_image(
    dir: &Path,
    product_id: ProductId,
    format: ImageFormat,
    bytes: &[u8],
) -> Result<String, UploadError> {
    tokio::fs::create_dir_all(dir).await?;

    let file_name = format!(
        "product-{product_id}-{}.{}",
        uuid::Uuid::new_v4().simple(),
        format.extension()
    );
    let path = dir.join(&file_name);
    let partial: PathBuf = dir.join(format!(".{file_name}.part"));

    tokio::fs::write(&partial, bytes).await?;
    tokio::fs::rename(&partial, &path).await?;

    info!(product_id = %product_id, file = %file_name, size = bytes.len(), "Stored product image");
    Ok(file_name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const WEBP: &[u8] = b"RIFF\x24\0\0\0WEBPVP8 ";

    #[test]
    fn test_accepts_matching_formats() {
        assert_eq!(check_image(Some("image/png"), PNG).unwrap(), ImageFormat::Png);
        assert_eq!(check_image(Some("image/webp"), WEBP).unwrap(), ImageFormat::Webp);
        assert_eq!(
            check_image(Some("image/jpeg; charset=binary"), &[0xFF, 0xD8, 0xFF, 0xE0]).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_rejects_unsupported_type() {
        assert!(matches!(
            check_image(Some("image/gif"), b"GIF89a"),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            check_image(None, PNG),
            Err(UploadError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_rejects_mismatched_content() {
        assert!(matches!(
            check_image(Some("image/png"), b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
            Err(UploadError::ContentMismatch("image/png"))
        ));
    }

    #[test]
    fn test_size_limits() {
        assert!(matches!(check_image(Some("image/png"), b""), Err(UploadError::Empty)));

        let mut big = PNG.to_vec();
        big.resize(MAX_IMAGE_BYTES + 1, 0);
        assert!(matches!(
            check_image(Some("image/png"), &big),
            Err(UploadError::TooLarge { .. })
        ));

        big.truncate(MAX_IMAGE_BYTES);
        assert!(check_image(Some("image/png"), &big).is_ok());
    }

    #[tokio::test]
    async fn test_store_product_image() {
        let dir = std::env::temp_dir().join(format!("ndp-uploads-{}", uuid::Uuid::new_v4()));
        let name = store_product_image(&dir, ProductId::new(12), ImageFormat::Png, PNG)
            .await
            .unwrap();

        assert!(name.starts_with("product-12-"));
        assert!(name.ends_with(".png"));
        assert_eq!(tokio::fs::read(dir.join(&name)).await.unwrap(), PNG);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
