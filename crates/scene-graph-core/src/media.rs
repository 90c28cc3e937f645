//! Image intake boundary.
//!
//! Files are sniffed by content, not by name. Anything whose detected media
//! type is not `image/*` is rejected before it reaches the upload session.

use std::path::Path;
use std::sync::Arc;

use file_format::FileFormat;

use crate::error::{SceneGraphError, SceneGraphResult};

/// Whether a media type names an image.
pub fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .split(';')
        .next()
        .map(|essence| essence.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// An image file accepted at the intake boundary.
///
/// Cheap to clone; the bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    name: String,
    media_type: String,
    extension: String,
    bytes: Arc<[u8]>,
}

impl SelectedImage {
    /// Accept an in-memory file if its content is an image.
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> SceneGraphResult<Self> {
        let name = name.into();
        let bytes = bytes.into();

        if bytes.is_empty() {
            return Err(SceneGraphError::EmptyFile { name });
        }

        let format = FileFormat::from_bytes(&bytes);
        let media_type = format.media_type();
        if !is_image_media_type(media_type) {
            return Err(SceneGraphError::NotAnImage {
                name,
                media_type: media_type.to_string(),
            });
        }

        Ok(Self {
            name,
            media_type: media_type.to_string(),
            extension: format.extension().to_string(),
            bytes: bytes.into(),
        })
    }

    /// Read and accept a file from disk.
    pub fn from_path(path: &Path) -> SceneGraphResult<Self> {
        let bytes = std::fs::read(path).map_err(|source| SceneGraphError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        Self::from_bytes(name, bytes)
    }

    /// File name as given at intake.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Detected media type, e.g. `image/png`.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Canonical extension for the detected format, e.g. `png`.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the bytes.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// PNG signature plus an IHDR chunk header; enough for format sniffing.
    pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR\
        \x00\x00\x00\x01\x00\x00\x00\x01\x08\x02\x00\x00\x00\x90\x77\x53\xde";
}

#[cfg(test)]
mod tests {
    use super::fixtures::PNG_BYTES;
    use super::*;

    #[test]
    fn accepts_png_by_content() {
        let image = SelectedImage::from_bytes("photo.bin", PNG_BYTES.to_vec()).unwrap();
        assert_eq!(image.media_type(), "image/png");
        assert_eq!(image.extension(), "png");
        assert_eq!(image.name(), "photo.bin");
        assert_eq!(image.bytes(), PNG_BYTES);
    }

    #[test]
    fn rejects_non_images_even_with_image_names() {
        let err = SelectedImage::from_bytes("fake.png", b"just some text".to_vec()).unwrap_err();
        assert!(matches!(err, SceneGraphError::NotAnImage { name, .. } if name == "fake.png"));
    }

    #[test]
    fn rejects_empty_files() {
        let err = SelectedImage::from_bytes("empty.png", Vec::new()).unwrap_err();
        assert!(matches!(err, SceneGraphError::EmptyFile { .. }));
    }

    #[test]
    fn media_type_check_ignores_parameters_and_case() {
        assert!(is_image_media_type("image/png"));
        assert!(is_image_media_type("Image/JPEG; q=0.9"));
        assert!(!is_image_media_type("application/octet-stream"));
        assert!(!is_image_media_type(""));
    }
}
