//! Image file input
//!
//! Uploads are accepted only when their magic bytes identify an image; the
//! declared extension is ignored.

use agrivision_common::{Error, Result};
use std::path::Path;
use tracing::debug;

const NOT_AN_IMAGE: &str = "Please select an image file (JPEG, PNG, ...).";

/// Image selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// File name shown in the preview
    pub name: String,
    pub bytes: Vec<u8>,
    /// Detected MIME type, always `image/*`
    pub mime: &'static str,
}

impl ImageFile {
    /// Read and sniff a file from disk
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, bytes)
    }

    /// Wrap in-memory bytes, rejecting anything that is not an image
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let kind = infer::get(&bytes)
            .filter(|k| k.matcher_type() == infer::MatcherType::Image)
            .ok_or_else(|| Error::Validation(NOT_AN_IMAGE.to_string()))?;

        debug!(file = %name, mime = kind.mime_type(), size = bytes.len(), "Image accepted");

        Ok(Self {
            name,
            bytes,
            mime: kind.mime_type(),
        })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest byte sequence `infer` recognises as PNG
    pub(crate) fn png_bytes() -> Vec<u8> {
        vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D]
    }

    #[test]
    fn accepts_png() {
        let img = ImageFile::from_bytes("apple.png", png_bytes()).unwrap();
        assert_eq!(img.mime, "image/png");
        assert_eq!(img.len(), 12);
    }

    #[test]
    fn accepts_jpeg_regardless_of_name() {
        let img = ImageFile::from_bytes("photo.bin", vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]).unwrap();
        assert_eq!(img.mime, "image/jpeg");
    }

    #[test]
    fn rejects_text() {
        let err = ImageFile::from_bytes("notes.png", b"hello world".to_vec()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn rejects_pdf() {
        assert!(ImageFile::from_bytes("doc.pdf", b"%PDF-1.7\n".to_vec()).is_err());
    }

    #[tokio::test]
    async fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pear.png");
        std::fs::write(&path, png_bytes()).unwrap();

        let img = ImageFile::load(&path).await.unwrap();
        assert_eq!(img.name, "pear.png");
        assert_eq!(img.bytes, png_bytes());
    }

    #[tokio::test]
    async fn load_missing_file_is_io_error() {
        let err = ImageFile::load(Path::new("/nonexistent/agrivision.png")).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
