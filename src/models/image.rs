//! Raw image input model.

use std::path::Path;
use std::sync::Arc;

/// An image supplied by the caller, held only for the duration of one run.
///
/// The bytes are shared so handing the image to a blocking decoder does not
/// copy the buffer.
#[derive(Debug, Clone)]
pub struct RawImage {
    name: String,
    mime_type: String,
    data: Arc<[u8]>,
}

impl RawImage {
    /// Create an image from in-memory bytes and a declared MIME type.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Read an image file, guessing the declared MIME type from its extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let data = tokio::fs::read(path).await?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(name, mime_type, data))
    }

    /// Display name (usually the file name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME type as declared by whoever supplied the image.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size of the encoded image in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_path_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calendar.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let image = RawImage::from_path(&path).await.unwrap();
        assert_eq!(image.name(), "calendar.png");
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.size(), 16);
    }

    #[tokio::test]
    async fn test_from_path_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture");
        std::fs::write(&path, [0u8; 4]).unwrap();

        let image = RawImage::from_path(&path).await.unwrap();
        assert_eq!(image.mime_type(), "application/octet-stream");
    }
}
