//! Upload contract checks for calendar images.
//!
//! The dashboard accepts JPEG, PNG and WebP files up to 10 MB. The declared
//! type is cross-checked against the magic bytes so a mislabeled upload is
//! rejected before it reaches the decoder.

use thiserror::Error;

use crate::models::RawImage;

/// MIME types accepted for calendar images.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Largest accepted image, in bytes.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("{name}: unsupported image type {mime} (expected jpeg, png or webp)")]
    UnsupportedType { name: String, mime: String },

    #[error("{name}: declared as {declared} but content is {detected}")]
    ContentMismatch {
        name: String,
        declared: String,
        detected: String,
    },

    #[error("{name}: {size} bytes exceeds the 10 MB limit")]
    TooLarge { name: String, size: usize },
}

/// Normalize a MIME type for comparison (strip parameters, lowercase, fix aliases).
pub fn normalize_mime(mime: &str) -> String {
    let essence = mime.split(';').next().unwrap_or(mime).trim().to_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    }
}

/// Detect the MIME type from file content.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|t| t.mime_type())
}

fn is_allowed(mime: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&mime)
}

fn is_generic(mime: &str) -> bool {
    mime.is_empty() || mime == "application/octet-stream" || mime == "binary/octet-stream"
}

/// Check an image against the upload contract.
pub fn validate_image(image: &RawImage) -> Result<(), InputError> {
    let declared = normalize_mime(image.mime_type());
    let detected = sniff_mime(image.bytes());

    // Generic declarations defer to the content
    let effective = match detected {
        Some(d) if is_generic(&declared) => d.to_string(),
        _ => declared.clone(),
    };

    if !is_allowed(&effective) {
        return Err(InputError::UnsupportedType {
            name: image.name().to_string(),
            mime: effective,
        });
    }

    if let Some(detected) = detected {
        if !is_allowed(detected) {
            return Err(InputError::ContentMismatch {
                name: image.name().to_string(),
                declared,
                detected: detected.to_string(),
            });
        }
    }

    if image.size() > MAX_IMAGE_BYTES {
        return Err(InputError::TooLarge {
            name: image.name().to_string(),
            size: image.size(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const PDF_MAGIC: &[u8] = b"%PDF-1.7\n";

    #[test]
    fn test_normalize_mime() {
        assert_eq!(normalize_mime("Image/JPG"), "image/jpeg");
        assert_eq!(normalize_mime("image/png; charset=binary"), "image/png");
    }

    #[test]
    fn test_accepts_declared_png() {
        let image = RawImage::new("a.png", "image/png", PNG_MAGIC.to_vec());
        assert!(validate_image(&image).is_ok());
    }

    #[test]
    fn test_generic_declaration_uses_content() {
        let image = RawImage::new("a", "application/octet-stream", PNG_MAGIC.to_vec());
        assert!(validate_image(&image).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_declared_type() {
        let image = RawImage::new("a.gif", "image/gif", b"GIF89a".to_vec());
        assert!(matches!(
            validate_image(&image),
            Err(InputError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_rejects_mislabeled_content() {
        let image = RawImage::new("a.png", "image/png", PDF_MAGIC.to_vec());
        assert!(matches!(
            validate_image(&image),
            Err(InputError::ContentMismatch { ref detected, .. }) if detected == "application/pdf"
        ));
    }

    #[test]
    fn test_rejects_oversized_image() {
        let mut data = PNG_MAGIC.to_vec();
        data.resize(MAX_IMAGE_BYTES + 1, 0);
        let image = RawImage::new("big.png", "image/png", data);
        assert!(matches!(
            validate_image(&image),
            Err(InputError::TooLarge { size, .. }) if size == MAX_IMAGE_BYTES + 1
        ));
    }

    #[test]
    fn test_undetectable_content_trusts_declaration() {
        let image = RawImage::new("a.webp", "image/webp", vec![0u8; 4]);
        assert!(validate_image(&image).is_ok());
    }
}
