//! Recognizer abstraction shared by all OCR engines.
//!
//! An `OcrBackend` describes an engine and knows whether it can run here.
//! Calling `acquire` initializes the engine and returns an `OcrSession`, the
//! long-lived handle that actually recognizes rasters. Sessions are kept warm
//! by their owner and must be released explicitly.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::preprocess::NormalizedRaster;

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Recognizer session has been released")]
    Released,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),
}

/// Text recognized from one raster.
#[derive(Debug, Clone)]
pub struct RecognizedText {
    /// Extracted text content.
    pub text: String,
    /// Which backend produced this result.
    pub backend: OcrBackendType,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl RecognizedText {
    /// Non-empty, trimmed lines of the recognized text.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Available OCR backend types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackendType {
    /// Tesseract OCR via command-line.
    #[default]
    Tesseract,
    /// Pure Rust OCR engine (ocrs crate).
    Ocrs,
}

impl OcrBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrBackendType::Tesseract => "tesseract",
            OcrBackendType::Ocrs => "ocrs",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tesseract" => Some(OcrBackendType::Tesseract),
            "ocrs" => Some(OcrBackendType::Ocrs),
            _ => None,
        }
    }
}

impl std::fmt::Display for OcrBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Receives recognition progress for the image currently being processed.
pub trait ProgressSink: Send + Sync {
    /// Report progress as a percentage (0-100).
    fn report(&self, percent: u8);
}

/// Sink that drops all progress reports.
#[cfg(test)]
pub struct NoProgress;

#[cfg(test)]
impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8) {}
}

/// Trait for OCR backends.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> OcrBackendType;

    /// Check if this backend is available (dependencies installed, models present).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Initialize the engine and hand back a session that owns it.
    async fn acquire(&self) -> Result<Box<dyn OcrSession>, OcrError>;
}

/// An initialized recognizer. At most one `recognize` call is in flight at a time.
#[async_trait]
pub trait OcrSession: Send + Sync {
    fn backend_type(&self) -> OcrBackendType;

    /// Recognize the text in a raster.
    async fn recognize(
        &self,
        raster: &NormalizedRaster,
        progress: &dyn ProgressSink,
    ) -> Result<RecognizedText, OcrError>;

    /// Free the engine. Later `recognize` calls fail with `OcrError::Released`.
    async fn release(&self);
}

/// Configuration for OCR backends.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng", "chi_sim").
    pub language: String,
    /// Explicit path to the engine binary (for command-line backends).
    pub binary_path: Option<PathBuf>,
    /// Path to model files (for backends that need them).
    pub model_path: Option<PathBuf>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            binary_path: None,
            model_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_round_trips_names() {
        assert_eq!(OcrBackendType::from_str("Tesseract"), Some(OcrBackendType::Tesseract));
        assert_eq!(OcrBackendType::from_str("ocrs"), Some(OcrBackendType::Ocrs));
        assert_eq!(OcrBackendType::from_str("paddle"), None);
        assert_eq!(OcrBackendType::Ocrs.to_string(), "ocrs");
    }

    #[test]
    fn test_recognized_lines_skip_blank() {
        let text = RecognizedText {
            text: "  Results \n\n\t\n 12 Aug 2025  ".to_string(),
            backend: OcrBackendType::Tesseract,
            processing_time_ms: 0,
        };
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, vec!["Results", "12 Aug 2025"]);
    }
}
