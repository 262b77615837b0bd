//! OCR: image normalization and text recognition.
//!
//! ## OCR Backends
//!
//! - **Tesseract**: Traditional OCR via command-line, CPU-based (default)
//! - **OCRS**: Pure Rust OCR, no external binaries (feature: ocr-ocrs)
//!
//! Backends hand out sessions; the extraction pipeline keeps one session warm
//! across runs and releases it on cancel or shutdown.

mod backend;
mod model_utils;
pub mod preprocess;
mod tesseract;

#[cfg(feature = "ocr-ocrs")]
mod ocrs_backend;

pub use backend::{
    OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrSession, ProgressSink, RecognizedText,
};
pub use preprocess::{NormalizedRaster, PreprocessError, MAX_DIMENSION};
pub use tesseract::{TesseractBackend, TesseractSession};

#[cfg(feature = "ocr-ocrs")]
pub use ocrs_backend::{OcrsBackend, OcrsSession};

/// Build the backend selected by `backend_type`.
pub fn create_backend(
    backend_type: OcrBackendType,
    config: OcrConfig,
) -> Result<Box<dyn OcrBackend>, OcrError> {
    match backend_type {
        OcrBackendType::Tesseract => Ok(Box::new(TesseractBackend::with_config(config))),
        #[cfg(feature = "ocr-ocrs")]
        OcrBackendType::Ocrs => Ok(Box::new(OcrsBackend::with_config(config))),
        #[cfg(not(feature = "ocr-ocrs"))]
        OcrBackendType::Ocrs => {
            let _ = config;
            Err(OcrError::BackendNotAvailable(
                "OCRS support not compiled (enable the ocr-ocrs feature)".to_string(),
            ))
        }
    }
}
