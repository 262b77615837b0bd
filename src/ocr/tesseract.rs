//! Tesseract OCR backend implementation.
//!
//! Uses Tesseract OCR via command-line for text extraction.
//! Each raster is written to a scratch PNG inside the session's working
//! directory; the file is removed as soon as the call returns.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use tempfile::{NamedTempFile, TempDir};
use tokio::process::Command;

use super::backend::{
    OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrSession, ProgressSink, RecognizedText,
};
use super::model_utils::check_binary;
use super::preprocess::NormalizedRaster;

/// Tesseract OCR backend.
pub struct TesseractBackend {
    config: OcrConfig,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: OcrConfig::default(),
        }
    }

    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Resolve the tesseract executable, honoring an explicit path override.
    fn resolve_binary(&self) -> Result<PathBuf, OcrError> {
        let requested = self
            .config
            .binary_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("tesseract"));

        which::which(&requested).map_err(|_| {
            OcrError::BackendNotAvailable(format!(
                "tesseract not found at {} (install tesseract-ocr)",
                requested.display()
            ))
        })
    }
}

impl Default for TesseractBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrBackend for TesseractBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    fn is_available(&self) -> bool {
        match self.config.binary_path {
            Some(ref path) => check_binary(path),
            None => check_binary("tesseract"),
        }
    }

    fn availability_hint(&self) -> String {
        if self.is_available() {
            "Tesseract is available".to_string()
        } else {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        }
    }

    async fn acquire(&self) -> Result<Box<dyn OcrSession>, OcrError> {
        let binary = self.resolve_binary()?;
        let workdir = tempfile::Builder::new()
            .prefix("earnings-ocr-")
            .tempdir()?;

        tracing::debug!(
            "Tesseract session ready ({}, workdir {})",
            binary.display(),
            workdir.path().display()
        );

        Ok(Box::new(TesseractSession {
            binary,
            language: self.config.language.clone(),
            workdir: Mutex::new(Some(workdir)),
        }))
    }
}

/// A warm Tesseract handle: resolved binary plus a private scratch directory.
pub struct TesseractSession {
    binary: PathBuf,
    language: String,
    workdir: Mutex<Option<TempDir>>,
}

impl TesseractSession {
    fn workdir_path(&self) -> Result<PathBuf, OcrError> {
        let guard = self.workdir.lock().map_err(|_| OcrError::Released)?;
        guard
            .as_ref()
            .map(|dir| dir.path().to_path_buf())
            .ok_or(OcrError::Released)
    }

    /// Write the raster to a scratch PNG that is deleted when dropped.
    async fn stage_raster(&self, raster: &NormalizedRaster) -> Result<NamedTempFile, OcrError> {
        let dir = self.workdir_path()?;
        let raster = raster.clone();

        tokio::task::spawn_blocking(move || write_png(&raster, &dir))
            .await
            .map_err(|e| OcrError::OcrFailed(format!("raster writer panicked: {}", e)))?
    }

    /// Run Tesseract on an image file.
    async fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .output()
            .await;

        match output {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).to_string())
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr)))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ))
            }
            Err(e) => Err(OcrError::Io(e)),
        }
    }
}

fn write_png(raster: &NormalizedRaster, dir: &Path) -> Result<NamedTempFile, OcrError> {
    let png = raster
        .to_png()
        .map_err(|e| OcrError::ImageError(format!("Failed to encode raster: {}", e)))?;

    let mut file = tempfile::Builder::new()
        .prefix("raster-")
        .suffix(".png")
        .tempfile_in(dir)?;
    file.write_all(&png)?;
    file.flush()?;
    Ok(file)
}

#[async_trait]
impl OcrSession for TesseractSession {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Tesseract
    }

    async fn recognize(
        &self,
        raster: &NormalizedRaster,
        progress: &dyn ProgressSink,
    ) -> Result<RecognizedText, OcrError> {
        let start = Instant::now();
        progress.report(0);

        let staged = self.stage_raster(raster).await?;
        let text = self.run_tesseract(staged.path()).await?;
        drop(staged);

        progress.report(100);
        Ok(RecognizedText {
            text,
            backend: OcrBackendType::Tesseract,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn release(&self) {
        let workdir = match self.workdir.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(dir) = workdir {
            if let Err(e) = dir.close() {
                tracing::warn!("Failed to remove tesseract workdir: {}", e);
            }
        }
    }
}
