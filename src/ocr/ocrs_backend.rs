//! OCRS OCR backend implementation.
//!
//! Uses the ocrs crate for pure-Rust OCR without external dependencies.
//! The engine lives inside the session, so releasing the session frees the
//! loaded models.
//!
//! Models are automatically downloaded on first use from:
//! https://ocrs-models.s3-accelerate.amazonaws.com/

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use async_trait::async_trait;

use super::backend::{
    OcrBackend, OcrBackendType, OcrConfig, OcrError, OcrSession, ProgressSink, RecognizedText,
};
use super::model_utils::{ensure_model_file, ModelDirConfig, ModelSpec};
use super::preprocess::NormalizedRaster;

/// Model directory configuration for OCRS.
const MODEL_CONFIG: ModelDirConfig = ModelDirConfig {
    subdir: "ocrs",
    required_files: &["text-detection.rten", "text-recognition.rten"],
};

/// Model specifications for downloading.
const DETECTION_MODEL: ModelSpec = ModelSpec {
    url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten",
    filename: "text-detection.rten",
    size_hint: "2.5 MB",
};

const RECOGNITION_MODEL: ModelSpec = ModelSpec {
    url: "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten",
    filename: "text-recognition.rten",
    size_hint: "10 MB",
};

/// OCRS OCR backend (pure Rust).
pub struct OcrsBackend {
    config: OcrConfig,
}

impl OcrsBackend {
    /// Create a new OCRS backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: OcrConfig::default(),
        }
    }

    /// Create a new OCRS backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Ensure models are downloaded, downloading them if necessary.
    fn ensure_models(model_path: Option<PathBuf>) -> Result<PathBuf, OcrError> {
        if let Some(dir) = MODEL_CONFIG.find(model_path.as_deref()) {
            return Ok(dir);
        }

        let model_dir = MODEL_CONFIG.default_dir();
        std::fs::create_dir_all(&model_dir).map_err(OcrError::Io)?;

        ensure_model_file(&DETECTION_MODEL, &model_dir)?;
        ensure_model_file(&RECOGNITION_MODEL, &model_dir)?;

        Ok(model_dir)
    }

    /// Load both models and build an engine.
    fn load_engine(model_path: Option<PathBuf>) -> Result<ocrs::OcrEngine, OcrError> {
        let model_dir = Self::ensure_models(model_path)?;

        let detection_path = model_dir.join(DETECTION_MODEL.filename);
        let recognition_path = model_dir.join(RECOGNITION_MODEL.filename);

        let detection_model = rten::Model::load_file(&detection_path)
            .map_err(|e| OcrError::ModelNotFound(format!("detection model: {}", e)))?;
        let recognition_model = rten::Model::load_file(&recognition_path)
            .map_err(|e| OcrError::ModelNotFound(format!("recognition model: {}", e)))?;

        ocrs::OcrEngine::new(ocrs::OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| OcrError::OcrFailed(format!("Failed to create OCR engine: {}", e)))
    }
}

impl Default for OcrsBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrBackend for OcrsBackend {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Ocrs
    }

    fn is_available(&self) -> bool {
        // Always available - models will be auto-downloaded on first use
        true
    }

    fn availability_hint(&self) -> String {
        match MODEL_CONFIG.find(self.config.model_path.as_deref()) {
            Some(path) => format!("OCRS models found at {:?}", path),
            None => format!(
                "OCRS models will be auto-downloaded on first use (~12 MB total) to {:?}",
                MODEL_CONFIG.default_dir()
            ),
        }
    }

    async fn acquire(&self) -> Result<Box<dyn OcrSession>, OcrError> {
        let model_path = self.config.model_path.clone();
        let engine = tokio::task::spawn_blocking(move || Self::load_engine(model_path))
            .await
            .map_err(|e| OcrError::OcrFailed(format!("engine loader panicked: {}", e)))??;

        Ok(Box::new(OcrsSession {
            engine: RwLock::new(Some(Arc::new(engine))),
        }))
    }
}

/// A loaded OCRS engine.
pub struct OcrsSession {
    engine: RwLock<Option<Arc<ocrs::OcrEngine>>>,
}

impl OcrsSession {
    fn engine(&self) -> Result<Arc<ocrs::OcrEngine>, OcrError> {
        self.engine
            .read()
            .map_err(|_| OcrError::Released)?
            .clone()
            .ok_or(OcrError::Released)
    }
}

fn run_ocrs(engine: &ocrs::OcrEngine, rgb: image::RgbImage) -> Result<String, OcrError> {
    let (width, height) = rgb.dimensions();

    let img_source = ocrs::ImageSource::from_bytes(rgb.as_raw(), (width, height))
        .map_err(|e| OcrError::ImageError(format!("Failed to convert image: {}", e)))?;

    let input = engine
        .prepare_input(img_source)
        .map_err(|e| OcrError::OcrFailed(format!("Failed to prepare input: {}", e)))?;

    engine
        .get_text(&input)
        .map_err(|e| OcrError::OcrFailed(format!("Failed to extract text: {}", e)))
}

#[async_trait]
impl OcrSession for OcrsSession {
    fn backend_type(&self) -> OcrBackendType {
        OcrBackendType::Ocrs
    }

    async fn recognize(
        &self,
        raster: &NormalizedRaster,
        progress: &dyn ProgressSink,
    ) -> Result<RecognizedText, OcrError> {
        let start = Instant::now();
        let engine = self.engine()?;
        let rgb = raster.image().to_rgb8();
        progress.report(0);

        let text = tokio::task::spawn_blocking(move || run_ocrs(&engine, rgb))
            .await
            .map_err(|e| OcrError::OcrFailed(format!("recognizer task panicked: {}", e)))??;

        progress.report(100);
        Ok(RecognizedText {
            text,
            backend: OcrBackendType::Ocrs,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn release(&self) {
        let engine = match self.engine.write() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        drop(engine);
    }
}
