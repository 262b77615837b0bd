//! Types shared by the extraction pipeline and its observers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{FailurePolicy, PipelineSettings};
use crate::models::AnnouncementEvent;
use crate::ocr::{OcrError, PreprocessError};
use crate::utils::InputError;

/// Whether a run is in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
}

/// Observable pipeline state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub phase: RunPhase,
    /// Recognition progress of the current image (0-100).
    pub progress_percent: u8,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }
}

/// Events emitted while a batch is processed.
#[derive(Debug, Clone)]
pub enum ExtractionEvent {
    /// Batch accepted, processing begins
    RunStarted {
        total_images: usize,
    },
    /// Image is being decoded and recognized
    ImageStarted {
        index: usize,
        name: String,
    },
    /// Image recognized; `candidates` dated lines found
    ImageCompleted {
        index: usize,
        name: String,
        candidates: usize,
    },
    /// Image skipped (or run aborted, depending on policy)
    ImageFailed {
        index: usize,
        name: String,
        error: String,
    },
    /// All images processed
    RunCompleted {
        events: Vec<AnnouncementEvent>,
        failed: usize,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no images supplied")]
    EmptyBatch,

    #[error("an extraction run is already in progress")]
    AlreadyRunning,

    #[error("extraction was cancelled")]
    Cancelled,

    #[error("image {index} ({name}) rejected: {source}")]
    Input {
        index: usize,
        name: String,
        #[source]
        source: InputError,
    },

    #[error("image {index} ({name}) could not be decoded: {source}")]
    Decode {
        index: usize,
        name: String,
        #[source]
        source: PreprocessError,
    },

    #[error("text recognition failed for image {index} ({name}): {source}")]
    Recognition {
        index: usize,
        name: String,
        #[source]
        source: OcrError,
    },

    #[error("recognizer unavailable: {0}")]
    Backend(#[source] OcrError),
}

impl PipelineError {
    /// Index of the image this error belongs to, if it is a per-image error.
    pub fn image_index(&self) -> Option<usize> {
        match self {
            PipelineError::Input { index, .. }
            | PipelineError::Decode { index, .. }
            | PipelineError::Recognition { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Per-pipeline behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub on_error: FailurePolicy,
    pub validate_input: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            on_error: FailurePolicy::Skip,
            validate_input: true,
        }
    }
}

impl From<&PipelineSettings> for PipelineOptions {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            on_error: settings.on_error,
            validate_input: settings.validate_input,
        }
    }
}
