//! Batch extraction of earnings announcements from calendar images.
//!
//! `ExtractionPipeline` drives each image through validation, downscaling,
//! recognition and date parsing, strictly one image at a time, then hands the
//! per-image candidates to the aggregator. The recognizer session is acquired
//! on first use and kept warm between runs until `cancel` or `release`.
//!
//! State and per-image progress are published on a `watch` channel; an
//! optional `mpsc` channel receives [`ExtractionEvent`]s.

mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use crate::config::{Config, FailurePolicy};
use crate::models::{ExtractionResult, ImageFailure, RawImage};
use crate::ocr::{
    create_backend, preprocess, OcrBackend, OcrError, OcrSession, ProgressSink, RecognizedText,
};
use crate::services::aggregate::aggregate;
use crate::services::date_detection::parse_lines;
use crate::utils::validate_image;

pub use types::{ExtractionEvent, PipelineError, PipelineOptions, RunPhase, RunState};

/// Sequential OCR pipeline with a warm recognizer.
pub struct ExtractionPipeline {
    backend: Box<dyn OcrBackend>,
    session: Mutex<Option<Arc<dyn OcrSession>>>,
    state: watch::Sender<RunState>,
    cancelled: AtomicBool,
    options: PipelineOptions,
    events: Option<mpsc::Sender<ExtractionEvent>>,
}

impl ExtractionPipeline {
    pub fn new(backend: Box<dyn OcrBackend>) -> Self {
        Self::with_options(backend, PipelineOptions::default())
    }

    pub fn with_options(backend: Box<dyn OcrBackend>, options: PipelineOptions) -> Self {
        let (state, _) = watch::channel(RunState::default());
        Self {
            backend,
            session: Mutex::new(None),
            state,
            cancelled: AtomicBool::new(false),
            options,
            events: None,
        }
    }

    /// Build the backend and options described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, OcrError> {
        let backend = create_backend(config.ocr.backend, config.ocr.backend_config())?;
        Ok(Self::with_options(backend, PipelineOptions::from(&config.pipeline)))
    }

    /// Send progress events to `tx` during runs.
    pub fn with_events(mut self, tx: mpsc::Sender<ExtractionEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    pub fn backend(&self) -> &dyn OcrBackend {
        self.backend.as_ref()
    }

    /// Current state snapshot.
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Watch state and progress changes.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Whether a recognizer session is currently held.
    pub async fn is_warm(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Process a batch and return the deduplicated events.
    ///
    /// Fails with `EmptyBatch` before touching any state when `images` is
    /// empty, and with `AlreadyRunning` when another run is active.
    /// Per-image failures are skipped or abort the run according to
    /// [`PipelineOptions::on_error`].
    pub async fn run(&self, images: &[RawImage]) -> Result<ExtractionResult, PipelineError> {
        if images.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }

        let started = self.state.send_if_modified(|state| {
            if state.is_running() {
                return false;
            }
            *state = RunState {
                phase: RunPhase::Running,
                progress_percent: 0,
            };
            true
        });
        if !started {
            return Err(PipelineError::AlreadyRunning);
        }
        let _guard = RunGuard { state: &self.state };
        self.cancelled.store(false, Ordering::SeqCst);

        info!("Extracting announcements from {} image(s)", images.len());
        self.emit(ExtractionEvent::RunStarted {
            total_images: images.len(),
        })
        .await;

        let mut texts = Vec::with_capacity(images.len());
        let mut per_image = Vec::with_capacity(images.len());
        let mut failures = Vec::new();

        for (index, image) in images.iter().enumerate() {
            self.check_cancelled()?;
            self.set_progress(0);
            self.emit(ExtractionEvent::ImageStarted {
                index,
                name: image.name().to_string(),
            })
            .await;

            let outcome = self.process_image(index, image).await;
            // A result that lands after cancel is discarded
            self.check_cancelled()?;

            match outcome {
                Ok(recognized) => {
                    let candidates = parse_lines(recognized.lines());
                    info!(
                        "{}: {} dated line(s) in {}ms",
                        image.name(),
                        candidates.len(),
                        recognized.processing_time_ms
                    );
                    self.emit(ExtractionEvent::ImageCompleted {
                        index,
                        name: image.name().to_string(),
                        candidates: candidates.len(),
                    })
                    .await;
                    texts.push(recognized.text);
                    per_image.push(candidates);
                }
                Err(e @ (PipelineError::Backend(_) | PipelineError::Cancelled)) => return Err(e),
                Err(e) => {
                    self.emit(ExtractionEvent::ImageFailed {
                        index,
                        name: image.name().to_string(),
                        error: e.to_string(),
                    })
                    .await;
                    if self.options.on_error == FailurePolicy::Abort {
                        return Err(e);
                    }
                    warn!("Skipping image: {}", e);
                    failures.push(ImageFailure {
                        index,
                        name: image.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let items = aggregate(&per_image);
        info!(
            "Run complete: {} event(s), {} image(s) skipped",
            items.len(),
            failures.len()
        );
        self.emit(ExtractionEvent::RunCompleted {
            events: items.clone(),
            failed: failures.len(),
        })
        .await;

        Ok(ExtractionResult {
            raw_text: texts.join("\n"),
            items,
            failures,
        })
    }

    /// Stop the active run and free the recognizer.
    ///
    /// The run returns `Cancelled` at its next checkpoint; a recognition that
    /// is still in flight has its result discarded. The next run acquires a
    /// fresh session.
    pub async fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        debug!("Cancellation requested");
        self.release().await;
    }

    /// Free the warm recognizer session, if any.
    pub async fn release(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            debug!("Releasing {} session", session.backend_type());
            session.release().await;
        }
    }

    async fn process_image(
        &self,
        index: usize,
        image: &RawImage,
    ) -> Result<RecognizedText, PipelineError> {
        if self.options.validate_input {
            validate_image(image).map_err(|source| PipelineError::Input {
                index,
                name: image.name().to_string(),
                source,
            })?;
        }

        let raster = preprocess::downscale(image)
            .await
            .map_err(|source| PipelineError::Decode {
                index,
                name: image.name().to_string(),
                source,
            })?;
        debug!(
            "{}: normalized to {}x{}",
            image.name(),
            raster.width(),
            raster.height()
        );

        let session = self.session().await?;
        self.check_cancelled()?;
        let sink = StateProgress { state: &self.state };
        session
            .recognize(&raster, &sink)
            .await
            .map_err(|source| PipelineError::Recognition {
                index,
                name: image.name().to_string(),
                source,
            })
    }

    /// Current session, acquiring one if none is held.
    ///
    /// The cancel flag is checked under the lock, so a session is never
    /// acquired after `cancel` has run.
    async fn session(&self) -> Result<Arc<dyn OcrSession>, PipelineError> {
        let mut guard = self.session.lock().await;
        self.check_cancelled()?;
        if let Some(session) = guard.as_ref() {
            return Ok(Arc::clone(session));
        }

        info!("Starting {} recognizer", self.backend.backend_type());
        let session: Arc<dyn OcrSession> = Arc::from(
            self.backend
                .acquire()
                .await
                .map_err(PipelineError::Backend)?,
        );
        *guard = Some(Arc::clone(&session));
        Ok(session)
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    fn set_progress(&self, percent: u8) {
        set_progress(&self.state, percent);
    }

    async fn emit(&self, event: ExtractionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}

fn set_progress(state: &watch::Sender<RunState>, percent: u8) {
    let percent = percent.min(100);
    state.send_if_modified(|s| {
        if s.progress_percent == percent {
            return false;
        }
        s.progress_percent = percent;
        true
    });
}

/// Forwards recognizer progress into the watch channel.
struct StateProgress<'a> {
    state: &'a watch::Sender<RunState>,
}

impl ProgressSink for StateProgress<'_> {
    fn report(&self, percent: u8) {
        set_progress(self.state, percent);
    }
}

/// Returns the pipeline to idle however the run ends.
struct RunGuard<'a> {
    state: &'a watch::Sender<RunState>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| *s = RunState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        let (state, rx) = watch::channel(RunState::default());
        StateProgress { state: &state }.report(250);
        assert_eq!(rx.borrow().progress_percent, 100);
    }

    #[test]
    fn test_guard_resets_state() {
        let (state, rx) = watch::channel(RunState {
            phase: RunPhase::Running,
            progress_percent: 42,
        });
        drop(RunGuard { state: &state });
        assert_eq!(*rx.borrow(), RunState::default());
    }

    #[tokio::test]
    async fn test_from_config_starts_cold_and_idle() {
        let mut config = Config::default();
        config.pipeline.on_error = FailurePolicy::Abort;

        let pipeline = ExtractionPipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.options().on_error, FailurePolicy::Abort);
        assert!(pipeline.options().validate_input);
        assert_eq!(pipeline.state(), RunState::default());
        assert!(!pipeline.is_warm().await);
    }

    #[test]
    fn test_per_image_errors_carry_index() {
        let err = PipelineError::Recognition {
            index: 3,
            name: "c.png".to_string(),
            source: OcrError::Released,
        };
        assert_eq!(err.image_index(), Some(3));
        assert_eq!(PipelineError::Cancelled.image_index(), None);
    }
}
