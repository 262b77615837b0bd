//! Image extraction command.

use std::path::PathBuf;

use anyhow::Context;
use tokio::sync::mpsc;

use earnings_ocr::config::{Config, FailurePolicy};
use earnings_ocr::models::RawImage;
use earnings_ocr::ocr::create_backend;
use earnings_ocr::services::{ExtractionPipeline, PipelineError, PipelineOptions};

use crate::cli::helpers::{print_result, OutputFormat};
use crate::cli::{icons, progress};

/// Run the pipeline over `paths` and print the result.
pub async fn cmd_extract(
    config: &Config,
    paths: &[PathBuf],
    format: OutputFormat,
    fail_fast: bool,
    show_progress: bool,
) -> anyhow::Result<()> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let image = RawImage::from_path(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        images.push(image);
    }

    let backend = create_backend(config.ocr.backend, config.ocr.backend_config())?;
    if !backend.is_available() {
        anyhow::bail!(
            "{} backend is not available: {}",
            backend.backend_type(),
            backend.availability_hint()
        );
    }

    let mut options = PipelineOptions::from(&config.pipeline);
    if fail_fast {
        options.on_error = FailurePolicy::Abort;
    }

    if show_progress {
        eprintln!(
            "{} Extracting from {} image(s) with {}",
            icons::info(),
            images.len(),
            backend.backend_type()
        );
    }

    let (event_tx, event_rx) = mpsc::channel(32);
    let pipeline = ExtractionPipeline::with_options(backend, options).with_events(event_tx);
    let event_handler = show_progress.then(|| progress::spawn(event_rx, pipeline.subscribe()));

    let outcome = tokio::select! {
        result = pipeline.run(&images) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n{} Interrupted, stopping...", icons::warn());
            pipeline.cancel().await;
            Err(PipelineError::Cancelled)
        }
    };

    pipeline.release().await;
    drop(pipeline);

    // Wait for event handler to finish
    if let Some(handler) = event_handler {
        if let Err(e) = handler.await {
            tracing::warn!("Progress task failed: {}", e);
        }
    }

    let result = outcome?;
    print_result(&result, format)
}
