//! Terminal progress for extraction runs.
//!
//! Batch position comes from pipeline events; the message line shows the
//! recognizer's percentage for the current image from the state watch.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use earnings_ocr::services::{ExtractionEvent, RunState};

use super::icons;

/// Render progress until the run completes or the pipeline goes away.
pub fn spawn(
    mut events: mpsc::Receiver<ExtractionEvent>,
    mut state: watch::Receiver<RunState>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut bar: Option<ProgressBar> = None;
        let mut current = String::new();
        let mut watching = true;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        ExtractionEvent::RunStarted { total_images } => {
                            bar = Some(new_bar(total_images as u64));
                        }
                        ExtractionEvent::ImageStarted { name, .. } => {
                            current = name;
                            if let Some(ref pb) = bar {
                                pb.set_message(format!("{} 0%", current));
                            }
                        }
                        ExtractionEvent::ImageCompleted { .. } => {
                            if let Some(ref pb) = bar {
                                pb.inc(1);
                            }
                        }
                        ExtractionEvent::ImageFailed { name, error, .. } => {
                            let line = format!("  {} {}: {}", icons::error(), name, error);
                            match bar {
                                Some(ref pb) => {
                                    pb.suspend(|| eprintln!("{}", line));
                                    pb.inc(1);
                                }
                                None => eprintln!("{}", line),
                            }
                        }
                        ExtractionEvent::RunCompleted { events, failed } => {
                            if let Some(pb) = bar.take() {
                                pb.finish_and_clear();
                            }
                            eprintln!(
                                "{} Found {} announcement(s){}",
                                icons::success(),
                                events.len(),
                                if failed > 0 {
                                    format!(", {} image(s) skipped", style(failed).yellow())
                                } else {
                                    String::new()
                                }
                            );
                            break;
                        }
                    }
                }
                changed = state.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                        continue;
                    }
                    let percent = state.borrow_and_update().progress_percent;
                    if let Some(ref pb) = bar {
                        pb.set_message(format!("{} {}%", current, percent));
                    }
                }
            }
        }

        if let Some(pb) = bar {
            pb.abandon();
        }
    })
}

fn new_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    pb.set_message("Starting recognizer...");
    pb
}
