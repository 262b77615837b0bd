//! Text-only extraction command.

use std::path::Path;

use anyhow::Context;
use tokio::io::AsyncReadExt;

use earnings_ocr::models::ExtractionResult;
use earnings_ocr::services::{aggregate, parse_events};

use crate::cli::helpers::{print_result, OutputFormat};

/// Run the date extractor and aggregator on recognized text.
pub async fn cmd_parse(file: Option<&Path>, format: OutputFormat) -> anyhow::Result<()> {
    let text = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read stdin")?;
            buf
        }
    };

    let candidates = parse_events(&text);
    tracing::info!("{} dated line(s) found", candidates.len());

    let result = ExtractionResult {
        items: aggregate(&[candidates]),
        raw_text: text,
        failures: Vec::new(),
    };
    print_result(&result, format)
}
