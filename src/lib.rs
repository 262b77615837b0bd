//! earnings-ocr - extract earnings announcement dates from calendar screenshots.
//!
//! Images go through a fixed pipeline: downscale, OCR, date/time extraction,
//! market-session classification and deduplication. The resulting event list
//! is what a dashboard hands to the price-reaction analysis service.

pub mod config;
pub mod models;
pub mod ocr;
pub mod services;
pub mod utils;
